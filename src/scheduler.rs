//! Recurring wall-clock recomputation of the global [`DisplayMode`].
//!
//! A manual [`ThemeScheduler::toggle_theme`] only lasts until the next tick:
//! every tick recomputes the mode from the clock and overwrites whatever the
//! user picked.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::theme::DisplayMode;

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(60);

pub trait Clock: Send + Sync + 'static {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

pub struct ThemeScheduler {
    mode: Arc<watch::Sender<DisplayMode>>,
    clock: Arc<dyn Clock>,
    ticker: Option<JoinHandle<()>>,
}

impl ThemeScheduler {
    /// Creates the scheduler with the mode computed from `clock`. The tick
    /// does not run until [`ThemeScheduler::start`].
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let initial = DisplayMode::for_time(&clock.now());
        let (sender, _) = watch::channel(initial);
        Self {
            mode: Arc::new(sender),
            clock,
            ticker: None,
        }
    }

    /// Starts the recurring tick. Restarting replaces the previous ticker.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, period: Duration) {
        self.stop();

        let mode = Arc::clone(&self.mode);
        let clock = Arc::clone(&self.clock);
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let next = recompute(&mode, clock.as_ref());
                debug!(mode = next.as_str(), "theme scheduler tick");
            }
        }));
        info!(period_ms = period.as_millis() as u64, "theme scheduler started");
    }

    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
            info!("theme scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker
            .as_ref()
            .is_some_and(|ticker| !ticker.is_finished())
    }

    pub fn mode(&self) -> DisplayMode {
        *self.mode.borrow()
    }

    /// Change feed for the presentation surface.
    pub fn subscribe(&self) -> watch::Receiver<DisplayMode> {
        self.mode.subscribe()
    }

    /// Flips the mode immediately. Overwritten by the next tick.
    pub fn toggle_theme(&self) -> DisplayMode {
        self.mode.send_modify(|mode| *mode = mode.toggled());
        let mode = self.mode();
        debug!(mode = mode.as_str(), "theme toggled manually");
        mode
    }

    /// Recomputes the mode from the clock now, as a tick would.
    pub fn tick(&self) -> DisplayMode {
        recompute(&self.mode, self.clock.as_ref())
    }
}

impl Drop for ThemeScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn recompute(mode: &watch::Sender<DisplayMode>, clock: &dyn Clock) -> DisplayMode {
    let next = DisplayMode::for_time(&clock.now());
    mode.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
    next
}
