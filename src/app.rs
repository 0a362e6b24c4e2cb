//! Wires selection, matcher, theme scheduler and navigation together and
//! runs the interactive loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::backend::RequestFetcher;
use crate::categories::is_known;
use crate::input::{HELP_TEXT, Intent, parse_intent};
use crate::matcher::{MatchEvent, MatcherConfig, RequestMatcher};
use crate::navigation::{Navigator, Route};
use crate::scheduler::{Clock, ThemeScheduler};
use crate::selection::{SelectionFeed, SelectionState};
use crate::theme::DisplayMode;
use crate::types::HelpRequest;
use crate::ui::{Line, ViewModel, paint, render};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Response {
    Render,
    Message(String),
    Quit,
}

pub struct VolunteerApp<F: RequestFetcher, N: Navigator> {
    selection: SelectionState,
    feed: SelectionFeed,
    matcher: RequestMatcher<F>,
    theme: ThemeScheduler,
    navigator: N,
}

impl<F: RequestFetcher, N: Navigator> VolunteerApp<F, N> {
    pub fn new(
        fetcher: Arc<F>,
        matcher_config: MatcherConfig,
        clock: Arc<dyn Clock>,
        navigator: N,
    ) -> Self {
        let mut selection = SelectionState::new();
        let feed = selection.subscribe();
        Self {
            selection,
            feed,
            matcher: RequestMatcher::new(fetcher, matcher_config),
            theme: ThemeScheduler::new(clock),
            navigator,
        }
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn matcher(&self) -> &RequestMatcher<F> {
        &self.matcher
    }

    pub fn results(&self) -> &[HelpRequest] {
        self.matcher.results()
    }

    pub fn theme(&self) -> &ThemeScheduler {
        &self.theme
    }

    pub fn theme_mut(&mut self) -> &mut ThemeScheduler {
        &mut self.theme
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.theme.mode()
    }

    pub fn toggle_category(&mut self, id: &str) -> Vec<MatchEvent> {
        if !is_known(id) {
            debug!(id = %id, "toggling category outside the taxonomy");
        }
        self.selection.toggle(id);
        self.dispatch_selection_changes()
    }

    pub fn clear_selection(&mut self) -> Vec<MatchEvent> {
        self.selection.clear();
        self.dispatch_selection_changes()
    }

    /// Hands every queued selection change to the matcher, in order.
    fn dispatch_selection_changes(&mut self) -> Vec<MatchEvent> {
        let mut events = Vec::new();
        while let Ok(change) = self.feed.try_recv() {
            events.push(self.matcher.on_selection_change(&change));
        }
        events
    }

    pub fn has_pending_fetch(&self) -> bool {
        self.matcher.has_pending()
    }

    pub async fn next_match_event(&mut self) -> Option<MatchEvent> {
        self.matcher.next_event().await
    }

    pub async fn settle(&mut self) -> Vec<MatchEvent> {
        self.matcher.settle().await
    }

    /// Opens a direct chat with the requester at 1-based `position`.
    pub fn open_chat(&self, position: usize) -> Result<Route> {
        let Some(request) = position
            .checked_sub(1)
            .and_then(|index| self.matcher.results().get(index))
        else {
            bail!(
                "no request #{position}; {} request(s) listed",
                self.matcher.results().len()
            );
        };

        let route = Route::DirectChat {
            user_id: request.user_id.clone(),
        };
        info!(request_id = %request.id, route = %route.path(), "opening direct chat");
        self.navigator.navigate(&route);
        Ok(route)
    }

    pub fn go_home(&self) -> Route {
        self.navigator.navigate(&Route::Home);
        Route::Home
    }

    pub fn apply_intent(&mut self, intent: Intent) -> Response {
        debug!(?intent, "applying intent");
        match intent {
            Intent::Toggle(id) => {
                self.toggle_category(&id);
                Response::Render
            }
            Intent::Clear => {
                self.clear_selection();
                Response::Render
            }
            Intent::ToggleTheme => {
                self.theme.toggle_theme();
                Response::Render
            }
            Intent::OpenChat(position) => match self.open_chat(position) {
                Ok(route) => Response::Message(format!("opening {}", route.path())),
                Err(err) => Response::Message(err.to_string()),
            },
            Intent::Home => {
                let route = self.go_home();
                Response::Message(format!("opening {}", route.path()))
            }
            Intent::List => Response::Render,
            Intent::Help => Response::Message(HELP_TEXT.to_string()),
            Intent::Quit => Response::Quit,
            Intent::Invalid(message) => Response::Message(format!("{message}\n{HELP_TEXT}")),
        }
    }

    pub fn view(&self) -> Vec<Line> {
        render(&ViewModel {
            selection: self.selection.categories(),
            matches: self.matcher.state(),
            mode: self.theme.mode(),
        })
    }
}

/// Runs the stdin-driven loop until `quit` or end of input. The theme tick
/// runs for the loop's lifetime.
pub async fn run_interactive<F: RequestFetcher, N: Navigator>(
    app: &mut VolunteerApp<F, N>,
    tick_period: Duration,
    color: bool,
) -> Result<()> {
    app.theme_mut().start(tick_period);
    let result = interactive_loop(app, color).await;
    app.theme_mut().stop();
    result
}

async fn interactive_loop<F: RequestFetcher, N: Navigator>(
    app: &mut VolunteerApp<F, N>,
    color: bool,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut theme_changes = app.theme().subscribe();
    let mut stdout = tokio::io::stdout();

    draw(&mut stdout, app, color, Some(HELP_TEXT)).await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read from stdin")? else {
                    info!("stdin closed; leaving interactive loop");
                    return Ok(());
                };
                let Some(intent) = parse_intent(&line) else {
                    continue;
                };
                match app.apply_intent(intent) {
                    Response::Quit => return Ok(()),
                    Response::Render => draw(&mut stdout, app, color, None).await?,
                    Response::Message(message) => {
                        draw(&mut stdout, app, color, Some(&message)).await?
                    }
                }
            }
            Some(event) = app.next_match_event(), if app.has_pending_fetch() => {
                if !matches!(event, MatchEvent::Discarded { .. }) {
                    draw(&mut stdout, app, color, None).await?;
                }
            }
            changed = theme_changes.changed() => {
                changed.context("theme scheduler closed")?;
                draw(&mut stdout, app, color, None).await?;
            }
        }
    }
}

async fn draw<F: RequestFetcher, N: Navigator>(
    stdout: &mut tokio::io::Stdout,
    app: &VolunteerApp<F, N>,
    color: bool,
    message: Option<&str>,
) -> Result<()> {
    let mut frame = paint(&app.view(), app.display_mode(), color);
    if let Some(message) = message {
        frame.push_str(message);
        frame.push('\n');
    }
    frame.push_str("> ");
    stdout
        .write_all(frame.as_bytes())
        .await
        .context("failed to write to stdout")?;
    stdout.flush().await.context("failed to flush stdout")?;
    Ok(())
}
