//! File logging for the CLI. Nothing is written to the terminal, which is
//! owned by the interactive view.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_LEVEL_ENV: &str = "VOLUNTEER_MATCH_LOG_LEVEL";

/// Keeps the background writer alive; dropping it flushes pending lines.
pub struct LogGuard {
    path: PathBuf,
    _writer: WorkerGuard,
}

impl LogGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn init_logging() -> Result<LogGuard> {
    let dir = log_directory().context("no local data directory for logs")?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory '{}'", dir.display()))?;

    let file_name = log_file_name(&Local::now().format("%Y-%m-%d_%H-%M-%S").to_string());
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
        &dir, &file_name,
    ));

    let level = level_from_env(|key| std::env::var(key).ok());
    tracing_subscriber::registry()
        .with(EnvFilter::new(format!("{level},volunteer_match={level}")))
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    let path = dir.join(file_name);
    tracing::info!(path = %path.display(), %level, "logging initialized");
    Ok(LogGuard {
        path,
        _writer: guard,
    })
}

fn level_from_env(lookup: impl Fn(&str) -> Option<String>) -> LevelFilter {
    let raw = lookup(LOG_LEVEL_ENV).unwrap_or_default();
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "error" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => LevelFilter::WARN,
    }
}

fn log_directory() -> Option<PathBuf> {
    Some(dirs::data_local_dir()?.join("volunteer-match").join("logs"))
}

fn log_file_name(stamp: &str) -> String {
    format!("volunteer-match-{stamp}.log")
}
