use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backend::PostsApiConfig;
use crate::matcher::{FailurePolicy, MatcherConfig};

pub const BACKEND_URL_ENV: &str = "VOLUNTEER_MATCH_BACKEND_URL";

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const MIN_REQUEST_TIMEOUT_MS: u64 = 500;
const MAX_REQUEST_TIMEOUT_MS: u64 = 120_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const MIN_THEME_TICK_SECS: u64 = 1;
const MAX_THEME_TICK_SECS: u64 = 3_600;
const DEFAULT_THEME_TICK_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontend_url: Option<String>,
    pub request_timeout_ms: u64,
    pub theme_tick_secs: u64,
    pub failure_policy: FailurePolicy,
    pub discard_stale: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            frontend_url: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            theme_tick_secs: DEFAULT_THEME_TICK_SECS,
            failure_policy: FailurePolicy::Keep,
            discard_stale: true,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("volunteer-match");
        path.push("settings.toml");
        Some(path)
    }

    /// Settings file, then environment overrides.
    pub fn load() -> Self {
        let mut settings = match Self::config_path() {
            Some(path) => Self::load_from_path(&path),
            None => Self::default(),
        };
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        settings
    }

    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(mut settings) => {
                    settings.validate();
                    settings
                }
                Err(error) => {
                    warn!(
                        "failed to parse settings config '{}': {}",
                        path.display(),
                        error
                    );
                    Self::default()
                }
            },
            Err(error) => {
                warn!(
                    "failed to read settings config '{}': {}",
                    path.display(),
                    error
                );
                Self::default()
            }
        }
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(BACKEND_URL_ENV) {
            self.backend_url = url;
            self.validate();
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path().ok_or_else(|| anyhow!("unable to determine config path"))?;
        self.save_to_path(&path)
    }

    pub fn save_to_path(&self, path: &Path) -> anyhow::Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow!("invalid settings config path"))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory '{}'", parent.display()))?;

        let mut validated = self.clone();
        validated.validate();
        let contents =
            toml::to_string_pretty(&validated).context("failed to serialize settings to TOML")?;

        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("invalid settings config file name"))?
            .to_string_lossy()
            .to_string();
        let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

        fs::write(&tmp_path, contents).with_context(|| {
            format!(
                "failed to write temporary settings file '{}'",
                tmp_path.display()
            )
        })?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "failed to atomically rename settings file '{}' to '{}'",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }

    pub fn validate(&mut self) {
        self.request_timeout_ms = self
            .request_timeout_ms
            .clamp(MIN_REQUEST_TIMEOUT_MS, MAX_REQUEST_TIMEOUT_MS);
        self.theme_tick_secs = self
            .theme_tick_secs
            .clamp(MIN_THEME_TICK_SECS, MAX_THEME_TICK_SECS);

        let backend_url = self.backend_url.trim().trim_end_matches('/').to_string();
        self.backend_url = if is_http_url(&backend_url) {
            backend_url
        } else {
            warn!(
                "invalid backend_url '{}' in settings; falling back to {}",
                self.backend_url, DEFAULT_BACKEND_URL
            );
            DEFAULT_BACKEND_URL.to_string()
        };

        self.frontend_url = self
            .frontend_url
            .take()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| {
                let valid = is_http_url(url);
                if !valid {
                    warn!("ignoring invalid frontend_url '{url}' in settings");
                }
                valid
            });
    }

    pub fn posts_api_config(&self) -> PostsApiConfig {
        PostsApiConfig {
            base_url: self.backend_url.clone(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    pub fn matcher_config(&self) -> MatcherConfig {
        MatcherConfig {
            failure_policy: self.failure_policy,
            discard_stale: self.discard_stale,
        }
    }

    pub fn theme_tick_period(&self) -> Duration {
        Duration::from_secs(self.theme_tick_secs)
    }
}

fn is_http_url(value: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| value.len() > scheme.len() && value.to_ascii_lowercase().starts_with(scheme))
}
