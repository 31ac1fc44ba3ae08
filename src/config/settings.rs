// Settings loading
//
// Settings come from an optional TOML file, then environment variables. The
// environment wins for retry and log settings. For the credentials file,
// region and STS endpoint it only fills in what the file leaves unset.

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;

use super::types::{EnvVars, LogLevel, Settings};

impl Settings {
    /// Load settings from `path` (if given) and apply environment overrides.
    ///
    /// Returns the settings together with a message for every environment
    /// override that was ignored. Loading usually happens before logging is
    /// set up, so reporting them is left to the caller.
    pub async fn load(path: Option<&Path>) -> Result<(Self, Vec<String>)> {
        let mut settings = match path {
            Some(path) => Self::load_file(path).await?,
            None => Self::default(),
        };

        let ignored = settings.apply_overrides(|key| env::var(key).ok());
        Ok((settings, ignored))
    }

    async fn load_file(path: &Path) -> Result<Self> {
        tracing::debug!("Loading settings from: {:?}", path);

        let content = async_fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings file {:?}", path))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse settings file {:?}", path))
    }

    /// Apply overrides looked up through `get`. Returns a message for each
    /// value that could not be used.
    pub fn apply_overrides<G>(&mut self, get: G) -> Vec<String>
    where
        G: Fn(&str) -> Option<String>,
    {
        let mut ignored = Vec::new();

        if let Some(max_retries) = get(EnvVars::MAX_RETRIES) {
            match max_retries.trim().parse::<u32>() {
                Ok(value) if value > 0 => self.retry.options.max_attempts = value,
                _ => ignored.push(format!(
                    "Ignoring invalid {}={:?}: expected a positive integer",
                    EnvVars::MAX_RETRIES,
                    max_retries
                )),
            }
        }

        if let Some(disable) = get(EnvVars::DISABLE_RETRY) {
            if is_truthy(&disable) {
                self.retry.enabled = false;
            }
        }

        if let Some(log_level) = get(EnvVars::LOG_LEVEL) {
            match log_level.parse::<LogLevel>() {
                Ok(level) => self.log_level = level,
                Err(e) => ignored.push(format!("Ignoring {}: {}", EnvVars::LOG_LEVEL, e)),
            }
        }

        if self.validation.endpoint_url.is_none() {
            self.validation.endpoint_url = get(EnvVars::STS_ENDPOINT).filter(|u| !u.is_empty());
        }

        if self.validation.region.is_none() {
            self.validation.region = get(EnvVars::REGION).filter(|r| !r.is_empty());
        }

        if self.credentials_file.is_none() {
            self.credentials_file = get(EnvVars::SHARED_CREDENTIALS_FILE)
                .filter(|f| !f.is_empty())
                .map(PathBuf::from);
        }

        ignored
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
