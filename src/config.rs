use std::path::{Path, PathBuf};

use compact_str::CompactString;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    client::config::DEFAULT_FEED_URL,
    result::{RelayError, Result},
};

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const ENV_FILE: &str = ".env";

/// On-disk configuration; every field may be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub feed_url: CompactString,
    /// Overridden by `GITHUB_TOKEN` when set
    pub token: Option<CompactString>,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub publisher_capacity: usize,
    /// Default log filter level, e.g. `info` or `debug`
    pub log_level: Option<CompactString>,
    /// Directory for rolling log files; stdout only when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.into(),
            token: None,
            poll_interval_secs: 15,
            request_timeout_secs: 30,
            publisher_capacity: 1024,
            log_level: None,
            log_dir: None,
        }
    }
}

impl RelayConfig {
    /// Apply the token from the environment, if present and non-empty
    pub fn with_env(self) -> Self {
        self.with_token_from(std::env::var(TOKEN_ENV).ok())
    }

    fn with_token_from(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.token = Some(token.into());
        }
        self
    }

    /// Copy suitable for writing to disk
    pub fn without_token(mut self) -> Self {
        self.token = None;
        self
    }
}

/// Merge variables from an env file into the process environment.
///
/// Variables already set are left alone. A missing file is silently skipped
/// and an unreadable one only logged; returns whether the file was applied.
pub fn load_env_file(path: &Path) -> bool {
    match dotenvy::from_path(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Loaded environment file");
            true
        },
        Err(e) if e.not_found() => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable environment file");
            false
        },
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(dirs) = BaseDirs::new() {
        dirs.config_dir().join("feed-relay.toml")
    } else {
        PathBuf::from("feed-relay.toml")
    }
}

/// Load the configuration file, falling back to defaults when it does not exist
pub fn load_config(config_file: &Path) -> Result<RelayConfig> {
    if !config_file.exists() {
        debug!(path = %config_file.display(), "No configuration file, using defaults");
        return Ok(RelayConfig::default());
    }

    confy::load_path(config_file)
        .map_err(|e| RelayError::config_load_error(config_file.to_path_buf(), e))
}

pub fn save_config(config_file: &Path, config: &RelayConfig) -> Result<()> {
    if let Some(parent) = config_file.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| RelayError::config_save_error(config_file.to_path_buf(), e))?;
    }

    confy::store_path(config_file, config)
        .map_err(|e| RelayError::config_save_error(config_file.to_path_buf(), e))?;

    Ok(())
}
