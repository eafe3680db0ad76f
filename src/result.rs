use std::path::PathBuf;

use compact_str::CompactString;
use thiserror::Error;

use crate::client::ClientError;

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Failed to load configuration from {path}: {message}")]
    ConfigLoadError { path: PathBuf, message: String },

    #[error("Failed to save configuration to {path}: {message}")]
    ConfigSaveError { path: PathBuf, message: String },

    #[error("Failed to initialize logging: {0}")]
    LoggingError(CompactString),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl RelayError {
    /// Create a configuration load error
    pub fn config_load_error(path: PathBuf, source: impl std::fmt::Display) -> Self {
        Self::ConfigLoadError { path, message: source.to_string() }
    }

    /// Create a configuration save error
    pub fn config_save_error(path: PathBuf, source: impl std::fmt::Display) -> Self {
        Self::ConfigSaveError { path, message: source.to_string() }
    }

    pub fn logging_error(source: impl std::fmt::Display) -> Self {
        Self::LoggingError(source.to_string().into())
    }
}
