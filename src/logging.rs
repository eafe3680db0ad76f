use std::path::PathBuf;

use compact_str::{CompactString, format_compact};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, fmt, fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
    config::RelayConfig,
    result::{RelayError, Result},
};

pub const LOG_FILE_PREFIX: &str = "feed-relay.log";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level applied to this crate when `RUST_LOG` is not set
    pub level: CompactString,
    /// Rolling daily log files are written here when set
    pub log_dir: Option<PathBuf>,
    /// Emit console logs as JSON lines
    pub json: bool,
    /// Write console logs to stderr, keeping stdout free for event output
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into(), log_dir: None, json: false, stderr: false }
    }
}

impl LoggingConfig {
    /// Read `FEED_RELAY_LOG_DIR` and `FEED_RELAY_LOG_JSON`
    pub fn from_env() -> Self {
        let log_dir = std::env::var_os("FEED_RELAY_LOG_DIR").map(PathBuf::from);
        let json = std::env::var("FEED_RELAY_LOG_JSON")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self { log_dir, json, ..Self::default() }
    }

    /// Layer the config file on top of the environment
    pub fn with_relay_config(mut self, config: &RelayConfig) -> Self {
        if let Some(level) = &config.log_level {
            self.level = level.clone();
        }
        if self.log_dir.is_none() {
            self.log_dir = config.log_dir.clone();
        }
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        if debug {
            self.level = "debug".into();
        }
        self
    }

    pub fn with_stderr(mut self, stderr: bool) -> Self {
        self.stderr = stderr;
        self
    }

    /// Filter directive used when `RUST_LOG` is absent
    pub fn default_directive(&self) -> CompactString {
        format_compact!("warn,feed_relay={}", self.level.to_lowercase())
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be kept alive
/// for as long as logging is needed.
pub fn init_logging(config: LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.default_directive()).map_err(RelayError::logging_error)?,
    };

    let json_layer = config
        .json
        .then(|| fmt::layer().json().with_writer(console_writer(config.stderr)));
    let plain_layer = (!config.json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(console_writer(config.stderr))
    });

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer)
        .with(file_layer)
        .try_init()
        .map_err(RelayError::logging_error)?;

    Ok(guard)
}

fn console_writer(stderr: bool) -> BoxMakeWriter {
    if stderr {
        BoxMakeWriter::new(std::io::stderr)
    } else {
        BoxMakeWriter::new(std::io::stdout)
    }
}
