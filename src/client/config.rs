//! Configuration management for the feed client

use std::time::Duration;

use compact_str::CompactString;

use super::error::{ClientError, Result};
use crate::config::RelayConfig;

pub const DEFAULT_FEED_URL: &str = "https://api.github.com/events";
pub const DEFAULT_USER_AGENT: &str = concat!("feed-relay/", env!("CARGO_PKG_VERSION"));

/// Main configuration for the feed client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root URL of the feed; every cycle starts paging from here
    pub feed_url: CompactString,
    /// Access token sent as `Authorization: token <token>`
    pub token: CompactString,
    /// Polling configuration
    pub polling: PollingConfig,
    /// Request configuration
    pub request: RequestConfig,
}

/// Polling configuration
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Fixed pause between the end of one cycle and the start of the next
    pub interval: Duration,
    /// Per-subscriber queue depth of the event publisher
    pub publisher_capacity: usize,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Request timeout
    pub timeout: Duration,
    /// `User-Agent` header; GitHub rejects requests without one
    pub user_agent: CompactString,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            publisher_capacity: 1024,
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(feed_url: impl Into<CompactString>, token: impl Into<CompactString>) -> Self {
        Self {
            feed_url: feed_url.into(),
            token: token.into(),
            polling: PollingConfig::default(),
            request: RequestConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.feed_url.is_empty() {
            return Err(ClientError::config_validation("feed_url", "Feed URL cannot be empty"));
        }

        if !self.feed_url.starts_with("http://") && !self.feed_url.starts_with("https://") {
            return Err(ClientError::config_validation(
                "feed_url",
                "Feed URL must start with http:// or https://",
            ));
        }

        if url::Url::parse(&self.feed_url).is_err() {
            return Err(ClientError::config_validation(
                "feed_url",
                "Feed URL is not a valid URL format",
            ));
        }

        if self.token.trim().is_empty() {
            return Err(ClientError::config_validation(
                "token",
                "Access token cannot be empty (set GITHUB_TOKEN)",
            ));
        }

        if self.polling.interval.is_zero() {
            return Err(ClientError::config_validation(
                "poll_interval_secs",
                "Poll interval must be greater than zero",
            ));
        }

        if self.polling.publisher_capacity == 0 {
            return Err(ClientError::config_validation(
                "publisher_capacity",
                "Publisher capacity must be greater than zero",
            ));
        }

        if self.request.timeout.is_zero() {
            return Err(ClientError::config_validation(
                "request_timeout_secs",
                "Timeout must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Set polling interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.polling.interval = interval;
        self
    }

    /// Set publisher queue depth
    pub fn with_publisher_capacity(mut self, capacity: usize) -> Self {
        self.polling.publisher_capacity = capacity;
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = timeout;
        self
    }
}

impl From<RelayConfig> for ClientConfig {
    fn from(config: RelayConfig) -> Self {
        Self::new(config.feed_url, config.token.unwrap_or_default())
            .with_interval(Duration::from_secs(config.poll_interval_secs))
            .with_timeout(Duration::from_secs(config.request_timeout_secs))
            .with_publisher_capacity(config.publisher_capacity)
    }
}
