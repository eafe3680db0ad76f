//! Error types for the feed client

use compact_str::CompactString;
use thiserror::Error;

use crate::domain::RateLimit;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors raised while fetching and walking the feed
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("malformed Link header entry `{entry}`: {reason}")]
    MalformedLinkHeader {
        entry: CompactString,
        reason: &'static str,
    },

    #[error("rate limited by the feed, remaining {0}")]
    RateLimited(RateLimit),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP {status} from {url}: {message}")]
    UnexpectedStatus {
        status: u16,
        url: CompactString,
        message: CompactString,
    },

    #[error("failed to decode response from {endpoint}: {message}")]
    JsonParse {
        endpoint: CompactString,
        message: CompactString,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {field}: {message}")]
    ConfigValidation {
        field: CompactString,
        message: CompactString,
    },
}

/// Coarse classification used by the scheduler when reporting a failed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MalformedLinkHeader,
    RateLimited,
    Transport,
    Config,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MalformedLinkHeader => "malformed_link_header",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::Transport => "transport",
            FailureKind::Config => "config",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ClientError {
    pub fn malformed_link(entry: impl Into<CompactString>, reason: &'static str) -> Self {
        Self::MalformedLinkHeader { entry: entry.into(), reason }
    }

    pub fn unexpected_status(
        status: u16,
        url: impl Into<CompactString>,
        message: impl Into<CompactString>,
    ) -> Self {
        Self::UnexpectedStatus { status, url: url.into(), message: message.into() }
    }

    pub fn json_parse(
        endpoint: impl Into<CompactString>,
        message: impl Into<CompactString>,
        source: serde_json::Error,
    ) -> Self {
        Self::JsonParse { endpoint: endpoint.into(), message: message.into(), source }
    }

    pub fn config_validation(
        field: impl Into<CompactString>,
        message: impl Into<CompactString>,
    ) -> Self {
        Self::ConfigValidation { field: field.into(), message: message.into() }
    }

    /// Non-2xx statuses and undecodable bodies are reported like network failures.
    pub fn kind(&self) -> FailureKind {
        match self {
            ClientError::MalformedLinkHeader { .. } => FailureKind::MalformedLinkHeader,
            ClientError::RateLimited(_) => FailureKind::RateLimited,
            ClientError::Transport(_)
            | ClientError::UnexpectedStatus { .. }
            | ClientError::JsonParse { .. } => FailureKind::Transport,
            ClientError::ConfigValidation { .. } => FailureKind::Config,
        }
    }

    pub fn rate_limit(&self) -> Option<&RateLimit> {
        match self {
            ClientError::RateLimited(rate_limit) => Some(rate_limit),
            _ => None,
        }
    }
}
