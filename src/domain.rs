use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::id::EventId;

pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// A single feed event.
///
/// Only `id` is interpreted; every other field is kept verbatim so consumers
/// receive exactly what the feed served.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Event {
    pub id: EventId,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Event {
    pub fn new(id: impl Into<EventId>) -> Self {
        Self { id: id.into(), payload: Map::new() }
    }

    /// Event type as reported by GitHub, e.g. `PushEvent`
    pub fn event_type(&self) -> Option<&str> {
        self.payload.get("type").and_then(Value::as_str)
    }

    pub fn actor_login(&self) -> Option<&str> {
        self.payload
            .get("actor")
            .and_then(|actor| actor.get("login"))
            .and_then(Value::as_str)
    }

    pub fn repo_name(&self) -> Option<&str> {
        self.payload
            .get("repo")
            .and_then(|repo| repo.get("name"))
            .and_then(Value::as_str)
    }
}

/// Rate-limit counters read from a single response.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimit {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let limit = header_u64(headers, RATE_LIMIT_LIMIT_HEADER);
        let remaining = header_u64(headers, RATE_LIMIT_REMAINING_HEADER);
        let reset_at = header_u64(headers, RATE_LIMIT_RESET_HEADER)
            .and_then(|epoch| i64::try_from(epoch).ok())
            .and_then(|epoch| DateTime::from_timestamp(epoch, 0));

        Self { limit, remaining, reset_at }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |value: Option<u64>| value.map_or_else(|| "?".to_string(), |v| v.to_string());
        write!(f, "{} out of {}", render(self.remaining), render(self.limit))?;
        if let Some(reset_at) = self.reset_at {
            write!(f, " (resets {})", reset_at.format("%H:%M:%S UTC"))?;
        }
        Ok(())
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
