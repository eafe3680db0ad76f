//! Polls a paginated event feed and republishes every newly seen event once.
//!
//! [`client::EventPoller`] walks the feed from its root each cycle, stops as
//! soon as it reaches events delivered on the previous cycle, hands the new
//! ones to [`publisher::EventPublisher`] subscribers and sleeps for a fixed
//! interval.

pub mod client;
pub mod config;
pub mod dedup;
pub mod domain;
pub mod id;
pub mod logging;
pub mod publisher;
pub mod result;

pub use client::{ClientConfig, ClientError, EventPoller, FeedApi, LinkSet, PollerState};
pub use dedup::DedupCache;
pub use domain::{Event, RateLimit};
pub use id::EventId;
pub use publisher::{EventPublisher, Subscription};
