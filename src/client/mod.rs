//! Event feed client modules
//!
//! Link parsing, page fetching, pagination and the polling loop each live in
//! their own module; the poller ties them together with the dedup cache and
//! the publisher.

pub mod api;
pub mod config;
pub mod error;
pub mod links;
pub mod poller;
pub mod walker;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use api::{FeedApi, Page, PageSource};
pub use config::{ClientConfig, PollingConfig, RequestConfig};
pub use error::{ClientError, FailureKind};
pub use links::LinkSet;
pub use poller::{CycleReport, EventPoller, PollerState, spawn_poller};
pub use walker::{Walk, walk};

pub type Result<T> = std::result::Result<T, ClientError>;
