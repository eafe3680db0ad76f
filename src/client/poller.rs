//! Background polling of the event feed

use compact_str::CompactString;
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, error, info, instrument, warn};

use super::{
    api::PageSource,
    config::PollingConfig,
    error::Result,
    links::LinkSet,
    walker::walk,
};
use crate::{
    dedup::DedupCache,
    domain::RateLimit,
    publisher::{EventPublisher, Subscription},
};

/// Where the poller currently is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Fetching,
    Publishing,
    Sleeping,
    Stopped,
}

/// Summary of one successful cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Pages fetched during the walk
    pub pages: usize,
    /// Distinct events returned by the walk
    pub fetched: usize,
    /// Events that were new and got published
    pub published: usize,
    /// Whether the walk reached events seen on the previous cycle
    pub overlap: bool,
    pub rate_limit: Option<RateLimit>,
}

/// Drives the feed: walk, dedup, publish, commit, sleep, repeat.
///
/// Owns the dedup cache and the publisher, so several pollers can run side
/// by side without sharing state. At most one cycle is in flight; a shutdown
/// request is honoured once the current cycle has completed.
#[derive(Debug)]
pub struct EventPoller<S> {
    source: S,
    feed_url: CompactString,
    config: PollingConfig,
    cache: DedupCache,
    publisher: EventPublisher,
    state_tx: watch::Sender<PollerState>,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl<S: PageSource> EventPoller<S> {
    /// Create a new poller over `source`, starting every cycle at `feed_url`
    pub fn new(source: S, feed_url: impl Into<CompactString>, config: PollingConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let (state_tx, _) = watch::channel(PollerState::Idle);
        let publisher = EventPublisher::new(config.publisher_capacity);

        Self {
            source,
            feed_url: feed_url.into(),
            config,
            cache: DedupCache::new(),
            publisher,
            state_tx,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Register a subscriber for events published from now on
    pub fn subscribe(&self) -> Subscription {
        self.publisher.subscribe()
    }

    /// Handle onto the publisher, usable to subscribe after the poller has been moved
    pub fn publisher(&self) -> EventPublisher {
        self.publisher.clone()
    }

    /// Observe state transitions
    pub fn state(&self) -> watch::Receiver<PollerState> {
        self.state_tx.subscribe()
    }

    pub fn cache(&self) -> &DedupCache {
        &self.cache
    }

    /// Ask the poller to stop after the cycle in flight
    pub fn shutdown(&self) {
        debug!("Sending shutdown signal to event poller");
        let _ = self.shutdown_tx.send(());
    }

    /// Get a shutdown sender for external shutdown control
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run a single cycle.
    ///
    /// New events are published oldest first, then the cache is replaced by
    /// the whole batch. On error nothing is published or committed, so the
    /// next cycle sees the same baseline.
    #[instrument(skip(self), fields(feed_url = %self.feed_url))]
    pub async fn poll_once(&mut self) -> Result<CycleReport> {
        info!("Polling");
        self.set_state(PollerState::Fetching);

        let start = LinkSet::starting_at(self.feed_url.clone());
        let walk = walk(&self.source, start, &self.cache).await?;

        self.set_state(PollerState::Publishing);
        let fresh = self.cache.filter_new(&walk.events);
        info!(
            batch_size = walk.events.len(),
            new_events = fresh.len(),
            subscribers = self.publisher.subscriber_count(),
            "Processing events"
        );

        let published = fresh.len();
        for event in fresh.into_iter().rev() {
            self.publisher.publish(event);
        }
        self.cache.commit(&walk.events);

        Ok(CycleReport {
            pages: walk.pages,
            fetched: walk.events.len(),
            published,
            overlap: walk.overlap,
            rate_limit: walk.rate_limit,
        })
    }

    /// Poll until a shutdown signal arrives.
    ///
    /// A failing cycle is logged and retried after the usual interval; it
    /// never ends the loop. A signal that arrives mid-cycle is seen once the
    /// cycle has published and committed.
    #[instrument(skip(self), fields(interval = ?self.config.interval))]
    pub async fn run(&mut self) {
        info!(feed_url = %self.feed_url, "Starting event poller");
        let interval = self.config.interval;

        loop {
            match self.poll_once().await {
                Ok(report) => {
                    let rate_limit = report.rate_limit.unwrap_or_default();
                    info!(
                        pages = report.pages,
                        fetched = report.fetched,
                        published = report.published,
                        "Cycle complete"
                    );
                    info!(ratelimit = %rate_limit, "Current ratelimit status");
                    if rate_limit.is_exhausted() {
                        warn!("Rate limit exhausted; the next cycle is likely to be refused");
                    }
                },
                Err(e) => {
                    error!(error = %e, kind = %e.kind(), "Cycle failed, cache left untouched");
                    if let Some(rate_limit) = e.rate_limit() {
                        info!(ratelimit = %rate_limit, "Current ratelimit status");
                    }
                },
            }

            info!(seconds = interval.as_secs(), "Setting timeout before polling again");
            self.set_state(PollerState::Sleeping);

            tokio::select! {
                _ = sleep(interval) => {}
                _ = self.shutdown_rx.recv() => {
                    debug!("Event poller received shutdown signal");
                    break;
                }
            }
        }

        self.set_state(PollerState::Stopped);
        info!("Event poller stopped");
    }

    fn set_state(&self, state: PollerState) {
        self.state_tx.send_replace(state);
    }
}

/// Spawn a poller as a background task.
///
/// Returns the task handle and a sender that stops the poller after its
/// current cycle.
pub fn spawn_poller<S>(poller: EventPoller<S>) -> (JoinHandle<()>, broadcast::Sender<()>)
where
    S: PageSource + Send + Sync + 'static,
{
    let shutdown_sender = poller.shutdown_sender();
    let handle = tokio::spawn(async move {
        let mut poller = poller;
        poller.run().await;
    });
    (handle, shutdown_sender)
}
