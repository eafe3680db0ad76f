//! Pagination across linked feed pages

use itertools::Itertools;
use tracing::{info, instrument, warn};

use super::{api::PageSource, error::Result, links::LinkSet};
use crate::{
    dedup::DedupCache,
    domain::{Event, RateLimit},
};

/// Result of walking the feed for one cycle
#[derive(Debug, Clone, Default)]
pub struct Walk {
    /// Events in traversal order (newest first), one per id
    pub events: Vec<Event>,
    /// Number of pages fetched
    pub pages: usize,
    /// Counters from the last response, if any page was fetched
    pub rate_limit: Option<RateLimit>,
    /// Whether the walk stopped because it reached previously seen events
    pub overlap: bool,
}

/// Follow `next` links from `start`, accumulating events.
///
/// Stops when the latest response has no `next` relation, or as soon as the
/// accumulated batch contains an id from `cache`. Pages are fetched strictly
/// one after another; the first error aborts the walk.
#[instrument(skip_all, fields(cached = cache.len()))]
pub async fn walk<S: PageSource>(source: &S, start: LinkSet, cache: &DedupCache) -> Result<Walk> {
    let mut links = start;
    let mut batch: Vec<Event> = Vec::new();
    let mut pages = 0;
    let mut rate_limit = None;
    let mut overlap = false;

    while let Some(next) = links.next() {
        if overlap {
            break;
        }

        info!(url = next, page = pages + 1, "Fetching");
        let page = source.fetch_page(next).await?;

        pages += 1;
        rate_limit = Some(page.rate_limit);
        overlap = cache.overlaps(&page.events);
        links = page.links;
        batch.extend(page.events);
    }

    // Overlap can never be found on the first cycle, so only warn once a baseline exists.
    if !overlap && !cache.is_empty() && pages > 0 {
        warn!(
            pages,
            "Reached the end of the feed without meeting any previously seen event"
        );
    }

    let raw_count = batch.len();
    let events: Vec<Event> = batch
        .into_iter()
        .unique_by(|event| event.id.clone())
        .collect();

    info!(pages, raw_count, event_count = events.len(), overlap, "Returning events");

    Ok(Walk { events, pages, rate_limit, overlap })
}
