use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::{domain::Event, id::EventId};

/// Ids delivered by the most recently completed cycle.
///
/// `commit` replaces the contents wholesale, so memory stays bounded by one
/// cycle's batch however long the process runs.
#[derive(Debug, Default, Clone)]
pub struct DedupCache {
    ids: HashSet<EventId>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.ids.contains(id)
    }

    /// True when any event of `batch` was already seen on the previous cycle
    pub fn overlaps(&self, batch: &[Event]) -> bool {
        batch.iter().any(|event| self.contains(&event.id))
    }

    /// Events of `batch` not seen on the previous cycle, in batch order
    pub fn filter_new(&self, batch: &[Event]) -> Vec<Event> {
        batch
            .iter()
            .filter(|event| {
                let seen = self.contains(&event.id);
                if seen {
                    debug!(event_id = %event.id, "Disregarding event already in the cache");
                }
                !seen
            })
            .cloned()
            .collect()
    }

    /// Replace the cache contents with exactly the ids of `batch`
    #[instrument(skip_all, fields(batch_size = batch.len()))]
    pub fn commit(&mut self, batch: &[Event]) {
        self.ids = batch.iter().map(|event| event.id.clone()).collect();
        debug!(cache_size = self.ids.len(), "Dedup cache replaced");
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(ids: &[u64]) -> Vec<Event> {
        ids.iter().map(|&id| Event::new(id)).collect()
    }

    fn ids(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn empty_cache_passes_everything() {
        let cache = DedupCache::new();
        assert_eq!(ids(&cache.filter_new(&batch(&[3, 2, 1]))), vec!["3", "2", "1"]);
    }

    #[test]
    fn filter_is_idempotent_without_commit() {
        let mut cache = DedupCache::new();
        cache.commit(&batch(&[2, 1]));

        let candidate = batch(&[4, 3, 2]);
        let first = cache.filter_new(&candidate);
        let second = cache.filter_new(&candidate);
        assert_eq!(first, second);
        assert_eq!(ids(&first), vec!["4", "3"]);
    }

    #[test]
    fn commit_then_filter_is_empty() {
        let mut cache = DedupCache::new();
        let candidate = batch(&[9, 8, 7]);
        cache.commit(&candidate);
        assert!(cache.filter_new(&candidate).is_empty());
    }

    #[test]
    fn commit_replaces_instead_of_accumulating() {
        let mut cache = DedupCache::new();
        cache.commit(&batch(&[1, 2, 3]));
        cache.commit(&batch(&[4, 5]));

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&EventId::from(1u64)));
        assert!(cache.contains(&EventId::from(5u64)));
    }

    #[test]
    fn overlap_detection() {
        let mut cache = DedupCache::new();
        assert!(!cache.overlaps(&batch(&[1])));

        cache.commit(&batch(&[1]));
        assert!(cache.overlaps(&batch(&[3, 2, 1])));
        assert!(!cache.overlaps(&batch(&[3, 2])));
    }
}
