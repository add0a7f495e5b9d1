//! Bounded look-ahead audio prefetch
//!
//! Keeps a window of synthesized audio ahead of the playback cursor. All
//! bookkeeping is keyed by queue version: completions from a superseded
//! version are dropped on arrival, never surfaced.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use narrator_core::{AudioHandle, TtsError};

/// Position-keyed audio cache with in-flight bookkeeping, scoped to one
/// queue version.
#[derive(Debug)]
pub struct PrefetchScheduler {
    depth: usize,
    version: u64,
    cache: HashMap<usize, AudioHandle>,
    in_flight: HashSet<usize>,
    /// Indices that failed under this version. Not retried here; the unit
    /// is generated on demand when the cursor reaches it.
    failed: HashSet<usize>,
}

impl PrefetchScheduler {
    pub fn new(depth: usize, version: u64) -> Self {
        Self {
            depth,
            version,
            cache: HashMap::new(),
            in_flight: HashSet::new(),
            failed: HashSet::new(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Indices in `[cursor+1, cursor+depth]` that need a request issued
    /// now. Marks them in flight: at most one request per (index, version).
    pub fn plan(&mut self, cursor: usize, queue_len: usize) -> Vec<usize> {
        let mut wanted = Vec::new();
        for index in (cursor + 1)..=(cursor + self.depth) {
            if index >= queue_len {
                break;
            }
            if self.cache.contains_key(&index)
                || self.in_flight.contains(&index)
                || self.failed.contains(&index)
            {
                continue;
            }
            self.in_flight.insert(index);
            wanted.push(index);
        }
        wanted
    }

    /// Record a completed request. Stale and already-passed results are
    /// dropped silently; failures leave the index uncached.
    pub fn complete(
        &mut self,
        index: usize,
        version: u64,
        cursor: usize,
        result: Result<AudioHandle, TtsError>,
    ) {
        if version != self.version {
            trace!(index, version, current = self.version, "discarding stale prefetch result");
            return;
        }
        self.in_flight.remove(&index);
        match result {
            Ok(handle) => {
                if index <= cursor {
                    trace!(index, cursor, "prefetch resolved behind the cursor, dropping");
                    return;
                }
                self.cache.insert(index, handle);
            }
            Err(err) => {
                debug!(index, %err, "prefetch failed, unit will be generated on demand");
                self.failed.insert(index);
            }
        }
    }

    /// Take cached audio for an index, if resolved.
    pub fn take(&mut self, index: usize) -> Option<AudioHandle> {
        self.cache.remove(&index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.cache.contains_key(&index)
    }

    pub fn is_in_flight(&self, index: usize) -> bool {
        self.in_flight.contains(&index)
    }

    /// Evict bookkeeping behind the cursor after a consumption.
    pub fn evict_behind(&mut self, cursor: usize) {
        self.cache.retain(|&index, _| index >= cursor);
        self.failed.retain(|&index| index >= cursor);
    }

    /// Drop the whole cache and in-flight bookkeeping for a new version.
    /// In-flight network work is not actively canceled; its completions
    /// arrive stale and are dropped.
    pub fn invalidate(&mut self, version: u64) {
        self.version = version;
        self.cache.clear();
        self.in_flight.clear();
        self.failed.clear();
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn outstanding(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn audio(tag: &str) -> AudioHandle {
        AudioHandle::Buffer(Bytes::from(tag.to_string()))
    }

    #[test]
    fn test_window_bounds() {
        let mut scheduler = PrefetchScheduler::new(3, 1);
        // cursor at 0 in a 10-unit queue: only 1..=3 requested
        assert_eq!(scheduler.plan(0, 10), vec![1, 2, 3]);
        // nothing new until something resolves or the cursor moves
        assert!(scheduler.plan(0, 10).is_empty());
        assert_eq!(scheduler.outstanding(), 3);
    }

    #[test]
    fn test_window_clipped_at_queue_end() {
        let mut scheduler = PrefetchScheduler::new(3, 1);
        assert_eq!(scheduler.plan(2, 4), vec![3]);
    }

    #[test]
    fn test_one_request_per_index_and_version() {
        let mut scheduler = PrefetchScheduler::new(2, 1);
        assert_eq!(scheduler.plan(0, 5), vec![1, 2]);
        scheduler.complete(1, 1, 0, Ok(audio("one")));
        // index 1 cached, index 2 still in flight
        assert_eq!(scheduler.plan(0, 5), Vec::<usize>::new());
        assert!(scheduler.contains(1));
        assert!(scheduler.is_in_flight(2));
    }

    #[test]
    fn test_stale_version_discarded() {
        let mut scheduler = PrefetchScheduler::new(3, 1);
        scheduler.plan(0, 5);
        scheduler.invalidate(2);

        // the request issued under version 1 resolves after the bump
        scheduler.complete(1, 1, 0, Ok(audio("stale")));
        assert_eq!(scheduler.cached(), 0);
        assert_eq!(scheduler.outstanding(), 0);
    }

    #[test]
    fn test_result_behind_cursor_dropped() {
        let mut scheduler = PrefetchScheduler::new(3, 1);
        scheduler.plan(0, 5);
        // cursor already advanced past index 1 when it resolves
        scheduler.complete(1, 1, 2, Ok(audio("late")));
        assert!(!scheduler.contains(1));
    }

    #[test]
    fn test_failure_leaves_index_uncached_and_unretried() {
        let mut scheduler = PrefetchScheduler::new(2, 1);
        assert_eq!(scheduler.plan(0, 5), vec![1, 2]);
        scheduler.complete(1, 1, 0, Err(TtsError::Status(500)));

        assert!(!scheduler.contains(1));
        // failed index is not re-requested; it resolves on demand
        assert!(scheduler.plan(0, 5).is_empty());
    }

    #[test]
    fn test_evict_behind_cursor() {
        let mut scheduler = PrefetchScheduler::new(3, 1);
        scheduler.plan(0, 5);
        scheduler.complete(1, 1, 0, Ok(audio("one")));
        scheduler.complete(2, 1, 0, Ok(audio("two")));

        scheduler.evict_behind(2);
        assert!(!scheduler.contains(1));
        assert!(scheduler.contains(2));
    }

    #[test]
    fn test_invalidate_clears_everything() {
        let mut scheduler = PrefetchScheduler::new(3, 1);
        scheduler.plan(0, 5);
        scheduler.complete(1, 1, 0, Ok(audio("one")));
        scheduler.complete(2, 1, 0, Err(TtsError::Status(500)));

        scheduler.invalidate(2);
        assert_eq!(scheduler.cached(), 0);
        assert_eq!(scheduler.outstanding(), 0);
        assert_eq!(scheduler.version(), 2);
        // everything is requestable again under the new version
        assert_eq!(scheduler.plan(0, 5), vec![1, 2, 3]);
    }
}
