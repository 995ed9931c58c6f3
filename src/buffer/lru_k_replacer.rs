use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::common::config::FrameId;
use crate::common::error::{BustubError, Result};

/// Access history for a single tracked frame: up to `k` most recent access
/// timestamps, oldest first, plus whether the replacer is currently allowed
/// to evict this frame.
#[derive(Debug)]
struct LRUKNode {
    history: VecDeque<u64>,
    is_evictable: bool,
}

impl LRUKNode {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            is_evictable: false,
        }
    }

    fn record_access(&mut self, timestamp: u64, k: usize) {
        self.history.push_back(timestamp);
        if self.history.len() > k {
            self.history.pop_front();
        }
    }

    /// Backward k-distance: `None` means infinite (fewer than k accesses).
    fn backward_k_distance(&self, current_timestamp: u64, k: usize) -> Option<u64> {
        if self.history.len() < k {
            None
        } else {
            Some(current_timestamp - self.history.front().copied().unwrap())
        }
    }

    fn earliest_access(&self) -> u64 {
        *self.history.front().unwrap()
    }
}

/// LRUKReplacer implements the LRU-K replacement policy.
///
/// The LRU-k algorithm evicts the evictable frame whose backward k-distance
/// is maximum. Backward k-distance is the difference between the current
/// timestamp and the timestamp of the k-th most recent access. A frame with
/// fewer than k historical accesses is given +inf as its backward
/// k-distance; among frames with +inf distance, classical LRU (earliest
/// first access) breaks the tie.
#[derive(Debug)]
pub struct LRUKReplacer {
    inner: Mutex<ReplacerInner>,
    replacer_size: usize,
    k: usize,
}

#[derive(Debug)]
struct ReplacerInner {
    node_store: HashMap<FrameId, LRUKNode>,
    current_timestamp: u64,
    current_size: usize,
}

impl LRUKReplacer {
    /// Creates a new replacer that can track up to `num_frames` frames,
    /// each remembering up to `k` accesses.
    pub fn new(num_frames: usize, k: usize) -> Self {
        Self {
            inner: Mutex::new(ReplacerInner {
                node_store: HashMap::new(),
                current_timestamp: 0,
                current_size: 0,
            }),
            replacer_size: num_frames,
            k,
        }
    }

    fn check_frame_id(&self, frame_id: FrameId) -> Result<()> {
        if (frame_id as usize) >= self.replacer_size {
            return Err(BustubError::InvalidFrameId(frame_id));
        }
        Ok(())
    }

    /// Finds and removes the evictable frame with the largest backward
    /// k-distance. Returns `None` if no frame is evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut inner = self.inner.lock().unwrap();
        if inner.current_size == 0 {
            return None;
        }

        let current_timestamp = inner.current_timestamp;
        let k = self.k;
        let mut victim: Option<(FrameId, Option<u64>, u64)> = None; // (frame, distance, earliest)

        for (&frame_id, node) in inner.node_store.iter() {
            if !node.is_evictable {
                continue;
            }
            let distance = node.backward_k_distance(current_timestamp, k);
            let earliest = node.earliest_access();
            let candidate = (frame_id, distance, earliest);

            victim = Some(match victim {
                None => candidate,
                Some(best) => {
                    if Self::is_more_evictable(&candidate, &best) {
                        candidate
                    } else {
                        best
                    }
                }
            });
        }

        let (frame_id, _, _) = victim?;
        inner.node_store.remove(&frame_id);
        inner.current_size -= 1;
        Some(frame_id)
    }

    /// Returns true if `candidate` should be evicted ahead of `current_best`.
    fn is_more_evictable(
        candidate: &(FrameId, Option<u64>, u64),
        current_best: &(FrameId, Option<u64>, u64),
    ) -> bool {
        match (candidate.1, current_best.1) {
            // Both infinite (< k accesses): earlier first access wins.
            (None, None) => candidate.2 < current_best.2,
            // Infinite beats any finite distance.
            (None, Some(_)) => true,
            (Some(_), None) => false,
            // Larger backward k-distance wins.
            (Some(a), Some(b)) => a > b,
        }
    }

    /// Records that `frame_id` was accessed at the current timestamp,
    /// bumping the monotonic clock and creating the node if this is its
    /// first access.
    pub fn record_access(&self, frame_id: FrameId) -> Result<()> {
        self.check_frame_id(frame_id)?;
        let mut inner = self.inner.lock().unwrap();
        inner.current_timestamp += 1;
        let timestamp = inner.current_timestamp;
        let k = self.k;
        inner
            .node_store
            .entry(frame_id)
            .or_insert_with(LRUKNode::new)
            .record_access(timestamp, k);
        Ok(())
    }

    /// Toggles whether `frame_id` is a candidate for eviction; updates
    /// `size()` accordingly. A no-op if the frame is already in the target
    /// state.
    pub fn set_evictable(&self, frame_id: FrameId, set_evictable: bool) -> Result<()> {
        self.check_frame_id(frame_id)?;
        let mut inner = self.inner.lock().unwrap();
        let Some(node) = inner.node_store.get_mut(&frame_id) else {
            return Err(BustubError::InvalidFrameId(frame_id));
        };
        if node.is_evictable == set_evictable {
            return Ok(());
        }
        node.is_evictable = set_evictable;
        if set_evictable {
            inner.current_size += 1;
        } else {
            inner.current_size -= 1;
        }
        Ok(())
    }

    /// Removes `frame_id`'s access history, regardless of its backward
    /// k-distance. Silent if the frame is not tracked.
    pub fn remove(&self, frame_id: FrameId) -> Result<()> {
        self.check_frame_id(frame_id)?;
        let mut inner = self.inner.lock().unwrap();
        if let Some(node) = inner.node_store.remove(&frame_id) {
            if node.is_evictable {
                inner.current_size -= 1;
            }
        }
        Ok(())
    }

    /// Returns the number of frames currently eligible for eviction.
    pub fn size(&self) -> usize {
        self.inner.lock().unwrap().current_size
    }
}

#[cfg(test)]
mod tests {
    use super::LRUKReplacer;

    #[test]
    pub fn test_lru_k_cmu_sample() {
        let lru_replacer = LRUKReplacer::new(7, 2);

        // Scenario: add six elements to the replacer. We have [1,2,3,4,5]. Frame 6 is
        // non-evictable.
        lru_replacer.record_access(1).unwrap();
        lru_replacer.record_access(2).unwrap();
        lru_replacer.record_access(3).unwrap();
        lru_replacer.record_access(4).unwrap();
        lru_replacer.record_access(5).unwrap();
        lru_replacer.record_access(6).unwrap();
        lru_replacer.set_evictable(1, true).unwrap();
        lru_replacer.set_evictable(2, true).unwrap();
        lru_replacer.set_evictable(3, true).unwrap();
        lru_replacer.set_evictable(4, true).unwrap();
        lru_replacer.set_evictable(5, true).unwrap();
        lru_replacer.set_evictable(6, false).unwrap();
        assert_eq!(5, lru_replacer.size());

        // Scenario: Insert access history for frame 1. Now frame 1 has two access
        // histories. All other frames have max backward k-dist. The order of
        // eviction is [2,3,4,5,1].
        lru_replacer.record_access(1).unwrap();

        let value = lru_replacer.evict();
        assert_eq!(Some(2), value);
        let value = lru_replacer.evict();
        assert_eq!(Some(3), value);
        let value = lru_replacer.evict();
        assert_eq!(Some(4), value);
        assert_eq!(lru_replacer.size(), 2);

        // Scenario: Now replacer has frames [5,1]. Insert new frames 3, 4, and update
        // access history for 5. We should end with [3,1,5,4]
        lru_replacer.record_access(3).unwrap();
        lru_replacer.record_access(4).unwrap();
        lru_replacer.record_access(5).unwrap();
        lru_replacer.record_access(4).unwrap();
        lru_replacer.set_evictable(3, true).unwrap();
        lru_replacer.set_evictable(4, true).unwrap();
        assert_eq!(4, lru_replacer.size());

        let value = lru_replacer.evict();
        assert_eq!(Some(3), value);
        assert_eq!(3, lru_replacer.size());

        lru_replacer.set_evictable(6, true).unwrap();
        assert_eq!(4, lru_replacer.size());
        let value = lru_replacer.evict();
        assert_eq!(Some(6), value);
        assert_eq!(3, lru_replacer.size());

        lru_replacer.set_evictable(1, false).unwrap();
        assert_eq!(2, lru_replacer.size());
        let value = lru_replacer.evict();
        assert_eq!(Some(5), value);
        assert_eq!(1, lru_replacer.size());

        lru_replacer.record_access(1).unwrap();
        lru_replacer.record_access(1).unwrap();
        lru_replacer.set_evictable(1, true).unwrap();
        assert_eq!(2, lru_replacer.size());
        let value = lru_replacer.evict();
        assert_eq!(Some(4), value);

        assert_eq!(1, lru_replacer.size());
        let value = lru_replacer.evict();
        assert_eq!(Some(1), value);
        assert_eq!(0, lru_replacer.size());

        // This operation should not modify size
        assert_eq!(None, lru_replacer.evict());
        assert_eq!(0, lru_replacer.size());
    }

    #[test]
    fn fewer_than_k_accesses_always_wins() {
        let replacer = LRUKReplacer::new(4, 2);
        replacer.record_access(0).unwrap();
        replacer.record_access(0).unwrap();
        replacer.record_access(1).unwrap();
        replacer.set_evictable(0, true).unwrap();
        replacer.set_evictable(1, true).unwrap();

        // frame 0 has 2 accesses (full k-history), frame 1 has only 1: frame 1
        // must be evicted first regardless of recency.
        assert_eq!(replacer.evict(), Some(1));
        assert_eq!(replacer.evict(), Some(0));
    }

    #[test]
    fn invalid_frame_id_is_rejected() {
        let replacer = LRUKReplacer::new(2, 2);
        assert!(replacer.record_access(5).is_err());
        assert!(replacer.set_evictable(5, true).is_err());
        assert!(replacer.remove(5).is_err());
    }
}
