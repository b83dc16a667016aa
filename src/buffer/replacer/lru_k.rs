//! LRU-K replacement policy.
//!
//! Tracks the last K access timestamps of every frame and evicts the
//! evictable frame with the largest backward K-distance (time since its
//! K-th most recent access). Frames with fewer than K recorded accesses
//! have infinite K-distance and are reclaimed first, ordered by their
//! oldest access (classic LRU among the uninitiated).

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::common::{Error, FrameId, Result};

/// Hint describing why a frame is being touched.
///
/// Hints never change which evictions are legal; they may only bias the
/// recorded timestamp. See [`LruKReplacer::record_access`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    #[default]
    Unknown,
    Lookup,
    Scan,
}

/// Logical-clock penalty applied to scan accesses, so a sequential scan
/// ages out before re-referenced pages instead of flushing the hot set.
const SCAN_SKEW: u64 = 8;

#[derive(Default)]
struct LruKNode {
    /// Last up-to-K access timestamps, newest first.
    history: VecDeque<u64>,
    is_evictable: bool,
}

#[derive(Default)]
struct NodeStore {
    nodes: HashMap<FrameId, LruKNode>,
    /// Monotone logical clock, bumped on every recorded access.
    current_timestamp: u64,
    /// Number of nodes currently marked evictable.
    curr_size: usize,
}

/// An LRU-K eviction policy over a fixed set of frames.
///
/// All state sits behind an internal mutex, so the replacer can be
/// shared by reference; the buffer pool additionally serializes its
/// call sites under the pool latch.
pub struct LruKReplacer {
    store: Mutex<NodeStore>,
    num_frames: usize,
    k: usize,
}

impl LruKReplacer {
    /// Create a replacer for `num_frames` frames with history depth `k`.
    ///
    /// `k = 1` degenerates to classic LRU.
    ///
    /// # Panics
    /// Panics if `num_frames` is 0 or `k` is 0.
    pub fn new(num_frames: usize, k: usize) -> Self {
        assert!(num_frames > 0, "num_frames must be > 0");
        assert!(k > 0, "k must be >= 1");

        Self {
            store: Mutex::new(NodeStore::default()),
            num_frames,
            k,
        }
    }

    /// Record an access to `frame_id`, creating its node on first touch.
    ///
    /// # Panics
    /// Panics if `frame_id` is outside `[0, num_frames)`.
    pub fn record_access(&self, frame_id: FrameId, access_type: AccessType) {
        self.check_frame_id(frame_id);

        let mut store = self.store.lock();
        let store = &mut *store;

        store.current_timestamp += 1;
        let timestamp = match access_type {
            AccessType::Scan => store.current_timestamp.saturating_sub(SCAN_SKEW),
            AccessType::Unknown | AccessType::Lookup => store.current_timestamp,
        };

        let node = store.nodes.entry(frame_id).or_default();
        if node.history.len() == self.k {
            node.history.pop_back();
        }
        node.history.push_front(timestamp);
    }

    /// Mark `frame_id` evictable or not, adjusting the candidate count.
    ///
    /// Creates the node if the frame has never been accessed.
    ///
    /// # Panics
    /// Panics if `frame_id` is outside `[0, num_frames)`.
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        self.check_frame_id(frame_id);

        let mut store = self.store.lock();
        let store = &mut *store;

        let node = store.nodes.entry(frame_id).or_default();
        if node.is_evictable == evictable {
            return;
        }
        node.is_evictable = evictable;
        if evictable {
            store.curr_size += 1;
        } else {
            debug_assert!(store.curr_size > 0);
            store.curr_size -= 1;
        }
    }

    /// Select and claim a victim frame, or `None` if nothing is
    /// evictable.
    ///
    /// The victim's history is cleared and it becomes non-evictable; a
    /// later `record_access` sees it as a fresh frame.
    pub fn evict(&self) -> Option<FrameId> {
        let mut store = self.store.lock();
        let store = &mut *store;

        if store.curr_size == 0 {
            return None;
        }

        // A frame still in warmup (fewer than K accesses) has infinite
        // K-distance and outranks every warm frame; within each class
        // the oldest recorded access wins, then the smaller frame id.
        let (_, _, frame_id) = store
            .nodes
            .iter()
            .filter(|(_, node)| node.is_evictable)
            .map(|(&frame_id, node)| {
                let warm = node.history.len() >= self.k;
                let oldest = node.history.back().copied().unwrap_or(0);
                (warm, oldest, frame_id)
            })
            .min()?;

        if let Some(node) = store.nodes.get_mut(&frame_id) {
            node.history.clear();
            node.is_evictable = false;
        }
        store.curr_size -= 1;

        Some(frame_id)
    }

    /// Unregister an evictable frame.
    ///
    /// A frame the replacer has never seen is a silent no-op; a tracked
    /// but non-evictable frame is a caller error.
    ///
    /// # Panics
    /// Panics if `frame_id` is outside `[0, num_frames)`.
    pub fn remove(&self, frame_id: FrameId) -> Result<()> {
        self.check_frame_id(frame_id);

        let mut store = self.store.lock();
        let store = &mut *store;

        let evictable = match store.nodes.get(&frame_id) {
            None => return Ok(()),
            Some(node) => node.is_evictable,
        };
        if !evictable {
            return Err(Error::NonEvictableRemove(frame_id));
        }

        store.nodes.remove(&frame_id);
        store.curr_size -= 1;
        Ok(())
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.store.lock().curr_size
    }

    fn check_frame_id(&self, frame_id: FrameId) {
        assert!(
            frame_id.0 < self.num_frames,
            "invalid frame id {} (num_frames = {})",
            frame_id,
            self.num_frames
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(replacer: &LruKReplacer, frame_id: usize) {
        replacer.record_access(FrameId::new(frame_id), AccessType::Unknown);
    }

    #[test]
    fn test_empty_replacer() {
        let replacer = LruKReplacer::new(4, 2);
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_size_counts_only_evictable() {
        let replacer = LruKReplacer::new(4, 2);
        touch(&replacer, 0);
        touch(&replacer, 1);
        assert_eq!(replacer.size(), 0);

        replacer.set_evictable(FrameId::new(0), true);
        assert_eq!(replacer.size(), 1);

        replacer.set_evictable(FrameId::new(0), true); // no double count
        assert_eq!(replacer.size(), 1);

        replacer.set_evictable(FrameId::new(0), false);
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_warmup_evicted_before_warm() {
        let replacer = LruKReplacer::new(4, 2);
        // Frame 0 becomes warm, frame 1 stays in warmup.
        touch(&replacer, 0);
        touch(&replacer, 0);
        touch(&replacer, 1);
        replacer.set_evictable(FrameId::new(0), true);
        replacer.set_evictable(FrameId::new(1), true);

        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_warm_order_is_kth_recent_access() {
        let replacer = LruKReplacer::new(4, 2);
        // Oldest access order: 0, 1, 2; all warm.
        for fid in 0..3 {
            touch(&replacer, fid);
            touch(&replacer, fid);
            replacer.set_evictable(FrameId::new(fid), true);
        }
        // One refresh still leaves frame 0's second-most-recent access
        // as the oldest K-th access, so frame 0 goes first regardless.
        touch(&replacer, 0);
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));

        // Two fresh accesses move the whole K-window forward; now the
        // oldest K-th access belongs to frame 1.
        touch(&replacer, 0);
        touch(&replacer, 0);
        replacer.set_evictable(FrameId::new(0), true);
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(2)));
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    }

    #[test]
    fn test_evicted_frame_restarts_in_warmup() {
        let replacer = LruKReplacer::new(4, 2);
        touch(&replacer, 0);
        touch(&replacer, 0);
        touch(&replacer, 1);
        touch(&replacer, 1);
        replacer.set_evictable(FrameId::new(0), true);
        replacer.set_evictable(FrameId::new(1), true);

        assert_eq!(replacer.evict(), Some(FrameId::new(0)));

        // One access after eviction: frame 0 is in warmup again and
        // outranks the warm frame 1.
        touch(&replacer, 0);
        replacer.set_evictable(FrameId::new(0), true);
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    }

    #[test]
    fn test_remove_semantics() {
        let replacer = LruKReplacer::new(4, 2);

        // Unknown frame: no-op.
        assert!(replacer.remove(FrameId::new(3)).is_ok());

        touch(&replacer, 1);
        assert!(matches!(
            replacer.remove(FrameId::new(1)),
            Err(Error::NonEvictableRemove(_))
        ));

        replacer.set_evictable(FrameId::new(1), true);
        assert_eq!(replacer.size(), 1);
        assert!(replacer.remove(FrameId::new(1)).is_ok());
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    #[should_panic(expected = "invalid frame id")]
    fn test_out_of_range_frame_id_panics() {
        let replacer = LruKReplacer::new(4, 2);
        touch(&replacer, 4);
    }

    #[test]
    fn test_scan_access_ages_faster() {
        let replacer = LruKReplacer::new(4, 1);
        replacer.record_access(FrameId::new(0), AccessType::Lookup);
        replacer.record_access(FrameId::new(1), AccessType::Scan);
        replacer.record_access(FrameId::new(2), AccessType::Lookup);
        for fid in 0..3 {
            replacer.set_evictable(FrameId::new(fid), true);
        }

        // The scan timestamp is skewed backward past frame 0's.
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    }

    #[test]
    fn test_equal_timestamps_tie_break_on_frame_id() {
        let replacer = LruKReplacer::new(8, 1);
        // Early scans saturate to timestamp 0, forcing a tie.
        replacer.record_access(FrameId::new(5), AccessType::Scan);
        replacer.record_access(FrameId::new(2), AccessType::Scan);
        replacer.set_evictable(FrameId::new(5), true);
        replacer.set_evictable(FrameId::new(2), true);

        assert_eq!(replacer.evict(), Some(FrameId::new(2)));
        assert_eq!(replacer.evict(), Some(FrameId::new(5)));
    }

    #[test]
    fn test_shared_across_threads() {
        use std::sync::Arc;
        use std::thread;

        let replacer = Arc::new(LruKReplacer::new(64, 2));
        let mut handles = vec![];

        for t in 0..4 {
            let replacer = Arc::clone(&replacer);
            handles.push(thread::spawn(move || {
                for i in 0..16 {
                    let fid = FrameId::new(t * 16 + i);
                    replacer.record_access(fid, AccessType::Unknown);
                    replacer.set_evictable(fid, true);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(replacer.size(), 64);
        let mut evicted = 0;
        while replacer.evict().is_some() {
            evicted += 1;
        }
        assert_eq!(evicted, 64);
    }
}
