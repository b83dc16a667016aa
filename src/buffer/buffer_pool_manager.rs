//! Buffer Pool Manager - the page caching layer.
//!
//! The [`BufferPoolManager`] keeps a bounded set of pages resident,
//! writes dirty frames back before reuse, and guarantees that a pinned
//! page is never evicted. Callers get pages through RAII guards; see
//! [`crate::buffer::page_guard`].

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::Mutex;

use crate::buffer::page_guard::{BasicPageGuard, ReadPageGuard, WritePageGuard};
use crate::buffer::replacer::{AccessType, LruKReplacer};
use crate::buffer::{BufferPoolStats, Frame};
use crate::common::{Error, FrameId, PageId, Result};
use crate::recovery::LogManager;
use crate::storage::DiskManager;

/// Bookkeeping shared by every pool operation.
///
/// One latch covers the page table, the free list, and all replacer
/// call sites, so the pin/evict bookkeeping of any two operations is
/// serialized. Page bytes are NOT covered: each frame carries its own
/// reader/writer latch, taken only after this latch is released.
struct PoolState {
    /// Maps resident page ids to their frames.
    page_table: HashMap<PageId, FrameId>,

    /// Frames currently holding no page.
    free_list: Vec<FrameId>,

    /// Eviction policy; consulted whenever the free list is empty.
    replacer: LruKReplacer,
}

/// Manages a fixed pool of frames caching disk pages.
///
/// # Usage
/// ```ignore
/// let dm = DiskManager::create("test.db")?;
/// let bpm = BufferPoolManager::new(16, 2, dm);
///
/// let pid = {
///     let mut guard = bpm.new_page()?;
///     guard.data_mut().as_mut_slice()[0] = 0xAB;
///     guard.page_id()
/// }; // guard drops: unpinned, dirty flag handed to the pool
///
/// let guard = bpm.fetch_page_read(pid, AccessType::Unknown)?;
/// assert_eq!(guard.as_slice()[0], 0xAB);
/// ```
pub struct BufferPoolManager {
    /// Fixed frame array allocated at startup.
    frames: Vec<Frame>,

    /// The pool latch; see [`PoolState`].
    state: Mutex<PoolState>,

    /// All disk I/O, serialized.
    disk: Mutex<DiskManager>,

    /// Write-ahead log sink, carried for higher layers; the pool itself
    /// never appends to it.
    log_manager: Option<Arc<LogManager>>,

    /// Lock-free performance counters.
    stats: BufferPoolStats,

    pool_size: usize,
}

impl BufferPoolManager {
    /// Create a buffer pool with `pool_size` frames and an LRU-K
    /// replacer of history depth `replacer_k`.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0 or `replacer_k` is 0.
    pub fn new(pool_size: usize, replacer_k: usize, disk_manager: DiskManager) -> Self {
        Self::build(pool_size, replacer_k, disk_manager, None)
    }

    /// Same as [`new`], wiring in a log manager for the layers above.
    ///
    /// [`new`]: BufferPoolManager::new
    pub fn with_log_manager(
        pool_size: usize,
        replacer_k: usize,
        disk_manager: DiskManager,
        log_manager: Arc<LogManager>,
    ) -> Self {
        Self::build(pool_size, replacer_k, disk_manager, Some(log_manager))
    }

    fn build(
        pool_size: usize,
        replacer_k: usize,
        disk_manager: DiskManager,
        log_manager: Option<Arc<LogManager>>,
    ) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new()).collect();
        let free_list: Vec<FrameId> = (0..pool_size).map(FrameId::new).collect();

        Self {
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::new(),
                free_list,
                replacer: LruKReplacer::new(pool_size, replacer_k),
            }),
            disk: Mutex::new(disk_manager),
            log_manager,
            stats: BufferPoolStats::new(),
            pool_size,
        }
    }

    // ========================================================================
    // Public API: create and fetch pages
    // ========================================================================

    /// Allocate a fresh page and bind it to a frame, evicting if needed.
    ///
    /// The page starts zeroed, pinned once, and clean. Returns
    /// [`Error::NoFreeFrames`] when every frame is pinned.
    pub fn new_page(&self) -> Result<BasicPageGuard<'_>> {
        let mut state = self.state.lock();
        let state = &mut *state;

        let page_id = self.disk.lock().allocate_page_id()?;
        let frame_id = match self.acquire_frame(state) {
            Ok(frame_id) => frame_id,
            Err(err) => {
                self.disk.lock().deallocate_page_id(page_id);
                return Err(err);
            }
        };
        self.bind_frame(state, frame_id, page_id, AccessType::Unknown);

        trace!("new {} bound to {}", page_id, frame_id);
        Ok(BasicPageGuard::new(self, frame_id, page_id))
    }

    /// Allocate a page id on disk without bringing the page in.
    ///
    /// A later fetch of this id reads back a zeroed page.
    pub fn allocate_page_id(&self) -> Result<PageId> {
        self.disk.lock().allocate_page_id()
    }

    /// Fetch a page behind a pin-only guard (no latch held).
    pub fn fetch_page_basic(
        &self,
        page_id: PageId,
        access: AccessType,
    ) -> Result<BasicPageGuard<'_>> {
        let frame_id = self.fetch_frame(page_id, access)?;
        Ok(BasicPageGuard::new(self, frame_id, page_id))
    }

    /// Fetch a page for shared reading. The frame latch is held by the
    /// returned guard.
    pub fn fetch_page_read(&self, page_id: PageId, access: AccessType) -> Result<ReadPageGuard<'_>> {
        let frame_id = self.fetch_frame(page_id, access)?;
        // Latch only after the pool latch is released, so a caller
        // blocked here never stalls unrelated pool operations.
        let lock = self.frames[frame_id.0].page();
        Ok(ReadPageGuard::new(self, frame_id, page_id, lock))
    }

    /// Fetch a page for exclusive writing. The frame latch is held by
    /// the returned guard.
    pub fn fetch_page_write(
        &self,
        page_id: PageId,
        access: AccessType,
    ) -> Result<WritePageGuard<'_>> {
        let frame_id = self.fetch_frame(page_id, access)?;
        let lock = self.frames[frame_id.0].page_mut();
        Ok(WritePageGuard::new(self, frame_id, page_id, lock))
    }

    // ========================================================================
    // Public API: unpin, flush, delete
    // ========================================================================

    /// Drop one pin on `page_id`, folding `is_dirty` into the frame.
    ///
    /// The dirty flag is sticky: an unpin with `is_dirty = false` never
    /// clears a flag some earlier holder set. When the last pin drops
    /// the frame becomes evictable.
    ///
    /// Returns `false` if the page is not resident or not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let state = self.state.lock();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.0];
        if !frame.is_pinned() {
            return false;
        }

        if is_dirty {
            frame.mark_dirty();
        }
        if frame.unpin() == 0 {
            state.replacer.set_evictable(frame_id, true);
        }
        true
    }

    /// Write `page_id`'s bytes to disk, dirty or not, and clear the
    /// dirty flag. Returns `Ok(false)` if the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let frame_id = {
            let state = self.state.lock();
            match state.page_table.get(&page_id) {
                Some(&frame_id) => {
                    // Keep the page resident for the duration of the
                    // write without holding the pool latch across it.
                    self.frames[frame_id.0].pin();
                    state.replacer.set_evictable(frame_id, false);
                    frame_id
                }
                None => return Ok(false),
            }
        };

        let frame = &self.frames[frame_id.0];
        let write_result = {
            let page = frame.page();
            self.disk.lock().write_page(page_id, &page)
        };
        if write_result.is_ok() {
            frame.clear_dirty();
            self.stats.record_page_written();
            trace!("flushed {} from {}", page_id, frame_id);
        }

        let state = self.state.lock();
        if frame.unpin() == 0 {
            state.replacer.set_evictable(frame_id, true);
        }
        drop(state);

        write_result.map(|_| true)
    }

    /// Flush every resident page.
    pub fn flush_all_pages(&self) -> Result<()> {
        let page_ids: Vec<PageId> = {
            let state = self.state.lock();
            state.page_table.keys().copied().collect()
        };

        for page_id in page_ids {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Drop `page_id` from the pool and deallocate its id.
    ///
    /// A non-resident page is vacuously deleted (`Ok(true)`); a pinned
    /// page is refused (`Ok(false)`). Dirty bytes are written back
    /// before the frame is freed.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut state = self.state.lock();
        let state = &mut *state;

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Ok(true);
        };
        let frame = &self.frames[frame_id.0];
        if frame.is_pinned() {
            return Ok(false);
        }

        // An unpinned resident frame is always evictable, so this
        // cannot report a misuse.
        state.replacer.remove(frame_id)?;

        if frame.is_dirty() {
            let page = frame.page();
            self.disk.lock().write_page(page_id, &page)?;
            drop(page);
            self.stats.record_page_written();
        }

        frame.reset();
        state.page_table.remove(&page_id);
        state.free_list.push(frame_id);
        self.disk.lock().deallocate_page_id(page_id);

        debug!("deleted {} from {}", page_id, frame_id);
        Ok(true)
    }

    // ========================================================================
    // Public API: introspection
    // ========================================================================

    /// Pin count of a resident page, or `None` if not resident.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.state.lock();
        state
            .page_table
            .get(&page_id)
            .map(|&frame_id| self.frames[frame_id.0].pin_count())
    }

    /// Whether `page_id` is currently resident.
    pub fn contains_page(&self, page_id: PageId) -> bool {
        self.state.lock().page_table.contains_key(&page_id)
    }

    /// Number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of frames holding no page.
    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Number of resident pages.
    pub fn page_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    /// Performance counters.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// The injected log manager, if any.
    pub fn log_manager(&self) -> Option<&Arc<LogManager>> {
        self.log_manager.as_ref()
    }

    pub(crate) fn frame(&self, frame_id: FrameId) -> &Frame {
        &self.frames[frame_id.0]
    }

    // ========================================================================
    // Internal: fetch and host-frame acquisition
    // ========================================================================

    /// Pin `page_id`'s frame, loading the page from disk on a miss.
    fn fetch_frame(&self, page_id: PageId, access: AccessType) -> Result<FrameId> {
        let mut state = self.state.lock();
        let state = &mut *state;

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.frames[frame_id.0].pin();
            state.replacer.record_access(frame_id, access);
            state.replacer.set_evictable(frame_id, false);
            self.stats.record_hit();
            return Ok(frame_id);
        }

        self.stats.record_miss();
        let frame_id = self.acquire_frame(state)?;
        {
            let frame = &self.frames[frame_id.0];
            let mut page = frame.page_mut();
            if let Err(err) = self.disk.lock().read_page(page_id, &mut page) {
                // Put the untouched frame back so the pool stays whole.
                drop(page);
                state.free_list.push(frame_id);
                return Err(err);
            }
        }
        self.stats.record_page_read();
        self.bind_frame(state, frame_id, page_id, access);

        Ok(frame_id)
    }

    /// Find a host frame: free list first, then eviction.
    ///
    /// An evicted frame is written back if dirty, unmapped, and zeroed;
    /// the caller binds it. Must be called with the pool latch held.
    fn acquire_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = state.free_list.pop() {
            debug_assert!(self.frames[frame_id.0].page_id().is_none());
            return Ok(frame_id);
        }

        let frame_id = state.replacer.evict().ok_or(Error::NoFreeFrames)?;
        let frame = &self.frames[frame_id.0];
        debug_assert!(!frame.is_pinned());

        let old_page_id = frame.page_id();
        if frame.is_dirty() {
            if let Some(old) = old_page_id {
                let page = frame.page();
                self.disk.lock().write_page(old, &page)?;
                drop(page);
                frame.clear_dirty();
                self.stats.record_page_written();
            }
        }
        if let Some(old) = old_page_id {
            state.page_table.remove(&old);
            debug!("evicted {} from {}", old, frame_id);
        }
        frame.set_page_id(None);
        frame.page_mut().reset();
        self.stats.record_eviction();

        Ok(frame_id)
    }

    /// Bind an acquired frame to `page_id`: pinned once, clean, tracked
    /// by the replacer and not evictable.
    fn bind_frame(&self, state: &mut PoolState, frame_id: FrameId, page_id: PageId, access: AccessType) {
        let frame = &self.frames[frame_id.0];
        debug_assert_eq!(frame.pin_count(), 0);

        frame.set_page_id(Some(page_id));
        frame.clear_dirty();
        frame.pin();

        state.page_table.insert(page_id, frame_id);
        state.replacer.record_access(frame_id, access);
        state.replacer.set_evictable(frame_id, false);
    }
}
