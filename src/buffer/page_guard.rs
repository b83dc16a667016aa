//! RAII guards for page access.
//!
//! Every guard owns one pin on one frame; the read and write variants
//! additionally hold the frame latch. Dropping a guard releases the
//! latch first and the pin second, exactly once. Moving a guard leaves
//! nothing behind to release, and [`drop_guard`] makes early release
//! explicit and idempotent.
//!
//! [`drop_guard`]: BasicPageGuard::drop_guard

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId};
use crate::storage::page::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// Pin-only guard: keeps the page resident but holds no latch.
///
/// Byte access goes through [`data`]/[`data_mut`], which latch the
/// frame for the duration of the returned lock guard. Writing through
/// [`data_mut`] (or calling [`mark_dirty`]) flags the page dirty; the
/// flag is handed to the pool when the guard drops.
///
/// [`data`]: BasicPageGuard::data
/// [`data_mut`]: BasicPageGuard::data_mut
/// [`mark_dirty`]: BasicPageGuard::mark_dirty
pub struct BasicPageGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    is_dirty: bool,
    active: bool,
}

impl<'a> BasicPageGuard<'a> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, frame_id: FrameId, page_id: PageId) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            is_dirty: false,
            active: true,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Latch the frame shared and read the page bytes.
    pub fn data(&self) -> RwLockReadGuard<'_, Page> {
        assert!(self.active, "page guard used after drop_guard");
        self.bpm.frame(self.frame_id).page()
    }

    /// Latch the frame exclusive for writing. Marks the page dirty.
    pub fn data_mut(&mut self) -> RwLockWriteGuard<'_, Page> {
        assert!(self.active, "page guard used after drop_guard");
        self.is_dirty = true;
        self.bpm.frame(self.frame_id).page_mut()
    }

    /// Flag the page as modified without touching the bytes.
    pub fn mark_dirty(&mut self) {
        assert!(self.active, "page guard used after drop_guard");
        self.is_dirty = true;
    }

    /// Release the pin now instead of at scope exit. Safe to call more
    /// than once.
    pub fn drop_guard(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.bpm.unpin_page(self.page_id, self.is_dirty);
    }
}

impl Drop for BasicPageGuard<'_> {
    fn drop(&mut self) {
        self.drop_guard();
    }
}

/// Shared-access guard: one pin plus the frame latch in read mode.
///
/// Any number of read guards may coexist on a page. Derefs to the page
/// bytes; never marks the page dirty.
pub struct ReadPageGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    lock: Option<RwLockReadGuard<'a, Page>>,
}

impl<'a> ReadPageGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockReadGuard<'a, Page>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            lock: Some(lock),
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Release the latch and the pin now, in that order. Safe to call
    /// more than once.
    pub fn drop_guard(&mut self) {
        if let Some(lock) = self.lock.take() {
            drop(lock);
            self.bpm.unpin_page(self.page_id, false);
        }
    }
}

impl Deref for ReadPageGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        match &self.lock {
            Some(lock) => lock,
            None => panic!("page guard used after drop_guard"),
        }
    }
}

impl Drop for ReadPageGuard<'_> {
    fn drop(&mut self) {
        self.drop_guard();
    }
}

/// Exclusive-access guard: one pin plus the frame latch in write mode.
///
/// Writing through `DerefMut` marks the page dirty; a write guard that
/// only ever reads leaves the page clean.
pub struct WritePageGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    is_dirty: bool,
    lock: Option<RwLockWriteGuard<'a, Page>>,
}

impl<'a> WritePageGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockWriteGuard<'a, Page>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            is_dirty: false,
            lock: Some(lock),
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Flag the page as modified without touching the bytes.
    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    /// Release the latch and the pin now, in that order. Safe to call
    /// more than once.
    pub fn drop_guard(&mut self) {
        if let Some(lock) = self.lock.take() {
            drop(lock);
            self.bpm.unpin_page(self.page_id, self.is_dirty);
        }
    }
}

impl Deref for WritePageGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        match &self.lock {
            Some(lock) => lock,
            None => panic!("page guard used after drop_guard"),
        }
    }
}

impl DerefMut for WritePageGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        self.is_dirty = true;
        match &mut self.lock {
            Some(lock) => lock,
            None => panic!("page guard used after drop_guard"),
        }
    }
}

impl Drop for WritePageGuard<'_> {
    fn drop(&mut self) {
        self.drop_guard();
    }
}
