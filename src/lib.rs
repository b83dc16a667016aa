//! pagepool - a fixed-capacity buffer pool with LRU-K replacement.
//!
//! # Architecture
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    access methods (callers)              │
//! │        hold BasicPageGuard / ReadPageGuard /             │
//! │        WritePageGuard: pin + latch, released on drop     │
//! └───────────────────────────┬──────────────────────────────┘
//!                             ↓
//! ┌──────────────────────────────────────────────────────────┐
//! │            BufferPoolManager (buffer/)                   │
//! │   page_table · free_list · fixed frame array · stats     │
//! │        └── LruKReplacer picks eviction victims           │
//! └───────────────────────────┬──────────────────────────────┘
//!                             ↓
//! ┌──────────────────────────────────────────────────────────┐
//! │   DiskManager (storage/)        LogManager (recovery/)   │
//! │   page-slot file I/O            append-only WAL sink     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - shared primitives (PageId, FrameId, Error, config)
//! - [`buffer`] - buffer pool, page guards, LRU-K replacer
//! - [`storage`] - disk I/O and the page type
//! - [`recovery`] - the injected write-ahead log sink
//!
//! # Quick Start
//! ```no_run
//! use pagepool::{AccessType, BufferPoolManager, DiskManager};
//!
//! let dm = DiskManager::create("my_database.db").unwrap();
//! let bpm = BufferPoolManager::new(64, 2, dm);
//!
//! let page_id = {
//!     let mut guard = bpm.new_page().unwrap();
//!     guard.data_mut().as_mut_slice()[0] = 0xAB;
//!     guard.page_id()
//! }; // dropped: unpinned, marked dirty
//!
//! let guard = bpm.fetch_page_read(page_id, AccessType::Unknown).unwrap();
//! assert_eq!(guard.as_slice()[0], 0xAB);
//! ```

pub mod buffer;
pub mod common;
pub mod recovery;
pub mod storage;

// Re-export commonly used items at the crate root.
pub use common::config::PAGE_SIZE;
pub use common::{Error, FrameId, PageId, Result};

pub use buffer::replacer::{AccessType, LruKReplacer};
pub use buffer::{
    BasicPageGuard, BufferPoolManager, BufferPoolStats, Frame, ReadPageGuard, StatsSnapshot,
    WritePageGuard,
};
pub use recovery::{LogManager, Lsn};
pub use storage::page::Page;
pub use storage::DiskManager;
