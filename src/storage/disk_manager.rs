//! Disk Manager - file I/O for database pages.
//!
//! The [`DiskManager`] owns the database file and exposes page-granular
//! reads and writes plus page-id allocation. It is single-threaded by
//! design; the buffer pool serializes access to it.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Manages disk I/O for a single database file.
///
/// # File Layout
/// Pages are laid out sequentially; page N lives at byte offset
/// `N * PAGE_SIZE`. The file only grows through [`allocate_page_id`];
/// deallocated ids are recycled from an in-process free list before the
/// file is extended again.
///
/// # Durability
/// Every write is followed by `fsync`, so `read_page`/`write_page` are
/// durable by the time they return.
///
/// [`allocate_page_id`]: DiskManager::allocate_page_id
pub struct DiskManager {
    file: File,
    /// Number of page slots in the file.
    page_count: u32,
    /// Deallocated ids available for reuse.
    free_ids: Vec<PageId>,
}

impl DiskManager {
    /// Create a new database file. Fails if the file already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            page_count: 0,
            free_ids: Vec::new(),
        })
    }

    /// Open an existing database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_size = file.metadata()?.len();
        let page_count = (file_size / PAGE_SIZE as u64) as u32;

        Ok(Self {
            file,
            page_count,
            free_ids: Vec::new(),
        })
    }

    /// Open an existing database file, creating it if absent.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Read a page from disk into `page`.
    pub fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        if !page_id.is_valid() || page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id));
        }

        self.file.seek(SeekFrom::Start(Self::offset(page_id)))?;
        self.file.read_exact(page.as_mut_slice())?;

        Ok(())
    }

    /// Write a page to disk and fsync.
    ///
    /// The slot must have been allocated with [`allocate_page_id`].
    ///
    /// [`allocate_page_id`]: DiskManager::allocate_page_id
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        if !page_id.is_valid() || page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id));
        }

        self.file.seek(SeekFrom::Start(Self::offset(page_id)))?;
        self.file.write_all(page.as_slice())?;
        self.file.sync_all()?;

        Ok(())
    }

    /// Allocate a page id, reusing a deallocated slot when one exists.
    ///
    /// The returned slot reads back zeroed either way.
    pub fn allocate_page_id(&mut self) -> Result<PageId> {
        if let Some(page_id) = self.free_ids.pop() {
            // Recycled slot: scrub whatever the previous owner left.
            self.file.seek(SeekFrom::Start(Self::offset(page_id)))?;
            self.file.write_all(&[0u8; PAGE_SIZE])?;
            self.file.sync_all()?;
            return Ok(page_id);
        }

        let page_id = PageId::new(self.page_count);
        self.file.seek(SeekFrom::Start(Self::offset(page_id)))?;
        self.file.write_all(&[0u8; PAGE_SIZE])?;
        self.file.sync_all()?;

        self.page_count += 1;
        Ok(page_id)
    }

    /// Return a page id to the allocator.
    ///
    /// The file is not shrunk; the slot becomes available to the next
    /// [`allocate_page_id`] call.
    ///
    /// [`allocate_page_id`]: DiskManager::allocate_page_id
    pub fn deallocate_page_id(&mut self, page_id: PageId) {
        if !page_id.is_valid() || page_id.0 >= self.page_count {
            return;
        }
        debug_assert!(!self.free_ids.contains(&page_id), "double deallocate");
        self.free_ids.push(page_id);
    }

    /// Number of page slots in the file.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Total size of the database file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.page_count as u64) * (PAGE_SIZE as u64)
    }

    #[inline]
    fn offset(page_id: PageId) -> u64 {
        (page_id.0 as u64) * (PAGE_SIZE as u64)
    }
}
