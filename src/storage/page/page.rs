//! Page - the fixed-size unit of disk I/O.

use crate::common::config::PAGE_SIZE;

/// A raw 4KB page.
///
/// This is the unit of transfer between disk and memory; the buffer
/// pool holds one `Page` per frame. The 4096-byte alignment keeps the
/// buffer usable for Direct I/O.
///
/// `Page` deliberately does not implement `Clone` outside of tests:
/// copying 4KB should be an explicit `copy_from_slice`, not an
/// accidental `.clone()`.
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    /// Immutable view of the page bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable view of the page bytes.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Size of a page in bytes.
    #[inline]
    pub const fn size() -> usize {
        PAGE_SIZE
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        let mut page = Page::new();
        page.data.copy_from_slice(&self.data);
        page
    }
}
