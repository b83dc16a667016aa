//! Error types.

use thiserror::Error;

use crate::common::{FrameId, PageId};

/// Convenient Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All recoverable failures surfaced by the buffer pool and its
/// collaborators.
///
/// Resource exhaustion and missing pages are ordinary results the
/// caller is expected to handle; only I/O failures carry a source.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested page has never been allocated on disk.
    #[error("{0} not found on disk")]
    PageNotFound(PageId),

    /// Every frame is pinned and the replacer has no eviction candidate.
    #[error("no free frame and no evictable frame in the buffer pool")]
    NoFreeFrames,

    /// `remove` was called on a frame the replacer tracks but which is
    /// not marked evictable.
    #[error("cannot remove non-evictable {0} from the replacer")]
    NonEvictableRemove(FrameId),
}
