//! Write-ahead log plumbing consumed by layers above the buffer pool.

mod log_manager;

pub use log_manager::{LogManager, Lsn};
