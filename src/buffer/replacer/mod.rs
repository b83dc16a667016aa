//! Eviction policy.
//!
//! The buffer pool consults an [`LruKReplacer`] whenever the free list
//! runs dry; only frames explicitly marked evictable are candidates.

mod lru_k;

pub use lru_k::{AccessType, LruKReplacer};
