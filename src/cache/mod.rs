//! Cache Module
//!
//! Generic in-memory engine with LRU ordering, TTL expiration and byte-budget
//! eviction.

mod entry;
mod lru;
pub mod size;
mod snapshot;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, expiration_from, CacheEntry};
pub use lru::LruList;
pub use size::{SizeCalculator, SizeEstimate};
pub use snapshot::{CacheSnapshot, SnapshotEntry};
pub use stats::CacheStats;
pub use store::{CacheLimits, LruCache};
