//! Cache Snapshots
//!
//! Serializable point-in-time copies of an engine's live entries.

use serde::{Deserialize, Serialize};

/// One live entry as captured by `LruCache::snapshot`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry<K, V> {
    pub key: K,
    pub value: V,
    /// Absolute expiration (Unix milliseconds), kept absolute so a restore
    /// never extends the remaining lifetime.
    pub expires_at: Option<u64>,
    pub access_count: u64,
}

/// Live entries ordered from least to most recently used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot<K, V> {
    /// Capture time (Unix milliseconds)
    pub taken_at: u64,
    pub entries: Vec<SnapshotEntry<K, V>>,
}

impl<K, V> CacheSnapshot<K, V> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in capture order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|entry| &entry.key)
    }
}
