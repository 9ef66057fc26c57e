//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support and
//! their links into the recency list.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// Entries live inside the engine's slab; `prev` and `next` are slab indices
/// of the more-recent and less-recent neighbours.
#[derive(Debug, Clone)]
pub struct CacheEntry<K, V> {
    /// The key this entry is indexed under
    pub key: K,
    /// The stored value
    pub value: V,
    /// Slab index of the more recently used neighbour
    pub(crate) prev: Option<usize>,
    /// Slab index of the less recently used neighbour
    pub(crate) next: Option<usize>,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
    /// Number of successful reads since insertion
    pub access_count: u64,
    /// Byte estimate produced by the size calculator
    pub size: usize,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
}

impl<K, V> CacheEntry<K, V> {
    // == Constructor ==
    /// Creates a detached entry with an absolute expiration instant.
    pub fn new(key: K, value: V, size: usize, expires_at: Option<u64>) -> Self {
        Self {
            key,
            value,
            prev: None,
            next: None,
            expires_at,
            access_count: 0,
            size,
            created_at: current_timestamp_ms(),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at the given instant.
    ///
    /// An entry is expired once `now >= expires_at`, so a TTL that has fully
    /// elapsed is never served.
    pub fn is_expired_at(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Checks if the entry has expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the entry has expired
    /// - `Some(remaining_ms)` if the entry has TTL and hasn't expired
    /// - `None` if the entry never expires
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Converts a relative TTL into an absolute expiration instant.
///
/// A zero TTL means the entry never expires.
pub fn expiration_from(ttl: Option<Duration>, now: u64) -> Option<u64> {
    match ttl {
        Some(ttl) if !ttl.is_zero() => {
            let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            Some(now.saturating_add(ttl_ms))
        }
        _ => None,
    }
}
