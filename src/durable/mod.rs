//! Durable Store Module
//!
//! Second-tier persistence consulted for categories flagged persistent. The
//! manager treats any implementation as best-effort: failures are logged and
//! swallowed, never surfaced to callers.

mod file;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::current_timestamp_ms;
use crate::error::Result;
use crate::manager::CacheKind;

pub use file::FileStore;
pub use memory::MemoryStore;

// == Entry Metadata ==
/// Bookkeeping persisted next to every durable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub category: CacheKind,
    /// Byte estimate computed by the category's size calculator
    pub size: usize,
    /// Unix milliseconds
    pub created_at: u64,
    /// Unix milliseconds
    pub accessed_at: u64,
    /// Unix milliseconds, None = no expiration
    pub expires_at: Option<u64>,
    pub access_count: u64,
}

impl EntryMetadata {
    /// Metadata for a freshly written value.
    pub fn new(category: CacheKind, size: usize, expires_at: Option<u64>) -> Self {
        let now = current_timestamp_ms();
        Self {
            category,
            size,
            created_at: now,
            accessed_at: now,
            expires_at,
            access_count: 0,
        }
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at.map_or(false, |expires| now >= expires)
    }
}

// == Durable Record ==
/// Value plus metadata as handed to the durable store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurableRecord {
    pub value: serde_json::Value,
    pub metadata: EntryMetadata,
}

// == Durable Store ==
/// Opaque asynchronous key-value persistence.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<DurableRecord>>;

    async fn set(&self, key: &str, record: DurableRecord) -> Result<()>;

    /// Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;

    async fn all_keys(&self) -> Result<Vec<String>>;

    /// Number of stored records.
    async fn len(&self) -> Result<usize>;
}
