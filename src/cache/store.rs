//! Cache Store Module
//!
//! Main cache engine combining a HashMap index with an intrusive LRU list,
//! TTL expiration and byte-budget accounting.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use tracing::debug;

use crate::cache::entry::{current_timestamp_ms, expiration_from};
use crate::cache::{CacheEntry, CacheSnapshot, CacheStats, LruList, SizeCalculator, SnapshotEntry};

// == Cache Limits ==
/// Budgets and TTL policy of a single engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheLimits {
    /// Maximum number of live entries
    pub max_items: Option<usize>,
    /// Maximum aggregate byte estimate
    pub max_bytes: Option<usize>,
    /// Maximum byte estimate of a single entry
    pub max_entry_bytes: Option<usize>,
    /// TTL applied when `set` is called without one
    pub default_ttl: Option<Duration>,
    /// Recompute expiration from `default_ttl` on every hit
    pub refresh_ttl_on_read: bool,
}

impl CacheLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn with_max_entry_bytes(mut self, max_entry_bytes: usize) -> Self {
        self.max_entry_bytes = Some(max_entry_bytes);
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    pub fn with_refresh_on_read(mut self, refresh: bool) -> Self {
        self.refresh_ttl_on_read = refresh;
        self
    }

    /// Largest size a single entry may have to be accepted.
    pub fn entry_ceiling(&self) -> Option<usize> {
        match (self.max_entry_bytes, self.max_bytes) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

// == LRU Cache ==
/// Bounded key-value store with LRU ordering, optional TTL and byte budget.
///
/// All operations are synchronous and amortized O(1), except the sweeping
/// enumeration calls which are linear in the live entry count.
pub struct LruCache<K, V> {
    /// Key to slab index
    index: HashMap<K, usize>,
    /// Entries in recency order
    list: LruList<K, V>,
    /// Performance statistics
    stats: CacheStats,
    limits: CacheLimits,
    /// Aggregate byte estimate of live entries
    bytes: usize,
    sizer: SizeCalculator<K, V>,
}

impl<K, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.list.len())
            .field("bytes", &self.bytes)
            .field("limits", &self.limits)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates an empty engine with the given budgets and size calculator.
    pub fn new(limits: CacheLimits, sizer: SizeCalculator<K, V>) -> Self {
        Self {
            index: HashMap::new(),
            list: LruList::new(),
            stats: CacheStats::new(),
            limits,
            bytes: 0,
            sizer,
        }
    }

    pub fn limits(&self) -> &CacheLimits {
        &self.limits
    }

    // == Reconfigure ==
    /// Replaces the budgets. Nothing is evicted until the next write.
    pub fn reconfigure(&mut self, limits: CacheLimits) {
        self.limits = limits;
    }

    // == Get ==
    /// Retrieves a value by key, promoting it to most recently used.
    ///
    /// Expired entries are removed and counted as both a miss and an
    /// expiration.
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = current_timestamp_ms();
        let Some(&idx) = self.index.get(key) else {
            self.stats.record_miss();
            return None;
        };

        if self.list.get(idx).map_or(true, |entry| entry.is_expired_at(now)) {
            self.remove_at(idx);
            self.stats.record_expiration();
            self.stats.record_miss();
            return None;
        }

        self.list.move_to_front(idx);
        let refreshed = match (self.limits.refresh_ttl_on_read, self.limits.default_ttl) {
            (true, Some(ttl)) => Some(expiration_from(Some(ttl), now)),
            _ => None,
        };

        let entry = self.list.get_mut(idx)?;
        entry.access_count += 1;
        if let Some(expires_at) = refreshed {
            entry.expires_at = expires_at;
        }
        self.stats.record_hit();
        Some(entry.value.clone())
    }

    // == Peek ==
    /// Reads a live value without touching recency or counters.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.list
            .get(idx)
            .filter(|entry| !entry.is_expired())
            .map(|entry| &entry.value)
    }

    /// Full entry view without touching recency or counters.
    pub fn peek_entry<Q>(&self, key: &Q) -> Option<&CacheEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.list.get(idx).filter(|entry| !entry.is_expired())
    }

    // == Has ==
    /// Checks for a live entry. An expired entry found here is removed and
    /// counted as an expiration; hits, misses and recency are untouched.
    pub fn has<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(&idx) = self.index.get(key) else {
            return false;
        };
        if self.list.get(idx).map_or(true, CacheEntry::is_expired) {
            self.remove_at(idx);
            self.stats.record_expiration();
            return false;
        }
        true
    }

    // == Set ==
    /// Stores a key-value pair.
    ///
    /// `ttl` overrides the default TTL; `Some(Duration::ZERO)` stores the
    /// entry without expiration. Returns `false` without mutating anything
    /// when the entry alone exceeds the per-entry or byte ceiling.
    pub fn set(&mut self, key: K, value: V, ttl: Option<Duration>) -> bool {
        let expires_at = expiration_from(ttl.or(self.limits.default_ttl), current_timestamp_ms());
        self.store(key, value, expires_at, None)
    }

    fn store(&mut self, key: K, value: V, expires_at: Option<u64>, access_count: Option<u64>) -> bool {
        let size = (self.sizer)(&key, &value);
        if let Some(ceiling) = self.limits.entry_ceiling() {
            if size > ceiling {
                debug!(size, ceiling, "Rejected cache write above entry ceiling");
                return false;
            }
        }

        match self.index.get(&key).copied() {
            Some(idx) => {
                let Some(entry) = self.list.get_mut(idx) else {
                    return false;
                };
                let old_size = entry.size;
                entry.value = value;
                entry.size = size;
                entry.expires_at = expires_at;
                if let Some(count) = access_count {
                    entry.access_count = count;
                }
                self.bytes = self.bytes - old_size + size;
                self.list.move_to_front(idx);
            }
            None => {
                let mut entry = CacheEntry::new(key.clone(), value, size, expires_at);
                entry.access_count = access_count.unwrap_or(0);
                let idx = self.list.push_front(entry);
                self.index.insert(key, idx);
                self.bytes += size;
            }
        }

        self.enforce_limits();
        true
    }

    // == Eviction ==
    /// Evicts from the LRU end until both budgets hold. Returns the number
    /// of evicted entries.
    fn enforce_limits(&mut self) -> usize {
        let mut evicted = 0;

        if let Some(max_items) = self.limits.max_items {
            while self.list.len() > max_items && self.evict_lru() {
                evicted += 1;
            }
        }
        if let Some(max_bytes) = self.limits.max_bytes {
            while self.bytes > max_bytes && self.evict_lru() {
                evicted += 1;
            }
        }

        if evicted > 0 {
            debug!(evicted, len = self.list.len(), bytes = self.bytes, "LRU eviction");
        }
        evicted
    }

    fn evict_lru(&mut self) -> bool {
        match self.list.pop_back() {
            Some(entry) => {
                self.index.remove(&entry.key);
                self.bytes -= entry.size;
                self.stats.record_eviction();
                true
            }
            None => false,
        }
    }

    fn remove_at(&mut self, idx: usize) -> Option<CacheEntry<K, V>> {
        let entry = self.list.remove(idx)?;
        self.index.remove(&entry.key);
        self.bytes -= entry.size;
        Some(entry)
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether an entry was present.
    pub fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.index.get(key).copied() {
            Some(idx) => self.remove_at(idx).is_some(),
            None => false,
        }
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.index.clear();
        self.list.clear();
        self.bytes = 0;
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let expired: Vec<usize> = self
            .index
            .values()
            .copied()
            .filter(|&idx| self.list.get(idx).map_or(false, |e| e.is_expired_at(now)))
            .collect();

        for &idx in &expired {
            self.remove_at(idx);
            self.stats.record_expiration();
        }
        expired.len()
    }

    // == Enumeration ==
    /// Live entry count after sweeping expired entries.
    pub fn size(&mut self) -> usize {
        self.purge_expired();
        self.list.len()
    }

    /// Keys from most to least recently used, after a sweep.
    pub fn keys(&mut self) -> Vec<K> {
        self.purge_expired();
        self.list.iter().map(|entry| entry.key.clone()).collect()
    }

    /// Values from most to least recently used, after a sweep.
    pub fn values(&mut self) -> Vec<V> {
        self.purge_expired();
        self.list.iter().map(|entry| entry.value.clone()).collect()
    }

    /// Key-value pairs from most to least recently used, after a sweep.
    pub fn entries(&mut self) -> Vec<(K, V)> {
        self.purge_expired();
        self.list
            .iter()
            .map(|entry| (entry.key.clone(), entry.value.clone()))
            .collect()
    }

    /// Entry count without sweeping; may include expired entries.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Aggregate byte estimate of the stored entries.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    // == Batch Operations ==
    /// Applies `get` per key, preserving input order.
    pub fn get_many<'a, Q, I>(&mut self, keys: I) -> Vec<Option<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'a,
        I: IntoIterator<Item = &'a Q>,
    {
        keys.into_iter().map(|key| self.get(key)).collect()
    }

    /// Applies `set` per item; a rejected item does not stop the batch.
    pub fn set_many<I>(&mut self, items: I, ttl: Option<Duration>) -> Vec<bool>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        items
            .into_iter()
            .map(|(key, value)| self.set(key, value, ttl))
            .collect()
    }

    /// Applies `delete` per key, returning how many entries were removed.
    pub fn delete_many<'a, Q, I>(&mut self, keys: I) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'a,
        I: IntoIterator<Item = &'a Q>,
    {
        keys.into_iter().filter(|key| self.delete(*key)).count()
    }

    // == Get Or Set ==
    /// Returns the cached value, or computes, stores and returns it.
    ///
    /// The computed value is returned even if the store rejects it.
    pub fn get_or_set<F>(&mut self, key: K, factory: F, ttl: Option<Duration>) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = factory();
        self.set(key, value.clone(), ttl);
        value
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.list.len();
        stats.total_bytes = self.bytes;
        stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset_counters();
    }

    // == Snapshot ==
    /// Captures live entries, least recently used first.
    pub fn snapshot(&self) -> CacheSnapshot<K, V> {
        let now = current_timestamp_ms();
        let entries = self
            .list
            .iter_lru()
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| SnapshotEntry {
                key: entry.key.clone(),
                value: entry.value.clone(),
                expires_at: entry.expires_at,
                access_count: entry.access_count,
            })
            .collect();

        CacheSnapshot {
            taken_at: now,
            entries,
        }
    }

    /// Re-inserts snapshot entries, keeping their absolute expiration.
    ///
    /// Entries that expired since the capture are skipped. Returns the
    /// number of accepted entries.
    pub fn restore(&mut self, snapshot: CacheSnapshot<K, V>) -> usize {
        let now = current_timestamp_ms();
        let mut restored = 0;

        for entry in snapshot.entries {
            if entry.expires_at.map_or(false, |expires| now >= expires) {
                continue;
            }
            if self.store(entry.key, entry.value, entry.expires_at, Some(entry.access_count)) {
                restored += 1;
            }
        }
        restored
    }
}
