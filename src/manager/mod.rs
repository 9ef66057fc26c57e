//! Category Cache Manager
//!
//! Owns one engine per configured category, routes typed calls to it,
//! extends persistent categories with a durable second tier and aggregates
//! statistics.
//!
//! Engines are synchronous and sit behind a per-category `tokio::sync::Mutex`
//! that is never held across an `.await`. Durable I/O is the only suspension
//! point; a `set` racing a read-through write-back resolves last-writer-wins.

mod category;
mod events;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{current_timestamp_ms, CacheSnapshot, LruCache, SizeCalculator};
use crate::config::{CacheConfig, CategoryConfig};
use crate::durable::{DurableRecord, DurableStore, EntryMetadata};

pub(crate) use category::with_category;
pub use category::{
    durable_key, CacheKind, Category, CategorySlot, Content, Listing, Metadata, Search, Slots,
    Thumbnail,
};
pub use events::{CacheEvent, CacheObserver, TracingObserver};

use events::Observers;

/// Predicate used by `invalidate`.
pub type InvalidatePredicate<'a, V> = &'a (dyn Fn(&str, &V) -> bool + Sync);

// == Statistics ==
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryStats {
    pub size: usize,
    pub bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub hit_rate: f64,
    pub persistent: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ManagerStats {
    pub enabled: bool,
    pub total_size: usize,
    /// Whether a durable store is attached
    pub persistent_storage: bool,
    /// Record count reported by the durable store, when it answered
    pub durable_entries: Option<usize>,
    pub categories: BTreeMap<CacheKind, CategoryStats>,
}

// == Builder ==
pub struct CacheManagerBuilder {
    config: CacheConfig,
    slots: Slots,
    durable: Option<Arc<dyn DurableStore>>,
    observers: Observers,
}

impl CacheManagerBuilder {
    /// Attaches the durable second tier used by persistent categories.
    pub fn durable_store(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.durable = Some(store);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn CacheObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Replaces the size calculator of category `C`.
    pub fn sizer<C: Category>(mut self, sizer: SizeCalculator<String, C::Value>) -> Self {
        C::slot_mut(&mut self.slots).sizer = sizer;
        self
    }

    pub fn build(self) -> CacheManager {
        info!(
            enabled = self.config.enabled,
            categories = self.config.categories.len(),
            durable = self.durable.is_some(),
            observers = self.observers.len(),
            "Cache manager initialized"
        );
        CacheManager {
            enabled: AtomicBool::new(self.config.enabled),
            config: RwLock::new(self.config),
            slots: self.slots,
            durable: self.durable,
            observers: self.observers,
        }
    }
}

// == Cache Manager ==
/// Multi-category cache with an optional durable tier.
///
/// Construct once at the composition root, share as `Arc<CacheManager>` and
/// call [`CacheManager::cleanup`] at shutdown.
pub struct CacheManager {
    enabled: AtomicBool,
    config: RwLock<CacheConfig>,
    slots: Slots,
    durable: Option<Arc<dyn DurableStore>>,
    observers: Observers,
}

impl CacheManager {
    pub fn builder(config: CacheConfig) -> CacheManagerBuilder {
        CacheManagerBuilder {
            slots: Slots::new(&config),
            config,
            durable: None,
            observers: Observers::default(),
        }
    }

    pub fn new(config: CacheConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn has_durable_store(&self) -> bool {
        self.durable.is_some()
    }

    pub async fn config(&self) -> CacheConfig {
        self.config.read().await.clone()
    }

    /// Runs `f` against the engine of `C`, building it on first use.
    /// `None` when disabled or when `C` is not configured.
    async fn with_cache<C, R>(
        &self,
        f: impl FnOnce(&mut LruCache<String, C::Value>, &CategoryConfig) -> R,
    ) -> Option<R>
    where
        C: Category,
    {
        if !self.is_enabled() {
            return None;
        }
        let slot = C::slot(&self.slots);
        let mut state = slot.state.lock().await;
        let (cache, config) = state.engine(&slot.sizer)?;
        Some(f(cache, config))
    }

    fn emit(&self, event: CacheEvent) {
        self.observers.emit(event);
    }

    // == Get ==
    /// Reads `key` from the memory tier, falling back to the durable tier
    /// for persistent categories. A durable hit is written back to memory
    /// with its remaining TTL.
    pub async fn get<C: Category>(&self, key: &str) -> Option<C::Value> {
        let (cached, persistent) = self
            .with_cache::<C, _>(|cache, config| (cache.get(key), config.persistent))
            .await?;

        let value = match cached {
            Some(value) => Some(value),
            None if persistent => self.read_through::<C>(key).await,
            None => None,
        };

        let event = match value {
            Some(_) => CacheEvent::CacheHit {
                category: C::KIND,
                key: key.to_string(),
            },
            None => CacheEvent::CacheMiss {
                category: C::KIND,
                key: key.to_string(),
            },
        };
        self.emit(event);
        value
    }

    async fn read_through<C: Category>(&self, key: &str) -> Option<C::Value> {
        let store = self.durable.as_ref()?;
        let record_key = durable_key(C::KIND, key);

        let record = match store.get(&record_key).await {
            Ok(record) => record?,
            Err(err) => {
                warn!(category = %C::KIND, key, error = %err, "Durable read failed");
                return None;
            }
        };

        let now = current_timestamp_ms();
        if record.metadata.is_expired_at(now) {
            if let Err(err) = store.delete(&record_key).await {
                warn!(category = %C::KIND, key, error = %err, "Durable delete of expired record failed");
            }
            return None;
        }

        let value: C::Value = match serde_json::from_value(record.value) {
            Ok(value) => value,
            Err(err) => {
                warn!(category = %C::KIND, key, error = %err, "Undecodable durable record");
                return None;
            }
        };

        // Keep the durable expiration instead of granting a fresh default TTL.
        let ttl = match record.metadata.expires_at {
            Some(expires_at) => Duration::from_millis(expires_at.saturating_sub(now).max(1)),
            None => Duration::ZERO,
        };
        let written = self
            .with_cache::<C, _>(|cache, _| cache.set(key.to_string(), value.clone(), Some(ttl)))
            .await;
        debug!(category = %C::KIND, key, written = ?written, "Durable hit written back to memory");

        Some(value)
    }

    // == Set ==
    /// Stores `value` in memory and, for persistent categories, in the
    /// durable tier. Returns `false` when the memory tier rejected the write
    /// or the category is unavailable.
    pub async fn set<C: Category>(&self, key: &str, value: C::Value, ttl: Option<Duration>) -> bool {
        let outcome = self
            .with_cache::<C, _>(|cache, config| {
                let accepted = cache.set(key.to_string(), value, ttl);
                let persisted = if accepted && config.persistent {
                    cache
                        .peek_entry(key)
                        .map(|entry| (serde_json::to_value(&entry.value), entry.size, entry.expires_at))
                } else {
                    None
                };
                (accepted, persisted)
            })
            .await;

        let Some((accepted, persisted)) = outcome else {
            return false;
        };

        if let (Some(store), Some((json, size, expires_at))) = (self.durable.as_ref(), persisted) {
            let result = match json {
                Ok(value) => {
                    let record = DurableRecord {
                        value,
                        metadata: EntryMetadata::new(C::KIND, size, expires_at),
                    };
                    store.set(&durable_key(C::KIND, key), record).await
                }
                Err(err) => Err(err.into()),
            };
            if let Err(err) = result {
                warn!(category = %C::KIND, key, error = %err, "Durable write failed");
            }
        }

        accepted
    }

    // == Delete ==
    /// Removes `key` from both tiers. Returns whether memory held it.
    pub async fn delete<C: Category>(&self, key: &str) -> bool {
        let Some((removed, persistent)) = self
            .with_cache::<C, _>(|cache, config| (cache.delete(key), config.persistent))
            .await
        else {
            return false;
        };

        if persistent {
            self.delete_durable(C::KIND, key).await;
        }
        removed
    }

    async fn delete_durable(&self, kind: CacheKind, key: &str) {
        if let Some(store) = &self.durable {
            if let Err(err) = store.delete(&durable_key(kind, key)).await {
                warn!(category = %kind, key, error = %err, "Durable delete failed");
            }
        }
    }

    /// Memory-tier presence check; never consults the durable tier.
    pub async fn has<C: Category>(&self, key: &str) -> bool {
        self.with_cache::<C, _>(|cache, _| cache.has(key))
            .await
            .unwrap_or(false)
    }

    // == Get Or Set ==
    /// Returns the cached value or computes it with `factory` and stores it.
    /// Concurrent callers for the same key may each run the factory.
    pub async fn get_or_set<C, F, Fut>(&self, key: &str, factory: F, ttl: Option<Duration>) -> C::Value
    where
        C: Category,
        F: FnOnce() -> Fut,
        Fut: Future<Output = C::Value>,
    {
        if let Some(value) = self.get::<C>(key).await {
            return value;
        }
        let value = factory().await;
        self.set::<C>(key, value.clone(), ttl).await;
        value
    }

    /// Like [`get_or_set`](Self::get_or_set) with a fallible factory;
    /// errors are returned and nothing is stored.
    pub async fn try_get_or_set<C, F, Fut, E>(
        &self,
        key: &str,
        factory: F,
        ttl: Option<Duration>,
    ) -> Result<C::Value, E>
    where
        C: Category,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<C::Value, E>>,
    {
        if let Some(value) = self.get::<C>(key).await {
            return Ok(value);
        }
        let value = factory().await?;
        self.set::<C>(key, value.clone(), ttl).await;
        Ok(value)
    }

    // == Batch Operations ==
    pub async fn get_many<C, S>(&self, keys: &[S]) -> Vec<Option<C::Value>>
    where
        C: Category,
        S: AsRef<str> + Sync,
    {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get::<C>(key.as_ref()).await);
        }
        values
    }

    /// One memory write and, when persistent, one durable write per item.
    pub async fn set_many<C: Category>(
        &self,
        entries: Vec<(String, C::Value)>,
        ttl: Option<Duration>,
    ) -> Vec<bool> {
        let mut accepted = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            accepted.push(self.set::<C>(&key, value, ttl).await);
        }
        accepted
    }

    pub async fn delete_many<C, S>(&self, keys: &[S]) -> usize
    where
        C: Category,
        S: AsRef<str> + Sync,
    {
        let mut removed = 0;
        for key in keys {
            if self.delete::<C>(key.as_ref()).await {
                removed += 1;
            }
        }
        removed
    }

    /// Pre-populates a category before its first real access.
    pub async fn warmup<C: Category>(
        &self,
        entries: Vec<(String, C::Value)>,
        ttl: Option<Duration>,
    ) -> usize {
        let total = entries.len();
        let accepted = self
            .set_many::<C>(entries, ttl)
            .await
            .into_iter()
            .filter(|ok| *ok)
            .count();
        info!(category = %C::KIND, accepted, total, "Cache warmup complete");
        accepted
    }

    // == Clearing ==
    /// Clears category `C` in both tiers and emits `CacheCleared`.
    /// Returns the number of memory entries dropped.
    pub async fn clear<C: Category>(&self) -> usize {
        let Some((removed, persistent)) = self
            .with_cache::<C, _>(|cache, config| {
                let removed = cache.len();
                cache.clear();
                (removed, config.persistent)
            })
            .await
        else {
            return 0;
        };

        if persistent {
            self.clear_durable(C::KIND).await;
        }
        self.emit(CacheEvent::CacheCleared { category: C::KIND });
        debug!(category = %C::KIND, removed, "Category cleared");
        removed
    }

    pub async fn clear_type(&self, kind: CacheKind) -> usize {
        with_category!(kind, C => self.clear::<C>().await)
    }

    /// Clears every configured category, one notification each.
    pub async fn clear_all(&self) -> usize {
        let mut removed = 0;
        for kind in CacheKind::ALL {
            removed += self.clear_type(kind).await;
        }
        info!(removed, "All cache categories cleared");
        removed
    }

    async fn clear_durable(&self, kind: CacheKind) {
        let Some(store) = &self.durable else {
            return;
        };
        let prefix = durable_key(kind, "");
        let keys = match store.all_keys().await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(category = %kind, error = %err, "Durable key listing failed");
                return;
            }
        };
        for key in keys.iter().filter(|key| key.starts_with(&prefix)) {
            if let Err(err) = store.delete(key).await {
                warn!(category = %kind, key = %key, error = %err, "Durable delete failed");
            }
        }
    }

    /// Drops the memory tier of `C` only. The durable tier and the
    /// statistics are left alone and no notification is emitted.
    pub async fn clear_memory<C: Category>(&self) -> usize {
        self.with_cache::<C, _>(|cache, _| {
            let removed = cache.len();
            cache.clear();
            removed
        })
        .await
        .unwrap_or(0)
    }

    // == Invalidate ==
    /// Deletes the live entries of `C` matching `predicate` from both tiers.
    /// Without a predicate the whole category is cleared.
    pub async fn invalidate<C: Category>(
        &self,
        predicate: Option<InvalidatePredicate<'_, C::Value>>,
    ) -> usize {
        let Some(predicate) = predicate else {
            return self.clear::<C>().await;
        };

        let Some((matched, persistent)) = self
            .with_cache::<C, _>(|cache, config| {
                let matched: Vec<String> = cache
                    .entries()
                    .into_iter()
                    .filter(|(key, value)| predicate(key.as_str(), value))
                    .map(|(key, _)| key)
                    .collect();
                for key in &matched {
                    cache.delete(key.as_str());
                }
                (matched, config.persistent)
            })
            .await
        else {
            return 0;
        };

        if persistent {
            for key in &matched {
                self.delete_durable(C::KIND, key).await;
            }
        }
        debug!(category = %C::KIND, invalidated = matched.len(), "Invalidated entries");
        matched.len()
    }

    // == Snapshots ==
    /// Snapshot of the memory tier of `C`.
    pub async fn export_data<C: Category>(&self) -> Option<CacheSnapshot<String, C::Value>> {
        self.with_cache::<C, _>(|cache, _| cache.snapshot()).await
    }

    /// Restores a snapshot into the memory tier of `C`, returning the number
    /// of accepted entries.
    pub async fn import_data<C: Category>(&self, snapshot: CacheSnapshot<String, C::Value>) -> usize {
        self.with_cache::<C, _>(|cache, _| cache.restore(snapshot))
            .await
            .unwrap_or(0)
    }

    // == Statistics ==
    async fn category_stats<C: Category>(&self) -> Option<CategoryStats> {
        self.with_cache::<C, _>(|cache, config| {
            let size = cache.size();
            let stats = cache.stats();
            CategoryStats {
                size,
                bytes: stats.total_bytes,
                hits: stats.hits,
                misses: stats.misses,
                evictions: stats.evictions,
                expirations: stats.expirations,
                hit_rate: stats.hit_rate(),
                persistent: config.persistent,
            }
        })
        .await
    }

    pub async fn get_stats(&self) -> ManagerStats {
        let mut categories = BTreeMap::new();
        for kind in CacheKind::ALL {
            if let Some(stats) = with_category!(kind, C => self.category_stats::<C>().await) {
                categories.insert(kind, stats);
            }
        }

        let durable_entries = match &self.durable {
            Some(store) => match store.len().await {
                Ok(len) => Some(len),
                Err(err) => {
                    warn!(error = %err, "Durable size query failed");
                    None
                }
            },
            None => None,
        };

        ManagerStats {
            enabled: self.is_enabled(),
            total_size: categories.values().map(|s| s.size).sum(),
            persistent_storage: self.durable.is_some(),
            durable_entries,
            categories,
        }
    }

    pub async fn reset_stats(&self) {
        for kind in CacheKind::ALL {
            with_category!(kind, C => {
                self.with_cache::<C, _>(|cache, _| cache.reset_stats()).await;
            });
        }
    }

    /// Sweeps expired entries from every engine.
    pub async fn purge_expired(&self) -> usize {
        let mut removed = 0;
        for kind in CacheKind::ALL {
            removed += with_category!(kind, C => {
                self.with_cache::<C, _>(|cache, _| cache.purge_expired())
                    .await
                    .unwrap_or(0)
            });
        }
        removed
    }

    // == Configuration ==
    /// Applies a new configuration.
    ///
    /// Disabling drops every engine. Enabling rebuilds engines lazily on the
    /// next access, never from the durable tier. Budget changes reach live
    /// engines without evicting until their next write.
    pub async fn update_config(&self, config: CacheConfig) {
        let enabled = config.enabled;
        self.enabled.store(enabled, Ordering::SeqCst);

        for kind in CacheKind::ALL {
            let category = config.category(kind).cloned();
            with_category!(kind, C => {
                let mut state = C::slot(&self.slots).state.lock().await;
                state.reconfigure(category);
                if !enabled {
                    state.cache = None;
                }
            });
        }

        info!(
            enabled,
            categories = config.categories.len(),
            "Cache configuration updated"
        );
        *self.config.write().await = config;
    }

    pub async fn set_enabled(&self, enabled: bool) {
        let mut config = self.config().await;
        config.enabled = enabled;
        self.update_config(config).await;
    }

    /// Shutdown hook: drops every memory tier and disables the manager.
    /// Durable records are kept for the next session.
    pub async fn cleanup(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        for kind in CacheKind::ALL {
            with_category!(kind, C => {
                C::slot(&self.slots).state.lock().await.cache = None;
            });
        }
        info!("Cache manager cleaned up");
    }
}
