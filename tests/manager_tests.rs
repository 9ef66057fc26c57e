//! Integration Tests for the Category Cache Manager
//!
//! Drives the manager through its public API with in-process and failing
//! durable stores.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cloud_cache::durable::{DurableRecord, DurableStore, EntryMetadata, FileStore, MemoryStore};
use cloud_cache::manager::{
    durable_key, CacheManager, Listing, Metadata, Search, Thumbnail,
};
use cloud_cache::models::{FileMetadata, FolderListing, SearchResults, ThumbnailImage};
use cloud_cache::{CacheConfig, CacheError, CacheEvent, CacheKind, CacheObserver};

// == Helper Functions ==

type Events = Arc<Mutex<Vec<CacheEvent>>>;

fn recorder() -> (Events, Arc<dyn CacheObserver>) {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let observer: Arc<dyn CacheObserver> = Arc::new(move |event: &CacheEvent| {
        sink.lock().unwrap().push(event.clone());
    });
    (events, observer)
}

fn thumbnail(bytes: usize) -> ThumbnailImage {
    ThumbnailImage {
        data: vec![7; bytes],
        width: 64,
        height: 64,
        mime_type: "image/png".to_string(),
    }
}

fn results(query: &str) -> SearchResults {
    SearchResults {
        query: query.to_string(),
        items: Vec::new(),
        total: None,
    }
}

fn listing(path: &str) -> FolderListing {
    FolderListing {
        path: path.to_string(),
        items: vec![FileMetadata::file("drive", format!("{}/a.txt", path), 12)],
        next_cursor: None,
    }
}

fn with_store(store: Arc<dyn DurableStore>) -> CacheManager {
    CacheManager::builder(CacheConfig::default())
        .durable_store(store)
        .build()
}

/// Durable store whose every call fails.
struct FailingStore;

#[async_trait]
impl DurableStore for FailingStore {
    async fn get(&self, _key: &str) -> cloud_cache::Result<Option<DurableRecord>> {
        Err(CacheError::Durable("unreachable".to_string()))
    }

    async fn set(&self, _key: &str, _record: DurableRecord) -> cloud_cache::Result<()> {
        Err(CacheError::Durable("unreachable".to_string()))
    }

    async fn delete(&self, _key: &str) -> cloud_cache::Result<()> {
        Err(CacheError::Durable("unreachable".to_string()))
    }

    async fn clear(&self) -> cloud_cache::Result<()> {
        Err(CacheError::Durable("unreachable".to_string()))
    }

    async fn all_keys(&self) -> cloud_cache::Result<Vec<String>> {
        Err(CacheError::Durable("unreachable".to_string()))
    }

    async fn len(&self) -> cloud_cache::Result<usize> {
        Err(CacheError::Durable("unreachable".to_string()))
    }
}

// == Dual Tier ==

#[tokio::test]
async fn test_thumbnail_read_through_after_memory_loss() {
    let store = Arc::new(MemoryStore::new());
    let manager = with_store(store.clone());

    assert!(manager.set::<Thumbnail>("a.png", thumbnail(32), None).await);
    assert_eq!(store.len().await.unwrap(), 1);

    assert_eq!(manager.clear_memory::<Thumbnail>().await, 1);
    assert!(!manager.has::<Thumbnail>("a.png").await);

    let value = manager.get::<Thumbnail>("a.png").await;
    assert_eq!(value, Some(thumbnail(32)));

    // Written back, so the next read is served from memory.
    assert!(manager.has::<Thumbnail>("a.png").await);
    manager.get::<Thumbnail>("a.png").await.unwrap();

    let stats = manager.get_stats().await;
    let thumbs = &stats.categories[&CacheKind::Thumbnail];
    assert_eq!(thumbs.misses, 1);
    assert_eq!(thumbs.hits, 1);
    assert!(stats.persistent_storage);
    assert_eq!(stats.durable_entries, Some(1));
}

#[tokio::test]
async fn test_read_through_keeps_durable_expiration() {
    let store = Arc::new(MemoryStore::new());
    let manager = with_store(store.clone());
    let meta = FileMetadata::file("drive", "/docs/report.pdf", 2048);

    manager
        .set::<Metadata>("report", meta.clone(), Some(Duration::from_millis(200)))
        .await;
    manager.clear_memory::<Metadata>().await;
    assert_eq!(manager.get::<Metadata>("report").await, Some(meta));

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(manager.get::<Metadata>("report").await.is_none());
    assert_eq!(store.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_expired_durable_record_is_deleted() {
    let store = Arc::new(MemoryStore::new());
    let key = durable_key(CacheKind::Thumbnail, "old.png");
    let record = DurableRecord {
        value: serde_json::to_value(thumbnail(4)).unwrap(),
        metadata: EntryMetadata {
            expires_at: Some(1),
            ..EntryMetadata::new(CacheKind::Thumbnail, 4, None)
        },
    };
    store.set(&key, record).await.unwrap();

    let manager = with_store(store.clone());
    assert!(manager.get::<Thumbnail>("old.png").await.is_none());
    assert!(store.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_non_persistent_category_skips_durable_store() {
    let store = Arc::new(MemoryStore::new());
    let manager = with_store(store.clone());

    assert!(manager.set::<Search>("q", results("q"), None).await);
    assert_eq!(store.len().await.unwrap(), 0);

    manager.clear_memory::<Search>().await;
    assert!(manager.get::<Search>("q").await.is_none());
}

#[tokio::test]
async fn test_durable_failures_are_swallowed() {
    let manager = with_store(Arc::new(FailingStore));

    assert!(manager.set::<Thumbnail>("a.png", thumbnail(8), None).await);
    assert_eq!(manager.get::<Thumbnail>("a.png").await, Some(thumbnail(8)));

    manager.clear_memory::<Thumbnail>().await;
    assert!(manager.get::<Thumbnail>("a.png").await.is_none());
    assert!(!manager.delete::<Thumbnail>("a.png").await);
    manager.clear::<Thumbnail>().await;

    let stats = manager.get_stats().await;
    assert!(stats.persistent_storage);
    assert_eq!(stats.durable_entries, None);
}

#[tokio::test]
async fn test_file_store_survives_manager_restart() {
    let dir = tempfile::tempdir().unwrap();

    let first = with_store(Arc::new(FileStore::open(dir.path()).await.unwrap()));
    first.set::<Thumbnail>("kept.png", thumbnail(16), None).await;
    first.cleanup().await;

    let second = with_store(Arc::new(FileStore::open(dir.path()).await.unwrap()));
    assert_eq!(second.get::<Thumbnail>("kept.png").await, Some(thumbnail(16)));
}

#[tokio::test]
async fn test_file_store_keeps_long_keys_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let key = format!("/Shared/{}/IMG_0001.png", "Holiday Photos 2023/".repeat(12));
    assert!(key.len() > 200);

    let store = Arc::new(FileStore::open(dir.path()).await.unwrap());
    let first = with_store(store.clone());
    assert!(first.set::<Thumbnail>(&key, thumbnail(16), None).await);
    assert_eq!(store.len().await.unwrap(), 1);
    first.cleanup().await;

    let second = with_store(Arc::new(FileStore::open(dir.path()).await.unwrap()));
    assert_eq!(second.get::<Thumbnail>(&key).await, Some(thumbnail(16)));
}

// == Notifications ==

#[tokio::test]
async fn test_hit_and_miss_notifications() {
    let (events, observer) = recorder();
    let manager = CacheManager::builder(CacheConfig::default())
        .observer(observer)
        .build();

    manager.get::<Search>("q").await;
    manager.set::<Search>("q", results("q"), None).await;
    manager.get::<Search>("q").await;

    let events = events.lock().unwrap();
    assert_eq!(
        *events,
        vec![
            CacheEvent::CacheMiss {
                category: CacheKind::Search,
                key: "q".to_string()
            },
            CacheEvent::CacheHit {
                category: CacheKind::Search,
                key: "q".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn test_disabled_manager_is_silent() {
    let (events, observer) = recorder();
    let config = CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    };
    let manager = CacheManager::builder(config).observer(observer).build();

    assert!(manager.get::<Search>("q").await.is_none());
    assert!(!manager.set::<Search>("q", results("q"), None).await);
    assert!(manager.get::<Search>("q").await.is_none());
    assert_eq!(manager.clear_all().await, 0);

    assert!(events.lock().unwrap().is_empty());
    assert!(manager.get_stats().await.categories.is_empty());
}

#[tokio::test]
async fn test_unconfigured_category_is_silent() {
    let (events, observer) = recorder();
    let mut config = CacheConfig::default();
    config.categories.remove(&CacheKind::Search);
    let manager = CacheManager::builder(config).observer(observer).build();

    assert!(!manager.set::<Search>("q", results("q"), None).await);
    assert!(manager.get::<Search>("q").await.is_none());
    assert!(!manager.delete::<Search>("q").await);

    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_clear_all_notifies_each_category() {
    let (events, observer) = recorder();
    let manager = CacheManager::builder(CacheConfig::default())
        .observer(observer)
        .build();
    manager.set::<Search>("q", results("q"), None).await;
    manager.set::<Listing>("/", listing(""), None).await;

    assert_eq!(manager.clear_all().await, 2);

    let events = events.lock().unwrap();
    let cleared: Vec<CacheKind> = events
        .iter()
        .filter_map(|event| match event {
            CacheEvent::CacheCleared { category } => Some(*category),
            _ => None,
        })
        .collect();
    assert_eq!(cleared, CacheKind::ALL.to_vec());
}

#[tokio::test]
async fn test_panicking_observer_does_not_break_reads() {
    let (events, observer) = recorder();
    let manager = CacheManager::builder(CacheConfig::default())
        .observer(Arc::new(|_: &CacheEvent| panic!("observer bug")))
        .observer(observer)
        .build();

    manager.set::<Search>("q", results("q"), None).await;
    assert!(manager.get::<Search>("q").await.is_some());
    assert_eq!(events.lock().unwrap().len(), 1);
}

// == Clearing And Invalidation ==

#[tokio::test]
async fn test_clear_removes_only_own_durable_records() {
    let store = Arc::new(MemoryStore::new());
    let manager = with_store(store.clone());
    manager
        .set::<Metadata>("doc", FileMetadata::file("drive", "/doc", 1), None)
        .await;
    manager.set::<Thumbnail>("doc", thumbnail(4), None).await;

    assert_eq!(manager.clear::<Metadata>().await, 1);

    let keys = store.all_keys().await.unwrap();
    assert_eq!(keys, vec![durable_key(CacheKind::Thumbnail, "doc")]);
}

#[tokio::test]
async fn test_invalidate_with_predicate() {
    let manager = CacheManager::new(CacheConfig::default());
    for path in ["/photos", "/photos/2023", "/music"] {
        manager.set::<Listing>(path, listing(path), None).await;
    }

    let removed = manager
        .invalidate::<Listing>(Some(&|_: &str, value: &FolderListing| {
            value.path.starts_with("/photos")
        }))
        .await;

    assert_eq!(removed, 2);
    assert!(manager.has::<Listing>("/music").await);
    assert!(!manager.has::<Listing>("/photos").await);
}

#[tokio::test]
async fn test_invalidate_without_predicate_clears() {
    let manager = CacheManager::new(CacheConfig::default());
    manager.set::<Search>("a", results("a"), None).await;
    manager.set::<Search>("b", results("b"), None).await;

    assert_eq!(manager.invalidate::<Search>(None).await, 2);
    assert!(!manager.has::<Search>("a").await);
}

// == Configuration ==

#[tokio::test]
async fn test_reenable_rebuilds_empty_engines() {
    let manager = CacheManager::new(CacheConfig::default());
    manager.set::<Search>("q", results("q"), None).await;

    manager.set_enabled(false).await;
    assert!(!manager.is_enabled());
    assert!(manager.get::<Search>("q").await.is_none());

    manager.set_enabled(true).await;
    assert!(manager.get::<Search>("q").await.is_none());
    assert!(manager.set::<Search>("q", results("q"), None).await);
    assert!(manager.get::<Search>("q").await.is_some());
}

#[tokio::test]
async fn test_shrinking_budget_applies_on_next_write() {
    let manager = CacheManager::new(CacheConfig::default());
    for i in 0..5 {
        let key = format!("q{}", i);
        manager.set::<Search>(&key, results(&key), None).await;
    }

    let mut config = manager.config().await;
    if let Some(search) = config.categories.get_mut(&CacheKind::Search) {
        search.max_items = 2;
    }
    manager.update_config(config).await;

    let stats = manager.get_stats().await;
    assert_eq!(stats.categories[&CacheKind::Search].size, 5);

    manager.set::<Search>("q5", results("q5"), None).await;
    let stats = manager.get_stats().await;
    assert_eq!(stats.categories[&CacheKind::Search].size, 2);
    assert!(manager.has::<Search>("q5").await);
    assert!(manager.has::<Search>("q4").await);
}

// == Compute, Batch And Snapshots ==

#[tokio::test]
async fn test_get_or_set_runs_factory_once() {
    let manager = CacheManager::new(CacheConfig::default());
    let calls = Arc::new(Mutex::new(0));

    for _ in 0..3 {
        let calls = calls.clone();
        let value = manager
            .get_or_set::<Search, _, _>(
                "q",
                || async move {
                    *calls.lock().unwrap() += 1;
                    results("computed")
                },
                None,
            )
            .await;
        assert_eq!(value.query, "computed");
    }

    assert_eq!(*calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_try_get_or_set_does_not_store_errors() {
    let manager = CacheManager::new(CacheConfig::default());

    let result = manager
        .try_get_or_set::<Search, _, _, String>("q", || async { Err("offline".to_string()) }, None)
        .await;
    assert_eq!(result.unwrap_err(), "offline");
    assert!(!manager.has::<Search>("q").await);
}

#[tokio::test]
async fn test_batch_operations() {
    let manager = CacheManager::new(CacheConfig::default());
    let accepted = manager
        .set_many::<Search>(
            vec![
                ("a".to_string(), results("a")),
                ("b".to_string(), results("b")),
            ],
            None,
        )
        .await;
    assert_eq!(accepted, vec![true, true]);

    let values = manager.get_many::<Search, _>(&["a", "missing", "b"]).await;
    assert!(values[0].is_some());
    assert!(values[1].is_none());
    assert!(values[2].is_some());

    assert_eq!(manager.delete_many::<Search, _>(&["a", "b", "missing"]).await, 2);
}

#[tokio::test]
async fn test_warmup_counts_accepted_entries() {
    let manager = CacheManager::new(CacheConfig::default());
    let entries = (0..3)
        .map(|i| (format!("/dir{}", i), listing(&format!("/dir{}", i))))
        .collect();

    assert_eq!(manager.warmup::<Listing>(entries, None).await, 3);
    assert!(manager.has::<Listing>("/dir1").await);
}

#[tokio::test]
async fn test_export_and_import() {
    let manager = CacheManager::new(CacheConfig::default());
    for key in ["a", "b", "c"] {
        manager.set::<Search>(key, results(key), None).await;
    }
    manager.get::<Search>("a").await;

    let snapshot = manager.export_data::<Search>().await.unwrap();
    let order: Vec<&String> = snapshot.keys().collect();
    assert_eq!(order, vec!["b", "c", "a"]);

    manager.clear::<Search>().await;
    assert_eq!(manager.import_data::<Search>(snapshot).await, 3);
    assert_eq!(manager.get::<Search>("b").await, Some(results("b")));
}

#[tokio::test]
async fn test_reset_stats() {
    let manager = CacheManager::new(CacheConfig::default());
    manager.get::<Search>("missing").await;
    manager.reset_stats().await;

    let stats = manager.get_stats().await;
    assert_eq!(stats.categories[&CacheKind::Search].misses, 0);
}
