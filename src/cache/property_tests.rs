//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the engine's budget, ordering and statistics
//! invariants over arbitrary operation sequences.

use proptest::prelude::*;
use std::collections::HashSet;
use std::thread::sleep;
use std::time::Duration;

use crate::cache::{size, CacheLimits, LruCache};

// == Strategies ==
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9_]{1,8}"
}

fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,24}"
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Has { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        2 => valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => valid_key_strategy().prop_map(|key| CacheOp::Has { key }),
        1 => valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

fn new_store(max_items: usize, max_bytes: usize) -> LruCache<String, String> {
    LruCache::new(
        CacheLimits::new()
            .with_max_items(max_items)
            .with_max_bytes(max_bytes),
        size::string_len(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Item and byte budgets hold after every operation, and the tracked byte
    // total always equals the sum of live entry sizes.
    #[test]
    fn prop_budgets_hold(
        ops in prop::collection::vec(cache_op_strategy(), 1..120),
        max_items in 1usize..12,
        max_bytes in 24usize..96,
    ) {
        let mut store = new_store(max_items, max_bytes);

        for op in ops {
            match op {
                CacheOp::Set { key, value } => { store.set(key, value, None); }
                CacheOp::Get { key } => { store.get(&key); }
                CacheOp::Has { key } => { store.has(&key); }
                CacheOp::Delete { key } => { store.delete(&key); }
            }
            prop_assert!(store.len() <= max_items, "len {} > {}", store.len(), max_items);
            prop_assert!(store.bytes() <= max_bytes, "bytes {} > {}", store.bytes(), max_bytes);

            let summed: usize = store.entries().iter().map(|(_, v)| v.len()).sum();
            prop_assert_eq!(summed, store.bytes());
        }
    }

    // Hits and misses count exactly the `get` outcomes; `has` never counts.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let mut store = new_store(16, 1024);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => { store.set(key, value, None); }
                CacheOp::Get { key } => match store.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Has { key } => { store.has(&key); }
                CacheOp::Delete { key } => { store.delete(&key); }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits);
        prop_assert_eq!(stats.misses, expected_misses);
        prop_assert_eq!(stats.total_entries, store.len());
    }

    // A key read just before an insert at capacity is never the victim.
    #[test]
    fn prop_touched_key_survives_eviction(
        keys in prop::collection::vec(valid_key_strategy(), 2..10),
        touch_index in 0usize..100,
        new_key in valid_key_strategy(),
    ) {
        let unique: Vec<String> = keys
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        prop_assume!(unique.len() >= 2);
        prop_assume!(!unique.contains(&new_key));

        let mut store = new_store(unique.len(), usize::MAX);
        for key in &unique {
            store.set(key.clone(), "v".to_string(), None);
        }

        let touched = unique[touch_index % unique.len()].clone();
        prop_assert!(store.get(&touched).is_some());

        store.set(new_key.clone(), "v".to_string(), None);

        prop_assert_eq!(store.stats().evictions, 1);
        prop_assert!(store.has(&touched), "touched key '{}' was evicted", touched);
        prop_assert!(store.has(&new_key));
    }

    // Snapshot, clear, restore reproduces the live key set and values.
    #[test]
    fn prop_snapshot_restore(
        items in prop::collection::vec((valid_key_strategy(), valid_value_strategy()), 1..30)
    ) {
        let mut store = new_store(64, 4096);
        store.set_many(items, None);

        let before = store.entries();
        let snapshot = store.snapshot();
        store.clear();
        store.restore(snapshot);

        prop_assert_eq!(store.entries(), before);
    }
}

// Fewer cases for the time-sensitive TTL property
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    #[test]
    fn prop_ttl_expiration_behavior(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        probe_first in any::<bool>(),
    ) {
        let mut store = new_store(16, 1024);
        store.set(key.clone(), value.clone(), Some(Duration::from_millis(100)));
        prop_assert_eq!(store.get(&key), Some(value));

        sleep(Duration::from_millis(150));

        if probe_first {
            prop_assert!(!store.has(&key));
        }
        prop_assert_eq!(store.get(&key), None);
        prop_assert_eq!(store.stats().expirations, 1);
    }
}
