//! Property-Based Tests for the Cache Module
//!
//! Uses proptest to check the LRU store against a simple recency model.

use proptest::prelude::*;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;

use crate::cache::{CacheEntry, Headers, LruStore, Storer};

// == Strategies ==
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,3}"
}

fn entry(tag: &str) -> CacheEntry {
    CacheEntry::new(
        200,
        Headers::new(),
        Bytes::copy_from_slice(tag.as_bytes()),
        Duration::from_secs(300),
    )
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set(String),
    Get(String),
    Delete(String),
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        key_strategy().prop_map(CacheOp::Set),
        key_strategy().prop_map(CacheOp::Get),
        key_strategy().prop_map(CacheOp::Delete),
    ]
}

/// Reference model: keys ordered most recent first.
fn model_touch(model: &mut Vec<String>, key: &str) {
    model.retain(|k| k != key);
    model.insert(0, key.to_string());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Any op sequence leaves the store ordered exactly like the model and
    // never above capacity.
    #[test]
    fn prop_matches_recency_model(
        capacity in 1usize..6,
        ops in prop::collection::vec(cache_op_strategy(), 1..80)
    ) {
        let store = LruStore::new(capacity as i64);
        let mut model: Vec<String> = Vec::new();

        for op in ops {
            match op {
                CacheOp::Set(key) => {
                    if !model.contains(&key) && model.len() >= capacity {
                        model.pop();
                    }
                    model_touch(&mut model, &key);
                    store.insert(&key, entry(&key));
                }
                CacheOp::Get(key) => {
                    let found = store.lookup(&key);
                    prop_assert_eq!(found.is_some(), model.contains(&key));
                    if found.is_some() {
                        model_touch(&mut model, &key);
                    }
                }
                CacheOp::Delete(key) => {
                    model.retain(|k| k != &key);
                    store.remove(&key);
                }
            }
            prop_assert!(store.len() <= capacity);
            prop_assert_eq!(store.keys(), model.clone());
        }
    }

    // Inserting N+1 distinct keys into capacity N keeps N keys and drops the
    // least recently touched one.
    #[test]
    fn prop_evicts_least_recently_touched(
        keys in prop::collection::hash_set(key_strategy(), 2..12),
        touch in any::<prop::sample::Index>()
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let capacity = keys.len() - 1;
        let store = LruStore::new(capacity as i64);

        for key in &keys[..capacity] {
            store.insert(key, entry(key));
        }

        // Touching one key moves the eviction target.
        let touched = touch.index(capacity);
        store.lookup(&keys[touched]);
        let expected_victim = if touched == 0 { &keys[1] } else { &keys[0] };
        let expected_victim = if capacity == 1 { &keys[0] } else { expected_victim };

        store.insert(&keys[capacity], entry("new"));

        prop_assert_eq!(store.len(), capacity);
        prop_assert!(store.lookup(expected_victim).is_none());
        prop_assert!(store.lookup(&keys[capacity]).is_some());
    }

    // Delete of an absent key never changes the store.
    #[test]
    fn prop_delete_absent_is_noop(
        keys in prop::collection::vec(key_strategy(), 0..10),
        absent in "[0-9]{1,3}"
    ) {
        let store = LruStore::new(8);
        for key in &keys {
            store.insert(key, entry(key));
        }
        let before = store.keys();

        store.remove(&absent);

        prop_assert_eq!(store.keys(), before);
    }

    // Expired entries are never returned, whatever their position.
    #[test]
    fn prop_expired_never_returned(keys in prop::collection::hash_set(key_strategy(), 1..10)) {
        let store = LruStore::new(16);
        for key in &keys {
            let mut stale = entry(key);
            stale.expires_at = Utc::now() - chrono::Duration::milliseconds(1);
            store.insert(key, stale);
        }

        for key in &keys {
            let found = tokio_test::block_on(Storer::get(&store, key));
            prop_assert!(found.is_none());
        }
        prop_assert!(store.is_empty());
    }
}
