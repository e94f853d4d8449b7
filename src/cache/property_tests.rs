//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify correctness properties of the store, the
//! eviction rankings, and the refresh check.

use proptest::prelude::*;
use std::collections::HashMap;

use crate::cache::{current_timestamp_ms, CacheEntry, CacheManager, CacheQuery, EvictionStrategy, SetOptions};
use crate::policy::{CachePolicyManager, PolicyUpdate};

// == Test Configuration ==
const TEST_GLOBAL_MAX: usize = 1000;

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,32}"
}

/// Generates valid payload strings
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}"
}

/// Generates a synthetic entry with arbitrary bookkeeping metadata
fn entry_strategy() -> impl Strategy<Value = (String, CacheEntry<u32>)> {
    (
        valid_key_strategy(),
        0u64..1_000_000,
        0u64..1_000_000,
        0u64..10_000,
    )
        .prop_map(|(key, timestamp, last_accessed, access_count)| {
            let entry = CacheEntry {
                key: key.clone(),
                data: 0,
                timestamp,
                expires_at: None,
                version: 1,
                last_accessed,
                access_count,
                tags: Vec::new(),
                dependencies: Vec::new(),
            };
            (key, entry)
        })
}

fn entry_map_strategy() -> impl Strategy<Value = HashMap<String, CacheEntry<u32>>> {
    prop::collection::vec(entry_strategy(), 1..20)
        .prop_map(|pairs| pairs.into_iter().collect())
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Invalidate { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Invalidate { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any valid key-value pair, storing the pair and then retrieving it
    // (before expiration) returns the exact same value that was stored.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in valid_value_strategy()) {
        let mut cache: CacheManager<String> =
            CacheManager::new(CachePolicyManager::default(), TEST_GLOBAL_MAX);

        cache.set("course", &key, value.clone(), SetOptions::default()).unwrap();
        let retrieved = cache.get("course", &key);
        prop_assert_eq!(retrieved, Some(value), "Round-trip value mismatch");
    }

    // For any sequence of operations, the statistics (hits, misses) reflect
    // exactly the get outcomes, and total_entries matches the store size.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut cache: CacheManager<String> =
            CacheManager::new(CachePolicyManager::default(), TEST_GLOBAL_MAX);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    cache.set("course", &key, value, SetOptions::default()).unwrap();
                }
                CacheOp::Get { key } => {
                    match cache.get("course", &key) {
                        Some(_) => expected_hits += 1,
                        None => expected_misses += 1,
                    }
                }
                CacheOp::Invalidate { key } => {
                    cache.invalidate(&CacheQuery::by_key("course", &key));
                }
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, cache.len(), "Total entries mismatch");
    }

    // For any sequence of writes, a bucket never exceeds its policy's
    // max_size.
    #[test]
    fn prop_bucket_capacity_enforcement(
        entries in prop::collection::vec(
            (valid_key_strategy(), valid_value_strategy()),
            1..150
        )
    ) {
        let max_size = 50;
        let mut policies = CachePolicyManager::default();
        policies.update_policy("course", &PolicyUpdate {
            max_size: Some(max_size),
            ..Default::default()
        });
        let mut cache: CacheManager<String> = CacheManager::new(policies, TEST_GLOBAL_MAX);

        for (key, value) in entries {
            cache.set("course", &key, value, SetOptions::default()).unwrap();
            prop_assert!(
                cache.len() <= max_size,
                "Bucket size {} exceeds max {}",
                cache.len(),
                max_size
            );
        }
    }

    // LRU always ranks the entry with the smallest last_accessed first.
    #[test]
    fn prop_lru_ranks_least_recently_accessed_first(entries in entry_map_strategy()) {
        let ranked = EvictionStrategy::Lru.rank(&entries);
        let min = entries.values().map(|e| e.last_accessed).min().unwrap();
        prop_assert_eq!(entries[&ranked[0]].last_accessed, min);
    }

    // FIFO always ranks the entry with the smallest insertion timestamp first.
    #[test]
    fn prop_fifo_ranks_oldest_insertion_first(entries in entry_map_strategy()) {
        let ranked = EvictionStrategy::Fifo.rank(&entries);
        let min = entries.values().map(|e| e.timestamp).min().unwrap();
        prop_assert_eq!(entries[&ranked[0]].timestamp, min);
    }

    // LFU always ranks the entry with the smallest access count first.
    #[test]
    fn prop_lfu_ranks_least_frequently_used_first(entries in entry_map_strategy()) {
        let ranked = EvictionStrategy::Lfu.rank(&entries);
        let min = entries.values().map(|e| e.access_count).min().unwrap();
        prop_assert_eq!(entries[&ranked[0]].access_count, min);
    }

    // Deterministic strategies produce identical rankings on identical input;
    // random produces a permutation of the key set.
    #[test]
    fn prop_rankings_deterministic_and_random_complete(entries in entry_map_strategy()) {
        for strategy in [EvictionStrategy::Lru, EvictionStrategy::Lfu, EvictionStrategy::Fifo] {
            prop_assert_eq!(strategy.rank(&entries), strategy.rank(&entries));
        }

        let mut shuffled = EvictionStrategy::Random.rank(&entries);
        shuffled.sort();
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        prop_assert_eq!(shuffled, keys);
    }

    // should_refresh is monotonic in elapsed time: once an entry is due for
    // refresh it stays due for any later instant, until rewritten.
    #[test]
    fn prop_should_refresh_monotonic(
        ttl_ms in 1u64..1_000_000,
        threshold in 0.0f64..1.0,
        elapsed_a in 0u64..2_000_000,
        advance in 0u64..2_000_000,
    ) {
        let mut policies = CachePolicyManager::default();
        policies.update_policy("course", &PolicyUpdate {
            ttl_ms: Some(ttl_ms),
            refresh_threshold: Some(threshold),
            ..Default::default()
        });
        let policy = policies.get_policy("course").clone();

        let now = current_timestamp_ms();
        let mut entry = CacheEntry::new("course:1".to_string(), 0u32, Some(ttl_ms), 1);

        entry.timestamp = now.saturating_sub(elapsed_a);
        let due_earlier = policies.should_refresh(&entry, &policy);

        entry.timestamp = entry.timestamp.saturating_sub(advance);
        let due_later = policies.should_refresh(&entry, &policy);

        prop_assert!(!due_earlier || due_later, "refresh signal regressed over time");
    }

    // Invalidation by prefix pattern removes exactly the matching keys.
    #[test]
    fn prop_pattern_invalidation_matches_prefix(
        keys in prop::collection::hash_set("[a-z]{1,10}", 1..20),
        prefix in "[a-z]{1,3}",
    ) {
        let mut cache: CacheManager<u32> =
            CacheManager::new(CachePolicyManager::default(), TEST_GLOBAL_MAX);
        for key in &keys {
            cache.set("course", key, 0, SetOptions::default()).unwrap();
        }

        let expected: usize = keys.iter().filter(|k| k.starts_with(&prefix)).count();
        let removed = cache.invalidate(&CacheQuery::by_pattern(format!("course:{}*", prefix)));

        prop_assert_eq!(removed, expected);
        prop_assert_eq!(cache.len(), keys.len() - expected);
    }
}
