//! Eviction Strategy Module
//!
//! Pure ranking functions choosing which cache entries to discard when a
//! bucket exceeds its capacity. Each strategy orders keys from most to least
//! evictable; the store pops from the front until it is back under limit.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::cache::CacheEntry;

// == Eviction Strategy ==
/// Rule for ranking eviction candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionStrategy {
    /// Least recently used first (ascending `last_accessed`)
    Lru,
    /// Least frequently used first (ascending `access_count`)
    Lfu,
    /// Oldest insertion first (ascending `timestamp`)
    Fifo,
    /// Uniform shuffle of all keys
    Random,
}

impl EvictionStrategy {
    // == Rank ==
    /// Orders the keys of `entries` from most to least evictable.
    ///
    /// Lru/Lfu/Fifo are deterministic given identical metadata; ties are
    /// broken by key so the order is stable across runs. Random produces a
    /// uniform Fisher-Yates shuffle.
    pub fn rank<T>(&self, entries: &HashMap<String, CacheEntry<T>>) -> Vec<String> {
        match self {
            EvictionStrategy::Lru => rank_by(entries, |e| e.last_accessed),
            EvictionStrategy::Lfu => rank_by(entries, |e| e.access_count),
            EvictionStrategy::Fifo => rank_by(entries, |e| e.timestamp),
            EvictionStrategy::Random => {
                let mut keys: Vec<String> = entries.keys().cloned().collect();
                keys.shuffle(&mut rand::thread_rng());
                keys
            }
        }
    }
}

/// Sorts keys ascending by the extracted metric, then by key for stable ties.
fn rank_by<T, F>(entries: &HashMap<String, CacheEntry<T>>, metric: F) -> Vec<String>
where
    F: Fn(&CacheEntry<T>) -> u64,
{
    let mut ranked: Vec<(&String, u64)> = entries
        .iter()
        .map(|(key, entry)| (key, metric(entry)))
        .collect();
    ranked.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().map(|(key, _)| key.clone()).collect()
}
