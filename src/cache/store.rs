//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with policy-driven TTL
//! expiration and per-bucket eviction. Entries are keyed by the composite
//! `"{entity_type}:{key}"`; the policy registered for the entity type decides
//! the bucket's TTL, capacity, and eviction strategy.

use std::collections::HashMap;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, MAX_KEY_LENGTH};
use crate::error::{Result, SyncError};
use crate::policy::{CachePolicyManager, PolicyPriority};

// == Composite Key ==
/// Builds the storage key for an entity-type/key pair.
pub fn composite_key(entity_type: &str, key: &str) -> String {
    format!("{}:{}", entity_type, key)
}

/// Entity type portion of a composite key.
fn entity_type_of(composite: &str) -> &str {
    composite.split_once(':').map(|(t, _)| t).unwrap_or(composite)
}

// == Set Options ==
/// Optional per-write settings. Fields left at their defaults inherit from
/// the bucket's policy.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// TTL override in milliseconds
    pub ttl_ms: Option<u64>,
    /// Extra tags; the entity type is always tagged
    pub tags: Vec<String>,
    /// Composite keys of entries this one is derived from
    pub dependencies: Vec<String>,
}

// == Cache Query ==
/// Matcher used by `query` and `invalidate`. Criteria are alternatives: an
/// entry matches when any populated criterion matches it. An empty query
/// matches nothing.
#[derive(Debug, Clone, Default)]
pub struct CacheQuery {
    /// Exact composite key
    pub key: Option<String>,
    /// Glob-style pattern (`*` wildcard) over the composite key
    pub pattern: Option<String>,
    /// Entries carrying any of these tags
    pub tags: Vec<String>,
    /// Entries depending on any of these composite keys
    pub dependencies: Vec<String>,
}

impl CacheQuery {
    /// Query by exact composite key.
    pub fn by_key(entity_type: &str, key: &str) -> Self {
        Self {
            key: Some(composite_key(entity_type, key)),
            ..Default::default()
        }
    }

    /// Query by glob pattern over the composite key.
    pub fn by_pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Default::default()
        }
    }

    /// Query by tags (any match).
    pub fn by_tags(tags: Vec<String>) -> Self {
        Self {
            tags,
            ..Default::default()
        }
    }

    /// Query by dependency keys (any match).
    pub fn by_dependencies(dependencies: Vec<String>) -> Self {
        Self {
            dependencies,
            ..Default::default()
        }
    }

    fn matches<T>(&self, entry: &CacheEntry<T>) -> bool {
        if let Some(key) = &self.key {
            if entry.key == *key {
                return true;
            }
        }
        if let Some(pattern) = &self.pattern {
            if pattern_matches(pattern, &entry.key) {
                return true;
            }
        }
        if self.tags.iter().any(|t| entry.has_tag(t)) {
            return true;
        }
        if self.dependencies.iter().any(|d| entry.depends_on(d)) {
            return true;
        }
        false
    }
}

// == Pattern Matching ==
/// Glob-style match with `*` as the only wildcard.
fn pattern_matches(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let (mut star, mut mark) = (None::<usize>, 0usize);

    while ti < t.len() {
        if pi < p.len() && p[pi] != '*' && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if let Some(s) = star {
            // Backtrack: let the last `*` swallow one more character
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

// == Cache Manager ==
/// Bounded key-value store with policy-driven TTL and eviction.
#[derive(Debug)]
pub struct CacheManager<T: Clone> {
    /// Composite-key storage
    entries: HashMap<String, CacheEntry<T>>,
    /// Per-entity-type policy registry
    policies: CachePolicyManager,
    /// Performance statistics
    stats: CacheStats,
    /// Upper bound on entries across all buckets
    global_max_entries: usize,
}

impl<T: Clone> CacheManager<T> {
    // == Constructor ==
    /// Creates a new CacheManager.
    ///
    /// # Arguments
    /// * `policies` - Policy registry consulted for TTL/capacity/eviction
    /// * `global_max_entries` - Bound on total entries across all buckets
    pub fn new(policies: CachePolicyManager, global_max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            policies,
            stats: CacheStats::new(),
            global_max_entries,
        }
    }

    // == Set ==
    /// Stores a value under `{entity_type}:{key}`.
    ///
    /// Overwriting an existing key bumps its `version` and resets its
    /// timestamp and expiry. After the write, the entity-type bucket is
    /// trimmed to its policy's `max_size` and the whole store to the global
    /// bound, evicting from the lowest-priority buckets first.
    pub fn set(&mut self, entity_type: &str, key: &str, data: T, opts: SetOptions) -> Result<()> {
        if entity_type.is_empty() || key.is_empty() {
            return Err(SyncError::InvalidRequest(
                "Entity type and key must be non-empty".to_string(),
            ));
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(SyncError::InvalidRequest(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }

        let composite = composite_key(entity_type, key);
        let policy = self.policies.get_policy(entity_type);
        let ttl_ms = opts.ttl_ms.unwrap_or(policy.ttl_ms);
        let version = self
            .entries
            .get(&composite)
            .map(|prev| prev.version + 1)
            .unwrap_or(1);

        let mut entry = CacheEntry::new(composite.clone(), data, Some(ttl_ms), version);
        entry.tags.push(entity_type.to_string());
        entry.tags.extend(opts.tags);
        entry.dependencies = opts.dependencies;
        self.entries.insert(composite, entry);

        self.enforce_bucket_limit(entity_type);
        self.enforce_global_limit();
        self.stats.set_total_entries(self.entries.len());

        Ok(())
    }

    // == Get ==
    /// Retrieves a value by entity type and key.
    ///
    /// A missing key is a cache miss, not an error. Expired entries are
    /// removed on access (lazy expiry) and counted as misses. Hits update
    /// the entry's LRU/LFU bookkeeping.
    pub fn get(&mut self, entity_type: &str, key: &str) -> Option<T> {
        let composite = composite_key(entity_type, key);

        let expired = match self.entries.get(&composite) {
            Some(entry) => entry.is_expired(),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.entries.remove(&composite);
            self.stats.record_expiration();
            self.stats.record_miss();
            self.stats.set_total_entries(self.entries.len());
            return None;
        }

        let entry = self.entries.get_mut(&composite)?;
        entry.touch();
        self.stats.record_hit();
        Some(entry.data.clone())
    }

    // == Peek ==
    /// Read-only lookup without expiry handling or access bookkeeping.
    pub fn peek(&self, entity_type: &str, key: &str) -> Option<&CacheEntry<T>> {
        self.entries.get(&composite_key(entity_type, key))
    }

    // == Needs Refresh ==
    /// Stale-while-revalidate check for a live entry: true once the entry
    /// has consumed its policy's `refresh_threshold` share of the TTL.
    /// Expired or absent entries report false; they need a full fetch.
    pub fn needs_refresh(&self, entity_type: &str, key: &str) -> bool {
        match self.peek(entity_type, key) {
            Some(entry) if !entry.is_expired() => {
                let policy = self.policies.get_policy(entity_type);
                self.policies.should_refresh(entry, policy)
            }
            _ => false,
        }
    }

    // == Invalidate ==
    /// Removes all entries matched by the query. Returns the removal count.
    pub fn invalidate(&mut self, query: &CacheQuery) -> usize {
        let victims: Vec<String> = self
            .entries
            .values()
            .filter(|entry| query.matches(entry))
            .map(|entry| entry.key.clone())
            .collect();

        for key in &victims {
            self.entries.remove(key);
        }
        if !victims.is_empty() {
            debug!(count = victims.len(), "cache entries invalidated");
        }
        self.stats.set_total_entries(self.entries.len());
        victims.len()
    }

    // == Query ==
    /// Read-only variant of `invalidate`: returns matching entries.
    pub fn query(&self, query: &CacheQuery) -> Vec<&CacheEntry<T>> {
        self.entries
            .values()
            .filter(|entry| query.matches(entry))
            .collect()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in expired_keys {
            self.entries.remove(&key);
            self.stats.record_expiration();
        }
        self.stats.set_total_entries(self.entries.len());
        count
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Policies ==
    /// The policy registry (read access).
    pub fn policies(&self) -> &CachePolicyManager {
        &self.policies
    }

    /// The policy registry (mutable, for runtime overrides).
    pub fn policies_mut(&mut self) -> &mut CachePolicyManager {
        &mut self.policies
    }

    // == Length ==
    /// Returns the current number of entries across all buckets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Bucket Limit ==
    /// Trims one entity-type bucket to its policy's `max_size` using the
    /// policy's eviction strategy.
    fn enforce_bucket_limit(&mut self, entity_type: &str) {
        let policy = self.policies.get_policy(entity_type).clone();
        loop {
            let bucket: HashMap<String, CacheEntry<T>> = self
                .entries
                .iter()
                .filter(|(key, _)| entity_type_of(key) == entity_type)
                .map(|(key, entry)| (key.clone(), entry.clone()))
                .collect();
            if bucket.len() <= policy.max_size {
                break;
            }

            let ranked = policy.eviction_strategy.rank(&bucket);
            let Some(victim) = ranked.first() else { break };
            debug!(key = %victim, entity_type, "bucket eviction");
            self.entries.remove(victim);
            self.stats.record_eviction();
        }
    }

    // == Global Limit ==
    /// Trims the whole store to `global_max_entries`.
    ///
    /// Victims come from the lowest-priority buckets first; within that
    /// priority the largest bucket is drained by its own strategy. Ties on
    /// bucket size break by entity-type name so the order is deterministic.
    fn enforce_global_limit(&mut self) {
        while self.entries.len() > self.global_max_entries {
            let mut sizes: HashMap<String, usize> = HashMap::new();
            for key in self.entries.keys() {
                *sizes.entry(entity_type_of(key).to_string()).or_insert(0) += 1;
            }

            let mut lowest: Option<(PolicyPriority, usize, String)> = None;
            for (entity_type, size) in &sizes {
                let priority = self.policies.get_policy(entity_type).priority;
                let candidate = (priority, *size, entity_type.clone());
                lowest = Some(match lowest {
                    None => candidate,
                    Some(best) => {
                        let better = candidate.0 < best.0
                            || (candidate.0 == best.0 && candidate.1 > best.1)
                            || (candidate.0 == best.0
                                && candidate.1 == best.1
                                && candidate.2 < best.2);
                        if better {
                            candidate
                        } else {
                            best
                        }
                    }
                });
            }

            let Some((_, _, entity_type)) = lowest else { break };
            let policy = self.policies.get_policy(&entity_type).clone();
            let bucket: HashMap<String, CacheEntry<T>> = self
                .entries
                .iter()
                .filter(|(key, _)| entity_type_of(key) == entity_type)
                .map(|(key, entry)| (key.clone(), entry.clone()))
                .collect();
            let ranked = policy.eviction_strategy.rank(&bucket);
            let Some(victim) = ranked.first() else { break };
            debug!(key = %victim, "global-bound eviction");
            self.entries.remove(victim);
            self.stats.record_eviction();
        }
    }
}
