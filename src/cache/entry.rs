//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support and
//! the access metadata the eviction strategies rank on.

use std::time::{SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A single cache entry with payload and bookkeeping metadata.
///
/// `expires_at` is derived from `timestamp + ttl` once, at write time. An
/// overwrite of the same key produces a fresh entry with a new timestamp and
/// a bumped `version`; expiry is never patched in place.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// Composite key this entry is stored under
    pub key: String,
    /// The cached payload
    pub data: T,
    /// Write timestamp (Unix milliseconds)
    pub timestamp: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
    /// Monotonically increasing per-key write counter
    pub version: u64,
    /// Last read timestamp (Unix milliseconds), used by LRU ranking
    pub last_accessed: u64,
    /// Number of reads, used by LFU ranking
    pub access_count: u64,
    /// Free-form tags for group invalidation (typically the entity type)
    pub tags: Vec<String>,
    /// Keys of entries this one is derived from, for dependency invalidation
    pub dependencies: Vec<String>,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    ///
    /// # Arguments
    /// * `key` - Composite key the entry is stored under
    /// * `data` - The payload to store
    /// * `ttl_ms` - Optional TTL in milliseconds
    /// * `version` - Per-key write counter (1 for a fresh key)
    pub fn new(key: String, data: T, ttl_ms: Option<u64>, version: u64) -> Self {
        let now = current_timestamp_ms();
        let expires_at = ttl_ms.map(|ttl| now + ttl);

        Self {
            key,
            data,
            timestamp: now,
            expires_at,
            version,
            last_accessed: now,
            access_count: 0,
            tags: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the current time is
    /// greater than or equal to the expiration time.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Touch ==
    /// Records a read: refreshes `last_accessed` and bumps `access_count`.
    pub fn touch(&mut self) {
        self.last_accessed = current_timestamp_ms();
        self.access_count += 1;
    }

    // == Age ==
    /// Milliseconds elapsed since the entry was written.
    pub fn age_ms(&self) -> u64 {
        current_timestamp_ms().saturating_sub(self.timestamp)
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the entry has expired (TTL elapsed)
    /// - `Some(remaining_ms)` if the entry has TTL and hasn't expired
    /// - `None` if the entry has no TTL (never expires)
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at.map(|expires| {
            let now = current_timestamp_ms();
            expires.saturating_sub(now)
        })
    }

    // == Has Tag ==
    /// Checks whether the entry carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    // == Depends On ==
    /// Checks whether the entry lists the given key as a dependency.
    pub fn depends_on(&self, key: &str) -> bool {
        self.dependencies.iter().any(|d| d == key)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
