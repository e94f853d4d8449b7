//! Cache Policy Module
//!
//! Per-entity-type cache configuration records and the factory presets the
//! application registers at startup.

use serde::{Deserialize, Serialize};

use crate::cache::EvictionStrategy;

// == Policy Priority ==
/// Relative importance of a policy's bucket when the global bound is hit.
///
/// Ordering matters: `Low < Medium < High`, and eviction under global
/// pressure drains lower-priority buckets first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyPriority {
    Low,
    Medium,
    High,
}

// == Cache Policy ==
/// Per-entity-type cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// Policy name; for registered policies this is the entity type
    pub name: String,
    /// Time-to-live for entries in this bucket, in milliseconds
    pub ttl_ms: u64,
    /// Maximum number of entries in this bucket
    pub max_size: usize,
    /// Rule used to pick eviction victims within this bucket
    pub eviction_strategy: EvictionStrategy,
    /// Fraction of the TTL after which a background refresh is due, in [0, 1]
    pub refresh_threshold: f64,
    /// Bucket priority under the global size bound
    pub priority: PolicyPriority,
    /// Whether payloads in this bucket should be stored compressed
    pub compression_enabled: bool,
    /// Whether this bucket should survive a restart when the host binds storage
    pub persistence_enabled: bool,
}

impl CachePolicy {
    // == Default Preset ==
    /// Baseline policy: five-minute TTL, LRU, medium priority.
    pub fn default_policy() -> Self {
        Self {
            name: "default".to_string(),
            ttl_ms: 300_000,
            max_size: 500,
            eviction_strategy: EvictionStrategy::Lru,
            refresh_threshold: 0.8,
            priority: PolicyPriority::Medium,
            compression_enabled: false,
            persistence_enabled: false,
        }
    }

    // == High Priority Preset ==
    /// Long-lived, generously sized bucket for hot reference data.
    pub fn high_priority() -> Self {
        Self {
            name: "high-priority".to_string(),
            ttl_ms: 600_000,
            max_size: 1000,
            eviction_strategy: EvictionStrategy::Lru,
            refresh_threshold: 0.7,
            priority: PolicyPriority::High,
            compression_enabled: false,
            persistence_enabled: false,
        }
    }

    // == Low Priority Preset ==
    /// Short-lived bucket for cheap, easily refetched data.
    pub fn low_priority() -> Self {
        Self {
            name: "low-priority".to_string(),
            ttl_ms: 60_000,
            max_size: 100,
            eviction_strategy: EvictionStrategy::Fifo,
            refresh_threshold: 0.9,
            priority: PolicyPriority::Low,
            compression_enabled: false,
            persistence_enabled: false,
        }
    }

    // == Session Preset ==
    /// Session-scoped data: long TTL, persisted when the host supports it.
    pub fn session() -> Self {
        Self {
            name: "session".to_string(),
            ttl_ms: 1_800_000,
            max_size: 50,
            eviction_strategy: EvictionStrategy::Lru,
            refresh_threshold: 0.5,
            priority: PolicyPriority::High,
            compression_enabled: false,
            persistence_enabled: true,
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::default_policy()
    }
}

// == Policy Update ==
/// Partial policy: fields left `None` keep their current value on merge.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyUpdate {
    pub ttl_ms: Option<u64>,
    pub max_size: Option<usize>,
    pub eviction_strategy: Option<EvictionStrategy>,
    pub refresh_threshold: Option<f64>,
    pub priority: Option<PolicyPriority>,
    pub compression_enabled: Option<bool>,
    pub persistence_enabled: Option<bool>,
}

impl CachePolicy {
    // == Merge ==
    /// Applies a partial update, returning the merged policy.
    pub fn merged(&self, update: &PolicyUpdate) -> Self {
        Self {
            name: self.name.clone(),
            ttl_ms: update.ttl_ms.unwrap_or(self.ttl_ms),
            max_size: update.max_size.unwrap_or(self.max_size),
            eviction_strategy: update.eviction_strategy.unwrap_or(self.eviction_strategy),
            refresh_threshold: update.refresh_threshold.unwrap_or(self.refresh_threshold),
            priority: update.priority.unwrap_or(self.priority),
            compression_enabled: update
                .compression_enabled
                .unwrap_or(self.compression_enabled),
            persistence_enabled: update
                .persistence_enabled
                .unwrap_or(self.persistence_enabled),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(PolicyPriority::Low < PolicyPriority::Medium);
        assert!(PolicyPriority::Medium < PolicyPriority::High);
    }

    #[test]
    fn test_presets_are_distinct() {
        assert!(CachePolicy::high_priority().ttl_ms > CachePolicy::default_policy().ttl_ms);
        assert!(CachePolicy::low_priority().max_size < CachePolicy::default_policy().max_size);
        assert!(CachePolicy::session().persistence_enabled);
    }

    #[test]
    fn test_merged_keeps_unset_fields() {
        let base = CachePolicy::default_policy();
        let update = PolicyUpdate {
            ttl_ms: Some(1000),
            ..Default::default()
        };

        let merged = base.merged(&update);
        assert_eq!(merged.ttl_ms, 1000);
        assert_eq!(merged.max_size, base.max_size);
        assert_eq!(merged.eviction_strategy, base.eviction_strategy);
        assert_eq!(merged.name, base.name);
    }

    #[test]
    fn test_merged_overrides_all_set_fields() {
        let base = CachePolicy::default_policy();
        let update = PolicyUpdate {
            ttl_ms: Some(1),
            max_size: Some(2),
            eviction_strategy: Some(crate::cache::EvictionStrategy::Random),
            refresh_threshold: Some(0.1),
            priority: Some(PolicyPriority::Low),
            compression_enabled: Some(true),
            persistence_enabled: Some(true),
        };

        let merged = base.merged(&update);
        assert_eq!(merged.ttl_ms, 1);
        assert_eq!(merged.max_size, 2);
        assert_eq!(merged.refresh_threshold, 0.1);
        assert_eq!(merged.priority, PolicyPriority::Low);
        assert!(merged.compression_enabled);
        assert!(merged.persistence_enabled);
    }
}
