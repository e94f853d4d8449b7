//! Cache Policy Manager Module
//!
//! Registry mapping entity-type names to cache policies, with fallback to a
//! default policy and the stale-while-revalidate refresh check.

use std::collections::HashMap;

use tracing::debug;

use crate::cache::{current_timestamp_ms, CacheEntry};
use crate::policy::{CachePolicy, PolicyUpdate};

// == Cache Policy Manager ==
/// Registry of per-entity-type cache policies.
///
/// Lookup never fails: entity types without a registered policy get the
/// manager's default. The periodic expired-entry sweep that pairs with these
/// policies is owned by the application root (`tasks::spawn_cleanup_task`),
/// not by this registry, so constructing a manager has no side effects.
#[derive(Debug, Clone)]
pub struct CachePolicyManager {
    /// Registered per-entity-type overrides
    policies: HashMap<String, CachePolicy>,
    /// Fallback for unregistered entity types
    default_policy: CachePolicy,
}

impl CachePolicyManager {
    // == Constructor ==
    /// Creates a manager with the given fallback policy and no overrides.
    pub fn new(default_policy: CachePolicy) -> Self {
        Self {
            policies: HashMap::new(),
            default_policy,
        }
    }

    // == Get Policy ==
    /// Returns the policy registered for `entity_type`, or the default.
    pub fn get_policy(&self, entity_type: &str) -> &CachePolicy {
        self.policies
            .get(entity_type)
            .unwrap_or(&self.default_policy)
    }

    // == Update Policy ==
    /// Merges `update` into the policy for `entity_type`.
    ///
    /// If no policy is registered yet, one is seeded from the default with
    /// its `name` forced to the entity type.
    pub fn update_policy(&mut self, entity_type: &str, update: &PolicyUpdate) {
        let base = match self.policies.get(entity_type) {
            Some(existing) => existing.clone(),
            None => CachePolicy {
                name: entity_type.to_string(),
                ..self.default_policy.clone()
            },
        };
        let merged = base.merged(update);
        debug!(entity_type, ttl_ms = merged.ttl_ms, "policy updated");
        self.policies.insert(entity_type.to_string(), merged);
    }

    // == Register Policy ==
    /// Registers a complete policy for `entity_type`, replacing any override.
    pub fn register_policy(&mut self, entity_type: &str, policy: CachePolicy) {
        self.policies.insert(entity_type.to_string(), policy);
    }

    // == Remove Policy ==
    /// Drops the override for `entity_type`; later lookups fall back to the
    /// default. Returns the removed policy, if any.
    pub fn remove_policy(&mut self, entity_type: &str) -> Option<CachePolicy> {
        self.policies.remove(entity_type)
    }

    // == Should Refresh ==
    /// Stale-while-revalidate check: true once the entry has consumed at
    /// least `refresh_threshold` of its TTL.
    ///
    /// Monotonic in elapsed time: once due, an entry stays due until it is
    /// rewritten (which resets its timestamp). Hard expiry is separate and
    /// handled by `CacheEntry::is_expired`.
    pub fn should_refresh<T>(&self, entry: &CacheEntry<T>, policy: &CachePolicy) -> bool {
        if policy.ttl_ms == 0 {
            return true;
        }
        let elapsed = current_timestamp_ms().saturating_sub(entry.timestamp) as f64;
        elapsed / policy.ttl_ms as f64 >= policy.refresh_threshold
    }

    // == Registered Types ==
    /// Entity types with an explicit override.
    pub fn registered_types(&self) -> Vec<&str> {
        self.policies.keys().map(String::as_str).collect()
    }

    /// The fallback policy.
    pub fn default_policy(&self) -> &CachePolicy {
        &self.default_policy
    }
}

impl Default for CachePolicyManager {
    fn default() -> Self {
        Self::new(CachePolicy::default_policy())
    }
}
