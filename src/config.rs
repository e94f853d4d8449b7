//! Configuration Module
//!
//! Handles loading and managing synchronization-layer configuration from
//! environment variables.

use std::env;

/// Synchronization layer configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Upper bound on cache entries across all entity types
    pub global_max_entries: usize,
    /// Default TTL in milliseconds for policies that do not override it
    pub default_ttl_ms: u64,
    /// Background expired-entry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Default retry budget for queued and optimistic mutations
    pub max_retries: u32,
    /// Default debounce window for related-data searches, in milliseconds
    pub debounce_ms: u64,
    /// Per-request HTTP timeout in seconds
    pub request_timeout: u64,
}

impl SyncConfig {
    /// Creates a new SyncConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `OFFSYNC_GLOBAL_MAX_ENTRIES` - Global cache entry bound (default: 1000)
    /// - `OFFSYNC_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `OFFSYNC_CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 1)
    /// - `OFFSYNC_MAX_RETRIES` - Mutation retry budget (default: 3)
    /// - `OFFSYNC_DEBOUNCE_MS` - Search debounce window (default: 300)
    /// - `OFFSYNC_REQUEST_TIMEOUT` - HTTP timeout in seconds (default: 30)
    pub fn from_env() -> Self {
        Self {
            global_max_entries: env::var("OFFSYNC_GLOBAL_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            default_ttl_ms: env::var("OFFSYNC_DEFAULT_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300_000),
            cleanup_interval: env::var("OFFSYNC_CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            max_retries: env::var("OFFSYNC_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            debounce_ms: env::var("OFFSYNC_DEBOUNCE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            request_timeout: env::var("OFFSYNC_REQUEST_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            global_max_entries: 1000,
            default_ttl_ms: 300_000,
            cleanup_interval: 1,
            max_retries: 3,
            debounce_ms: 300,
            request_timeout: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = SyncConfig::default();
        assert_eq!(config.global_max_entries, 1000);
        assert_eq!(config.default_ttl_ms, 300_000);
        assert_eq!(config.cleanup_interval, 1);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.request_timeout, 30);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("OFFSYNC_GLOBAL_MAX_ENTRIES");
        env::remove_var("OFFSYNC_DEFAULT_TTL_MS");
        env::remove_var("OFFSYNC_CLEANUP_INTERVAL");
        env::remove_var("OFFSYNC_MAX_RETRIES");
        env::remove_var("OFFSYNC_DEBOUNCE_MS");
        env::remove_var("OFFSYNC_REQUEST_TIMEOUT");

        let config = SyncConfig::from_env();
        assert_eq!(config.global_max_entries, 1000);
        assert_eq!(config.default_ttl_ms, 300_000);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.debounce_ms, 300);
    }
}
