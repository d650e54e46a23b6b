use serde::{Deserialize, Serialize};

/// Configuration for savings aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsConfig {
    /// Seconds a per-device total stays cached; 0 disables caching
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    /// Seconds between sweeps of expired cache entries
    #[serde(default = "default_cache_cleanup_interval_seconds")]
    pub cache_cleanup_interval_seconds: u64,
    /// Length of the window used when a request omits its start date
    #[serde(default = "default_window_days")]
    pub default_window_days: u32,
    /// Largest number of chunks a series request may produce
    #[serde(default = "default_max_chunks")]
    pub max_chunks: u64,
}

fn default_cache_ttl_seconds() -> u64 {
    300
}

fn default_cache_cleanup_interval_seconds() -> u64 {
    600
}

fn default_window_days() -> u32 {
    30
}

fn default_max_chunks() -> u64 {
    10_000
}

impl Default for SavingsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: default_cache_ttl_seconds(),
            cache_cleanup_interval_seconds: default_cache_cleanup_interval_seconds(),
            default_window_days: default_window_days(),
            max_chunks: default_max_chunks(),
        }
    }
}
