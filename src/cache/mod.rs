//! Cache layer for derived values
//!
//! This module provides in-memory TTL caching for values that are expensive to
//! recompute on every request, such as whole-history savings totals.

pub mod memory;

pub use memory::TtlCache;

use serde::Serialize;

/// Point-in-time counters for a cache instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}
