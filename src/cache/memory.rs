use super::CacheStats;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// TTL entry wrapper for cached values
#[derive(Clone, Debug)]
struct TtlEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

impl<V> TtlEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { value, expires_at }
    }

    fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// In-memory key/value cache with a fixed time-to-live per entry.
///
/// Values are cloned out on read, so callers never hold a reference into the
/// map across an await point.
pub struct TtlCache<K, V> {
    entries: Arc<DashMap<K, TtlEntry<V>>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a live entry, dropping it if it has expired
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_if(key, |_| true)
    }

    /// Get a live entry that also satisfies `is_valid`.
    ///
    /// An entry that fails the check is removed and counted as a miss.
    pub fn get_if<F>(&self, key: &K, is_valid: F) -> Option<V>
    where
        F: FnOnce(&V) -> bool,
    {
        let value = self.entries.get(key).and_then(|entry| {
            if entry.is_expired() || !is_valid(&entry.value) {
                drop(entry);
                self.entries.remove(key);
                None
            } else {
                Some(entry.value.clone())
            }
        });

        match value {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        value
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, TtlEntry::new(value, self.ttl));
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.entries.len())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Periodically purge expired entries in the background
    pub fn start_cleanup_task(&self, interval: Duration) -> JoinHandle<()> {
        let entries = self.entries.clone();

        tokio::spawn(async move {
            loop {
                sleep(interval).await;
                entries.retain(|_, entry| !entry.is_expired());
            }
        })
    }
}
