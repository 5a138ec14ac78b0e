//! In-process cache.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use crate::backend::{Cache, FillTicket};
use crate::error::Result;

/// Upper bound on remembered per-key stamps before they are folded into
/// the floor.
const MAX_STAMPS: usize = 4096;

/// Inner state protected by RwLock.
struct CacheInner<K, V> {
    /// Cached values.
    entries: HashMap<K, V>,

    /// Logical clock, advanced by every mutation. Tickets snapshot it.
    clock: u64,

    /// Clock value of the last mutation of each key.
    stamps: HashMap<K, u64>,

    /// Every key counts as mutated at this clock value. Raised by `clear`
    /// and when `stamps` is folded.
    floor: u64,
}

impl<K: Eq + Hash, V> CacheInner<K, V> {
    /// Record a mutation of `key`.
    fn touch(&mut self, key: K) {
        self.clock += 1;
        if self.stamps.len() >= MAX_STAMPS {
            self.stamps.clear();
            self.floor = self.clock;
        }
        self.stamps.insert(key, self.clock);
    }

    /// Last mutation of `key`, as seen by a ticket.
    fn last_mutation(&self, key: &K) -> u64 {
        self.stamps
            .get(key)
            .copied()
            .unwrap_or(0)
            .max(self.floor)
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    fills: AtomicU64,
    rejected_fills: AtomicU64,
    evictions: AtomicU64,
}

/// Thread-safe in-memory key/value cache.
///
/// Values are cloned in and out under a `parking_lot` lock that is never held
/// across an await point, so readers always see whole values. Wrap large
/// values in `Arc` to keep clones cheap.
pub struct MemoryCache<K, V> {
    inner: RwLock<CacheInner<K, V>>,
    counters: Counters,
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                entries: HashMap::new(),
                clock: 0,
                stamps: HashMap::new(),
                floor: 0,
            }),
            counters: Counters::default(),
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Check whether a key is cached, without counting a hit or miss.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.read().entries.contains_key(key)
    }
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> std::fmt::Debug for MemoryCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MemoryCache")
            .field("entries", &inner.entries.len())
            .field("clock", &inner.clock)
            .finish()
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Result<Option<V>> {
        let value = self.inner.read().entries.get(key).cloned();
        let counter = if value.is_some() {
            &self.counters.hits
        } else {
            &self.counters.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(value)
    }

    async fn put(&self, key: K, value: V) -> Result<()> {
        let mut inner = self.inner.write();
        inner.touch(key.clone());
        inner.entries.insert(key, value);
        Ok(())
    }

    async fn evict(&self, key: &K) -> Result<()> {
        let mut inner = self.inner.write();
        // Stamp even when absent: a reader holding an older ticket may be
        // about to fill this key with a value that no longer exists.
        inner.touch(key.clone());
        if inner.entries.remove(key).is_some() {
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write();
        let count = inner.entries.len() as u64;
        inner.entries.clear();
        inner.stamps.clear();
        inner.clock += 1;
        inner.floor = inner.clock;
        self.counters.evictions.fetch_add(count, Ordering::Relaxed);
        trace!(count, "Cache cleared");
        Ok(())
    }

    async fn ticket(&self) -> Result<FillTicket> {
        Ok(FillTicket::new(self.inner.read().clock))
    }

    async fn fill(&self, key: K, value: V, ticket: FillTicket) -> Result<bool> {
        let mut inner = self.inner.write();
        let last = inner.last_mutation(&key);
        if last > ticket.epoch() {
            self.counters.rejected_fills.fetch_add(1, Ordering::Relaxed);
            trace!(
                ticket = ticket.epoch(),
                last_mutation = last,
                "Fill rejected, key mutated since ticket"
            );
            return Ok(false);
        }
        inner.touch(key.clone());
        inner.entries.insert(key, value);
        self.counters.fills.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.inner.read().entries.len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            fills: self.counters.fills.load(Ordering::Relaxed),
            rejected_fills: self.counters.rejected_fills.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of cached entries.
    pub entries: usize,

    /// Lookups that found a value.
    pub hits: u64,

    /// Lookups that found nothing.
    pub misses: u64,

    /// Conditional fills that were stored.
    pub fills: u64,

    /// Conditional fills rejected because of an intervening mutation.
    pub rejected_fills: u64,

    /// Entries removed by `evict` or `clear`.
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit, or `None` before the first lookup.
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.hits + self.misses;
        if total == 0 {
            None
        } else {
            Some(self.hits as f64 / total as f64)
        }
    }
}
