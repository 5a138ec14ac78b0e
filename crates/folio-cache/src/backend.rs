//! The cache trait and the no-op backend.
//!
//! [`Cache`] keeps the cache decoupled from its backend. Callers that cache
//! values read from a slower source of truth use the ticket protocol:
//!
//! 1. take a [`FillTicket`] *before* reading the source,
//! 2. read the source,
//! 3. [`Cache::fill`] with the ticket.
//!
//! The fill is rejected if the same key was put, evicted or filled in
//! between, or the whole cache was cleared, so a value read before an
//! invalidation can never land after it. Mutations of other keys do not
//! affect the ticket.

use std::marker::PhantomData;

use async_trait::async_trait;

use crate::cache::CacheStats;
use crate::error::Result;

/// Snapshot of a cache's mutation clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FillTicket(u64);

impl FillTicket {
    pub fn new(epoch: u64) -> Self {
        Self(epoch)
    }

    pub fn epoch(&self) -> u64 {
        self.0
    }
}

/// Trait for cache backends.
///
/// Every operation must be safe to call concurrently. A `get` racing a
/// `put`/`evict` on the same key observes either the old or the new state.
#[async_trait]
pub trait Cache<K, V>: Send + Sync
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Look up a value.
    async fn get(&self, key: &K) -> Result<Option<V>>;

    /// Insert or overwrite a value unconditionally.
    async fn put(&self, key: K, value: V) -> Result<()>;

    /// Remove a value. Removing an absent key is not an error.
    async fn evict(&self, key: &K) -> Result<()>;

    /// Remove every value.
    async fn clear(&self) -> Result<()>;

    /// Take a ticket for a later [`Cache::fill`].
    async fn ticket(&self) -> Result<FillTicket>;

    /// Insert `value` only if `key` has not been mutated (and the cache not
    /// cleared) since `ticket` was issued. Returns whether the value was
    /// stored.
    async fn fill(&self, key: K, value: V, ticket: FillTicket) -> Result<bool>;

    /// Usage counters.
    fn stats(&self) -> CacheStats;
}

/// A cache that never stores anything.
///
/// Used when caching is switched off: every read misses and every fill is
/// rejected, so callers always go to the source of truth.
pub struct NoCache<K, V> {
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> NoCache<K, V> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<K, V> Default for NoCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> std::fmt::Debug for NoCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NoCache")
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for NoCache<K, V>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    async fn get(&self, _key: &K) -> Result<Option<V>> {
        Ok(None)
    }

    async fn put(&self, _key: K, _value: V) -> Result<()> {
        Ok(())
    }

    async fn evict(&self, _key: &K) -> Result<()> {
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    async fn ticket(&self) -> Result<FillTicket> {
        Ok(FillTicket::new(0))
    }

    async fn fill(&self, _key: K, _value: V, _ticket: FillTicket) -> Result<bool> {
        Ok(false)
    }

    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}
