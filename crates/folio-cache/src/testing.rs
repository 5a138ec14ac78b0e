//! Cache doubles for tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use crate::backend::{Cache, FillTicket};
use crate::cache::{CacheStats, MemoryCache};
use crate::error::{CacheError, Result};

/// A [`MemoryCache`] that can be switched into a failing mode.
///
/// While failing, every operation returns [`CacheError::Unavailable`] and
/// leaves the underlying entries untouched.
pub struct FailingCache<K, V> {
    inner: MemoryCache<K, V>,
    failing: AtomicBool,
    failures: AtomicU64,
}

impl<K, V> FailingCache<K, V>
where
    K: Eq + std::hash::Hash,
{
    /// Create a cache that starts out failing.
    pub fn new() -> Self {
        Self {
            inner: MemoryCache::new(),
            failing: AtomicBool::new(true),
            failures: AtomicU64::new(0),
        }
    }

    /// Turn failures on or off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of operations that failed.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Borrow the underlying cache.
    pub fn inner(&self) -> &MemoryCache<K, V> {
        &self.inner
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(CacheError::Unavailable("injected cache failure".to_string()));
        }
        Ok(())
    }
}

impl<K, V> Default for FailingCache<K, V>
where
    K: Eq + std::hash::Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for FailingCache<K, V>
where
    K: Eq + std::hash::Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Result<Option<V>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn put(&self, key: K, value: V) -> Result<()> {
        self.check()?;
        self.inner.put(key, value).await
    }

    async fn evict(&self, key: &K) -> Result<()> {
        self.check()?;
        self.inner.evict(key).await
    }

    async fn clear(&self) -> Result<()> {
        self.check()?;
        self.inner.clear().await
    }

    async fn ticket(&self) -> Result<FillTicket> {
        self.check()?;
        self.inner.ticket().await
    }

    async fn fill(&self, key: K, value: V, ticket: FillTicket) -> Result<bool> {
        self.check()?;
        self.inner.fill(key, value, ticket).await
    }

    fn stats(&self) -> CacheStats {
        self.inner.stats()
    }
}
