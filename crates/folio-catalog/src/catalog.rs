//! The catalog service: cache-aside reads, store-first writes.
//!
//! Every write goes to the store first. Only once the store has answered is
//! the cache touched, so a failure between the two steps can leave the cache
//! missing data but never claiming data the store does not have.
//!
//! Cache fills use the ticket protocol from `folio-cache`: a ticket is taken
//! before the store call and the fill is rejected if the same key was
//! invalidated in between. A rejected write-through falls back to evicting the key, so
//! concurrent writers converge on "cache holds the last store write, or
//! nothing".

use std::sync::Arc;

use folio_cache::{CacheStats, FillTicket, MemoryCache, NoCache};
use folio_store::validation::{validate_draft, validate_update};
use folio_store::{Book, BookDraft, BookId, BookUpdate, SharedStore};
use tracing::{debug, error, info, trace, warn};

use crate::error::{CatalogError, Result};
use crate::keys::{BookCache, CacheKey, CachedValue};

/// Orchestrates the backing store and the cache.
///
/// Cheap to share: wrap in `Arc` and call from as many tasks as needed. No
/// lock is held across a store or cache call.
pub struct CatalogService {
    store: SharedStore,
    cache: Arc<BookCache>,
}

impl CatalogService {
    /// Create a catalog over the given store and cache.
    pub fn new(store: SharedStore, cache: Arc<BookCache>) -> Self {
        Self { store, cache }
    }

    /// Create a catalog with an in-process [`MemoryCache`].
    pub fn with_memory_cache(store: SharedStore) -> Self {
        Self::new(store, Arc::new(MemoryCache::<CacheKey, CachedValue>::new()))
    }

    /// Create a catalog that always reads from the store.
    pub fn uncached(store: SharedStore) -> Self {
        Self::new(store, Arc::new(NoCache::<CacheKey, CachedValue>::new()))
    }

    /// The backing store.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Cache usage counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// List every record, serving the cached snapshot when there is one.
    pub async fn list_all(&self) -> Result<Arc<Vec<Book>>> {
        if let Some(CachedValue::Collection(books)) = self.lookup(&CacheKey::AllRecords).await {
            trace!(count = books.len(), "Book listing served from cache");
            return Ok(books);
        }

        let ticket = self.ticket().await;
        let books = Arc::new(self.store.find_all().await?);
        debug!(count = books.len(), "Book listing loaded from store");

        self.populate(
            CacheKey::AllRecords,
            CachedValue::Collection(Arc::clone(&books)),
            ticket,
        )
        .await;
        Ok(books)
    }

    /// Fetch one record.
    pub async fn get_by_id(&self, id: &BookId) -> Result<Book> {
        let key = CacheKey::Record(id.clone());
        if let Some(CachedValue::Record(book)) = self.lookup(&key).await {
            trace!(book_id = %id, "Book served from cache");
            return Ok(book);
        }

        let ticket = self.ticket().await;
        let book = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;
        debug!(book_id = %id, "Book loaded from store");

        self.populate(key, CachedValue::Record(book.clone()), ticket)
            .await;
        Ok(book)
    }

    /// Read every record straight from the store, bypassing the cache.
    pub async fn store_snapshot(&self) -> Result<Vec<Book>> {
        Ok(self.store.find_all().await?)
    }

    // ── Writes ──────────────────────────────────────────────────────

    /// Store a new record and cache it.
    pub async fn create(&self, draft: BookDraft) -> Result<Book> {
        validate_draft(&draft)?;

        let ticket = self.ticket().await;
        let book = self.store.insert(draft).await?;

        self.write_through(
            CacheKey::Record(book.id.clone()),
            CachedValue::Record(book.clone()),
            ticket,
        )
        .await;
        self.invalidate(&CacheKey::AllRecords).await;

        info!(book_id = %book.id, title = %book.title, "Book created");
        Ok(book)
    }

    /// Merge `update` onto an existing record and store it.
    pub async fn update(&self, id: &BookId, update: BookUpdate) -> Result<Book> {
        validate_update(&update)?;

        let ticket = self.ticket().await;
        let existing = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;
        let saved = self.store.save(update.apply(existing)).await?;

        self.write_through(
            CacheKey::Record(id.clone()),
            CachedValue::Record(saved.clone()),
            ticket,
        )
        .await;
        self.invalidate(&CacheKey::AllRecords).await;

        info!(book_id = %id, "Book updated");
        Ok(saved)
    }

    /// Delete a record. Returns whether the store had it.
    ///
    /// Deleting an unknown id is not an error; the cache entry for it is
    /// evicted anyway in case it was stale.
    pub async fn delete(&self, id: &BookId) -> Result<bool> {
        let deleted = self.store.delete_by_id(id).await?;

        self.invalidate(&CacheKey::Record(id.clone())).await;
        self.invalidate(&CacheKey::AllRecords).await;

        if deleted {
            info!(book_id = %id, "Book deleted");
        } else {
            debug!(book_id = %id, "Delete found nothing in store, cache entry evicted");
        }
        Ok(deleted)
    }

    // ── Cache plumbing ──────────────────────────────────────────────
    //
    // Cache errors are logged and swallowed here: a request that succeeded
    // against the store must not fail because of the cache.

    async fn lookup(&self, key: &CacheKey) -> Option<CachedValue> {
        match self.cache.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, falling back to store");
                None
            }
        }
    }

    async fn ticket(&self) -> Option<FillTicket> {
        match self.cache.ticket().await {
            Ok(ticket) => Some(ticket),
            Err(e) => {
                warn!(error = %e, "Cache ticket unavailable, result will not be cached");
                None
            }
        }
    }

    /// Cache a value read from the store, unless something invalidated the
    /// cache while we were reading.
    async fn populate(&self, key: CacheKey, value: CachedValue, ticket: Option<FillTicket>) {
        let Some(ticket) = ticket else {
            return;
        };
        let label = key.to_string();
        match self.cache.fill(key, value, ticket).await {
            Ok(true) => trace!(key = %label, "Cache populated"),
            Ok(false) => debug!(key = %label, "Cache fill skipped, concurrent write in flight"),
            Err(e) => warn!(key = %label, error = %e, "Cache fill failed"),
        }
    }

    /// Refresh the cache with a value just written to the store, or evict
    /// the key if the refresh cannot be done safely.
    async fn write_through(&self, key: CacheKey, value: CachedValue, ticket: Option<FillTicket>) {
        let stored = match ticket {
            Some(ticket) => match self.cache.fill(key.clone(), value, ticket).await {
                Ok(stored) => stored,
                Err(e) => {
                    warn!(key = %key, error = %e, "Cache write failed");
                    false
                }
            },
            None => false,
        };

        if !stored {
            debug!(key = %key, "Write-through not applied, evicting instead");
            self.invalidate(&key).await;
        }
    }

    async fn invalidate(&self, key: &CacheKey) {
        let Err(e) = self.cache.evict(key).await else {
            return;
        };
        warn!(key = %key, error = %e, "Cache evict failed, clearing cache");
        if let Err(e) = self.cache.clear().await {
            error!(
                key = %key,
                error = %e,
                "Cache clear failed, entry may be stale until the cache recovers"
            );
        }
    }
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("store", &self.store.name())
            .field("cache", &self.cache.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use folio_store::MemoryStore;

    fn draft(title: &str) -> BookDraft {
        BookDraft::new(
            title,
            "Test Author",
            "123-1234567890",
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        )
    }

    fn catalog() -> CatalogService {
        CatalogService::with_memory_cache(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let catalog = catalog();
        let created = catalog.create(draft("New Book")).await.unwrap();

        let fetched = catalog.get_by_id(&created.id).await.unwrap();
        assert_eq!(fetched.title, "New Book");

        // The write-through entry answered the read
        assert_eq!(catalog.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let catalog = catalog();
        let err = catalog.get_by_id(&BookId::new("42")).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(catalog.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let catalog = catalog();
        let err = catalog.create(draft("  ")).await.unwrap_err();

        assert!(matches!(err, CatalogError::InvalidInput(_)));
        assert!(catalog.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let catalog = catalog();
        let err = catalog
            .update(&BookId::new("7"), BookUpdate::new().with_title("x"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_overwrites_cached_record() {
        let catalog = catalog();
        let book = catalog.create(draft("Before")).await.unwrap();
        catalog.get_by_id(&book.id).await.unwrap();

        catalog
            .update(&book.id, BookUpdate::new().with_title("After"))
            .await
            .unwrap();

        let fetched = catalog.get_by_id(&book.id).await.unwrap();
        assert_eq!(fetched.title, "After");
        assert_eq!(fetched.id, book.id);
    }

    #[tokio::test]
    async fn test_uncached_catalog_still_works() {
        let catalog = CatalogService::uncached(Arc::new(MemoryStore::new()));
        let book = catalog.create(draft("Plain")).await.unwrap();

        assert_eq!(catalog.get_by_id(&book.id).await.unwrap(), book);
        assert_eq!(catalog.list_all().await.unwrap().len(), 1);
        assert!(catalog.delete(&book.id).await.unwrap());
        assert!(catalog.get_by_id(&book.id).await.unwrap_err().is_not_found());
    }
}
