//! The backing store trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Book, BookDraft, BookId};

/// Durable record storage.
///
/// Implement this trait to plug a storage engine under the catalog. Stores
/// must be safe to call from many tasks at once; whatever consistency they
/// offer for concurrent calls is inherited by the catalog as-is.
///
/// Stores do no caching.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Return every stored record.
    async fn find_all(&self) -> Result<Vec<Book>>;

    /// Look up a record. Returns `Ok(None)` if the id is unknown.
    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>>;

    /// Store a new record, assigning its identifier.
    async fn insert(&self, draft: BookDraft) -> Result<Book>;

    /// Store a record under its existing identifier (insert or replace).
    async fn save(&self, book: Book) -> Result<Book>;

    /// Delete a record. Returns `true` if something was deleted.
    async fn delete_by_id(&self, id: &BookId) -> Result<bool>;

    /// Delete the given record. Returns `true` if something was deleted.
    async fn delete(&self, book: &Book) -> Result<bool> {
        self.delete_by_id(&book.id).await
    }

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// A store shared between the catalog and its background tasks.
pub type SharedStore = Arc<dyn BookStore>;
