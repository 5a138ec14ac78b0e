//! In-memory store keyed by small integers.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use crate::error::{Result, StoreError};
use crate::store::BookStore;
use crate::types::{Book, BookDraft, BookId};

#[derive(Debug, Default)]
struct MemoryInner {
    books: BTreeMap<u64, Book>,
    next_id: u64,
}

/// Volatile store that assigns sequential integer ids (`"1"`, `"2"`, ...).
///
/// Records are returned in id order. Ids are never reused, even after the
/// record holding them is deleted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.read().books.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().books.is_empty()
    }
}

/// Ids this store did not hand out simply do not exist in it.
fn parse_key(id: &BookId) -> Option<u64> {
    id.as_str().parse().ok()
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn find_all(&self) -> Result<Vec<Book>> {
        Ok(self.inner.read().books.values().cloned().collect())
    }

    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>> {
        let Some(key) = parse_key(id) else {
            return Ok(None);
        };
        Ok(self.inner.read().books.get(&key).cloned())
    }

    async fn insert(&self, draft: BookDraft) -> Result<Book> {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let key = inner.next_id;

        let book = Book::from_draft(BookId::from(key), draft);
        inner.books.insert(key, book.clone());

        trace!(book_id = %book.id, "Inserted book into memory store");
        Ok(book)
    }

    async fn save(&self, book: Book) -> Result<Book> {
        let mut inner = self.inner.write();
        let key = match parse_key(&book.id) {
            Some(key) if key <= inner.next_id => key,
            _ => return Err(StoreError::ForeignId(book.id)),
        };
        inner.books.insert(key, book.clone());
        Ok(book)
    }

    async fn delete_by_id(&self, id: &BookId) -> Result<bool> {
        let Some(key) = parse_key(id) else {
            return Ok(false);
        };
        Ok(self.inner.write().books.remove(&key).is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn draft(title: &str) -> BookDraft {
        BookDraft::new(
            title,
            "Author",
            "1234567890",
            NaiveDate::from_ymd_opt(2020, 5, 1).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = store.insert(draft("a")).await.unwrap();
        let b = store.insert(draft("b")).await.unwrap();

        assert_eq!(a.id, BookId::new("1"));
        assert_eq!(b.id, BookId::new("2"));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let store = MemoryStore::new();
        let a = store.insert(draft("a")).await.unwrap();
        assert!(store.delete_by_id(&a.id).await.unwrap());

        let b = store.insert(draft("b")).await.unwrap();
        assert_eq!(b.id, BookId::new("2"));
    }

    #[tokio::test]
    async fn test_find_and_delete() {
        let store = MemoryStore::new();
        let book = store.insert(draft("a")).await.unwrap();

        assert_eq!(store.find_by_id(&book.id).await.unwrap(), Some(book.clone()));
        assert!(store.delete(&book).await.unwrap());
        assert!(!store.delete_by_id(&book.id).await.unwrap());
        assert_eq!(store.find_by_id(&book.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_foreign_ids() {
        let store = MemoryStore::new();
        let foreign = BookId::new("not-a-number");

        assert_eq!(store.find_by_id(&foreign).await.unwrap(), None);
        assert!(!store.delete_by_id(&foreign).await.unwrap());

        let book = Book::from_draft(BookId::new("99"), draft("x"));
        assert!(matches!(
            store.save(book).await,
            Err(StoreError::ForeignId(_))
        ));
    }

    #[tokio::test]
    async fn test_save_replaces_fields() {
        let store = MemoryStore::new();
        let mut book = store.insert(draft("a")).await.unwrap();
        book.title = "renamed".to_string();
        store.save(book.clone()).await.unwrap();

        let all = store.find_all().await.unwrap();
        assert_eq!(all, vec![book]);
    }
}
