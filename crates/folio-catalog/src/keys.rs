//! Cache keys and values used by the catalog.

use std::fmt;
use std::sync::Arc;

use folio_cache::Cache;
use folio_store::{Book, BookId};

/// Key of a catalog cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A single record.
    Record(BookId),
    /// The snapshot returned by `list_all`.
    AllRecords,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Record(id) => write!(f, "book:{id}"),
            CacheKey::AllRecords => f.write_str("books:all"),
        }
    }
}

/// Value of a catalog cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    Record(Book),
    Collection(Arc<Vec<Book>>),
}

/// The cache type the catalog talks to.
pub type BookCache = dyn Cache<CacheKey, CachedValue>;
