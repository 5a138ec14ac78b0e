//! Book records and backing store adapters for Folio.
//!
//! This crate is the leaf of the workspace. It owns:
//! - The record model ([`Book`], [`BookId`], [`BookDraft`], [`BookUpdate`])
//! - Input validation for drafts and updates
//! - The [`BookStore`] trait that every backing store implements
//! - Two adapters: [`MemoryStore`] (small integer ids) and [`SqliteStore`]
//!   (UUID string ids)
//!
//! Stores have no caching logic of their own. Caching and retention live in
//! `folio-cache` and `folio-catalog`.
//!
//! # Example
//!
//! ```rust,ignore
//! use folio_store::{BookDraft, BookStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let book = store.insert(draft).await?;
//! assert!(store.find_by_id(&book.id).await?.is_some());
//! ```

mod error;
mod memory;
mod sqlite;
mod store;
mod types;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{BookStore, SharedStore};
pub use types::{Book, BookDraft, BookId, BookUpdate};
pub use validation::ValidationError;
