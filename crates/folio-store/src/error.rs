//! Error types for backing store operations.

use thiserror::Error;

use crate::types::BookId;

/// Errors that can occur while talking to a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database connection or query failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The store could not serve the request right now.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The blocking worker running the query panicked or was cancelled.
    #[error("Store worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// A record was saved under an identifier this store never assigned.
    #[error("Identifier {0} was not assigned by this store")]
    ForeignId(BookId),

    /// Schema initialization failed.
    #[error("Migration error: {0}")]
    Migration(String),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
