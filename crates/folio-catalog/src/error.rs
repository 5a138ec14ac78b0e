//! Error types for catalog operations.

use folio_store::{BookId, StoreError, ValidationError};
use thiserror::Error;

/// Errors surfaced to catalog callers.
///
/// Cache failures never appear here: they are logged and the operation
/// carries on against the store.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The store has no record with this id.
    #[error("Book not found: {0}")]
    NotFound(BookId),

    /// The input record is malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// The backing store call failed.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl CatalogError {
    /// HTTP status an outer layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            CatalogError::NotFound(_) => 404,
            CatalogError::InvalidInput(_) => 400,
            CatalogError::StoreUnavailable(_) => 503,
        }
    }

    /// True for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound(_))
    }
}

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(CatalogError::NotFound(BookId::new("1")).status_code(), 404);
        assert_eq!(
            CatalogError::from(ValidationError::EmptyField("title")).status_code(),
            400
        );
        assert_eq!(
            CatalogError::from(StoreError::Unavailable("down".into())).status_code(),
            503
        );
    }
}
