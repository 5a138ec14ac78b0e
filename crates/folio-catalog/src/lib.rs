//! Cache-consistent book catalog with a background retention sweeper.
//!
//! The catalog is the only way records are read or written:
//!
//! ```text
//!  callers ──► CatalogService ──► { Cache, BookStore }
//!                   ▲
//!  RetentionSweeper ┘  (scan store, delete through the catalog)
//! ```
//!
//! - [`CatalogService`] serves reads cache-aside and writes store-first,
//!   then refreshes or invalidates the cache.
//! - [`RetentionSweeper`] periodically deletes records published before the
//!   retention cutoff, always through [`CatalogService::delete`] so the cache
//!   is invalidated the same way as for a manual delete.

mod catalog;
mod clock;
mod error;
mod keys;
pub mod sweeper;

pub use catalog::CatalogService;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CatalogError, Result};
pub use keys::{BookCache, CacheKey, CachedValue};
pub use sweeper::{
    RetentionSweeper, SweepOutcome, SweepReport, SweepState, SweeperConfig, SweeperHandle,
};

// Re-exported so callers don't need direct dependencies for the common types.
pub use folio_cache::{CacheStats, MemoryCache, NoCache};
pub use folio_store::{Book, BookDraft, BookId, BookStore, BookUpdate, SharedStore};
