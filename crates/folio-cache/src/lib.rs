//! Policy-free key/value cache.
//!
//! This crate provides the cache used by the Folio catalog:
//! - A [`Cache`] trait with `get`/`put`/`evict`/`clear`
//! - Conditional fills ([`Cache::ticket`] + [`Cache::fill`]) so a reader that
//!   raced with an invalidation cannot install a stale value
//! - [`MemoryCache`], a thread-safe in-process implementation
//! - [`NoCache`], used when caching is disabled
//!
//! The cache has no eviction policy and no TTL: entries live until a caller
//! removes them.
//!
//! # Example
//!
//! ```rust,ignore
//! use folio_cache::{Cache, MemoryCache};
//!
//! let cache = MemoryCache::new();
//! let ticket = cache.ticket().await?;
//! let value = load_from_store().await?;
//! cache.fill("key", value, ticket).await?;
//! ```

mod backend;
mod cache;
mod error;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::{Cache, FillTicket, NoCache};
pub use cache::{CacheStats, MemoryCache};
pub use error::{CacheError, Result};
