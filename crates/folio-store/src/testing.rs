//! Store wrappers for tests.
//!
//! - [`CountingStore`] counts calls per operation, can add latency, and can
//!   park `find_by_id` between reading and returning (to stage races).
//! - [`FlakyStore`] injects `Unavailable` failures on demand.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::{Result, StoreError};
use crate::store::BookStore;
use crate::types::{Book, BookDraft, BookId};

/// Snapshot of per-operation call counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub find_all: usize,
    pub find_by_id: usize,
    pub insert: usize,
    pub save: usize,
    pub delete_by_id: usize,
}

impl StoreCalls {
    /// Total number of calls across all operations.
    pub fn total(&self) -> usize {
        self.find_all + self.find_by_id + self.insert + self.save + self.delete_by_id
    }
}

#[derive(Debug, Default)]
struct Counters {
    find_all: AtomicUsize,
    find_by_id: AtomicUsize,
    insert: AtomicUsize,
    save: AtomicUsize,
    delete_by_id: AtomicUsize,
}

/// Pauses a `find_by_id` after it has read from the inner store.
///
/// The store signals `reached` once the read is done, then waits for
/// `release` before returning the (possibly stale) result.
#[derive(Debug, Clone, Default)]
pub struct ReadGate {
    pub reached: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl ReadGate {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Wraps a store and counts every call made through it.
pub struct CountingStore<S> {
    inner: S,
    counters: Counters,
    latency: Option<Duration>,
    read_gate: Mutex<Option<ReadGate>>,
}

impl<S: BookStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            counters: Counters::default(),
            latency: None,
            read_gate: Mutex::new(None),
        }
    }

    /// Sleep this long before every `find_all` and `delete_by_id`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Park the next `find_by_id` on the given gate.
    pub fn gate_next_read(&self, gate: ReadGate) {
        *self.read_gate.lock() = Some(gate);
    }

    /// Current call counts.
    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            find_all: self.counters.find_all.load(Ordering::SeqCst),
            find_by_id: self.counters.find_by_id.load(Ordering::SeqCst),
            insert: self.counters.insert.load(Ordering::SeqCst),
            save: self.counters.save.load(Ordering::SeqCst),
            delete_by_id: self.counters.delete_by_id.load(Ordering::SeqCst),
        }
    }

    /// Borrow the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl<S: BookStore> BookStore for CountingStore<S> {
    async fn find_all(&self) -> Result<Vec<Book>> {
        self.counters.find_all.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.inner.find_all().await
    }

    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>> {
        self.counters.find_by_id.fetch_add(1, Ordering::SeqCst);
        let found = self.inner.find_by_id(id).await;

        let gate = self.read_gate.lock().take();
        if let Some(gate) = gate {
            gate.reached.notify_one();
            gate.release.notified().await;
        }
        found
    }

    async fn insert(&self, draft: BookDraft) -> Result<Book> {
        self.counters.insert.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(draft).await
    }

    async fn save(&self, book: Book) -> Result<Book> {
        self.counters.save.fetch_add(1, Ordering::SeqCst);
        self.inner.save(book).await
    }

    async fn delete_by_id(&self, id: &BookId) -> Result<bool> {
        self.counters.delete_by_id.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.inner.delete_by_id(id).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Wraps a store and fails selected operations with `Unavailable`.
pub struct FlakyStore<S> {
    inner: S,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    failing_deletes: Mutex<HashSet<BookId>>,
}

impl<S: BookStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            failing_deletes: Mutex::new(HashSet::new()),
        }
    }

    /// Make `find_all` and `find_by_id` fail until turned off.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `insert`, `save` and `delete_by_id` fail until turned off.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make deletes of this particular id fail.
    pub fn fail_delete_of(&self, id: BookId) {
        self.failing_deletes.lock().insert(id);
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check(&self, flag: &AtomicBool, op: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("injected {op} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: BookStore> BookStore for FlakyStore<S> {
    async fn find_all(&self) -> Result<Vec<Book>> {
        self.check(&self.fail_reads, "read")?;
        self.inner.find_all().await
    }

    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>> {
        self.check(&self.fail_reads, "read")?;
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, draft: BookDraft) -> Result<Book> {
        self.check(&self.fail_writes, "write")?;
        self.inner.insert(draft).await
    }

    async fn save(&self, book: Book) -> Result<Book> {
        self.check(&self.fail_writes, "write")?;
        self.inner.save(book).await
    }

    async fn delete_by_id(&self, id: &BookId) -> Result<bool> {
        self.check(&self.fail_writes, "write")?;
        if self.failing_deletes.lock().contains(id) {
            return Err(StoreError::Unavailable(format!("injected delete failure for {id}")));
        }
        self.inner.delete_by_id(id).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
