//! SQLite-backed store keyed by UUID strings.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::BookStore;
use crate::types::{Book, BookDraft, BookId};

/// Current schema version, tracked in `PRAGMA user_version`.
const SCHEMA_VERSION: i32 = 1;

/// Default time a query waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Persistent store backed by SQLite.
///
/// Queries run on tokio's blocking pool so callers never stall the async
/// runtime. Lock waits are bounded by SQLite's busy timeout.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open or create a store, with an explicit busy timeout.
    pub fn open_with_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(busy_timeout)?;
        create_schema(&conn)?;

        info!(path = %path.display(), "Book store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        create_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            f(&guard)
        })
        .await?
    }
}

fn create_schema(conn: &Connection) -> Result<()> {
    let current: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if current >= SCHEMA_VERSION {
        debug!(version = current, "Schema up to date");
        return Ok(());
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            isbn TEXT NOT NULL,
            published_date TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_books_published ON books(published_date);
        "#,
    )
    .map_err(|e| StoreError::Migration(e.to_string()))?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

    info!(from = current, to = SCHEMA_VERSION, "Book schema migrated");
    Ok(())
}

fn row_to_book(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: BookId::new(row.get::<_, String>(0)?),
        title: row.get(1)?,
        author: row.get(2)?,
        isbn: row.get(3)?,
        published_date: row.get(4)?,
    })
}

#[async_trait]
impl BookStore for SqliteStore {
    async fn find_all(&self) -> Result<Vec<Book>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, author, isbn, published_date FROM books ORDER BY rowid",
            )?;
            let rows = stmt.query_map([], row_to_book)?;
            let mut books = Vec::new();
            for row in rows {
                books.push(row?);
            }
            Ok(books)
        })
        .await
    }

    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let book = conn
                .query_row(
                    "SELECT id, title, author, isbn, published_date FROM books WHERE id = ?1",
                    params![id.as_str()],
                    row_to_book,
                )
                .optional()?;
            Ok(book)
        })
        .await
    }

    async fn insert(&self, draft: BookDraft) -> Result<Book> {
        let book = Book::from_draft(BookId::new(Uuid::new_v4().to_string()), draft);
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO books (id, title, author, isbn, published_date)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    book.id.as_str(),
                    book.title,
                    book.author,
                    book.isbn,
                    book.published_date
                ],
            )?;
            Ok(book)
        })
        .await
    }

    async fn save(&self, book: Book) -> Result<Book> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO books (id, title, author, isbn, published_date)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    author = excluded.author,
                    isbn = excluded.isbn,
                    published_date = excluded.published_date",
                params![
                    book.id.as_str(),
                    book.title,
                    book.author,
                    book.isbn,
                    book.published_date
                ],
            )?;
            Ok(book)
        })
        .await
    }

    async fn delete_by_id(&self, id: &BookId) -> Result<bool> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let deleted = conn.execute("DELETE FROM books WHERE id = ?1", params![id.as_str()])?;
            Ok(deleted > 0)
        })
        .await
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
