//! Durable counter store backed by SQLite.
//!
//! This module provides [`SqliteStore`]. The increment runs entirely inside
//! SQLite as one upsert statement, so every process and every connection
//! sharing the database file sees lost-update-free counts: the database's
//! own write lock is the serialization point.
//!
//! # Feature Flag
//!
//! This module requires the `sqlite` feature:
//!
//! ```toml
//! [dependencies]
//! visite = { version = "0.1", features = ["sqlite"] }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE view_counts (
//!     content_id TEXT PRIMARY KEY NOT NULL,
//!     views      INTEGER NOT NULL CHECK (views >= 0)
//! );
//! ```

use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::retry::RetryPolicy;
use crate::store::memory::MemoryStore;
use crate::store::{ContentId, CounterRecord, CounterStore, Page, SortDirection};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS view_counts (
    content_id TEXT PRIMARY KEY NOT NULL,
    views      INTEGER NOT NULL CHECK (views >= 0)
)";

const INCREMENT: &str = "INSERT INTO view_counts (content_id, views) VALUES (?1, 1)
    ON CONFLICT (content_id) DO UPDATE SET views = views + 1 WHERE views < ?2
    RETURNING views";

/// Configuration for [`SqliteStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct SqliteConfig {
    /// How long SQLite itself waits on a locked database before reporting busy.
    pub busy_timeout: Duration,
    /// Retry schedule once SQLite does report busy or locked.
    pub retry: RetryPolicy,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(250),
            retry: RetryPolicy::default(),
        }
    }
}

impl SqliteConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets SQLite's busy timeout.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// A durable counter store in a SQLite table.
///
/// Reads that fail (database locked past every retry, file removed) answer
/// with the last count this instance observed for the id, or 0.
///
/// # Examples
///
/// ```rust
/// use visite::store::sqlite::{SqliteConfig, SqliteStore};
/// use visite::store::CounterStore;
///
/// let store = SqliteStore::open_in_memory(SqliteConfig::new())?;
/// assert_eq!(store.increment("post-1")?, 1);
/// assert_eq!(store.get("post-1"), 1);
/// # Ok::<(), visite::error::StoreError>(())
/// ```
pub struct SqliteStore {
    conn: Mutex<Connection>,
    config: SqliteConfig,
    last_seen: MemoryStore,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`.
    pub fn open(path: impl AsRef<Path>, config: SqliteConfig) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "sqlite counter store opened");
        Self::with_connection(conn, config)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory(config: SqliteConfig) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, config)
    }

    /// Wraps an existing connection, creating the table if needed.
    pub fn with_connection(conn: Connection, config: SqliteConfig) -> Result<Self> {
        conn.busy_timeout(config.busy_timeout)?;
        config
            .retry
            .run("sqlite schema", || conn.execute_batch(SCHEMA).map_err(StoreError::from))?;
        Ok(Self {
            conn: Mutex::new(conn),
            config,
            last_seen: MemoryStore::new(),
        })
    }

    fn with_conn<T>(&self, what: &str, op: impl Fn(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        self.config.retry.run(what, || {
            let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
            op(&conn).map_err(StoreError::from)
        })
    }

    fn try_get(&self, id: &ContentId) -> Result<u64> {
        let views = self.with_conn("sqlite get", |conn| {
            conn.prepare_cached("SELECT views FROM view_counts WHERE content_id = ?1")?
                .query_row(params![id.as_str()], |row| row.get::<_, i64>(0))
                .optional()
        })?;
        Ok(views.map_or(0, to_count))
    }

    /// Number of ids with a counter.
    pub fn len(&self) -> Result<u64> {
        let n = self.with_conn("sqlite len", |conn| {
            conn.query_row("SELECT COUNT(*) FROM view_counts", [], |row| row.get::<_, i64>(0))
        })?;
        Ok(to_count(n))
    }

    /// Returns `true` if no id has been counted.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> Result<u64> {
        let sum = self.with_conn("sqlite total", |conn| {
            conn.query_row(
                "SELECT CAST(COALESCE(SUM(views), 0) AS INTEGER) FROM view_counts",
                [],
                |row| row.get::<_, i64>(0),
            )
        })?;
        Ok(to_count(sum))
    }
}

#[inline]
fn to_count(views: i64) -> u64 {
    views.max(0) as u64
}

impl CounterStore for SqliteStore {
    fn get(&self, id: &str) -> u64 {
        let Ok(id) = ContentId::parse(id) else {
            return 0;
        };
        match self.try_get(&id) {
            Ok(count) => {
                // unknown ids stay out of the fallback cache
                if count > 0 || self.last_seen.contains(id.as_str()) {
                    self.last_seen.commit(&id, count);
                }
                count
            }
            Err(err) => {
                let fallback = self.last_seen.get(id.as_str());
                tracing::warn!(id = %id, error = %err, fallback, "sqlite read failed, serving last seen count");
                fallback
            }
        }
    }

    fn increment(&self, id: &str) -> Result<u64> {
        let id = ContentId::parse(id)?;
        let views = self.with_conn("sqlite increment", |conn| {
            conn.prepare_cached(INCREMENT)?
                .query_row(params![id.as_str(), i64::MAX], |row| row.get::<_, i64>(0))
                .optional()
        })?;
        // the upsert's WHERE clause refuses the update at the maximum
        let count = views
            .map(to_count)
            .ok_or_else(|| StoreError::Overflow(id.to_string()))?;
        self.last_seen.commit(&id, count);
        Ok(count)
    }

    fn order_by_count(&self, direction: SortDirection, page: Page) -> Result<Vec<CounterRecord>> {
        let sql = format!(
            "SELECT content_id, views FROM view_counts ORDER BY views {}, content_id ASC LIMIT ?1 OFFSET ?2",
            direction.as_sql()
        );
        let limit = i64::try_from(page.limit).unwrap_or(-1);
        let offset = i64::try_from(page.offset).unwrap_or(i64::MAX);

        let rows = self.with_conn("sqlite order", |conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params![limit, offset], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;

        rows.into_iter()
            .enumerate()
            .map(|(idx, (id, views))| {
                let id = ContentId::parse(&id).map_err(|_| StoreError::Corrupt {
                    line: page.offset.saturating_add(idx + 1),
                    reason: format!("invalid content id {id:?} in view_counts"),
                })?;
                Ok(CounterRecord::new(id, to_count(views)))
            })
            .collect()
    }

    fn remove(&self, id: &str) -> Result<Option<u64>> {
        let id = ContentId::parse(id)?;
        let views = self.with_conn("sqlite remove", |conn| {
            conn.prepare_cached("DELETE FROM view_counts WHERE content_id = ?1 RETURNING views")?
                .query_row(params![id.as_str()], |row| row.get::<_, i64>(0))
                .optional()
        })?;
        self.last_seen.forget(id.as_str());
        Ok(views.map(to_count))
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn memory() -> SqliteStore {
        SqliteStore::open_in_memory(SqliteConfig::new()).unwrap()
    }

    fn shared_config() -> SqliteConfig {
        SqliteConfig::new()
            .with_busy_timeout(Duration::from_secs(5))
            .with_retry(RetryPolicy::new().with_max_attempts(10))
    }

    #[test]
    fn test_unknown_reads_zero() {
        let store = memory();
        assert_eq!(store.get("nothing"), 0);
        assert_eq!(store.get(""), 0);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_reading_unknown_ids_caches_nothing() {
        let store = memory();
        for n in 0..1_000 {
            assert_eq!(store.get(&format!("missing-{n}")), 0);
        }
        assert_eq!(store.last_seen.len(), 0);

        store.increment("post-1").unwrap();
        assert_eq!(store.get("post-1"), 1);
        assert_eq!(store.last_seen.len(), 1);
        assert_eq!(store.last_seen.get("post-1"), 1);
    }

    #[test]
    fn test_sequential_increments() {
        let store = memory();
        for n in 1..=10 {
            assert_eq!(store.increment("post-1").unwrap(), n);
        }
        assert_eq!(store.get("post-1"), 10);
        assert_eq!(store.total().unwrap(), 10);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_invalid_id() {
        let store = memory();
        assert!(store.increment("  ").unwrap_err().is_invalid_identifier());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_concurrent_threads() {
        let store = Arc::new(memory());
        let handles: Vec<_> = (0..100)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.increment("hot").unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.get("hot"), 100);
    }

    #[test]
    fn test_separate_connections_never_lose_updates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("views.db");
        let first = Arc::new(SqliteStore::open(&path, shared_config()).unwrap());
        let second = Arc::new(SqliteStore::open(&path, shared_config()).unwrap());

        let mut handles = vec![];
        for store in [first.clone(), second.clone()] {
            for _ in 0..5 {
                let store = Arc::clone(&store);
                handles.push(thread::spawn(move || {
                    for _ in 0..10 {
                        store.increment("shared").unwrap();
                    }
                }));
            }
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(first.get("shared"), 100);
        assert_eq!(second.get("shared"), 100);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("views.db");
        {
            let store = SqliteStore::open(&path, SqliteConfig::new()).unwrap();
            store.increment("a").unwrap();
            store.increment("a").unwrap();
        }
        let store = SqliteStore::open(&path, SqliteConfig::new()).unwrap();
        assert_eq!(store.get("a"), 2);
    }

    #[test]
    fn test_order_by_count() {
        let store = memory();
        for (name, views) in [("b", 3), ("a", 3), ("c", 5), ("d", 1)] {
            for _ in 0..views {
                store.increment(name).unwrap();
            }
        }

        let desc: Vec<_> = store
            .order_by_count_descending(10, 0)
            .unwrap()
            .into_iter()
            .map(|r| (r.id.to_string(), r.count))
            .collect();
        assert_eq!(
            desc,
            vec![
                ("c".to_string(), 5),
                ("a".to_string(), 3),
                ("b".to_string(), 3),
                ("d".to_string(), 1)
            ]
        );

        let asc: Vec<_> = store
            .order_by_count(SortDirection::Ascending, Page::new(2, 1))
            .unwrap()
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(asc, vec!["a", "b"]);

        assert_eq!(store.order_by_count(SortDirection::Descending, Page::all()).unwrap().len(), 4);
    }

    #[test]
    fn test_overflow() {
        let store = memory();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO view_counts (content_id, views) VALUES ('max', ?1)",
                params![i64::MAX],
            )
            .unwrap();
        }
        assert!(matches!(store.increment("max"), Err(StoreError::Overflow(_))));
        assert_eq!(store.get("max"), i64::MAX as u64);
    }

    #[test]
    fn test_failed_read_serves_last_seen() {
        let store = memory();
        store.increment("a").unwrap();
        store.increment("a").unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute_batch("DROP TABLE view_counts").unwrap();
        }
        assert_eq!(store.get("a"), 2);
        assert_eq!(store.get("b"), 0);
        assert!(store.increment("a").unwrap_err().is_unavailable());
    }

    #[test]
    fn test_remove() {
        let store = memory();
        store.increment("a").unwrap();
        assert_eq!(store.remove("a").unwrap(), Some(1));
        assert_eq!(store.remove("a").unwrap(), None);
        assert_eq!(store.get("a"), 0);
    }
}
