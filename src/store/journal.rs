//! Durable counter store backed by an append-only journal file.
//!
//! This module provides [`JournalStore`], which persists every increment as
//! one JSON line and serves reads from an in-memory [`MemoryStore`].
//!
//! # File Format
//!
//! One JSON object per line. The newest line for an id holds its count; a
//! `null` count is a removal tombstone:
//!
//! ```text
//! {"id":"post-1","count":1}
//! {"id":"post-2","count":1}
//! {"id":"post-1","count":2}
//! {"id":"post-2","count":null}
//! ```
//!
//! # Write Path
//!
//! All mutations go through a single writer lock:
//!
//! 1. compute the new count from the committed in-memory value
//! 2. append the line (and sync it, per [`SyncPolicy`])
//! 3. only then publish the new count to readers
//!
//! A failed append is rolled back by truncating the file to its last
//! committed length, so readers and the file never disagree. If the rollback
//! itself fails the store is poisoned and refuses further mutations.
//!
//! The journal has exactly one owner. [`JournalStore::open`] takes an
//! exclusive advisory lock on `<journal>.lock` and holds it until the store
//! is dropped; a second open of the same journal, from this process or
//! another, fails with [`StoreError::Locked`]. Use
//! [`SqliteStore`](crate::store::sqlite::SqliteStore) when several processes
//! share the counts.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::retry::RetryPolicy;
use crate::store::memory::MemoryStore;
use crate::store::{ContentId, CounterRecord, CounterStore, Page, SortDirection};

/// When appended lines are flushed to stable storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(rename_all = "lowercase"))]
pub enum SyncPolicy {
    /// `fsync` after every append. An acknowledged increment survives power loss.
    #[default]
    Always,
    /// Leave flushing to the operating system. An acknowledged increment
    /// survives a process crash but not power loss.
    Never,
}

/// Configuration for [`JournalStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct JournalConfig {
    /// Durability of each append.
    pub sync: SyncPolicy,
    /// Rewrite the journal once it holds this many superseded lines.
    pub compact_after: Option<u64>,
    /// Retry schedule for transient I/O errors.
    pub retry: RetryPolicy,
}

impl JournalConfig {
    /// Creates the default configuration: sync every append, never compact automatically.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sync policy.
    pub fn with_sync(mut self, sync: SyncPolicy) -> Self {
        self.sync = sync;
        self
    }

    /// Enables automatic compaction after `lines` superseded lines.
    pub fn compact_after(mut self, lines: u64) -> Self {
        self.compact_after = Some(lines);
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Path of the lock file guarding `journal`.
fn lock_path(journal: &Path) -> PathBuf {
    let mut name = OsString::from(journal.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

/// Takes the exclusive lock on the journal's sidecar lock file.
///
/// The lock lives on a separate file so that compaction, which renames a new
/// journal over the old one, never swaps out the locked inode.
fn acquire_lock(journal: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path(journal))?;
    match file.try_lock() {
        Ok(()) => Ok(file),
        Err(TryLockError::WouldBlock) => {
            tracing::warn!(path = %journal.display(), "journal already open elsewhere");
            Err(StoreError::Locked(journal.to_path_buf()))
        }
        Err(TryLockError::Error(err)) => Err(err.into()),
    }
}

/// One journal line.
#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    id: ContentId,
    count: Option<u64>,
}

/// The byte sink behind the journal.
pub(crate) trait Medium: Send {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl Medium for File {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

struct Writer {
    medium: Box<dyn Medium>,
    /// Length of the file up to the last acknowledged line.
    committed_len: u64,
    /// Lines in the file, live or superseded.
    lines: u64,
    poisoned: bool,
}

impl Writer {
    /// Appends one line, rolling the file back if anything fails.
    fn write_line(&mut self, line: &[u8], sync: SyncPolicy) -> Result<()> {
        if self.poisoned {
            return Err(StoreError::Poisoned);
        }
        let written = self.medium.append(line).and_then(|()| match sync {
            SyncPolicy::Always => self.medium.sync(),
            SyncPolicy::Never => Ok(()),
        });
        if let Err(err) = written {
            if let Err(rollback) = self.medium.truncate(self.committed_len) {
                tracing::error!(error = %rollback, "journal rollback failed, poisoning store");
                self.poisoned = true;
            }
            return Err(err.into());
        }
        self.committed_len += line.len() as u64;
        self.lines += 1;
        Ok(())
    }
}

/// A durable counter store persisted as a JSON-lines journal.
///
/// # Examples
///
/// ```rust,no_run
/// use visite::store::journal::{JournalConfig, JournalStore};
/// use visite::store::CounterStore;
///
/// let store = JournalStore::open("views.jsonl", JournalConfig::new())?;
/// store.increment("post-1")?;
/// assert!(store.get("post-1") >= 1);
/// # Ok::<(), visite::error::StoreError>(())
/// ```
pub struct JournalStore {
    path: PathBuf,
    config: JournalConfig,
    cache: MemoryStore,
    writer: Mutex<Writer>,
    /// Held for the store's lifetime; closing it releases the lock.
    _lock: File,
}

impl JournalStore {
    /// Opens (or creates) the journal at `path` and replays it.
    ///
    /// A damaged final line is the trace of a write that was never
    /// acknowledged; it is dropped and the file truncated. Damage anywhere
    /// else fails with [`StoreError::Corrupt`]. Fails with
    /// [`StoreError::Locked`] while another store has the journal open.
    pub fn open(path: impl AsRef<Path>, config: JournalConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lock = acquire_lock(&path)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };

        let cache = MemoryStore::new();
        let (valid_len, lines) = replay(&content, &cache)?;

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if valid_len < content.len() as u64 {
            tracing::warn!(
                path = %path.display(),
                dropped_bytes = content.len() as u64 - valid_len,
                "discarding torn final journal line"
            );
            file.set_len(valid_len)?;
        }

        tracing::info!(path = %path.display(), ids = cache.len(), lines, "journal opened");

        Ok(Self {
            path,
            config,
            cache,
            writer: Mutex::new(Writer {
                medium: Box::new(file),
                committed_len: valid_len,
                lines,
                poisoned: false,
            }),
            _lock: lock,
        })
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of ids with a counter.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns `true` if no id has been counted.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.cache.total()
    }

    /// Returns `true` if an unrecoverable write failure disabled mutations.
    pub fn is_poisoned(&self) -> bool {
        self.lock_writer().poisoned
    }

    /// Rewrites the journal with exactly one line per live id.
    ///
    /// The new file is written next to the journal and renamed over it, so a
    /// crash during compaction leaves the old journal intact.
    pub fn compact(&self) -> Result<()> {
        let mut writer = self.lock_writer();
        self.compact_locked(&mut writer)
    }

    fn lock_writer(&self) -> MutexGuard<'_, Writer> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append(&self, writer: &mut Writer, entry: &Entry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        self.config
            .retry
            .run("journal append", || writer.write_line(&line, self.config.sync))
    }

    fn compact_locked(&self, writer: &mut Writer) -> Result<()> {
        if writer.poisoned {
            return Err(StoreError::Poisoned);
        }

        let mut records = self.cache.records();
        records.sort_unstable_by(|a, b| a.id.cmp(&b.id));

        let tmp = self.path.with_extension("compact");
        {
            let file = File::create(&tmp)?;
            let mut out = BufWriter::new(file);
            for record in &records {
                serde_json::to_writer(
                    &mut out,
                    &Entry {
                        id: record.id.clone(),
                        count: Some(record.count),
                    },
                )?;
                out.write_all(b"\n")?;
            }
            let file = out.into_inner().map_err(|err| err.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        // The old handle now points at an unlinked file: appends through it
        // would be lost, so failing to reopen poisons the store.
        let reopened = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .and_then(|file| file.metadata().map(|meta| (file, meta.len())));
        match reopened {
            Ok((file, len)) => {
                writer.medium = Box::new(file);
                writer.committed_len = len;
                writer.lines = records.len() as u64;
                tracing::info!(path = %self.path.display(), ids = records.len(), "journal compacted");
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "cannot reopen compacted journal, poisoning store");
                writer.poisoned = true;
                Err(err.into())
            }
        }
    }

    fn maybe_compact(&self, writer: &mut Writer) {
        let Some(threshold) = self.config.compact_after else {
            return;
        };
        let superseded = writer.lines.saturating_sub(self.cache.len() as u64);
        if superseded >= threshold {
            if let Err(err) = self.compact_locked(writer) {
                tracing::warn!(error = %err, "automatic journal compaction failed");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn replace_medium(&self, medium: Box<dyn Medium>) {
        self.lock_writer().medium = medium;
    }
}

/// Replays journal `content` into `cache`.
///
/// Returns the byte length of the valid prefix and the number of lines in it.
fn replay(content: &str, cache: &MemoryStore) -> Result<(u64, u64)> {
    let mut valid_len = 0u64;
    let mut lines = 0u64;
    let mut chunks = content.split_inclusive('\n').enumerate().peekable();

    while let Some((idx, chunk)) = chunks.next() {
        let is_last = chunks.peek().is_none();
        let text = chunk.trim();
        if text.is_empty() {
            valid_len += chunk.len() as u64;
            continue;
        }
        let parsed = serde_json::from_str::<Entry>(text);
        if is_last && (!chunk.ends_with('\n') || parsed.is_err()) {
            break;
        }
        let entry = parsed.map_err(|err| StoreError::Corrupt {
            line: idx + 1,
            reason: err.to_string(),
        })?;
        match entry.count {
            Some(count) => cache.raise(&entry.id, count),
            None => {
                cache.forget(entry.id.as_str());
            }
        }
        valid_len += chunk.len() as u64;
        lines += 1;
    }

    Ok((valid_len, lines))
}

impl CounterStore for JournalStore {
    fn get(&self, id: &str) -> u64 {
        self.cache.get(id)
    }

    fn increment(&self, id: &str) -> Result<u64> {
        let id = ContentId::parse(id)?;
        let mut writer = self.lock_writer();

        let next = self
            .cache
            .get(id.as_str())
            .checked_add(1)
            .ok_or_else(|| StoreError::Overflow(id.to_string()))?;

        self.append(
            &mut writer,
            &Entry {
                id: id.clone(),
                count: Some(next),
            },
        )?;
        self.cache.commit(&id, next);
        self.maybe_compact(&mut writer);
        Ok(next)
    }

    fn order_by_count(&self, direction: SortDirection, page: Page) -> Result<Vec<CounterRecord>> {
        self.cache.order_by_count(direction, page)
    }

    fn remove(&self, id: &str) -> Result<Option<u64>> {
        let id = ContentId::parse(id)?;
        let mut writer = self.lock_writer();
        if !self.cache.contains(id.as_str()) {
            return Ok(None);
        }
        self.append(
            &mut writer,
            &Entry {
                id: id.clone(),
                count: None,
            },
        )?;
        Ok(self.cache.forget(id.as_str()))
    }
}

impl std::fmt::Debug for JournalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalStore")
            .field("path", &self.path)
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    /// A file that fails on demand.
    struct FlakyFile {
        inner: File,
        failures: Arc<Mutex<VecDeque<io::ErrorKind>>>,
        write_half_on_failure: bool,
        fail_truncate: bool,
    }

    impl Medium for FlakyFile {
        fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
            if let Some(kind) = self.failures.lock().unwrap().pop_front() {
                if self.write_half_on_failure {
                    self.inner.write_all(&bytes[..bytes.len() / 2])?;
                }
                return Err(io::Error::from(kind));
            }
            self.inner.write_all(bytes)
        }

        fn truncate(&mut self, len: u64) -> io::Result<()> {
            if self.fail_truncate {
                return Err(io::Error::other("truncate refused"));
            }
            self.inner.set_len(len)
        }

        fn sync(&mut self) -> io::Result<()> {
            self.inner.sync_data()
        }
    }

    fn journal_path(dir: &TempDir) -> PathBuf {
        dir.path().join("views.jsonl")
    }

    fn fast_config() -> JournalConfig {
        JournalConfig::new()
            .with_sync(SyncPolicy::Never)
            .with_retry(RetryPolicy::new().with_initial_backoff(Duration::ZERO))
    }

    fn install_flaky(
        store: &JournalStore,
        failures: &[io::ErrorKind],
        write_half_on_failure: bool,
        fail_truncate: bool,
    ) {
        let inner = OpenOptions::new().append(true).open(store.path()).unwrap();
        store.replace_medium(Box::new(FlakyFile {
            inner,
            failures: Arc::new(Mutex::new(failures.iter().copied().collect())),
            write_half_on_failure,
            fail_truncate,
        }));
    }

    #[test]
    fn test_counts_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = journal_path(&dir);
        {
            let store = JournalStore::open(&path, JournalConfig::new()).unwrap();
            assert_eq!(store.get("post-1"), 0);
            for n in 1..=3 {
                assert_eq!(store.increment("post-1").unwrap(), n);
            }
            store.increment("post-2").unwrap();
        }
        let store = JournalStore::open(&path, JournalConfig::new()).unwrap();
        assert_eq!(store.get("post-1"), 3);
        assert_eq!(store.get("post-2"), 1);
        assert_eq!(store.increment("post-1").unwrap(), 4);
    }

    #[test]
    fn test_concurrent_increments_persist() {
        let dir = TempDir::new().unwrap();
        let path = journal_path(&dir);
        let store = Arc::new(JournalStore::open(&path, fast_config()).unwrap());

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..10 {
                        store.increment("hot").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get("hot"), 100);
        drop(store);
        assert_eq!(JournalStore::open(&path, fast_config()).unwrap().get("hot"), 100);
    }

    #[test]
    fn test_torn_final_line_is_dropped() {
        let dir = TempDir::new().unwrap();
        let path = journal_path(&dir);
        fs::write(&path, "{\"id\":\"a\",\"count\":1}\n{\"id\":\"a\",\"cou").unwrap();

        let store = JournalStore::open(&path, fast_config()).unwrap();
        assert_eq!(store.get("a"), 1);
        assert_eq!(store.increment("a").unwrap(), 2);
        drop(store);

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert_eq!(JournalStore::open(&path, fast_config()).unwrap().get("a"), 2);
    }

    #[test]
    fn test_complete_final_line_without_newline_is_dropped() {
        let dir = TempDir::new().unwrap();
        let path = journal_path(&dir);
        fs::write(&path, "{\"id\":\"a\",\"count\":1}\n{\"id\":\"a\",\"count\":2}").unwrap();

        let store = JournalStore::open(&path, fast_config()).unwrap();
        assert_eq!(store.get("a"), 1);
    }

    #[test]
    fn test_interior_corruption_fails_open() {
        let dir = TempDir::new().unwrap();
        let path = journal_path(&dir);
        fs::write(
            &path,
            "{\"id\":\"a\",\"count\":1}\ngarbage\n{\"id\":\"a\",\"count\":2}\n",
        )
        .unwrap();

        match JournalStore::open(&path, fast_config()) {
            Err(StoreError::Corrupt { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corruption, got {other:?}"),
        }
    }

    #[test]
    fn test_failed_append_leaves_committed_state() {
        let dir = TempDir::new().unwrap();
        let path = journal_path(&dir);
        let store = JournalStore::open(&path, fast_config()).unwrap();
        store.increment("a").unwrap();
        let before = fs::read_to_string(&path).unwrap();

        install_flaky(&store, &[io::ErrorKind::Other], true, false);
        let err = store.increment("a").unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(store.get("a"), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), before);

        // the medium recovers and the next increment continues from the committed value
        assert_eq!(store.increment("a").unwrap(), 2);
        drop(store);
        assert_eq!(JournalStore::open(&path, fast_config()).unwrap().get("a"), 2);
    }

    #[test]
    fn test_transient_failure_is_retried() {
        let dir = TempDir::new().unwrap();
        let store = JournalStore::open(journal_path(&dir), fast_config()).unwrap();

        install_flaky(&store, &[io::ErrorKind::Interrupted], true, false);
        assert_eq!(store.increment("a").unwrap(), 1);

        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content, "{\"id\":\"a\",\"count\":1}\n");
    }

    #[test]
    fn test_retries_are_bounded() {
        let dir = TempDir::new().unwrap();
        let config = fast_config().with_retry(
            RetryPolicy::new()
                .with_max_attempts(2)
                .with_initial_backoff(Duration::ZERO),
        );
        let store = JournalStore::open(journal_path(&dir), config).unwrap();

        install_flaky(&store, &[io::ErrorKind::Interrupted; 3], false, false);
        assert!(store.increment("a").is_err());
        assert_eq!(store.get("a"), 0);
    }

    #[test]
    fn test_failed_rollback_poisons() {
        let dir = TempDir::new().unwrap();
        let store = JournalStore::open(journal_path(&dir), fast_config()).unwrap();

        install_flaky(&store, &[io::ErrorKind::Other], true, true);
        assert!(store.increment("a").is_err());
        assert!(store.is_poisoned());
        assert!(matches!(store.increment("a"), Err(StoreError::Poisoned)));
        assert!(matches!(store.compact(), Err(StoreError::Poisoned)));
        assert_eq!(store.get("a"), 0);
    }

    #[test]
    fn test_invalid_id_rejected_before_write() {
        let dir = TempDir::new().unwrap();
        let store = JournalStore::open(journal_path(&dir), fast_config()).unwrap();
        assert!(store.increment("").unwrap_err().is_invalid_identifier());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "");
    }

    #[test]
    fn test_compact() {
        let dir = TempDir::new().unwrap();
        let path = journal_path(&dir);
        let store = JournalStore::open(&path, fast_config()).unwrap();
        for _ in 0..5 {
            store.increment("b").unwrap();
        }
        store.increment("a").unwrap();
        store.compact().unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "{\"id\":\"a\",\"count\":1}\n{\"id\":\"b\",\"count\":5}\n"
        );
        assert_eq!(store.increment("b").unwrap(), 6);
        drop(store);

        let store = JournalStore::open(&path, fast_config()).unwrap();
        assert_eq!(store.get("a"), 1);
        assert_eq!(store.get("b"), 6);
    }

    #[test]
    fn test_automatic_compaction() {
        let dir = TempDir::new().unwrap();
        let path = journal_path(&dir);
        let store = JournalStore::open(&path, fast_config().compact_after(4)).unwrap();
        for _ in 0..5 {
            store.increment("a").unwrap();
        }
        // five lines for one id: four superseded, compacted down to one
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
        assert_eq!(store.get("a"), 5);
    }

    #[test]
    fn test_remove_writes_tombstone() {
        let dir = TempDir::new().unwrap();
        let path = journal_path(&dir);
        let store = JournalStore::open(&path, fast_config()).unwrap();
        store.increment("a").unwrap();
        store.increment("a").unwrap();
        store.increment("b").unwrap();

        assert_eq!(store.remove("a").unwrap(), Some(2));
        assert_eq!(store.remove("a").unwrap(), None);
        drop(store);

        let store = JournalStore::open(&path, fast_config()).unwrap();
        assert_eq!(store.get("a"), 0);
        assert_eq!(store.get("b"), 1);
        assert_eq!(store.increment("a").unwrap(), 1);
    }

    #[test]
    fn test_second_open_is_locked_out() {
        let dir = TempDir::new().unwrap();
        let path = journal_path(&dir);
        let first = JournalStore::open(&path, fast_config()).unwrap();

        let err = JournalStore::open(&path, fast_config()).unwrap_err();
        assert!(matches!(err, StoreError::Locked(ref locked) if locked == &path));
        assert!(err.is_unavailable());

        // the owner is unaffected and no increment is lost
        assert_eq!(first.increment("a").unwrap(), 1);
        assert_eq!(first.increment("a").unwrap(), 2);
        drop(first);

        let reopened = JournalStore::open(&path, fast_config()).unwrap();
        assert_eq!(reopened.get("a"), 2);
    }

    #[test]
    fn test_lock_held_across_compaction() {
        let dir = TempDir::new().unwrap();
        let path = journal_path(&dir);
        let store = JournalStore::open(&path, fast_config()).unwrap();
        store.increment("a").unwrap();
        store.increment("a").unwrap();
        store.compact().unwrap();

        assert!(matches!(
            JournalStore::open(&path, fast_config()),
            Err(StoreError::Locked(_))
        ));
        assert_eq!(store.increment("a").unwrap(), 3);
    }

    #[test]
    fn test_concurrent_opens_never_share_the_journal() {
        let dir = TempDir::new().unwrap();
        let path = Arc::new(journal_path(&dir));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = Arc::clone(&path);
                thread::spawn(move || match JournalStore::open(path.as_path(), fast_config()) {
                    Ok(store) => {
                        store.increment("a").unwrap();
                        // keep the lock until every contender has tried
                        thread::sleep(Duration::from_millis(100));
                        true
                    }
                    Err(StoreError::Locked(_)) => false,
                    Err(other) => panic!("unexpected error: {other:?}"),
                })
            })
            .collect();

        let owners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|owned| *owned)
            .count();
        assert!(owners >= 1);

        let store = JournalStore::open(path.as_path(), fast_config()).unwrap();
        assert_eq!(store.get("a"), owners as u64);
    }

    #[test]
    fn test_remove_replayed_zero_entry() {
        let dir = TempDir::new().unwrap();
        let path = journal_path(&dir);
        fs::write(&path, "{\"id\":\"a\",\"count\":0}\n").unwrap();

        let store = JournalStore::open(&path, fast_config()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.remove("a").unwrap(), Some(0));
        assert!(store.order_by_count_descending(10, 0).unwrap().is_empty());
        assert_eq!(store.remove("a").unwrap(), None);
        drop(store);

        let store = JournalStore::open(&path, fast_config()).unwrap();
        assert!(store.is_empty());
        assert!(store.order_by_count_descending(10, 0).unwrap().is_empty());
    }

    #[test]
    fn test_order_by_count() {
        let dir = TempDir::new().unwrap();
        let store = JournalStore::open(journal_path(&dir), fast_config()).unwrap();
        for (name, views) in [("b", 2), ("a", 2), ("c", 4)] {
            for _ in 0..views {
                store.increment(name).unwrap();
            }
        }
        let ids: Vec<_> = store
            .order_by_count_descending(10, 0)
            .unwrap()
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(store.total(), 8);
        assert_eq!(store.len(), 3);
    }
}
