//! Counter stores and the types they share.
//!
//! A counter store maps a [`ContentId`] to a cumulative view count. Every
//! implementation honours the same contract:
//!
//! - [`get`](CounterStore::get) never fails; unknown or invalid ids read as 0.
//! - [`increment`](CounterStore::increment) adds exactly one and returns the
//!   new count. Concurrent increments are never lost.
//! - [`order_by_count`](CounterStore::order_by_count) returns a page of
//!   records ordered by count, ties broken by id ascending, so the same data
//!   always yields the same order.
//!
//! # Available Stores
//!
//! | Store | Durable | Feature | Increment strategy |
//! |-------|---------|---------|--------------------|
//! | [`MemoryStore`](memory::MemoryStore) | no | always | per-key atomic in a sharded map |
//! | [`JournalStore`](journal::JournalStore) | yes | `journal` | single writer, append then commit |
//! | [`SqliteStore`](sqlite::SqliteStore) | yes | `sqlite` | upsert with `views = views + 1` inside SQLite |
//!
//! # Sharding
//!
//! The in-memory map is split into [`NUM_SHARDS`] cache-padded shards. An id
//! always lands in the same shard (its hash modulo the shard count), so
//! increments to different ids rarely contend on the same lock.
//!
//! ```text
//!                         ┌──────────────────────────────────────┐
//!   "post-17" ──hash──►   │ [Shard 0]  RwLock<HashMap> (padded)  │
//!   "post-3"  ──hash──►   │ [Shard 1]  RwLock<HashMap> (padded)  │
//!        ...              │    ...                               │
//!   "page-9"  ──hash──►   │ [Shard 63] RwLock<HashMap> (padded)  │
//!                         └──────────────────────────────────────┘
//! ```

pub mod memory;

#[cfg(feature = "journal")]
pub mod journal;

#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::sync::Arc;

use crate::error::{Result, StoreError};

/// Number of shards used by the in-memory map.
pub(crate) const NUM_SHARDS: usize = 64;

/// Longest accepted identifier, in bytes.
pub const MAX_ID_LEN: usize = 255;

/// Opaque, validated identifier of a content item.
///
/// Surrounding whitespace is trimmed. Empty ids, ids longer than
/// [`MAX_ID_LEN`] bytes and ids containing control characters are rejected.
/// Ids order lexicographically, which is the tie-break order for sorted scans.
///
/// # Examples
///
/// ```rust
/// use visite::store::ContentId;
///
/// let id = ContentId::parse(" post-42 ").unwrap();
/// assert_eq!(id.as_str(), "post-42");
/// assert!(ContentId::parse("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct ContentId(String);

impl ContentId {
    /// Validates and normalizes a raw identifier.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.len() > MAX_ID_LEN
            || trimmed.chars().any(char::is_control)
        {
            return Err(StoreError::InvalidIdentifier(raw.to_string()));
        }
        Ok(ContentId(trimmed.to_string()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContentId {
    type Error = StoreError;

    fn try_from(raw: String) -> Result<Self> {
        ContentId::parse(&raw)
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.0
    }
}

/// A content item's id together with its view count.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CounterRecord {
    /// The content item.
    pub id: ContentId,
    /// Cumulative views.
    pub count: u64,
}

impl CounterRecord {
    /// Creates a record.
    pub fn new(id: ContentId, count: u64) -> Self {
        Self { id, count }
    }
}

/// Order of a sorted scan by count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortDirection {
    /// Smallest count first.
    Ascending,
    /// Largest count first.
    #[default]
    Descending,
}

impl SortDirection {
    /// Parses a listing's direction parameter.
    ///
    /// `"asc"` in any case means ascending; anything else is descending.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("asc") {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        }
    }

    /// Returns the SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }

    /// Compares two `(id, count)` pairs: count in this direction, then id ascending.
    pub fn compare(&self, a: (&str, u64), b: (&str, u64)) -> Ordering {
        let by_count = match self {
            SortDirection::Ascending => a.1.cmp(&b.1),
            SortDirection::Descending => b.1.cmp(&a.1),
        };
        by_count.then_with(|| a.0.cmp(b.0))
    }
}

/// A window into a sorted scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Maximum number of records to return.
    pub limit: usize,
    /// Number of leading records to skip.
    pub offset: usize,
}

impl Page {
    /// Creates a page of at most `limit` records after skipping `offset`.
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// The first `limit` records.
    pub fn first(limit: usize) -> Self {
        Self::new(limit, 0)
    }

    /// Every record.
    pub fn all() -> Self {
        Self::new(usize::MAX, 0)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::all()
    }
}

/// Sorts `records` for `direction` and cuts out `page`.
pub(crate) fn sort_and_page(
    mut records: Vec<CounterRecord>,
    direction: SortDirection,
    page: Page,
) -> Vec<CounterRecord> {
    records.sort_unstable_by(|a, b| {
        direction.compare((a.id.as_str(), a.count), (b.id.as_str(), b.count))
    });
    records
        .into_iter()
        .skip(page.offset)
        .take(page.limit)
        .collect()
}

/// The counting contract implemented by every store.
///
/// Stores are shared by reference (usually through an [`Arc`]) between all
/// request handlers; every method takes `&self`.
pub trait CounterStore: Send + Sync {
    /// Returns the count for `id`.
    ///
    /// Never fails: unknown and invalid ids read as 0, and a backend that
    /// cannot be reached answers with the last value it committed.
    fn get(&self, id: &str) -> u64;

    /// Adds one view to `id` and returns the new count.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidIdentifier`] if `id` is rejected, or an
    /// unavailable-class error if the increment could not be committed. In
    /// both cases the stored count is unchanged.
    fn increment(&self, id: &str) -> Result<u64>;

    /// Returns a page of records sorted by count, ties broken by id ascending.
    fn order_by_count(&self, direction: SortDirection, page: Page) -> Result<Vec<CounterRecord>>;

    /// Drops the counter for `id`, returning its last count.
    ///
    /// Reserved for the collaborator that owns the content item's lifecycle;
    /// viewing never removes anything.
    fn remove(&self, id: &str) -> Result<Option<u64>>;

    /// Largest counts first, ties by id ascending.
    fn order_by_count_descending(&self, limit: usize, offset: usize) -> Result<Vec<CounterRecord>> {
        self.order_by_count(SortDirection::Descending, Page::new(limit, offset))
    }

    /// Counts for several ids, in input order.
    fn get_many(&self, ids: &[&str]) -> Vec<u64> {
        ids.iter().map(|id| self.get(id)).collect()
    }
}

impl<S: CounterStore + ?Sized> CounterStore for Arc<S> {
    fn get(&self, id: &str) -> u64 {
        (**self).get(id)
    }

    fn increment(&self, id: &str) -> Result<u64> {
        (**self).increment(id)
    }

    fn order_by_count(&self, direction: SortDirection, page: Page) -> Result<Vec<CounterRecord>> {
        (**self).order_by_count(direction, page)
    }

    fn remove(&self, id: &str) -> Result<Option<u64>> {
        (**self).remove(id)
    }
}

impl<S: CounterStore + ?Sized> CounterStore for Box<S> {
    fn get(&self, id: &str) -> u64 {
        (**self).get(id)
    }

    fn increment(&self, id: &str) -> Result<u64> {
        (**self).increment(id)
    }

    fn order_by_count(&self, direction: SortDirection, page: Page) -> Result<Vec<CounterRecord>> {
        (**self).order_by_count(direction, page)
    }

    fn remove(&self, id: &str) -> Result<Option<u64>> {
        (**self).remove(id)
    }
}
