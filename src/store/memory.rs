//! In-memory counter store with sharded per-key atomics.
//!
//! This module provides [`MemoryStore`], the fastest store and the one used
//! as a test fake and as the read cache of the durable stores. It is not
//! persistent: counts are lost when the process exits.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use crossbeam_utils::CachePadded;

use crate::error::{Result, StoreError};
use crate::store::{sort_and_page, ContentId, CounterRecord, CounterStore, Page, SortDirection, NUM_SHARDS};

type Shard = CachePadded<RwLock<HashMap<ContentId, AtomicU64>>>;

/// A concurrent in-memory map from content id to view count.
///
/// Each id owns an [`AtomicU64`]. Incrementing an id that already exists
/// only takes its shard's read lock and performs a compare-and-swap, so
/// concurrent increments of the same id never lose an update and increments
/// of different ids in different shards never touch the same cache line.
/// The shard's write lock is taken once per id, on its first view.
///
/// # Examples
///
/// ```rust
/// use visite::store::memory::MemoryStore;
/// use visite::store::CounterStore;
///
/// let store = MemoryStore::new();
/// assert_eq!(store.get("post-1"), 0);
/// assert_eq!(store.increment("post-1").unwrap(), 1);
/// assert_eq!(store.increment("post-1").unwrap(), 2);
/// assert_eq!(store.get("post-1"), 2);
/// ```
///
/// Multi-threaded usage:
///
/// ```rust
/// use visite::store::memory::MemoryStore;
/// use visite::store::CounterStore;
/// use std::sync::Arc;
/// use std::thread;
///
/// let store = Arc::new(MemoryStore::new());
/// let mut handles = vec![];
///
/// for _ in 0..4 {
///     let s = Arc::clone(&store);
///     handles.push(thread::spawn(move || {
///         for _ in 0..1000 {
///             s.increment("front-page").unwrap();
///         }
///     }));
/// }
///
/// for h in handles {
///     h.join().unwrap();
/// }
///
/// assert_eq!(store.get("front-page"), 4000);
/// ```
pub struct MemoryStore {
    shards: Box<[Shard; NUM_SHARDS]>,
    hasher: RandomState,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            shards: Box::new(std::array::from_fn(|_| {
                CachePadded::new(RwLock::new(HashMap::new()))
            })),
            hasher: RandomState::new(),
        }
    }

    /// Creates a store seeded with existing records.
    ///
    /// When an id appears more than once, the largest count is kept.
    pub fn from_records(records: impl IntoIterator<Item = CounterRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.raise(&record.id, record.count);
        }
        store
    }

    #[inline]
    fn shard(&self, id: &str) -> &RwLock<HashMap<ContentId, AtomicU64>> {
        let idx = (self.hasher.hash_one(id) as usize) % NUM_SHARDS;
        &self.shards[idx]
    }

    /// Number of ids with a counter.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.read().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    /// Returns `true` if no id has been counted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .values()
                    .fold(0u64, |acc, c| acc.saturating_add(c.load(Ordering::Acquire)))
            })
            .fold(0u64, u64::saturating_add)
    }

    /// Copies every record out of the store, in no particular order.
    pub fn records(&self) -> Vec<CounterRecord> {
        let mut out = Vec::new();
        for shard in self.shards.iter() {
            let map = shard.read().unwrap_or_else(PoisonError::into_inner);
            out.extend(
                map.iter()
                    .map(|(id, c)| CounterRecord::new(id.clone(), c.load(Ordering::Acquire))),
            );
        }
        out
    }

    /// Stores `value` for `id` as the committed count.
    ///
    /// Only durable stores call this, while holding their writer lock, after
    /// the value has reached the backing medium.
    pub(crate) fn commit(&self, id: &ContentId, value: u64) {
        let shard = self.shard(id.as_str());
        {
            let map = shard.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(counter) = map.get(id.as_str()) {
                counter.store(value, Ordering::Release);
                return;
            }
        }
        let mut map = shard.write().unwrap_or_else(PoisonError::into_inner);
        map.entry(id.clone())
            .or_insert_with(|| AtomicU64::new(0))
            .store(value, Ordering::Release);
    }

    /// Raises the count for `id` to at least `value`.
    pub(crate) fn raise(&self, id: &ContentId, value: u64) {
        let shard = self.shard(id.as_str());
        let mut map = shard.write().unwrap_or_else(PoisonError::into_inner);
        map.entry(id.clone())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_max(value, Ordering::AcqRel);
    }

    /// Returns `true` if `id` has an entry, even one holding 0.
    pub(crate) fn contains(&self, id: &str) -> bool {
        self.shard(id)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Removes `id`, returning its count.
    pub(crate) fn forget(&self, id: &str) -> Option<u64> {
        let mut map = self
            .shard(id)
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        map.remove(id).map(|c| c.into_inner())
    }
}

/// Adds one to `counter` unless it is saturated.
#[inline]
fn bump(counter: &AtomicU64, id: &str) -> Result<u64> {
    counter
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| c.checked_add(1))
        .map(|previous| previous + 1)
        .map_err(|_| StoreError::Overflow(id.to_string()))
}

impl CounterStore for MemoryStore {
    fn get(&self, id: &str) -> u64 {
        let id = id.trim();
        let map = self.shard(id).read().unwrap_or_else(PoisonError::into_inner);
        map.get(id).map_or(0, |c| c.load(Ordering::Acquire))
    }

    fn increment(&self, id: &str) -> Result<u64> {
        let id = ContentId::parse(id)?;
        let shard = self.shard(id.as_str());
        {
            let map = shard.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(counter) = map.get(id.as_str()) {
                return bump(counter, id.as_str());
            }
        }
        let mut map = shard.write().unwrap_or_else(PoisonError::into_inner);
        let name = id.as_str().to_string();
        let counter = map.entry(id).or_insert_with(|| AtomicU64::new(0));
        bump(counter, &name)
    }

    fn order_by_count(&self, direction: SortDirection, page: Page) -> Result<Vec<CounterRecord>> {
        Ok(sort_and_page(self.records(), direction, page))
    }

    fn remove(&self, id: &str) -> Result<Option<u64>> {
        let id = ContentId::parse(id)?;
        Ok(self.forget(id.as_str()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for MemoryStore {
    /// Formats the store showing the population of non-empty shards.
    ///
    /// Output format: `MemoryStore{ [shard]:ids [shard]:ids ... }`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryStore{{")?;
        for (i, shard) in self.shards.iter().enumerate() {
            let len = shard.read().unwrap_or_else(PoisonError::into_inner).len();
            if len != 0 {
                write!(f, " [{i}]:{len}")?;
            }
        }
        write!(f, " }}")
    }
}
