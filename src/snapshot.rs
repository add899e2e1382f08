//! Snapshot types for serializing store state.
//!
//! A [`StoreSnapshot`] is a point-in-time copy of every record a store
//! holds, ordered most viewed first. It serializes with any serde format and
//! can seed a fresh [`MemoryStore`](crate::store::memory::MemoryStore).
//!
//! # Feature Flag
//!
//! This module requires the `serde` feature:
//!
//! ```toml
//! [dependencies]
//! visite = { version = "0.1", features = ["serde"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use visite::snapshot::StoreSnapshot;
//! use visite::store::memory::MemoryStore;
//!
//! let store = MemoryStore::new();
//! store.increment("hello-world")?;
//!
//! let snapshot = StoreSnapshot::collect(&store)?;
//! let json = serde_json::to_string(&snapshot)?;
//! ```

use crate::error::Result;
use crate::store::memory::MemoryStore;
use crate::store::{CounterRecord, CounterStore, Page, SortDirection};
use serde::{Deserialize, Serialize};

/// Every record of a store at one instant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreSnapshot {
    /// Optional timestamp in milliseconds since Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
    /// The records, most viewed first.
    pub records: Vec<CounterRecord>,
}

impl StoreSnapshot {
    /// Creates a snapshot of the given records.
    pub fn new(records: Vec<CounterRecord>) -> Self {
        Self {
            timestamp_ms: None,
            records,
        }
    }

    /// Creates a snapshot with a timestamp.
    pub fn with_timestamp(records: Vec<CounterRecord>, timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms: Some(timestamp_ms),
            records,
        }
    }

    /// Reads every record of `store`, most viewed first.
    pub fn collect<S>(store: &S) -> Result<Self>
    where
        S: CounterStore + ?Sized,
    {
        Ok(Self::new(
            store.order_by_count(SortDirection::Descending, Page::all())?,
        ))
    }

    /// The count of `id`, if the snapshot holds it.
    pub fn get(&self, id: &str) -> Option<u64> {
        self.records
            .iter()
            .find(|r| r.id.as_str() == id)
            .map(|r| r.count)
    }

    /// Sum of all counts, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.records
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.count))
    }

    /// A memory store holding this snapshot's counts.
    pub fn restore(&self) -> MemoryStore {
        MemoryStore::from_records(self.records.iter().cloned())
    }
}
