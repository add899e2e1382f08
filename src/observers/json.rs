//! JSON observer for serializing view counts.
//!
//! This module provides [`JsonObserver`], which serializes [`CounterRecord`]s
//! to JSON using serde, either as a bare array or wrapped in a
//! [`StoreSnapshot`], and parses snapshots back.
//!
//! # Feature Flag
//!
//! This module requires the `json` feature:
//!
//! ```toml
//! [dependencies]
//! visite = { version = "0.1", features = ["json"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use visite::observers::json::JsonObserver;
//! use visite::store::memory::MemoryStore;
//!
//! let store = MemoryStore::new();
//! store.increment("hello-world")?;
//!
//! let json = JsonObserver::new().snapshot_json(&store)?;
//! println!("{}", json);
//! // [{"id":"hello-world","count":1}]
//! ```

use super::Result;
use crate::snapshot::StoreSnapshot;
use crate::store::{CounterRecord, CounterStore};

/// Configuration for the JSON observer.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct JsonConfig {
    /// Whether to pretty-print the JSON output.
    pub pretty: bool,
    /// Whether to include a timestamp in the output.
    pub include_timestamp: bool,
    /// Whether to wrap records in a [`StoreSnapshot`] object.
    pub wrap_in_snapshot: bool,
}

/// An observer that serializes view counts to JSON.
///
/// # Examples
///
/// ```rust,ignore
/// use visite::observers::json::JsonObserver;
///
/// let observer = JsonObserver::new()
///     .pretty(true)
///     .wrap_in_snapshot(true)
///     .include_timestamp(true);
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonObserver {
    config: JsonConfig,
}

impl JsonObserver {
    /// Creates a new JSON observer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new JSON observer with the specified configuration.
    pub fn with_config(config: JsonConfig) -> Self {
        Self { config }
    }

    /// Enables or disables pretty-printing.
    pub fn pretty(mut self, enabled: bool) -> Self {
        self.config.pretty = enabled;
        self
    }

    /// Enables or disables timestamp inclusion.
    ///
    /// Only has effect when `wrap_in_snapshot` is also enabled.
    pub fn include_timestamp(mut self, enabled: bool) -> Self {
        self.config.include_timestamp = enabled;
        self
    }

    /// Enables or disables wrapping the output in a [`StoreSnapshot`].
    pub fn wrap_in_snapshot(mut self, enabled: bool) -> Self {
        self.config.wrap_in_snapshot = enabled;
        self
    }

    fn encode<T: serde::Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.config.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(json)
    }

    /// Serializes the records, in the given order.
    pub fn to_json(&self, records: &[CounterRecord]) -> Result<String> {
        if self.config.wrap_in_snapshot {
            let snapshot = if self.config.include_timestamp {
                StoreSnapshot::with_timestamp(records.to_vec(), current_timestamp_ms())
            } else {
                StoreSnapshot::new(records.to_vec())
            };
            self.encode(&snapshot)
        } else {
            self.encode(&records)
        }
    }

    /// Serializes every record of `store`, most viewed first.
    pub fn snapshot_json<S>(&self, store: &S) -> Result<String>
    where
        S: CounterStore + ?Sized,
    {
        let snapshot = StoreSnapshot::collect(store)?;
        self.to_json(&snapshot.records)
    }

    /// Parses JSON produced by this observer in either shape.
    pub fn parse_snapshot(json: &str) -> Result<StoreSnapshot> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let snapshot = if value.is_array() {
            StoreSnapshot::new(serde_json::from_value(value)?)
        } else {
            serde_json::from_value(value)?
        };
        Ok(snapshot)
    }
}

/// Returns the current timestamp in milliseconds since Unix epoch.
fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
