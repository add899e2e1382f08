//! Exporters for view counts.
//!
//! This module provides ways to look at what a store holds:
//!
//! - [`table`] - Pretty-print a leaderboard using the `tabled` crate
//! - [`json`] - Serialize records and snapshots to JSON
//! - [`prometheus`] - Export counts in Prometheus exposition format
//!
//! # Unified Error Handling
//!
//! All observers use a unified [`ObserverError`] type, allowing you to switch
//! between observers without changing error handling code.
//!
//! # Feature Flags
//!
//! Each observer is gated behind a feature flag to minimize dependencies:
//!
//! - `table` - Enables the [`table`] module
//! - `json` - Enables the [`json`] module
//! - `prometheus` - Enables the [`prometheus`] module
//! - `full` - Enables all observer modules
//!
//! # Example
//!
//! ```rust,ignore
//! use visite::observers::Result;
//! use visite::store::CounterStore;
//!
//! fn export(store: &dyn CounterStore) -> Result<()> {
//!     #[cfg(feature = "table")]
//!     {
//!         use visite::observers::table::TableObserver;
//!         println!("{}", TableObserver::new().render_top(store, 10)?);
//!     }
//!
//!     #[cfg(feature = "prometheus")]
//!     {
//!         use visite::observers::prometheus::PrometheusObserver;
//!         println!("{}", PrometheusObserver::new().render_top(store, 100)?);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod error;

pub use error::{ObserverError, Result};

#[cfg(feature = "table")]
pub mod table;

#[cfg(feature = "json")]
pub mod json;

#[cfg(feature = "prometheus")]
pub mod prometheus;
