//! # Visite - Durable, Concurrent View Counting
//!
//! A Rust library for counting how many times each piece of content has been
//! viewed. It keeps one cumulative counter per content id, decides which
//! requests count as a view, renders the count as an HTML fragment, and lets
//! an admin listing sort content by popularity.
//!
//! ## The Problem
//!
//! A counter that is read, incremented in application code, and written back
//! loses updates as soon as two requests for the same page overlap: both read
//! `n`, both write `n + 1`. On a busy page this silently undercounts, and the
//! error grows with traffic.
//!
//! ## The Solution
//!
//! Every increment here is a single atomic step inside the store:
//!
//! 1. **In memory**: the id's counter is an `AtomicU64` updated with a
//!    compare-and-swap loop, inside a map split into 64 cache-padded shards
//!    so unrelated ids rarely contend.
//!
//! 2. **Journal file**: increments serialize through one writer. The new
//!    count is appended to the file before it becomes visible, so a count
//!    that was returned is a count that was written.
//!
//! 3. **SQLite**: the database does the arithmetic (`views = views + 1`) in
//!    one upsert, so even separate processes sharing the file never lose
//!    updates.
//!
//! ## Components
//!
//! | Type | Role |
//! |------|------|
//! | [`CounterStore`](store::CounterStore) | get, atomic increment, ordered pagination |
//! | [`ViewGate`](gate::ViewGate) | decides whether a request counts as a view |
//! | [`Formatter`](format::Formatter) | renders a count as escaped HTML, with an optional post-processing transform |
//! | [`SortExtension`](sort::SortExtension) | makes view count a sortable field of the admin listing |
//! | [`ViewTracker`](tracker::ViewTracker) | wires the above together for request handlers |
//!
//! ## Quick Start
//!
//! ```rust
//! use visite::gate::{RequestTarget, ViewDecisionContext};
//! use visite::store::memory::MemoryStore;
//! use visite::tracker::ViewTracker;
//!
//! let tracker = ViewTracker::new(MemoryStore::new());
//!
//! // A visitor opens a single post
//! let ctx = ViewDecisionContext::new(RequestTarget::single("post"));
//! tracker.record_view("hello-world", &ctx);
//!
//! // The post's author previews it; not counted
//! tracker.record_view("hello-world", &ctx.clone().with_editor(true));
//!
//! assert_eq!(tracker.views("hello-world"), 1);
//! println!("{}", tracker.render("hello-world"));
//! ```
//!
//! ## Durable Stores
//!
//! ```rust,ignore
//! use visite::store::journal::{JournalConfig, JournalStore};
//!
//! let store = JournalStore::open("views.jsonl", JournalConfig::default())?;
//! store.increment("hello-world")?;
//! ```
//!
//! Failures never reach the page: [`ViewTracker::record_view`](tracker::ViewTracker::record_view)
//! logs a failed increment through `tracing` and reports it as
//! [`ViewOutcome::Failed`](tracker::ViewOutcome::Failed), and reads that
//! cannot reach the backend render as the last known count, or 0.
//!
//! ## Feature Flags
//!
//! | Feature | Module | Description |
//! |---------|--------|-------------|
//! | `journal` (default) | `store::journal` | Append-only JSON-lines store |
//! | `sqlite` | `store::sqlite` | SQLite-backed store |
//! | `serde` | `snapshot` | Serializable records, snapshots and configs |
//! | `table` | `observers::table` | Pretty-print a leaderboard as an ASCII table |
//! | `json` | `observers::json` | Serialize records to JSON |
//! | `prometheus` | `observers::prometheus` | Export in Prometheus exposition format |
//! | `full` | All of the above | |

pub mod error;
pub mod format;
pub mod gate;
pub mod observers;
pub mod retry;
pub mod sort;
pub mod store;
pub mod tracker;

#[cfg(feature = "serde")]
pub mod snapshot;

pub use error::{Result, StoreError};
