//! The view-tracking facade used by request handlers.
//!
//! [`ViewTracker`] wires a [`CounterStore`], a [`ViewGate`] and a
//! [`Formatter`] together and applies the failure policy for inline request
//! handling: counting a view and rendering a count never produce an error
//! the page has to deal with. A failed increment is logged and reported as
//! [`ViewOutcome::Failed`]; a failed read renders as 0.
//!
//! # Examples
//!
//! ```rust
//! use visite::gate::{RequestTarget, ViewDecisionContext};
//! use visite::store::memory::MemoryStore;
//! use visite::tracker::{ViewOutcome, ViewTracker};
//!
//! let tracker = ViewTracker::new(MemoryStore::new());
//! let ctx = ViewDecisionContext::new(RequestTarget::single("post"));
//!
//! assert_eq!(tracker.record_view("post-1", &ctx), ViewOutcome::Counted(1));
//! assert_eq!(tracker.views("post-1"), 1);
//! assert!(tracker.render("post-1").as_str().contains(">view<"));
//! ```

use crate::error::Result;
use crate::format::{Formatter, Fragment};
use crate::gate::{Decision, Rejection, ViewDecisionContext, ViewGate};
use crate::store::{ContentId, CounterStore};

/// What happened to one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOutcome {
    /// The view was counted; the new total.
    Counted(u64),
    /// The gate declined the request.
    Skipped(Rejection),
    /// The store could not record the view. Already logged.
    Failed,
}

/// Gate, store and formatter behind one handle.
#[derive(Debug)]
pub struct ViewTracker<S> {
    store: S,
    gate: ViewGate,
    formatter: Formatter,
}

impl<S: CounterStore> ViewTracker<S> {
    /// A tracker with the default gate and formatter.
    pub fn new(store: S) -> Self {
        Self {
            store,
            gate: ViewGate::default(),
            formatter: Formatter::default(),
        }
    }

    /// Replaces the gate.
    pub fn with_gate(mut self, gate: ViewGate) -> Self {
        self.gate = gate;
        self
    }

    /// Replaces the formatter.
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The gate.
    pub fn gate(&self) -> &ViewGate {
        &self.gate
    }

    /// The formatter.
    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    /// Mutable access to the formatter, for registering a post-processing transform.
    pub fn formatter_mut(&mut self) -> &mut Formatter {
        &mut self.formatter
    }

    /// Counts a view of `id` if the gate accepts `ctx`.
    ///
    /// Never fails: store errors are logged and reported as [`ViewOutcome::Failed`].
    pub fn record_view(&self, id: &str, ctx: &ViewDecisionContext) -> ViewOutcome {
        if let Decision::Skip(reason) = self.gate.evaluate(ctx) {
            tracing::debug!(id, %reason, "view skipped");
            return ViewOutcome::Skipped(reason);
        }
        match self.store.increment(id) {
            Ok(count) => ViewOutcome::Counted(count),
            Err(err) => {
                tracing::warn!(id, error = %err, "view not recorded");
                ViewOutcome::Failed
            }
        }
    }

    /// Counts a view of `id` if the gate accepts `ctx`, propagating store errors.
    ///
    /// Returns `Ok(None)` when the gate declines.
    pub fn try_record_view(&self, id: &str, ctx: &ViewDecisionContext) -> Result<Option<u64>> {
        match self.gate.evaluate(ctx) {
            Decision::Count => self.store.increment(id).map(Some),
            Decision::Skip(reason) => {
                tracing::debug!(id, %reason, "view skipped");
                Ok(None)
            }
        }
    }

    /// Current count of `id`; 0 when unknown or unreadable.
    pub fn views(&self, id: &str) -> u64 {
        self.store.get(id)
    }

    /// Renders the count of `id`.
    ///
    /// An invalid id renders as the empty fragment.
    pub fn render(&self, id: &str) -> Fragment {
        match ContentId::parse(id) {
            Ok(id) => self.formatter.format(id.as_str(), self.store.get(id.as_str())),
            Err(_) => Fragment::empty(),
        }
    }

    /// Drops the counter of a destroyed content item.
    pub fn remove(&self, id: &str) -> Result<Option<u64>> {
        self.store.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::gate::{GateConfig, RequestTarget};
    use crate::store::memory::MemoryStore;
    use crate::store::{CounterRecord, Page, SortDirection};
    use std::sync::Arc;
    use std::thread;

    /// A store whose backend is down: reads serve a fixed value, writes fail.
    struct DownStore {
        last_known: u64,
    }

    impl CounterStore for DownStore {
        fn get(&self, _id: &str) -> u64 {
            self.last_known
        }

        fn increment(&self, _id: &str) -> Result<u64> {
            Err(StoreError::from(std::io::Error::other("backend down")))
        }

        fn order_by_count(&self, _: SortDirection, _: Page) -> Result<Vec<CounterRecord>> {
            Err(StoreError::from(std::io::Error::other("backend down")))
        }

        fn remove(&self, _id: &str) -> Result<Option<u64>> {
            Err(StoreError::from(std::io::Error::other("backend down")))
        }
    }

    fn single_post() -> ViewDecisionContext {
        ViewDecisionContext::new(RequestTarget::single("post"))
    }

    #[test]
    fn test_counts_accepted_views() {
        let tracker = ViewTracker::new(MemoryStore::new());
        assert_eq!(tracker.record_view("p", &single_post()), ViewOutcome::Counted(1));
        assert_eq!(tracker.record_view("p", &single_post()), ViewOutcome::Counted(2));
        assert_eq!(tracker.views("p"), 2);
    }

    #[test]
    fn test_skipped_views_do_not_touch_store() {
        let tracker = ViewTracker::new(MemoryStore::new());
        assert_eq!(
            tracker.record_view("p", &single_post().with_editor(true)),
            ViewOutcome::Skipped(Rejection::Editor)
        );
        assert_eq!(
            tracker.record_view("p", &single_post().with_primary_query(false)),
            ViewOutcome::Skipped(Rejection::SecondaryQuery)
        );
        assert_eq!(
            tracker.record_view("p", &ViewDecisionContext::new(RequestTarget::Listing)),
            ViewOutcome::Skipped(Rejection::NotSingle)
        );
        assert!(tracker.store().is_empty());
    }

    #[test]
    fn test_store_failure_is_swallowed() {
        let tracker = ViewTracker::new(DownStore { last_known: 41 });
        assert_eq!(tracker.record_view("p", &single_post()), ViewOutcome::Failed);
        assert!(tracker.try_record_view("p", &single_post()).is_err());
        assert_eq!(tracker.views("p"), 41);
        assert!(tracker.render("p").as_str().contains(">41<"));
    }

    #[test]
    fn test_invalid_id_fails_quietly() {
        let tracker = ViewTracker::new(MemoryStore::new());
        assert_eq!(tracker.record_view("", &single_post()), ViewOutcome::Failed);
        assert!(tracker
            .try_record_view("", &single_post())
            .unwrap_err()
            .is_invalid_identifier());
        assert!(tracker.render("").is_empty());
        assert_eq!(tracker.views(""), 0);
    }

    #[test]
    fn test_render_unknown_is_zero_views() {
        let tracker = ViewTracker::new(MemoryStore::new());
        let html = tracker.render("never");
        assert!(html.as_str().contains(">0<"));
        assert!(html.as_str().contains(">views<"));
    }

    #[test]
    fn test_render_uses_registered_transform() {
        let mut tracker = ViewTracker::new(MemoryStore::new());
        tracker
            .formatter_mut()
            .set_post_process(|_, count, id| Fragment::text(&format!("{id}:{count}")));
        tracker.record_view("p", &single_post());
        assert_eq!(tracker.render("p").as_str(), "p:1");
    }

    #[test]
    fn test_custom_gate() {
        let tracker = ViewTracker::new(MemoryStore::new())
            .with_gate(ViewGate::with_config(GateConfig::new().with_counted_types(["page"])));
        let page = ViewDecisionContext::new(RequestTarget::single("page"));
        assert_eq!(tracker.record_view("about", &page), ViewOutcome::Counted(1));
        assert_eq!(
            tracker.record_view("p", &single_post()),
            ViewOutcome::Skipped(Rejection::UncountedType)
        );
    }

    #[test]
    fn test_shared_between_threads() {
        let tracker = Arc::new(ViewTracker::new(MemoryStore::new()));
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    for _ in 0..10 {
                        tracker.record_view("p", &single_post());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tracker.views("p"), 100);
    }

    #[test]
    fn test_remove() {
        let tracker = ViewTracker::new(MemoryStore::new());
        tracker.record_view("p", &single_post());
        assert_eq!(tracker.remove("p").unwrap(), Some(1));
        assert_eq!(tracker.views("p"), 0);
    }
}
