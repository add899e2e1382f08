//! Sorting listings by view count.
//!
//! An external listing (typically the admin content table) issues sort
//! requests by field name. [`SortExtension`] claims exactly the requests
//! that come from the admin listing and name the view-count field, turning
//! them into a [`SortPlan::ByViewCount`] the store can execute. Every other
//! request is handed back untouched as [`SortPlan::PassThrough`].
//!
//! # Examples
//!
//! ```rust
//! use visite::sort::{ListingContext, SortExtension, SortPlan, SortRequest};
//! use visite::store::SortDirection;
//!
//! let ext = SortExtension::new();
//!
//! let by_views = SortRequest::new(ListingContext::Admin, "views", SortDirection::parse("asc"));
//! assert!(matches!(ext.rewrite(by_views), SortPlan::ByViewCount { .. }));
//!
//! let by_title = SortRequest::new(ListingContext::Admin, "title", SortDirection::Ascending);
//! assert_eq!(ext.rewrite(by_title.clone()), SortPlan::PassThrough(by_title));
//! ```

use crate::error::Result;
use crate::store::{CounterRecord, CounterStore, Page, SortDirection};

/// Name of the view-count pseudo-field.
pub const VIEW_COUNT_FIELD: &str = "views";

/// Where a listing is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingContext {
    /// The administration content table.
    Admin,
    /// A public-facing listing.
    Public,
}

/// A listing's request to order its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortRequest {
    /// Where the listing is rendered.
    pub context: ListingContext,
    /// The field to order by.
    pub field: String,
    /// Requested order.
    pub direction: SortDirection,
    /// Requested window.
    pub page: Page,
}

impl SortRequest {
    /// A request for every row.
    pub fn new(context: ListingContext, field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            context,
            field: field.into(),
            direction,
            page: Page::all(),
        }
    }

    /// Sets the requested window.
    pub fn with_page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }
}

/// Outcome of [`SortExtension::rewrite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortPlan {
    /// Order by view count, ties by id ascending.
    ByViewCount {
        /// Count order.
        direction: SortDirection,
        /// Window into the ordering.
        page: Page,
    },
    /// Not ours; the listing sorts this itself.
    PassThrough(SortRequest),
}

/// Integrates the counter store as a sortable listing field.
#[derive(Debug, Clone)]
pub struct SortExtension {
    field: String,
}

impl Default for SortExtension {
    fn default() -> Self {
        Self {
            field: VIEW_COUNT_FIELD.to_string(),
        }
    }
}

impl SortExtension {
    /// Claims the [`VIEW_COUNT_FIELD`] field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a differently named field instead.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// The claimed field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns `true` if this extension owns `request`.
    pub fn claims(&self, request: &SortRequest) -> bool {
        request.context == ListingContext::Admin && request.field == self.field
    }

    /// Rewrites an owned request into a store ordering; passes others through.
    pub fn rewrite(&self, request: SortRequest) -> SortPlan {
        if self.claims(&request) {
            SortPlan::ByViewCount {
                direction: request.direction,
                page: request.page,
            }
        } else {
            SortPlan::PassThrough(request)
        }
    }

    /// Runs a [`SortPlan::ByViewCount`] against `store`.
    ///
    /// Returns `Ok(None)` for a pass-through plan.
    pub fn execute<S>(&self, store: &S, plan: &SortPlan) -> Result<Option<Vec<CounterRecord>>>
    where
        S: CounterStore + ?Sized,
    {
        match plan {
            SortPlan::ByViewCount { direction, page } => {
                store.order_by_count(*direction, *page).map(Some)
            }
            SortPlan::PassThrough(_) => Ok(None),
        }
    }

    /// Orders a listing's own rows by their counts.
    ///
    /// Ids the store has never seen count 0. Ties are broken by id ascending.
    pub fn sort_ids<'a, S>(
        &self,
        store: &S,
        ids: &[&'a str],
        direction: SortDirection,
    ) -> Vec<(&'a str, u64)>
    where
        S: CounterStore + ?Sized,
    {
        let counts = store.get_many(ids);
        let mut rows: Vec<(&'a str, u64)> = ids.iter().copied().zip(counts).collect();
        rows.sort_by(|a, b| direction.compare(*a, *b));
        rows
    }
}
