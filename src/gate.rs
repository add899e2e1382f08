//! Deciding whether a request counts as a view.
//!
//! [`ViewGate`] is a pure function of a [`ViewDecisionContext`]: the host
//! classifies the request and reports whether the viewer may edit content,
//! and the gate answers whether the store should be incremented. Three rules
//! must all pass:
//!
//! 1. the request targets a single content item of a counted type
//! 2. it is the page's primary query, not an embedded or secondary lookup
//! 3. the viewer cannot edit content, so review traffic never inflates counts
//!
//! # Examples
//!
//! ```rust
//! use visite::gate::{RequestTarget, ViewDecisionContext, ViewGate};
//!
//! let gate = ViewGate::new();
//! let ctx = ViewDecisionContext::new(RequestTarget::single("post"));
//! assert!(gate.should_count(&ctx));
//! assert!(!gate.should_count(&ctx.clone().with_editor(true)));
//! assert!(!gate.should_count(&ctx.with_primary_query(false)));
//! ```

use std::collections::BTreeSet;
use std::fmt::{self, Display};

/// Content type counted when no configuration is given.
pub const DEFAULT_COUNTED_TYPE: &str = "post";

/// What the current request resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTarget {
    /// A single content item of the given type.
    Single {
        /// The item's content type, such as `post` or `page`.
        content_type: String,
    },
    /// An index or search listing several items.
    Listing,
    /// A date, author or taxonomy archive.
    Archive,
    /// Anything else: feeds, admin screens, assets.
    Other,
}

impl RequestTarget {
    /// A single item of `content_type`.
    pub fn single(content_type: impl Into<String>) -> Self {
        RequestTarget::Single {
            content_type: content_type.into(),
        }
    }
}

/// Per-request facts the gate decides on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewDecisionContext {
    /// What the request resolves to.
    pub target: RequestTarget,
    /// Whether this is the request's main content query.
    pub is_primary_query: bool,
    /// Whether the viewer holds the editing capability.
    pub viewer_can_edit: bool,
}

impl ViewDecisionContext {
    /// A primary-query context for an anonymous viewer.
    pub fn new(target: RequestTarget) -> Self {
        Self {
            target,
            is_primary_query: true,
            viewer_can_edit: false,
        }
    }

    /// Sets whether this is the primary query.
    pub fn with_primary_query(mut self, primary: bool) -> Self {
        self.is_primary_query = primary;
        self
    }

    /// Sets whether the viewer can edit content.
    pub fn with_editor(mut self, can_edit: bool) -> Self {
        self.viewer_can_edit = can_edit;
        self
    }
}

/// Why a request was not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// The request does not target a single item.
    NotSingle,
    /// The item's content type is not counted.
    UncountedType,
    /// A secondary query on the same page.
    SecondaryQuery,
    /// The viewer can edit content.
    Editor,
}

impl Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rejection::NotSingle => "not a single item",
            Rejection::UncountedType => "content type not counted",
            Rejection::SecondaryQuery => "secondary query",
            Rejection::Editor => "viewer can edit",
        })
    }
}

/// The gate's answer for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Increment the item's counter.
    Count,
    /// Leave the counter alone.
    Skip(Rejection),
}

impl Decision {
    /// Returns `true` for [`Decision::Count`].
    pub fn is_count(&self) -> bool {
        matches!(self, Decision::Count)
    }
}

/// Configuration for [`ViewGate`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct GateConfig {
    /// Content types whose single-item views are counted.
    pub counted_types: BTreeSet<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            counted_types: BTreeSet::from([DEFAULT_COUNTED_TYPE.to_string()]),
        }
    }
}

impl GateConfig {
    /// Counts only [`DEFAULT_COUNTED_TYPE`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the counted content types.
    pub fn with_counted_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.counted_types = types.into_iter().map(Into::into).collect();
        self
    }
}

/// Decides which requests increment a counter.
#[derive(Debug, Clone, Default)]
pub struct ViewGate {
    config: GateConfig,
}

impl ViewGate {
    /// A gate counting single `post` views.
    pub fn new() -> Self {
        Self::default()
    }

    /// A gate with the given configuration.
    pub fn with_config(config: GateConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Evaluates the rules in order and reports the first that fails.
    pub fn evaluate(&self, ctx: &ViewDecisionContext) -> Decision {
        let content_type = match &ctx.target {
            RequestTarget::Single { content_type } => content_type,
            _ => return Decision::Skip(Rejection::NotSingle),
        };
        if !self.config.counted_types.contains(content_type) {
            return Decision::Skip(Rejection::UncountedType);
        }
        if !ctx.is_primary_query {
            return Decision::Skip(Rejection::SecondaryQuery);
        }
        if ctx.viewer_can_edit {
            return Decision::Skip(Rejection::Editor);
        }
        Decision::Count
    }

    /// Returns `true` if the request should increment the counter.
    pub fn should_count(&self, ctx: &ViewDecisionContext) -> bool {
        self.evaluate(ctx).is_count()
    }
}
