//! Prometheus observer for exporting view counts using the official `prometheus` crate.
//!
//! This module provides [`PrometheusObserver`], which turns a store's
//! records into two metric families and renders them with the official
//! [`TextEncoder`](prometheus::TextEncoder):
//!
//! - `views_total`, a counter holding the sum of every count in the store
//! - `views{content_id="..."}`, a gauge per supplied record
//!
//! # Feature Flag
//!
//! This module requires the `prometheus` feature:
//!
//! ```toml
//! [dependencies]
//! visite = { version = "0.1", features = ["prometheus"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use visite::observers::prometheus::PrometheusObserver;
//! use visite::store::memory::MemoryStore;
//!
//! let store = MemoryStore::new();
//! store.increment("hello-world")?;
//!
//! let output = PrometheusObserver::new()
//!     .with_namespace("blog")
//!     .with_const_label("instance", "web-1")
//!     .render_top(&store, 50)?;
//! // # TYPE blog_views gauge
//! // blog_views{content_id="hello-world",instance="web-1"} 1
//! // # TYPE blog_views_total counter
//! // blog_views_total{instance="web-1"} 1
//! ```

use super::Result;
use crate::store::{CounterRecord, CounterStore, Page, SortDirection};
use prometheus::{Encoder, IntCounter, IntGaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;

/// Label carrying the content id on the per-item gauge.
pub const CONTENT_ID_LABEL: &str = "content_id";

/// Observer that exports view counts in Prometheus exposition format.
#[derive(Debug, Clone, Default)]
pub struct PrometheusObserver {
    /// Namespace (prefix) for all metrics.
    namespace: Option<String>,
    /// Subsystem for all metrics.
    subsystem: Option<String>,
    /// Constant labels applied to all metrics.
    const_labels: HashMap<String, String>,
}

impl PrometheusObserver {
    /// Creates a new `PrometheusObserver`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the namespace (prefix) for all metrics.
    ///
    /// Namespace "blog" turns `views_total` into `blog_views_total`.
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(Self::sanitize_name(namespace));
        self
    }

    /// Sets the subsystem for all metrics.
    ///
    /// The subsystem appears between namespace and metric name.
    pub fn with_subsystem(mut self, subsystem: &str) -> Self {
        self.subsystem = Some(Self::sanitize_name(subsystem));
        self
    }

    /// Adds a constant label to all metrics.
    pub fn with_const_label(mut self, name: &str, value: &str) -> Self {
        self.const_labels
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Sanitizes a name component to be Prometheus-compatible.
    ///
    /// Prometheus metric names must match `[a-zA-Z_:][a-zA-Z0-9_:]*`.
    fn sanitize_name(name: &str) -> String {
        let mut result: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if result.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            result.insert(0, '_');
        }
        result
    }

    fn opts(&self, name: &str, help: &str) -> Opts {
        let mut opts = Opts::new(name, help).const_labels(self.const_labels.clone());
        if let Some(ns) = &self.namespace {
            opts = opts.namespace(ns.clone());
        }
        if let Some(ss) = &self.subsystem {
            opts = opts.subsystem(ss.clone());
        }
        opts
    }

    /// Renders `records` as per-item gauges and `total` as the `views_total` counter.
    ///
    /// # Errors
    ///
    /// Returns an error if metric creation, registration, or encoding fails.
    pub fn render(&self, records: &[CounterRecord], total: u64) -> Result<String> {
        let registry = Registry::new();

        let views_total =
            IntCounter::with_opts(self.opts("views_total", "Views counted across all content"))?;
        views_total.inc_by(total);
        registry.register(Box::new(views_total))?;

        if !records.is_empty() {
            let views = IntGaugeVec::new(
                self.opts("views", "Views counted per content item"),
                &[CONTENT_ID_LABEL],
            )?;
            for record in records {
                views
                    .with_label_values(&[record.id.as_str()])
                    .set(i64::try_from(record.count).unwrap_or(i64::MAX));
            }
            registry.register(Box::new(views))?;
        }

        Self::encode_registry(&registry)
    }

    /// Renders the store's grand total and its `limit` most viewed items.
    pub fn render_top<S>(&self, store: &S, limit: usize) -> Result<String>
    where
        S: CounterStore + ?Sized,
    {
        let mut records = store.order_by_count(SortDirection::Descending, Page::all())?;
        let total = records
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.count));
        records.truncate(limit);
        self.render(&records, total)
    }

    /// Encodes a registry to the text exposition format.
    pub fn encode_registry(registry: &Registry) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
