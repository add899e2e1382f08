//! Table observer for pretty-printing view counts.
//!
//! This module provides [`TableObserver`], which renders [`CounterRecord`]s
//! as a formatted ASCII table using the `tabled` crate. Records are shown in
//! the order given, so render the output of
//! [`CounterStore::order_by_count`] to get a leaderboard.
//!
//! # Feature Flag
//!
//! This module requires the `table` feature:
//!
//! ```toml
//! [dependencies]
//! visite = { version = "0.1", features = ["table"] }
//! ```
//!
//! # Examples
//!
//! ## Standard format
//!
//! ```rust,ignore
//! use visite::observers::table::{TableObserver, TableStyle};
//! use visite::store::memory::MemoryStore;
//!
//! let store = MemoryStore::new();
//! store.increment("hello-world")?;
//!
//! let observer = TableObserver::new().with_style(TableStyle::Rounded);
//! println!("{}", observer.render_top(&store, 10)?);
//! // ╭──────┬─────────────┬───────╮
//! // │ Rank │ Content     │ Views │
//! // ├──────┼─────────────┼───────┤
//! // │ 1    │ hello-world │ 1     │
//! // ╰──────┴─────────────┴───────╯
//! ```
//!
//! ## Compact format (multiple columns)
//!
//! ```rust,ignore
//! let observer = TableObserver::new().compact(true).columns(3);
//! println!("{}", observer.render(&records));
//! // ╭────────────────┬──────────────┬──────────╮
//! // │ about: 12,004  │ contact: 310 │ faq: 97  │
//! // ╰────────────────┴──────────────┴──────────╯
//! ```

use super::Result;
use crate::format::NumberLocale;
use crate::store::{CounterRecord, CounterStore, Page, SortDirection};
use tabled::{builder::Builder, settings::Style, Table, Tabled};

/// Available table styles for rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableStyle {
    /// ASCII table with simple characters: +, -, |
    Ascii,
    /// Modern rounded corners (default)
    #[default]
    Rounded,
    /// Sharp corners with box-drawing characters
    Sharp,
    /// Modern style with clean lines
    Modern,
    /// GitHub-flavored Markdown table
    Markdown,
    /// No borders, just spacing
    Blank,
}

/// Separator style between id and count in compact mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompactSeparator {
    /// "id: count"
    #[default]
    Colon,
    /// "id = count"
    Equals,
    /// "id → count"
    Arrow,
}

impl CompactSeparator {
    /// Returns the separator string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompactSeparator::Colon => ": ",
            CompactSeparator::Equals => " = ",
            CompactSeparator::Arrow => " → ",
        }
    }
}

/// Configuration for the table observer.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// The style to use for rendering.
    pub style: TableStyle,
    /// Whether to show the header row (only in non-compact mode).
    pub show_header: bool,
    /// Custom title for the table (optional).
    pub title: Option<String>,
    /// Whether to use compact format (id: count in cells).
    pub compact: bool,
    /// Number of columns in compact mode (default: 1).
    pub columns: usize,
    /// Separator between id and count in compact mode.
    pub separator: CompactSeparator,
    /// Digit grouping for counts.
    pub locale: NumberLocale,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            style: TableStyle::default(),
            show_header: true,
            title: None,
            compact: false,
            columns: 1,
            separator: CompactSeparator::default(),
            locale: NumberLocale::default(),
        }
    }
}

#[derive(Tabled)]
struct ViewRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Content")]
    content: String,
    #[tabled(rename = "Views")]
    views: String,
}

/// An observer that renders view counts as a formatted ASCII table.
///
/// Supports two rendering modes:
///
/// 1. **Standard mode**: Rank, Content and Views columns
/// 2. **Compact mode**: Multi-column grid with "id: count" cells
#[derive(Debug, Clone, Default)]
pub struct TableObserver {
    config: TableConfig,
}

impl TableObserver {
    /// Creates a new table observer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new table observer with the specified configuration.
    pub fn with_config(config: TableConfig) -> Self {
        Self { config }
    }

    /// Sets the table style.
    pub fn with_style(mut self, style: TableStyle) -> Self {
        self.config.style = style;
        self
    }

    /// Sets whether to show the header row.
    ///
    /// Only applies in standard (non-compact) mode.
    pub fn with_header(mut self, show: bool) -> Self {
        self.config.show_header = show;
        self
    }

    /// Sets an optional title for the table.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    /// Sets digit grouping for the counts.
    pub fn with_locale(mut self, locale: NumberLocale) -> Self {
        self.config.locale = locale;
        self
    }

    /// Enables or disables compact mode.
    pub fn compact(mut self, enabled: bool) -> Self {
        self.config.compact = enabled;
        self
    }

    /// Sets the number of columns in compact mode.
    ///
    /// Values less than 1 are treated as 1.
    pub fn columns(mut self, count: usize) -> Self {
        self.config.columns = count.max(1);
        self
    }

    /// Sets the separator between id and count in compact mode.
    pub fn separator(mut self, sep: CompactSeparator) -> Self {
        self.config.separator = sep;
        self
    }

    fn apply_style(&self, table: &mut Table) {
        match self.config.style {
            TableStyle::Ascii => {
                table.with(Style::ascii());
            }
            TableStyle::Rounded => {
                table.with(Style::rounded());
            }
            TableStyle::Sharp => {
                table.with(Style::sharp());
            }
            TableStyle::Modern => {
                table.with(Style::modern());
            }
            TableStyle::Markdown => {
                table.with(Style::markdown());
            }
            TableStyle::Blank => {
                table.with(Style::blank());
            }
        }
    }

    fn titled(&self, table: Table) -> String {
        match &self.config.title {
            Some(title) => format!("{}\n{}", title, table),
            None => table.to_string(),
        }
    }

    fn render_compact(&self, records: &[CounterRecord]) -> String {
        if records.is_empty() {
            return String::new();
        }

        let cols = self.config.columns;
        let mut builder = Builder::default();
        for chunk in records.chunks(cols) {
            let mut row: Vec<String> = chunk
                .iter()
                .map(|r| {
                    format!(
                        "{}{}{}",
                        r.id,
                        self.config.separator.as_str(),
                        self.config.locale.group(r.count)
                    )
                })
                .collect();
            row.resize(cols, String::new());
            builder.push_record(row);
        }

        let mut table = builder.build();
        self.apply_style(&mut table);
        self.titled(table)
    }

    fn render_standard(&self, records: &[CounterRecord]) -> String {
        let rows: Vec<ViewRow> = records
            .iter()
            .enumerate()
            .map(|(i, r)| ViewRow {
                rank: i + 1,
                content: r.id.to_string(),
                views: self.config.locale.group(r.count),
            })
            .collect();

        let mut table = Table::new(&rows);
        self.apply_style(&mut table);

        if !self.config.show_header {
            table.with(tabled::settings::Remove::row(
                tabled::settings::object::Rows::first(),
            ));
        }

        self.titled(table)
    }

    /// Renders the records, in the given order, as a table string.
    pub fn render(&self, records: &[CounterRecord]) -> String {
        if self.config.compact {
            self.render_compact(records)
        } else {
            self.render_standard(records)
        }
    }

    /// Renders the `limit` most viewed items of `store`.
    pub fn render_top<S>(&self, store: &S, limit: usize) -> Result<String>
    where
        S: CounterStore + ?Sized,
    {
        let records = store.order_by_count(SortDirection::Descending, Page::first(limit))?;
        Ok(self.render(&records))
    }
}
