//! Rendering view counts for display.
//!
//! [`Formatter`] turns a raw count into a ready-to-embed HTML [`Fragment`]:
//! the number grouped per a [`NumberLocale`], followed by the singular or
//! plural label, wrapped in spans with an accessible `aria-label`. Every
//! interpolated string is escaped with [`escape_html`], so callers embed the
//! result without further escaping decisions.
//!
//! # Post-processing
//!
//! One transform can be registered with
//! [`set_post_process`](Formatter::set_post_process). It receives the
//! rendered fragment, the raw count and the content id, and whatever it
//! returns is the final output. Registering again replaces the previous
//! transform.
//!
//! # Examples
//!
//! ```rust
//! use visite::format::Formatter;
//!
//! let formatter = Formatter::new();
//! assert_eq!(formatter.format_count(1250), "1,250");
//!
//! let html = formatter.format("post-1", 1250);
//! assert!(html.as_str().contains(">1,250<"));
//! assert!(html.as_str().contains("views"));
//! ```

use std::fmt::{self, Debug, Display};
use std::sync::Arc;

/// Transform applied to every rendered fragment: `(fragment, count, id)`.
pub type PostProcess = Arc<dyn Fn(Fragment, u64, &str) -> Fragment + Send + Sync>;

/// Escapes `&`, `<`, `>`, `"` and `'` for HTML text and attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A piece of HTML safe to embed as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Fragment(String);

impl Fragment {
    /// The empty fragment, rendered when nothing can be shown.
    pub fn empty() -> Self {
        Fragment(String::new())
    }

    /// Wraps markup the caller has already made safe.
    ///
    /// Post-processing transforms use this to return their own markup; any
    /// text they interpolate must go through [`escape_html`] first.
    pub fn from_trusted_html(html: impl Into<String>) -> Self {
        Fragment(html.into())
    }

    /// Builds a fragment from plain text, escaping it.
    pub fn text(raw: &str) -> Self {
        Fragment(escape_html(raw))
    }

    /// The markup.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the fragment, returning the markup.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Returns `true` if there is nothing to render.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digit grouping rules for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct NumberLocale {
    /// Inserted between digit groups.
    pub separator: String,
    /// Digits per group, counted from the right. 0 disables grouping.
    pub group_size: usize,
}

impl Default for NumberLocale {
    fn default() -> Self {
        Self::en_us()
    }
}

impl NumberLocale {
    /// A custom separator with groups of three.
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            group_size: 3,
        }
    }

    /// `1,250`
    pub fn en_us() -> Self {
        Self::new(",")
    }

    /// `1.250`
    pub fn de_de() -> Self {
        Self::new(".")
    }

    /// `1 250` with a narrow no-break space.
    pub fn fr_fr() -> Self {
        Self::new("\u{202F}")
    }

    /// `1250`
    pub fn plain() -> Self {
        Self {
            separator: String::new(),
            group_size: 0,
        }
    }

    /// Sets the group size.
    pub fn with_group_size(mut self, size: usize) -> Self {
        self.group_size = size;
        self
    }

    /// Formats `n` with this locale's grouping.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use visite::format::NumberLocale;
    ///
    /// assert_eq!(NumberLocale::en_us().group(1234567), "1,234,567");
    /// assert_eq!(NumberLocale::de_de().group(1250), "1.250");
    /// assert_eq!(NumberLocale::plain().group(1250), "1250");
    /// ```
    pub fn group(&self, n: u64) -> String {
        let digits = n.to_string();
        let len = digits.len();
        if self.separator.is_empty() || self.group_size == 0 || len <= self.group_size {
            return digits;
        }

        let mut out = String::with_capacity(len + self.separator.len() * (len / self.group_size));
        let head = match len % self.group_size {
            0 => self.group_size,
            r => r,
        };
        out.push_str(&digits[..head]);
        let mut i = head;
        while i < len {
            out.push_str(&self.separator);
            out.push_str(&digits[i..i + self.group_size]);
            i += self.group_size;
        }
        out
    }
}

/// Singular and plural nouns shown next to the number.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct Labels {
    /// Used when the count is exactly 1.
    pub singular: String,
    /// Used for every other count, including 0.
    pub plural: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self::new("view", "views")
    }
}

impl Labels {
    /// Creates a label pair.
    pub fn new(singular: impl Into<String>, plural: impl Into<String>) -> Self {
        Self {
            singular: singular.into(),
            plural: plural.into(),
        }
    }

    /// Picks the label for `count`.
    pub fn for_count(&self, count: u64) -> &str {
        if count == 1 {
            &self.singular
        } else {
            &self.plural
        }
    }
}

/// Default CSS class of the outer span.
pub const DEFAULT_CLASS: &str = "post-views";

/// Renders counts as HTML fragments.
#[derive(Clone)]
pub struct Formatter {
    locale: NumberLocale,
    labels: Labels,
    class: String,
    post_process: Option<PostProcess>,
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            locale: NumberLocale::default(),
            labels: Labels::default(),
            class: DEFAULT_CLASS.to_string(),
            post_process: None,
        }
    }
}

impl Formatter {
    /// US English grouping, "view"/"views", class `post-views`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number locale.
    pub fn with_locale(mut self, locale: NumberLocale) -> Self {
        self.locale = locale;
        self
    }

    /// Sets the labels.
    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    /// Sets the CSS class of the outer span. Inner spans get `-count` and `-label` suffixes.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    /// Returns the number locale.
    pub fn locale(&self) -> &NumberLocale {
        &self.locale
    }

    /// Registers the post-processing transform, replacing any previous one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use visite::format::{Formatter, Fragment};
    ///
    /// let mut formatter = Formatter::new();
    /// formatter.set_post_process(|fragment, count, _id| {
    ///     if count == 0 {
    ///         Fragment::empty()
    ///     } else {
    ///         Fragment::from_trusted_html(format!("<p>{fragment}</p>"))
    ///     }
    /// });
    /// assert!(formatter.format("post-1", 0).is_empty());
    /// assert!(formatter.format("post-1", 3).as_str().starts_with("<p>"));
    /// ```
    pub fn set_post_process<F>(&mut self, transform: F)
    where
        F: Fn(Fragment, u64, &str) -> Fragment + Send + Sync + 'static,
    {
        self.post_process = Some(Arc::new(transform));
    }

    /// Removes the post-processing transform.
    pub fn clear_post_process(&mut self) {
        self.post_process = None;
    }

    /// Returns `true` if a transform is registered.
    pub fn has_post_process(&self) -> bool {
        self.post_process.is_some()
    }

    /// Formats just the grouped number, unescaped.
    pub fn format_count(&self, count: u64) -> String {
        self.locale.group(count)
    }

    /// Renders the default fragment, without post-processing.
    pub fn render_default(&self, count: u64) -> Fragment {
        let number = escape_html(&self.format_count(count));
        let label = escape_html(self.labels.for_count(count));
        let class = escape_html(&self.class);
        Fragment(format!(
            "<span class=\"{class}\" aria-label=\"{number} {label}\">\
             <span class=\"{class}-count\">{number}</span> \
             <span class=\"{class}-label\">{label}</span></span>"
        ))
    }

    /// Renders `count` for content item `id`, applying the registered transform.
    pub fn format(&self, id: &str, count: u64) -> Fragment {
        let fragment = self.render_default(count);
        match &self.post_process {
            Some(transform) => transform(fragment, count, id),
            None => fragment,
        }
    }
}

impl Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatter")
            .field("locale", &self.locale)
            .field("labels", &self.labels)
            .field("class", &self.class)
            .field("post_process", &self.post_process.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singular_and_plural() {
        let formatter = Formatter::new();
        assert!(formatter.format("p", 1).as_str().contains(">view<"));
        assert!(formatter.format("p", 0).as_str().contains(">views<"));
        assert!(formatter.format("p", 2).as_str().contains(">views<"));
    }

    #[test]
    fn test_grouping_in_fragment() {
        let html = Formatter::new().format("p", 1250).into_string();
        assert_eq!(
            html,
            "<span class=\"post-views\" aria-label=\"1,250 views\">\
             <span class=\"post-views-count\">1,250</span> \
             <span class=\"post-views-label\">views</span></span>"
        );
    }

    #[test]
    fn test_group_boundaries() {
        let en = NumberLocale::en_us();
        assert_eq!(en.group(0), "0");
        assert_eq!(en.group(999), "999");
        assert_eq!(en.group(1000), "1,000");
        assert_eq!(en.group(100000), "100,000");
        assert_eq!(en.group(u64::MAX), "18,446,744,073,709,551,615");
        assert_eq!(NumberLocale::fr_fr().group(1250), "1\u{202F}250");
        assert_eq!(NumberLocale::new(",").with_group_size(2).group(12345), "1,23,45");
    }

    #[test]
    fn test_labels_and_class_are_escaped() {
        let formatter = Formatter::new()
            .with_labels(Labels::new("<b>hit</b>", "\"hits\""))
            .with_class("a\"b");
        let one = formatter.format("p", 1).into_string();
        assert!(one.contains("&lt;b&gt;hit&lt;/b&gt;"));
        assert!(!one.contains("<b>"));
        assert!(one.contains("class=\"a&quot;b\""));
        let many = formatter.format("p", 5).into_string();
        assert!(many.contains("&quot;hits&quot;"));
    }

    #[test]
    fn test_separator_is_escaped() {
        let formatter = Formatter::new().with_locale(NumberLocale::new("&"));
        assert!(formatter.format("p", 1000).as_str().contains(">1&amp;000<"));
        assert_eq!(formatter.format_count(1000), "1&000");
    }

    #[test]
    fn test_no_transform_returns_default() {
        let formatter = Formatter::new();
        assert!(!formatter.has_post_process());
        assert_eq!(formatter.format("p", 7), formatter.render_default(7));
    }

    #[test]
    fn test_transform_output_is_final() {
        let mut formatter = Formatter::new();
        formatter.set_post_process(|_, count, id| {
            Fragment::from_trusted_html(format!("{}={}", escape_html(id), count))
        });
        assert_eq!(formatter.format("a<b", 3).as_str(), "a&lt;b=3");
    }

    #[test]
    fn test_transform_receives_default_fragment() {
        let mut formatter = Formatter::new();
        let expected = formatter.render_default(12);
        formatter.set_post_process(move |fragment, _, _| {
            assert_eq!(fragment, expected);
            fragment
        });
        formatter.format("p", 12);
    }

    #[test]
    fn test_last_registered_wins() {
        let mut formatter = Formatter::new();
        formatter.set_post_process(|_, _, _| Fragment::text("first"));
        formatter.set_post_process(|_, _, _| Fragment::text("second"));
        assert_eq!(formatter.format("p", 1).as_str(), "second");

        formatter.clear_post_process();
        assert_eq!(formatter.format("p", 1), formatter.render_default(1));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a&b<c>\"d'"), "a&amp;b&lt;c&gt;&quot;d&#39;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_debug_hides_closure() {
        let mut formatter = Formatter::new();
        formatter.set_post_process(|f, _, _| f);
        let debug_str = format!("{:?}", formatter);
        assert!(debug_str.contains("post_process: true"));
    }
}
