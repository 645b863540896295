//! Parsed documents
//!
//! A [`Document`] is built once from a successful fetch and never changes
//! afterwards. Title and text are extracted eagerly with `scraper`
//! (html5ever), which recovers from any markup it is given: missing tags,
//! unescaped entities and unclosed elements all still yield a tree, so
//! parsing never fails.

use crate::crawler::links::extract_uris;
use crate::storage::{format_last_update, StoredRecord};
use chrono::{DateTime, Local};
use scraper::{Html, Selector};

/// Elements whose text content is never rendered
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// A successfully fetched and parsed document
#[derive(Debug, Clone)]
pub struct Document {
    origin: String,
    raw_source: String,
    title: Option<String>,
    text: String,
    fetched_at: DateTime<Local>,
}

impl Document {
    /// Parses `raw_source` fetched from `origin`
    ///
    /// # Example
    ///
    /// ```
    /// use walker::crawler::Document;
    ///
    /// let doc = Document::parse(
    ///     "http://example.com",
    ///     "<title>Hi</title><p>Hello <b>world</b>",
    ///     chrono::Local::now(),
    /// );
    /// assert_eq!(doc.title(), Some("Hi"));
    /// assert_eq!(doc.text(), "HiHello world");
    /// ```
    pub fn parse(
        origin: impl Into<String>,
        raw_source: impl Into<String>,
        fetched_at: DateTime<Local>,
    ) -> Self {
        let raw_source = raw_source.into();
        let html = Html::parse_document(&raw_source);

        Self {
            origin: origin.into(),
            title: extract_title(&html),
            text: extract_text(&html),
            raw_source,
            fetched_at,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn raw_source(&self) -> &str {
        &self.raw_source
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn fetched_at(&self) -> DateTime<Local> {
        self.fetched_at
    }

    /// URIs referenced anywhere in the raw source, markup included
    pub fn uris(&self) -> impl Iterator<Item = String> + '_ {
        extract_uris(&self.raw_source)
    }

    /// Builds the record persisted for this document
    pub fn to_record(&self) -> StoredRecord {
        StoredRecord {
            title: self.title.clone(),
            url: self.origin.clone(),
            text: self.text.clone(),
            source: self.raw_source.clone(),
            last_update: format_last_update(&self.fetched_at),
        }
    }
}

/// Extracts the first `<title>` element's text
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Concatenates every visible text node in document order
fn extract_text(document: &Html) -> String {
    document
        .tree
        .root()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node
                .parent()
                .and_then(|parent| parent.value().as_element())
                .map_or(false, |element| INVISIBLE_ELEMENTS.contains(&element.name()));
            (!hidden).then(|| &**text)
        })
        .collect()
}
