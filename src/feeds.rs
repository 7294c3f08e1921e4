//! Feed-syntax parsing and HTML-to-text conversion.
//!
//! This module is the boundary to `feed-rs`. It turns a fetched document into
//! a [`RawFeed`]: library-neutral entries whose fields are all optional. The
//! harvester decides how missing fields are defaulted.
//!
//! RSS 0.9x/1.0/2.0, Atom and JSON Feed are accepted.

use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Feed};
use feed_rs::parser;
use scraper::Html;
use thiserror::Error;
use tracing::debug;

use crate::utils::collapse_whitespace;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to parse feed: {0}")]
    Parse(#[from] parser::ParseFeedError),
}

/// A parsed feed before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeed {
    pub title: Option<String>,
    pub entries: Vec<RawEntry>,
}

/// One feed entry exactly as far as the feed declared it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    /// Summary or content body, possibly containing HTML.
    pub summary_html: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
}

type TimestampField = fn(&RawEntry) -> Option<DateTime<Utc>>;

fn published(e: &RawEntry) -> Option<DateTime<Utc>> {
    e.published
}

fn updated(e: &RawEntry) -> Option<DateTime<Utc>> {
    e.updated
}

fn created(e: &RawEntry) -> Option<DateTime<Utc>> {
    e.created
}

/// Timestamp fields in priority order.
const TIMESTAMP_PRIORITY: [TimestampField; 3] = [published, updated, created];

impl RawEntry {
    /// The first present of published, updated, created.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        TIMESTAMP_PRIORITY.iter().find_map(|field| field(self))
    }
}

/// Parse a fetched document into a [`RawFeed`].
pub fn parse_feed(body: &str) -> Result<RawFeed, FeedError> {
    let feed = parser::parse(body.as_bytes())?;
    let raw = RawFeed::from(feed);
    debug!(entries = raw.entries.len(), title = ?raw.title, "Parsed feed");
    Ok(raw)
}

impl From<Feed> for RawFeed {
    fn from(feed: Feed) -> Self {
        Self {
            title: feed.title.map(|t| t.content).and_then(non_blank),
            entries: feed.entries.into_iter().map(RawEntry::from).collect(),
        }
    }
}

impl From<Entry> for RawEntry {
    fn from(entry: Entry) -> Self {
        let link = select_link(&entry);
        let summary_html = entry
            .summary
            .map(|s| s.content)
            .and_then(non_blank)
            .or_else(|| entry.content.and_then(|c| c.body).and_then(non_blank));

        Self {
            title: entry.title.map(|t| t.content).and_then(non_blank),
            link,
            summary_html,
            published: entry.published,
            updated: entry.updated,
            // feed-rs does not surface a separate creation timestamp
            created: None,
        }
    }
}

/// Prefer an `alternate` (or rel-less) link, then any link, then an id that
/// looks like a URL.
fn select_link(entry: &Entry) -> Option<String> {
    let candidates = || entry.links.iter().filter(|l| !l.href.trim().is_empty());
    candidates()
        .find(|l| {
            l.rel
                .as_deref()
                .is_none_or(|rel| rel.is_empty() || rel.eq_ignore_ascii_case("alternate"))
        })
        .or_else(|| candidates().next())
        .map(|l| l.href.trim().to_string())
        .or_else(|| {
            let id = entry.id.trim();
            (id.starts_with("http://") || id.starts_with("https://")).then(|| id.to_string())
        })
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Reduce an HTML fragment to its visible text, whitespace-collapsed.
pub fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&text)
}
