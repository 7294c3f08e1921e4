//! Data models for harvested items and the digest they are assembled into.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`Item`]: one normalized entry harvested from a feed
//! - [`Section`]: a label in the configured taxonomy
//! - [`DigestEntry`]: the output record written for each surviving item
//! - [`Digest`]: the timestamped, section-partitioned result of one run
//!
//! The digest uses camelCase field names (`lastUpdated`) because the JSON
//! document is consumed as-is by the rendering widget.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::utils::iso_z;

/// Placeholder used when a feed entry carries no usable title.
pub const UNTITLED: &str = "(no title)";

/// A single label of the section taxonomy (e.g. `aviation`, `crossIndustry`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Section(String);

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Section {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A normalized news or regulatory entry harvested from one feed.
///
/// Items are ephemeral: they are created by the harvester, flow through the
/// filters and the classifier, and are dropped once the digest is assembled.
///
/// # Invariants
///
/// `title`, `url`, `source` and `feed_url` are never empty. The harvester
/// substitutes [`UNTITLED`], the feed URL and the feed host respectively.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Entry headline, or [`UNTITLED`].
    pub title: String,
    /// Plain-text summary with markup already stripped.
    pub summary: String,
    /// Canonical link to the article; falls back to `feed_url`.
    pub url: String,
    /// Publisher name from feed metadata, or the feed's host.
    pub source: String,
    /// The concrete feed the item was harvested from.
    pub feed_url: String,
    /// Publication instant, absent when the entry carried no timestamp.
    pub published_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Ordering key for "most recent first" sorts. Undated items sort as the
    /// Unix epoch so they always land after dated ones.
    pub fn recency_key(&self) -> DateTime<Utc> {
        self.published_at.unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Lowercased `title + " " + summary`, the text every keyword rule runs on.
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.summary).to_lowercase()
    }
}

/// One output record inside a digest section.
///
/// Field order matches the published JSON contract:
/// `title`, `url`, `source`, `published`, `summary`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DigestEntry {
    pub title: String,
    pub url: String,
    pub source: String,
    /// `YYYY-MM-DDTHH:MM:SSZ`, or an empty string for undated items.
    pub published: String,
    pub summary: String,
}

impl From<&Item> for DigestEntry {
    fn from(item: &Item) -> Self {
        Self {
            title: item.title.clone(),
            url: item.url.clone(),
            source: item.source.clone(),
            published: item.published_at.map(iso_z).unwrap_or_default(),
            summary: item.summary.clone(),
        }
    }
}

/// The output document of one run.
///
/// `sections` keeps the configured section order and never contains an
/// empty list. It serializes as a JSON object keyed by section name.
#[allow(non_snake_case)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Digest {
    /// Generation instant in Zulu ISO-8601.
    pub lastUpdated: String,
    #[serde(serialize_with = "serialize_sections")]
    pub sections: Vec<(Section, Vec<DigestEntry>)>,
}

impl Digest {
    /// Look up the entries of one section.
    pub fn section(&self, name: &str) -> Option<&[DigestEntry]> {
        self.sections
            .iter()
            .find(|(section, _)| section.as_str() == name)
            .map(|(_, entries)| entries.as_slice())
    }

    /// Total number of entries across all sections.
    pub fn len(&self) -> usize {
        self.sections.iter().map(|(_, entries)| entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

fn serialize_sections<S>(
    sections: &[(Section, Vec<DigestEntry>)],
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(sections.len()))?;
    for (section, entries) in sections {
        map.serialize_entry(section, entries)?;
    }
    map.end()
}
