//! Feed harvesting.
//!
//! Turns the configured source table into a flat list of [`Item`]s:
//!
//! 1. **Resolve**: every configured URL that already looks like a feed is
//!    used as-is; anything else is treated as a landing page and handed to
//!    [`discover_feeds`]. Feed URLs are de-duplicated across the whole run.
//! 2. **Fetch + parse**: each feed is fetched and parsed independently. A
//!    failure is logged and skipped, never propagated.
//! 3. **Normalize**: raw entries become [`Item`]s with defaults filled in.
//!
//! Fetches run with bounded concurrency (`buffered`), and every worker returns
//! its own `Vec<Item>`; results are concatenated in feed order afterwards.

use futures::stream::{self, StreamExt};
use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::{Config, SectionTable};
use crate::discovery::discover_feeds;
use crate::feeds::{parse_feed, strip_html, FeedError, RawFeed};
use crate::fetch::{Fetch, FetchError};
use crate::models::{Item, UNTITLED};
use crate::utils::{clip_summary, truncate_for_log};

const DIRECT_FEED_SUFFIXES: [&str; 2] = [".xml", ".rss"];
const DIRECT_FEED_SEGMENTS: [&str; 2] = ["/rss", "/feed"];

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// Per-run harvesting knobs.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Maximum number of feeds (or landing pages) in flight at once.
    pub concurrency: usize,
    pub max_entries_per_feed: Option<usize>,
    pub summary_max_chars: Option<usize>,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_entries_per_feed: None,
            summary_max_chars: None,
        }
    }
}

impl HarvestOptions {
    pub fn from_config(config: &Config, concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            max_entries_per_feed: config.max_entries_per_feed,
            summary_max_chars: config.summary_max_chars,
        }
    }
}

/// Whether a configured URL already points at a feed rather than a landing page.
///
/// The lowercased path must end in `.xml`/`.rss` or contain `/rss` or `/feed`.
pub fn is_direct_feed(url: &str) -> bool {
    let path = Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| url.to_lowercase());
    DIRECT_FEED_SUFFIXES.iter().any(|s| path.ends_with(s))
        || DIRECT_FEED_SEGMENTS.iter().any(|s| path.contains(s))
}

/// Harvest every configured source into a flat list of items.
///
/// # Arguments
///
/// * `sources` - Ordered `Section -> [URL]` table
/// * `fetcher` - HTTP collaborator used for landing pages and feeds
/// * `options` - Concurrency and per-feed limits
///
/// # Returns
///
/// All items in configured feed order. Never fails; when every source is
/// unreachable the result is empty.
#[instrument(level = "info", skip_all, fields(sections = sources.len()))]
pub async fn harvest<F: Fetch>(
    sources: &SectionTable,
    fetcher: &F,
    options: &HarvestOptions,
) -> Vec<Item> {
    let feed_urls = resolve_feed_urls(sources, fetcher, options.concurrency).await;
    info!(feeds = feed_urls.len(), "Resolved feed URLs");

    let per_feed: Vec<Vec<Item>> = stream::iter(feed_urls.iter())
        .map(|feed_url| async move {
            match harvest_feed(fetcher, feed_url, options).await {
                Ok(items) => {
                    debug!(%feed_url, count = items.len(), "Harvested feed");
                    items
                }
                Err(e) => {
                    warn!(%feed_url, error = %e, "Feed failed; skipping");
                    Vec::new()
                }
            }
        })
        .buffered(options.concurrency.max(1))
        .collect()
        .await;

    let failed = per_feed.iter().filter(|items| items.is_empty()).count();
    let items: Vec<Item> = per_feed.into_iter().flatten().collect();
    info!(
        feeds = feed_urls.len(),
        empty_or_failed = failed,
        items = items.len(),
        "Harvest complete"
    );
    items
}

/// Expand the source table into concrete feed URLs, in configured order.
///
/// Landing pages are discovered concurrently; each feed URL appears once no
/// matter how many entries lead to it.
#[instrument(level = "info", skip_all)]
pub async fn resolve_feed_urls<F: Fetch>(
    sources: &SectionTable,
    fetcher: &F,
    concurrency: usize,
) -> Vec<String> {
    let entries: Vec<(&str, &str)> = sources
        .iter()
        .flat_map(|(section, urls)| urls.iter().map(move |u| (section.as_str(), u.trim())))
        .filter(|(_, u)| !u.is_empty())
        .unique_by(|(_, u)| *u)
        .collect();

    let resolved: Vec<Vec<String>> = stream::iter(entries)
        .map(|(section, url)| async move {
            if is_direct_feed(url) {
                vec![url.to_string()]
            } else {
                debug!(section, %url, "Discovering feeds on landing page");
                discover_feeds(fetcher, url).await
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    resolved.into_iter().flatten().unique().collect()
}

/// Fetch, parse and normalize one feed.
#[instrument(level = "debug", skip(fetcher, options))]
pub async fn harvest_feed<F: Fetch>(
    fetcher: &F,
    feed_url: &str,
    options: &HarvestOptions,
) -> Result<Vec<Item>, HarvestError> {
    let body = fetcher.fetch(feed_url).await?;
    let raw = parse_feed(&body).inspect_err(|_| {
        debug!(body = %truncate_for_log(&body, 200), "Unparseable feed body");
    })?;
    Ok(normalize_feed(raw, feed_url, options))
}

/// Convert a parsed feed into [`Item`]s, filling in defaults.
///
/// - missing title becomes [`UNTITLED`]
/// - missing link falls back to `feed_url`
/// - missing feed title falls back to the feed's host
pub fn normalize_feed(raw: RawFeed, feed_url: &str, options: &HarvestOptions) -> Vec<Item> {
    let source = raw.title.unwrap_or_else(|| feed_host(feed_url));
    let limit = options.max_entries_per_feed.unwrap_or(usize::MAX);

    raw.entries
        .into_iter()
        .take(limit)
        .map(|entry| {
            let published_at = entry.timestamp();
            let summary = entry
                .summary_html
                .as_deref()
                .map(strip_html)
                .unwrap_or_default();
            let summary = match options.summary_max_chars {
                Some(max) => clip_summary(&summary, max),
                None => summary,
            };
            Item {
                title: entry.title.unwrap_or_else(|| UNTITLED.to_string()),
                summary,
                url: entry.link.unwrap_or_else(|| feed_url.to_string()),
                source: source.clone(),
                feed_url: feed_url.to_string(),
                published_at,
            }
        })
        .collect()
}

fn feed_host(feed_url: &str) -> String {
    Url::parse(feed_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| feed_url.to_string())
}

/// Drop items whose article URL was already seen; the first occurrence wins.
pub fn dedupe_by_url(items: Vec<Item>) -> Vec<Item> {
    let before = items.len();
    let deduped: Vec<Item> = items.into_iter().unique_by(|item| item.url.clone()).collect();
    if deduped.len() < before {
        debug!(removed = before - deduped.len(), "Removed duplicate article URLs");
    }
    deduped
}
