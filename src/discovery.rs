//! Feed discovery on HTML landing pages.
//!
//! Regulator newsrooms rarely advertise a single canonical feed, so for
//! every configured landing page we look for:
//!
//! 1. `<link rel="alternate">` elements whose `type` mentions RSS or Atom,
//!    or whose `href` ends in `.xml`
//! 2. `<a href>` anchors whose visible label contains "rss", or whose `href`
//!    ends in `.rss`, `.xml`, `/rss` or `/feed`
//!
//! Every accepted `href` is resolved against the page URL. The result is
//! de-duplicated in first-seen order and restricted to absolute HTTP(S) URLs.
//!
//! Discovery never fails: a page that cannot be fetched or parsed simply
//! yields no feeds.

use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::fetch::Fetch;

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("link[rel][href]").expect("static selector"));
static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

const ANCHOR_FEED_SUFFIXES: [&str; 4] = [".rss", ".xml", "/rss", "/feed"];

/// Fetch `page_url` and return the feed URLs it advertises.
#[instrument(level = "info", skip(fetcher))]
pub async fn discover_feeds<F: Fetch>(fetcher: &F, page_url: &str) -> Vec<String> {
    let base = match Url::parse(page_url) {
        Ok(base) => base,
        Err(e) => {
            warn!(error = %e, "Landing page URL is not valid; skipping discovery");
            return Vec::new();
        }
    };

    let html = match fetcher.fetch(page_url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(error = %e, "Landing page fetch failed; no feeds discovered");
            return Vec::new();
        }
    };

    let feeds = extract_feed_links(&base, &html);
    info!(count = feeds.len(), "Discovered feeds");
    debug!(feeds = ?feeds, "Discovered feed URLs");
    feeds
}

/// Extract candidate feed URLs from an HTML document served at `base`.
pub fn extract_feed_links(base: &Url, html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    let from_links = document
        .select(&LINK_SELECTOR)
        .filter(|el| is_alternate_feed_link(el))
        .filter_map(|el| el.value().attr("href"));

    let from_anchors = document
        .select(&ANCHOR_SELECTOR)
        .filter(|el| is_feed_anchor(el))
        .filter_map(|el| el.value().attr("href"));

    from_links
        .chain(from_anchors)
        .filter_map(|href| resolve(base, href))
        .unique()
        .collect()
}

fn is_alternate_feed_link(el: &ElementRef) -> bool {
    let rel = el.value().attr("rel").unwrap_or_default().to_lowercase();
    if !rel.contains("alternate") {
        return false;
    }
    let kind = el.value().attr("type").unwrap_or_default().to_lowercase();
    let href = el.value().attr("href").unwrap_or_default().trim();
    kind.contains("rss") || kind.contains("atom") || href.ends_with(".xml")
}

fn is_feed_anchor(el: &ElementRef) -> bool {
    let label = el.text().collect::<String>().to_lowercase();
    if label.contains("rss") {
        return true;
    }
    let href = el.value().attr("href").unwrap_or_default().trim().to_lowercase();
    ANCHOR_FEED_SUFFIXES.iter().any(|suffix| href.ends_with(suffix))
}

/// Resolve `href` against `base`, keeping only absolute HTTP(S) results.
fn resolve(base: &Url, href: &str) -> Option<String> {
    let resolved = base.join(href.trim()).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}
