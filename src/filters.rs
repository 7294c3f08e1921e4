//! Recency and relevance filtering.
//!
//! # Recency
//!
//! Items published within the trailing window (`published_at >= now - window`)
//! are kept. When nothing qualifies, the filter falls back to the `max_items`
//! most recent items overall so a quiet news day still produces a digest.
//! Undated items rank last in the fallback.
//!
//! # Relevance
//!
//! Two checks on the lowercased `title + " " + summary`:
//!
//! 1. any negative keyword as a substring rejects the item outright
//! 2. the number of distinct positive keywords (all sections combined) must
//!    reach `min_positive_hits`

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument};

use crate::classify::KeywordSet;
use crate::config::SectionTable;
use crate::models::Item;

/// Keep items from the `window_hours` before `now`, or fall back to the
/// `max_items` most recent ones.
#[instrument(level = "info", skip(items), fields(items = items.len()))]
pub fn filter_recent(
    items: Vec<Item>,
    window_hours: u64,
    max_items: usize,
    now: DateTime<Utc>,
) -> Vec<Item> {
    let window = Duration::try_hours(i64::try_from(window_hours).unwrap_or(i64::MAX))
        .unwrap_or(Duration::MAX);
    let cutoff = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);

    let in_window = |item: &Item| item.published_at.is_some_and(|t| t >= cutoff);
    if items.iter().any(in_window) {
        let fresh: Vec<Item> = items.into_iter().filter(in_window).collect();
        info!(fresh = fresh.len(), %cutoff, "Items inside recency window");
        return fresh;
    }

    let mut fallback = items;
    fallback.sort_by(|a, b| b.recency_key().cmp(&a.recency_key()));
    fallback.truncate(max_items);
    info!(
        fallback = fallback.len(),
        %cutoff,
        "No items inside recency window; using most recent items"
    );
    fallback
}

/// Negative-term exclusion plus a minimum positive-keyword count.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    negative: Vec<String>,
    positive: KeywordSet,
    min_positive_hits: usize,
}

impl RelevanceFilter {
    /// Build from the negative terms and every section's keywords.
    pub fn new(
        negative_keywords: &[String],
        keywords: &SectionTable,
        min_positive_hits: usize,
    ) -> Result<Self, regex::Error> {
        let negative = negative_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        let positive = KeywordSet::new(keywords.iter().flat_map(|(_, words)| words))?;
        Ok(Self {
            negative,
            positive,
            min_positive_hits,
        })
    }

    pub fn is_relevant(&self, item: &Item) -> bool {
        let text = item.search_text();
        if let Some(term) = self.negative.iter().find(|term| text.contains(term.as_str())) {
            debug!(title = %item.title, %term, "Rejected by negative keyword");
            return false;
        }
        if self.min_positive_hits == 0 {
            return true;
        }
        self.positive.count_hits(&text) >= self.min_positive_hits
    }

    #[instrument(level = "info", skip_all, fields(items = items.len()))]
    pub fn apply(&self, items: Vec<Item>) -> Vec<Item> {
        let relevant: Vec<Item> = items.into_iter().filter(|i| self.is_relevant(i)).collect();
        info!(
            relevant = relevant.len(),
            negative_terms = self.negative.len(),
            positive_keywords = self.positive.len(),
            min_positive_hits = self.min_positive_hits,
            "Relevance filter applied"
        );
        relevant
    }
}

/// One-shot form of [`RelevanceFilter::apply`].
pub fn filter_relevant(
    items: Vec<Item>,
    negative_keywords: &[String],
    keywords: &SectionTable,
    min_positive_hits: usize,
) -> Result<Vec<Item>, regex::Error> {
    Ok(RelevanceFilter::new(negative_keywords, keywords, min_positive_hits)?.apply(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Section;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 3, 12, 0, 0).unwrap()
    }

    fn item(title: &str, published_at: Option<DateTime<Utc>>) -> Item {
        Item {
            title: title.to_string(),
            summary: String::new(),
            url: format!("https://example.org/{}", title.replace(' ', "-")),
            source: "Example".to_string(),
            feed_url: "https://example.org/rss.xml".to_string(),
            published_at,
        }
    }

    fn hours_ago(h: i64) -> Option<DateTime<Utc>> {
        Some(now() - Duration::hours(h))
    }

    fn titles(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.title.as_str()).collect()
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let items = vec![
            item("exact", hours_ago(36)),
            item("older", Some(now() - Duration::hours(36) - Duration::seconds(1))),
            item("recent", hours_ago(1)),
            item("undated", None),
        ];
        let kept = filter_recent(items, 36, 50, now());
        assert_eq!(titles(&kept), ["exact", "recent"]);
    }

    #[test]
    fn test_fallback_sorts_and_caps() {
        let items = vec![
            item("undated", None),
            item("mid", hours_ago(100)),
            item("newest", hours_ago(50)),
            item("oldest", hours_ago(500)),
        ];
        let kept = filter_recent(items.clone(), 24, 3, now());
        assert_eq!(titles(&kept), ["newest", "mid", "oldest"]);

        let kept = filter_recent(items, 24, 10, now());
        assert_eq!(kept.len(), 4);
        assert_eq!(kept.last().unwrap().title, "undated");
    }

    #[test]
    fn test_fallback_on_empty_input() {
        assert!(filter_recent(Vec::new(), 36, 50, now()).is_empty());
    }

    #[test]
    fn test_huge_window_does_not_overflow() {
        let kept = filter_recent(vec![item("a", hours_ago(1))], u64::MAX, 50, now());
        assert_eq!(kept.len(), 1);
    }

    fn keywords() -> SectionTable {
        vec![
            (Section::from("aviation"), vec!["aircraft".into(), "uas".into()]),
            (Section::from("space"), vec!["satellite".into(), "aircraft".into()]),
        ]
    }

    #[test]
    fn test_negative_keyword_rejects_regardless_of_hits() {
        let filter = RelevanceFilter::new(&["Webinar".to_string()], &keywords(), 1).unwrap();
        let mut it = item("Aircraft and satellite webinar", hours_ago(1));
        assert!(!filter.is_relevant(&it));
        it.title = "Aircraft and satellite rules".into();
        assert!(filter.is_relevant(&it));
    }

    #[test]
    fn test_positive_hits_counted_across_sections() {
        let filter = RelevanceFilter::new(&[], &keywords(), 2).unwrap();
        // aircraft (shared) + satellite
        assert!(filter.is_relevant(&item("Aircraft tracks satellite", None)));
        // aircraft listed twice still counts once
        assert!(!filter.is_relevant(&item("Aircraft update", None)));
        // "uas" must be a whole word
        assert!(!filter.is_relevant(&item("Aircraft in Kaunas", None)));
    }

    #[test]
    fn test_defaults_keep_everything() {
        let items = vec![item("Quarterly report", None), item("Anything", hours_ago(2))];
        let kept = filter_relevant(items, &[], &keywords(), 0).unwrap();
        assert_eq!(kept.len(), 2);
    }
}
