//! Digest assembly and the end-to-end filtering pipeline.
//!
//! [`assemble`] groups classified items by section, orders each group newest
//! first, caps it and renders output records. [`build_digest`] strings the
//! post-harvest stages together:
//!
//! ```text
//! items -> dedupe (optional) -> recency -> relevance -> classify -> assemble
//! ```

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::classify::Classifier;
use crate::config::Config;
use crate::filters::{filter_recent, filter_relevant};
use crate::harvest::dedupe_by_url;
use crate::models::{Digest, DigestEntry, Item, Section};
use crate::utils::iso_z;

/// Assemble a digest stamped with `now`.
///
/// Sections follow `section_order`; sections not listed there (e.g. one only
/// reachable through a source hint) follow in first-seen order. Within a
/// section, items are sorted newest first with undated items last, ties
/// keeping their input order. Empty sections are omitted.
pub fn assemble(
    classified: Vec<(Section, Item)>,
    section_order: &[Section],
    section_cap: usize,
    now: DateTime<Utc>,
) -> Digest {
    let mut groups: Vec<(Section, Vec<Item>)> = section_order
        .iter()
        .map(|section| (section.clone(), Vec::new()))
        .collect();

    for (section, item) in classified {
        match groups.iter_mut().find(|(s, _)| *s == section) {
            Some((_, items)) => items.push(item),
            None => groups.push((section, vec![item])),
        }
    }

    let sections = groups
        .into_iter()
        .filter(|(_, items)| !items.is_empty())
        .map(|(section, mut items)| {
            items.sort_by(|a, b| b.recency_key().cmp(&a.recency_key()));
            let entries = items
                .iter()
                .take(section_cap)
                .map(DigestEntry::from)
                .collect::<Vec<_>>();
            (section, entries)
        })
        .collect();

    Digest {
        lastUpdated: iso_z(now),
        sections,
    }
}

/// Run every post-harvest stage and assemble the digest.
///
/// # Arguments
///
/// * `items` - Everything the harvester produced
/// * `config` - Thresholds, keyword tables and section order
/// * `now` - Reference instant for the recency window and `lastUpdated`
///
/// # Errors
///
/// Only keyword compilation can fail, and only for pathological keywords.
#[instrument(level = "info", skip_all, fields(items = items.len()))]
pub fn build_digest(
    items: Vec<Item>,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<Digest, regex::Error> {
    let items = if config.dedupe_by_url {
        dedupe_by_url(items)
    } else {
        items
    };
    let unique = items.len();

    let fresh = filter_recent(items, config.window_hours, config.max_items, now);
    let fresh_count = fresh.len();

    let relevant = filter_relevant(
        fresh,
        &config.negative_keywords,
        &config.keywords,
        config.min_positive_hits,
    )?;

    let classifier = Classifier::new(
        &config.keywords,
        &config.source_hints,
        config.fallback_section.clone(),
    )?;
    let classified: Vec<(Section, Item)> = relevant
        .into_iter()
        .map(|item| (classifier.classify(&item), item))
        .collect();

    info!(
        unique,
        fresh = fresh_count,
        relevant = classified.len(),
        "Filtering complete"
    );

    Ok(assemble(
        classified,
        &config.section_order(),
        config.section_cap,
        now,
    ))
}
