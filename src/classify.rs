//! Keyword scoring and section assignment.
//!
//! Every item is assigned to exactly one section. The rules are deterministic
//! and stateless:
//!
//! 1. Score each configured section by the number of its keywords found in
//!    the lowercased `title + " " + summary`.
//! 2. The first section with the strictly highest nonzero score wins; an
//!    equal score later in the section order never displaces an earlier one.
//! 3. With no keyword hits at all, the first matching [`SourceHint`] decides,
//!    and failing that the fallback section.
//!
//! Keywords of at most three characters only match as whole words, so `faa`
//! does not fire inside `faas`. Longer keywords match as plain substrings.

use regex::Regex;
use serde::Deserialize;
use tracing::trace;

use crate::config::SectionTable;
use crate::models::{Item, Section};

/// Keywords up to this many characters must match on word boundaries.
const WHOLE_WORD_MAX_CHARS: usize = 3;

/// Maps a publisher name or feed-domain substring to a likely section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceHint {
    pub pattern: String,
    pub section: Section,
}

impl SourceHint {
    pub fn new(pattern: &str, section: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            section: Section::from(section),
        }
    }
}

/// Built-in hint table used when the configuration does not supply one.
///
/// Order matters: the first match wins, so `easa` sits ahead of `esa`.
pub fn default_source_hints() -> Vec<SourceHint> {
    vec![
        SourceHint::new("easa", "aviation"),
        SourceHint::new("faa", "aviation"),
        SourceHint::new("nasa", "space"),
        SourceHint::new("esa", "space"),
        SourceHint::new("fcc", "space"),
        SourceHint::new("ema", "pharma"),
        SourceHint::new("fda", "pharma"),
        SourceHint::new("nhtsa", "automotive"),
        SourceHint::new("transportation.gov", "automotive"),
    ]
}

#[derive(Debug, Clone)]
enum Rule {
    WholeWord(Regex),
    Substring(String),
}

impl Rule {
    fn matches(&self, text: &str) -> bool {
        match self {
            Rule::WholeWord(re) => re.is_match(text),
            Rule::Substring(needle) => text.contains(needle.as_str()),
        }
    }
}

/// A compiled list of keywords that counts how many occur in a text.
///
/// Keywords are lowercased and de-duplicated; blank keywords are ignored.
/// The text passed to [`KeywordSet::count_hits`] must already be lowercased.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    rules: Vec<Rule>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen: Vec<String> = Vec::new();
        let mut rules = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if keyword.is_empty() || seen.contains(&keyword) {
                continue;
            }
            let rule = if keyword.chars().count() <= WHOLE_WORD_MAX_CHARS {
                Rule::WholeWord(Regex::new(&format!(r"\b{}\b", regex::escape(&keyword)))?)
            } else {
                Rule::Substring(keyword.clone())
            };
            seen.push(keyword);
            rules.push(rule);
        }
        Ok(Self { rules })
    }

    /// Number of distinct keywords present in `text`.
    pub fn count_hits(&self, text: &str) -> usize {
        self.rules.iter().filter(|rule| rule.matches(text)).count()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

/// Assigns items to sections. Build once per run, then call
/// [`Classifier::classify`] for every item.
#[derive(Debug, Clone)]
pub struct Classifier {
    sections: Vec<(Section, KeywordSet)>,
    hints: Vec<SourceHint>,
    fallback: Section,
}

impl Classifier {
    pub fn new(
        keywords: &SectionTable,
        hints: &[SourceHint],
        fallback: Section,
    ) -> Result<Self, regex::Error> {
        let sections = keywords
            .iter()
            .map(|(section, words)| Ok((section.clone(), KeywordSet::new(words)?)))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        let hints = hints
            .iter()
            .map(|h| SourceHint {
                pattern: h.pattern.to_lowercase(),
                section: h.section.clone(),
            })
            .collect();
        Ok(Self {
            sections,
            hints,
            fallback,
        })
    }

    /// First hint whose pattern occurs in the lowercased source name or feed URL.
    fn source_hint(&self, item: &Item) -> Option<&Section> {
        let source = item.source.to_lowercase();
        let feed_url = item.feed_url.to_lowercase();
        self.hints
            .iter()
            .find(|h| source.contains(&h.pattern) || feed_url.contains(&h.pattern))
            .map(|h| &h.section)
    }

    pub fn classify(&self, item: &Item) -> Section {
        let text = item.search_text();
        let hint = self.source_hint(item);

        let mut best: Option<&Section> = None;
        let mut best_hits = 0usize;
        for (section, keywords) in &self.sections {
            let hits = keywords.count_hits(&text);
            if hits > best_hits {
                best = Some(section);
                best_hits = hits;
            }
        }

        let chosen = best.or(hint).unwrap_or(&self.fallback);
        trace!(title = %item.title, hits = best_hits, hint = ?hint, section = %chosen, "Classified item");
        chosen.clone()
    }
}
