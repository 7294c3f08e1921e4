//! Run configuration loaded from a YAML document.
//!
//! The configuration is read once at startup and treated as immutable for
//! the rest of the run. Any problem here is fatal: without sections and
//! keywords there is nothing meaningful to classify into.
//!
//! # Example
//!
//! ```yaml
//! window_hours: 36
//! max_items: 50
//! negative_keywords: [webinar, interview]
//! min_positive_hits: 1
//! sources:
//!   aviation:
//!     - https://www.easa.europa.eu/newsroom-and-events/news/feed.xml
//!   space:
//!     - https://www.esa.int/Newsroom
//! keywords:
//!   aviation: [aircraft, airworthiness, uas]
//!   space: [satellite, launch, orbit]
//! ```
//!
//! Mappings keep document order. The order of `keywords` decides classifier
//! tie-breaks; `sources` then `keywords` decide the section order of the
//! digest.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument};

use crate::classify::{default_source_hints, SourceHint};
use crate::models::Section;

/// Ordered `Section -> [String]` table, as written in the document.
pub type SectionTable = Vec<(Section, Vec<String>)>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Everything the pipeline needs to know about one run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Trailing recency window in hours.
    #[serde(default = "default_window_hours")]
    pub window_hours: u64,

    /// Number of items kept by the recency fallback.
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Maximum entries per digest section.
    #[serde(default = "default_section_cap")]
    pub section_cap: usize,

    /// Section used when neither keywords nor source hints decide.
    #[serde(default = "default_fallback_section")]
    pub fallback_section: Section,

    /// Minimum number of keyword hits (across all sections) an item needs.
    #[serde(default)]
    pub min_positive_hits: usize,

    /// Substrings that mark an item as editorial or non-technical.
    #[serde(default)]
    pub negative_keywords: Vec<String>,

    /// Only the first N entries of each feed are kept when set.
    #[serde(default)]
    pub max_entries_per_feed: Option<usize>,

    /// Summaries are clipped to this many characters when set.
    #[serde(default)]
    pub summary_max_chars: Option<usize>,

    /// Drop items whose article URL was already harvested from another feed.
    #[serde(default = "default_true")]
    pub dedupe_by_url: bool,

    /// Publisher/domain substrings mapped to a likely section, in priority order.
    #[serde(default = "default_source_hints")]
    pub source_hints: Vec<SourceHint>,

    #[serde(default, deserialize_with = "ordered_sections")]
    pub sources: SectionTable,

    #[serde(default, deserialize_with = "ordered_sections")]
    pub keywords: SectionTable,
}

fn default_window_hours() -> u64 {
    36
}

fn default_max_items() -> usize {
    50
}

fn default_section_cap() -> usize {
    12
}

fn default_fallback_section() -> Section {
    Section::from("crossIndustry")
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load and validate the configuration at `path`.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        info!(
            sections = config.sources.len(),
            keyword_sections = config.keywords.len(),
            window_hours = config.window_hours,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse a YAML document. An empty document yields all defaults.
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return serde_yaml::from_str("{}");
        }
        serde_yaml::from_str(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_hours == 0 {
            return Err(ConfigError::Invalid("window_hours must be greater than 0".into()));
        }
        if self.max_items == 0 {
            return Err(ConfigError::Invalid("max_items must be greater than 0".into()));
        }
        if self.section_cap == 0 {
            return Err(ConfigError::Invalid("section_cap must be greater than 0".into()));
        }
        if self.fallback_section.as_str().trim().is_empty() {
            return Err(ConfigError::Invalid("fallback_section must not be empty".into()));
        }
        if let Some(hint) = self
            .source_hints
            .iter()
            .find(|h| h.pattern.trim().is_empty() || h.section.as_str().trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "source hint {:?} -> {:?} needs a non-empty pattern and section",
                hint.pattern,
                hint.section.as_str()
            )));
        }
        Ok(())
    }

    /// Section order of the digest: `sources` keys, then any extra `keywords`
    /// keys, then the fallback section.
    pub fn section_order(&self) -> Vec<Section> {
        let mut order: Vec<Section> = Vec::new();
        let candidates = self
            .sources
            .iter()
            .map(|(s, _)| s)
            .chain(self.keywords.iter().map(|(s, _)| s))
            .chain(std::iter::once(&self.fallback_section));
        for section in candidates {
            if !order.contains(section) {
                order.push(section.clone());
            }
        }
        order
    }
}

/// Deserialize a YAML mapping into an ordered table. Null lists become empty.
fn ordered_sections<'de, D>(deserializer: D) -> Result<SectionTable, D::Error>
where
    D: Deserializer<'de>,
{
    struct SectionTableVisitor;

    impl<'de> Visitor<'de> for SectionTableVisitor {
        type Value = SectionTable;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping from section name to a list of strings")
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut table = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, values)) = map.next_entry::<String, Option<Vec<String>>>()? {
                table.push((Section::new(name), values.unwrap_or_default()));
            }
            Ok(table)
        }
    }

    deserializer.deserialize_any(SectionTableVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
window_hours: 48
negative_keywords: [webinar, interview]
min_positive_hits: 2
sources:
  space:
    - https://www.esa.int/rssfeed/Our_Activities/Space_News
  aviation:
    - https://www.easa.europa.eu/newsroom-and-events/news/feed.xml
  pharma:
keywords:
  aviation: [aircraft, uas]
  space: [satellite, orbit]
  crossIndustry: [regulation]
"#;

    #[test]
    fn test_defaults_for_empty_document() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.window_hours, 36);
        assert_eq!(config.max_items, 50);
        assert_eq!(config.section_cap, 12);
        assert_eq!(config.fallback_section.as_str(), "crossIndustry");
        assert_eq!(config.min_positive_hits, 0);
        assert!(config.negative_keywords.is_empty());
        assert!(config.dedupe_by_url);
        assert!(config.sources.is_empty());
        assert!(!config.source_hints.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_mappings_keep_document_order() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let sources: Vec<&str> = config.sources.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(sources, ["space", "aviation", "pharma"]);
        let keywords: Vec<&str> = config.keywords.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(keywords, ["aviation", "space", "crossIndustry"]);
        assert!(config.sources[2].1.is_empty());
        assert_eq!(config.window_hours, 48);
        assert_eq!(config.min_positive_hits, 2);
    }

    #[test]
    fn test_section_order_deduplicates() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let order: Vec<String> = config.section_order().iter().map(|s| s.to_string()).collect();
        assert_eq!(order, ["space", "aviation", "pharma", "crossIndustry"]);
    }

    #[test]
    fn test_custom_source_hints_replace_defaults() {
        let config = Config::from_yaml(
            "source_hints:\n  - { pattern: nist, section: crossIndustry }\n",
        )
        .unwrap();
        assert_eq!(config.source_hints.len(), 1);
        assert_eq!(config.source_hints[0].pattern, "nist");
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let config = Config::from_yaml("window_hours: 0").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Config::load(&tmp.path().join("regwatch.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_unparseable_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "sources: [this, is, not, a, mapping").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_bundled_sample_is_valid() {
        let config = Config::from_yaml(include_str!("../regwatch.yml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.max_entries_per_feed, Some(10));
        assert_eq!(config.section_order().len(), 5);
    }

    #[test]
    fn test_load_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.negative_keywords, ["webinar", "interview"]);
    }
}
