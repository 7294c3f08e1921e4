//! JSON output of the digest.
//!
//! # Output Structure
//!
//! ```text
//! out_dir/
//! ├── regwatch.json             # latest digest, overwritten every run
//! └── regwatch-2025-09-03.json  # snapshot for the UTC date of lastUpdated
//! ```
//!
//! Each file is written to a temporary sibling first and renamed into place,
//! so readers never observe a partially written digest.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate};
use thiserror::Error;
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::models::Digest;

/// File name of the latest digest.
pub const LATEST_FILE: &str = "regwatch.json";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize digest: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Paths written by one call to [`write_digest`].
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenFiles {
    pub latest: PathBuf,
    pub snapshot: Option<PathBuf>,
}

/// Write `digest` as pretty-printed JSON into `out_dir`.
///
/// # Arguments
///
/// * `digest` - The assembled digest
/// * `out_dir` - Target directory, created if missing
///
/// # Returns
///
/// The paths that were written. The dated snapshot is skipped (with a
/// warning) if `lastUpdated` cannot be parsed back into a date.
#[instrument(level = "info", skip_all, fields(out_dir = %out_dir.display()))]
pub async fn write_digest(digest: &Digest, out_dir: &Path) -> Result<WrittenFiles, OutputError> {
    let json = serde_json::to_string_pretty(digest)?;

    fs::create_dir_all(out_dir)
        .await
        .map_err(|source| OutputError::Io {
            path: out_dir.to_path_buf(),
            source,
        })?;

    let latest = out_dir.join(LATEST_FILE);
    write_atomic(&latest, &json).await?;
    info!(path = %latest.display(), sections = digest.sections.len(), "Wrote digest");

    let snapshot = match snapshot_date(&digest.lastUpdated) {
        Some(date) => {
            let path = out_dir.join(snapshot_file_name(date));
            write_atomic(&path, &json).await?;
            info!(path = %path.display(), "Wrote dated snapshot");
            Some(path)
        }
        None => {
            warn!(last_updated = %digest.lastUpdated, "Unparseable lastUpdated; skipping snapshot");
            None
        }
    };

    Ok(WrittenFiles { latest, snapshot })
}

/// `regwatch-YYYY-MM-DD.json`
pub fn snapshot_file_name(date: NaiveDate) -> String {
    format!("regwatch-{}.json", date.format("%Y-%m-%d"))
}

fn snapshot_date(last_updated: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(last_updated)
        .ok()
        .map(|dt| dt.naive_utc().date())
}

async fn write_atomic(path: &Path, contents: &str) -> Result<(), OutputError> {
    let tmp = path.with_extension("json.tmp");
    let io_err = |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, contents).await.map_err(io_err)?;
    if let Err(source) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(io_err(source));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DigestEntry, Section};

    fn digest() -> Digest {
        Digest {
            lastUpdated: "2025-09-03T23:59:59Z".to_string(),
            sections: vec![(
                Section::from("aviation"),
                vec![DigestEntry {
                    title: "Règlement sur les drones".to_string(),
                    url: "https://www.easa.europa.eu/news/uas".to_string(),
                    source: "EASA".to_string(),
                    published: "2025-09-03T08:00:00Z".to_string(),
                    summary: "Operators must register.".to_string(),
                }],
            )],
        }
    }

    #[tokio::test]
    async fn test_write_digest_creates_latest_and_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let out_dir = tmp.path().join("out");

        let written = write_digest(&digest(), &out_dir).await.unwrap();
        assert_eq!(written.latest, out_dir.join("regwatch.json"));
        assert_eq!(
            written.snapshot.as_deref(),
            Some(out_dir.join("regwatch-2025-09-03.json").as_path())
        );

        let raw = std::fs::read_to_string(&written.latest).unwrap();
        assert!(raw.contains("Règlement"), "non-ASCII must be preserved");
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["lastUpdated"], "2025-09-03T23:59:59Z");
        assert_eq!(value["sections"]["aviation"][0]["source"], "EASA");

        let snapshot = std::fs::read_to_string(written.snapshot.unwrap()).unwrap();
        assert_eq!(snapshot, raw);
        assert!(!out_dir.join("regwatch.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_digest_overwrites_previous_run() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(LATEST_FILE), "stale").unwrap();

        let empty = Digest {
            lastUpdated: "2025-09-04T00:00:00Z".to_string(),
            sections: Vec::new(),
        };
        write_digest(&empty, tmp.path()).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(tmp.path().join(LATEST_FILE)).unwrap())
                .unwrap();
        assert_eq!(value["sections"], serde_json::json!({}));
    }

    #[test]
    fn test_snapshot_file_name() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        assert_eq!(snapshot_file_name(date), "regwatch-2025-01-07.json");
    }
}
