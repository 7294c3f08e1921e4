//! Utility functions for timestamp formatting, string clipping, and file system checks.
//!
//! This module provides helper functions used throughout the pipeline:
//! - Zulu ISO-8601 formatting for the digest contract
//! - Summary clipping and log truncation
//! - File system validation for the output directory

use chrono::{DateTime, SecondsFormat, Utc};
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Format an instant as `YYYY-MM-DDTHH:MM:SSZ`.
///
/// Sub-second precision is dropped; the digest contract is second-granular.
///
/// # Examples
///
/// ```ignore
/// let t = Utc.with_ymd_and_hms(2025, 9, 3, 8, 0, 0).unwrap();
/// assert_eq!(iso_z(t), "2025-09-03T08:00:00Z");
/// ```
pub fn iso_z(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to at most `max` bytes (on a char boundary)
/// with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
    }
}

/// Clip a summary to `max_chars` characters.
///
/// Summaries longer than the limit keep their first `max_chars - 3`
/// characters followed by `"..."`, so the result is exactly `max_chars` long.
/// Counting is done in chars, not bytes.
pub fn clip_summary(summary: &str, max_chars: usize) -> String {
    if summary.chars().count() <= max_chars {
        return summary.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut clipped: String = summary.chars().take(keep).collect();
    clipped.push_str("...");
    clipped
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
