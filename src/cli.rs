//! Command-line interface definitions for regwatch.
//!
//! Every option can also be supplied through an environment variable, which
//! is how the scheduled job configures it.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::{FetchConfig, DEFAULT_USER_AGENT};

/// Command-line arguments for one regwatch run.
///
/// # Examples
///
/// ```sh
/// # Defaults: ./regwatch.yml in, ./out out
/// regwatch
///
/// # Explicit paths, slower hosts
/// regwatch -c config/regwatch.yml -o site/data --timeout-secs 40
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration
    #[arg(short, long, env = "REGWATCH_CONFIG", default_value = "regwatch.yml")]
    pub config: PathBuf,

    /// Output directory for regwatch.json and the dated snapshot
    #[arg(short, long, env = "REGWATCH_OUT_DIR", default_value = "out")]
    pub out_dir: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, env = "REGWATCH_TIMEOUT_SECS", default_value_t = 25)]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[arg(long, env = "REGWATCH_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Maximum number of feeds fetched concurrently
    #[arg(long, env = "REGWATCH_CONCURRENCY", default_value_t = 4)]
    pub concurrency: usize,

    /// Extra attempts for a transiently failing request
    #[arg(long, env = "REGWATCH_RETRIES", default_value_t = 1)]
    pub retries: usize,
}

impl Cli {
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            ..Default::default()
        }
    }
}
