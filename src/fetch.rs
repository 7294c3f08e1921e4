//! HTTP fetching with timeouts and an optional retry decorator.
//!
//! The pipeline never talks to `reqwest` directly; it goes through the
//! [`Fetch`] trait so discovery and harvesting can be exercised against
//! canned responses.
//!
//! # Architecture
//!
//! - [`Fetch`]: core trait, one GET returning the body as text
//! - [`HttpFetcher`]: `reqwest`-backed implementation with timeout and user agent
//! - [`RetryFetch`]: decorator adding exponential backoff to any [`Fetch`]
//!
//! # Retry Strategy
//!
//! - Only transient failures are retried (network errors, 429, 5xx)
//! - Exponential backoff from `base_delay`, capped at 30 seconds
//! - Random jitter (0-250ms) added to avoid hammering a host in lockstep

use rand::{rng, Rng};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Default user agent. Several regulator sites reject unknown clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36 regwatch/0.1";

const ACCEPT_FEEDS: &str =
    "application/rss+xml,application/atom+xml,application/xml;q=0.9,text/html;q=0.8,*/*;q=0.7";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: StatusCode },

    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(e) => !e.is_builder(),
            FetchError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            FetchError::InvalidUrl { .. } => false,
        }
    }
}

/// Trait for retrieving a document over HTTP(S).
pub trait Fetch {
    /// GET `url` and return the response body as text.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Settings for the shared HTTP client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(25),
            max_redirects: 5,
        }
    }
}

/// [`Fetch`] implementation backed by one shared `reqwest::Client`.
///
/// Every request carries the configured timeout, so a hung host fails the
/// request instead of stalling the run.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_FEEDS));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
            });
        }

        let t0 = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        let body = response.text().await?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched document"
        );
        Ok(body)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Fetch`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: Fetch,
{
    /// Wrap `inner`, allowing up to `max_retries` extra attempts per URL.
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Fetch for RetryFetch<T>
where
    T: Fetch,
{
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    if !e.is_transient() {
                        return Err(e);
                    }
                    if attempt > self.max_retries {
                        error!(attempt, max = self.max_retries, error = %e, "fetch exhausted retries");
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Fails with the given status a fixed number of times, then succeeds.
    struct Flaky {
        failures: usize,
        status: StatusCode,
        calls: Cell<usize>,
    }

    impl Fetch for Flaky {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            if n <= self.failures {
                Err(FetchError::Status {
                    url: url.to_string(),
                    status: self.status,
                })
            } else {
                Ok("ok".to_string())
            }
        }
    }

    fn flaky(failures: usize, status: StatusCode) -> Flaky {
        Flaky {
            failures,
            status,
            calls: Cell::new(0),
        }
    }

    #[tokio::test]
    async fn test_http_fetcher_returns_body_and_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .and(header("user-agent", "regwatch-test/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rss/>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&FetchConfig {
            user_agent: "regwatch-test/1.0".to_string(),
            ..Default::default()
        })
        .unwrap();

        let body = fetcher.fetch(&format!("{}/feed.xml", server.uri())).await.unwrap();
        assert_eq!(body, "<rss/>");
    }

    #[tokio::test]
    async fn test_http_fetcher_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let err = fetcher.fetch(&format!("{}/missing", server.uri())).await.unwrap_err();
        match err {
            FetchError::Status { status, .. } => assert_eq!(status, StatusCode::NOT_FOUND),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_fetcher_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&FetchConfig {
            timeout: Duration::from_millis(100),
            ..Default::default()
        })
        .unwrap();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, FetchError::Http(ref e) if e.is_timeout()));
    }

    #[tokio::test]
    async fn test_http_fetcher_rejects_non_http_urls() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let err = fetcher.fetch("ftp://example.com/feed.xml").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failures() {
        let retry = RetryFetch::new(
            flaky(2, StatusCode::SERVICE_UNAVAILABLE),
            3,
            Duration::from_millis(1),
        );
        assert_eq!(retry.fetch("https://example.com").await.unwrap(), "ok");
        assert_eq!(retry.inner.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let retry = RetryFetch::new(
            flaky(10, StatusCode::BAD_GATEWAY),
            1,
            Duration::from_millis(1),
        );
        assert!(retry.fetch("https://example.com").await.is_err());
        assert_eq!(retry.inner.calls.get(), 2);
    }

    #[tokio::test]
    async fn test_retry_skips_permanent_failures() {
        let retry = RetryFetch::new(flaky(10, StatusCode::NOT_FOUND), 3, Duration::from_millis(1));
        assert!(retry.fetch("https://example.com").await.is_err());
        assert_eq!(retry.inner.calls.get(), 1);
    }

    #[test]
    fn test_transient_classification() {
        let status = |s| FetchError::Status {
            url: String::new(),
            status: s,
        };
        assert!(status(StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(status(StatusCode::INTERNAL_SERVER_ERROR).is_transient());
        assert!(!status(StatusCode::FORBIDDEN).is_transient());
        assert!(!FetchError::InvalidUrl { url: String::new() }.is_transient());
    }
}
