//! Configuration types for fetching and crawling.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Longest duration a configured number of seconds turns into, about a
/// century.
const MAX_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

/// Converts configured seconds to a `Duration`.
///
/// Negative and NaN values give zero; huge and infinite values are capped.
pub(crate) fn seconds(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value)
        .unwrap_or(Duration::MAX)
        .min(Duration::from_secs(MAX_SECONDS))
}

/// Configuration for HTTP fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Maximum response size in bytes.
    #[serde(default = "default_max_size")]
    pub max_response_size: usize,
    /// Additional headers to include.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Retry configuration.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_timeout() -> f64 {
    20.0
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    format!("siteinfo/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_size() -> usize {
    5 * 1024 * 1024 // 5MB
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
            max_response_size: default_max_size(),
            headers: HashMap::new(),
            retry: RetryConfig::default(),
        }
    }
}

impl FetchConfig {
    /// Creates a new fetch configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        seconds(self.timeout_seconds)
    }
}

/// Retry configuration for failed fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Initial delay between retries in seconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: f64,
    /// Backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Maximum delay between retries.
    #[serde(default = "default_max_delay")]
    pub max_delay_seconds: f64,
    /// Whether to add up to 25% random jitter to each delay.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
    /// Status codes that should trigger a retry.
    #[serde(default = "default_retry_status_codes")]
    pub retry_status_codes: HashSet<u16>,
}

fn default_max_retries() -> usize {
    2
}

fn default_retry_delay() -> f64 {
    0.5
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_delay() -> f64 {
    10.0
}

fn default_jitter() -> bool {
    true
}

fn default_retry_status_codes() -> HashSet<u16> {
    [429, 500, 502, 503, 504].into_iter().collect()
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_seconds: default_retry_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_seconds: default_max_delay(),
            jitter: default_jitter(),
            retry_status_codes: default_retry_status_codes(),
        }
    }
}

impl RetryConfig {
    /// A configuration that never retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Calculates the delay before retry number `attempt` (zero-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = self.retry_delay_seconds * self.backoff_multiplier.powi(exponent);
        let capped = delay.min(self.max_delay_seconds).max(0.0);

        let with_jitter = if self.jitter {
            capped + capped * 0.25 * rand::random::<f64>()
        } else {
            capped
        };
        seconds(with_jitter)
    }

    /// Whether a status code should trigger a retry.
    #[must_use]
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_status_codes.contains(&status)
    }
}

/// Configuration for the depth-bounded crawl behind the default provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Maximum number of pages fetched for one crawl.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Maximum number of concurrent fetches within one crawl level.
    #[serde(default = "default_crawl_concurrency")]
    pub max_concurrency: usize,
    /// Only follow links on the same host as the crawl root.
    #[serde(default = "default_same_host_only")]
    pub same_host_only: bool,
    /// How long fetched pages stay in the page cache.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: f64,
    /// Most pages the page cache holds at once.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_max_pages() -> usize {
    50
}

fn default_crawl_concurrency() -> usize {
    4
}

fn default_same_host_only() -> bool {
    true
}

fn default_cache_ttl() -> f64 {
    300.0
}

fn default_cache_capacity() -> usize {
    super::cache::DEFAULT_CACHE_CAPACITY
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            max_concurrency: default_crawl_concurrency(),
            same_host_only: default_same_host_only(),
            cache_ttl_seconds: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl CrawlConfig {
    /// Creates a new crawl configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page cap.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Sets the per-level fetch concurrency.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Allows or forbids following links to other hosts.
    #[must_use]
    pub fn with_same_host_only(mut self, same_host_only: bool) -> Self {
        self.same_host_only = same_host_only;
        self
    }

    /// Gets the cache TTL as Duration.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        seconds(self.cache_ttl_seconds)
    }
}
