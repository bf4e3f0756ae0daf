//! Extractor configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::provider::{seconds, CrawlConfig, FetchConfig};

/// Configuration for a [`SiteInfoExtractor`](crate::SiteInfoExtractor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Maximum concurrent sub-lookups per request.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Time budget of one sub-lookup in seconds.
    #[serde(default = "default_sub_lookup_timeout")]
    pub sub_lookup_timeout_seconds: f64,
    /// Similarity cutoff for site-name candidates.
    #[serde(default = "default_name_cutoff")]
    pub name_cutoff: f64,
    /// Similarity cutoff for page-label guesses.
    #[serde(default = "default_page_cutoff")]
    pub page_cutoff: f64,
    /// Similarity cutoff for picking a social handle by site name.
    #[serde(default = "default_handle_cutoff")]
    pub handle_cutoff: f64,
    /// HTTP fetch settings for the default provider.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Crawl settings for the default provider.
    #[serde(default)]
    pub crawl: CrawlConfig,
    /// Email verification settings.
    #[serde(default)]
    pub verification: VerificationConfig,
}

fn default_max_concurrency() -> usize {
    8
}

fn default_sub_lookup_timeout() -> f64 {
    30.0
}

fn default_name_cutoff() -> f64 {
    0.3
}

fn default_page_cutoff() -> f64 {
    0.5
}

fn default_handle_cutoff() -> f64 {
    0.3
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            sub_lookup_timeout_seconds: default_sub_lookup_timeout(),
            name_cutoff: default_name_cutoff(),
            page_cutoff: default_page_cutoff(),
            handle_cutoff: default_handle_cutoff(),
            fetch: FetchConfig::default(),
            crawl: CrawlConfig::default(),
            verification: VerificationConfig::default(),
        }
    }
}

impl ExtractorConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sub-lookup concurrency bound.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Sets the sub-lookup timeout.
    #[must_use]
    pub fn with_sub_lookup_timeout(mut self, seconds: f64) -> Self {
        self.sub_lookup_timeout_seconds = seconds;
        self
    }

    /// Sets the fetch configuration.
    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    /// Sets the crawl configuration.
    #[must_use]
    pub fn with_crawl(mut self, crawl: CrawlConfig) -> Self {
        self.crawl = crawl;
        self
    }

    /// Sets the verification configuration.
    #[must_use]
    pub fn with_verification(mut self, verification: VerificationConfig) -> Self {
        self.verification = verification;
        self
    }

    /// Gets the sub-lookup timeout as Duration.
    #[must_use]
    pub fn sub_lookup_timeout(&self) -> Duration {
        seconds(self.sub_lookup_timeout_seconds)
    }
}

/// Configuration for the HTTP email verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Endpoint that receives `email` as a form field. Verification is off
    /// when unset.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_verification_timeout")]
    pub timeout_seconds: f64,
}

fn default_verification_timeout() -> f64 {
    10.0
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_seconds: default_verification_timeout(),
        }
    }
}

impl VerificationConfig {
    /// Sets the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        seconds(self.timeout_seconds)
    }
}
