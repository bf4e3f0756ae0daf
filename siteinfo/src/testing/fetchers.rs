//! In-memory page fetcher.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::errors::ProviderError;
use crate::provider::{FetchedPage, PageFetcher};

/// A fetcher that serves pages from memory and counts fetches.
///
/// URLs are normalised before lookup, so `https://acme.com` and
/// `https://acme.com/` name the same page. Unknown URLs answer HTTP 404.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    responses: HashMap<String, Result<FetchedPage, ProviderError>>,
    fetch_counts: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

fn normalize(url: &str) -> String {
    Url::parse(url.trim()).map_or_else(|_| url.trim().to_string(), String::from)
}

impl StaticFetcher {
    /// Creates an empty fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `html` at `url`.
    #[must_use]
    pub fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
        let key = normalize(url);
        self.responses
            .insert(key.clone(), Ok(FetchedPage::new(key, html)));
        self
    }

    /// Serves a prepared page, keyed by its requested URL.
    #[must_use]
    pub fn with_fetched_page(mut self, page: FetchedPage) -> Self {
        self.responses.insert(normalize(&page.url), Ok(page));
        self
    }

    /// Fails fetches of `url` with `error`.
    #[must_use]
    pub fn with_error(mut self, url: &str, error: ProviderError) -> Self {
        self.responses.insert(normalize(url), Err(error));
        self
    }

    /// Delays every fetch.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches of `url` so far.
    #[must_use]
    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetch_counts
            .lock()
            .get(&normalize(url))
            .copied()
            .unwrap_or(0)
    }

    /// Number of fetches of any URL so far.
    #[must_use]
    pub fn total_fetches(&self) -> usize {
        self.fetch_counts.lock().values().sum()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ProviderError> {
        let key = normalize(url);
        *self.fetch_counts.lock().entry(key.clone()).or_insert(0) += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.responses.get(&key) {
            Some(response) => response.clone(),
            None => Err(ProviderError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
