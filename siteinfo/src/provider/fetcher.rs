//! Page fetching.
//!
//! [`PageFetcher`] is the seam between the crawl logic and the network.
//! [`HttpFetcher`] is the reqwest-backed implementation; tests use
//! [`StaticFetcher`](crate::testing::StaticFetcher) instead.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

#[cfg(feature = "http")]
use super::config::FetchConfig;
use crate::errors::ProviderError;

/// A fetched HTML page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested.
    pub url: String,
    /// The URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Content type from headers.
    pub content_type: Option<String>,
    /// Response body.
    pub html: String,
    /// When the page was fetched.
    pub fetched_at: DateTime<Utc>,
}

impl FetchedPage {
    /// Creates a successful HTML page that was not redirected.
    #[must_use]
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            status: 200,
            content_type: Some("text/html; charset=utf-8".to_string()),
            html: html.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Whether the response is HTML, or carries no content type at all.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_ref()
            .map_or(true, |ct| ct.contains("text/html") || ct.contains("application/xhtml"))
    }

    /// Whether the fetch was successful (2xx status).
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetches a single page.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url`. Non-2xx answers are errors.
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ProviderError>;
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for std::sync::Arc<T> {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ProviderError> {
        (**self).fetch(url).await
    }
}

/// HTTP fetcher backed by `reqwest`.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    /// Builds a fetcher from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured header is invalid or the client
    /// cannot be built.
    pub fn new(config: FetchConfig) -> Result<Self, ProviderError> {
        let mut headers = reqwest::header::HeaderMap::new();
        for (key, value) in &config.headers {
            let name = reqwest::header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| ProviderError::fetch("<config>", format!("header `{key}`: {e}")))?;
            let value = reqwest::header::HeaderValue::from_str(value)
                .map_err(|e| ProviderError::fetch("<config>", format!("header `{key}`: {e}")))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| ProviderError::fetch("<config>", e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchedPage, ProviderError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::fetch(url, e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(ProviderError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let max = self.config.max_response_size;
        if let Some(length) = response.content_length() {
            let size = usize::try_from(length).unwrap_or(usize::MAX);
            if size > max {
                return Err(ProviderError::TooLarge {
                    url: url.to_string(),
                    size,
                    max,
                });
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ProviderError::fetch(url, e.to_string()))?
        {
            if body.len() + chunk.len() > max {
                return Err(ProviderError::TooLarge {
                    url: url.to_string(),
                    size: body.len() + chunk.len(),
                    max,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchedPage {
            url: url.to_string(),
            final_url,
            status,
            content_type,
            html: String::from_utf8_lossy(&body).into_owned(),
            fetched_at: Utc::now(),
        })
    }

    fn should_retry(&self, error: &ProviderError) -> bool {
        match error {
            ProviderError::HttpStatus { status, .. } => {
                self.config.retry.should_retry_status(*status)
            }
            other => other.is_transient(),
        }
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ProviderError> {
        let retry = &self.config.retry;
        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(page) => {
                    debug!(url, status = page.status, bytes = page.html.len(), "Fetched page");
                    return Ok(page);
                }
                Err(e) if attempt < retry.max_retries && self.should_retry(&e) => {
                    let delay = retry.delay_for_attempt(attempt);
                    debug!(url, attempt = attempt + 1, error = %e, ?delay, "Retrying fetch");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetched_page_defaults() {
        let page = FetchedPage::new("https://acme.com/", "<p>hi</p>");
        assert_eq!(page.final_url, "https://acme.com/");
        assert!(page.is_success());
        assert!(page.is_html());
    }

    #[test]
    fn test_non_html_content_type() {
        let page = FetchedPage {
            content_type: Some("application/pdf".to_string()),
            ..FetchedPage::new("https://acme.com/a.pdf", "")
        };
        assert!(!page.is_html());
    }

    #[tokio::test]
    async fn test_arc_fetcher_delegates() {
        let mut mock = MockPageFetcher::new();
        mock.expect_fetch()
            .withf(|url| url.to_string() == "https://acme.com/")
            .times(1)
            .returning(|url| Ok(FetchedPage::new(url.to_string(), "<html></html>")));

        let shared = std::sync::Arc::new(mock);
        let page = shared.fetch("https://acme.com/").await.unwrap();
        assert_eq!(page.url, "https://acme.com/");
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_http_fetcher_rejects_bad_header() {
        let config = FetchConfig::new().with_header("bad header", "x");
        assert!(HttpFetcher::new(config).is_err());
    }
}
