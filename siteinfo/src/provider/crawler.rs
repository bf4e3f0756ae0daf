//! Depth-bounded crawl behind the default page content provider.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use super::cache::PageCache;
use super::config::CrawlConfig;
use super::fetcher::{FetchedPage, PageFetcher};
use super::{html, parse_http_url, site_root, PageContentProvider, Tag, TagQuery};
use crate::errors::ProviderError;

/// A [`PageContentProvider`] that crawls a site breadth-first.
///
/// Level 0 is the requested URL. Each further level fetches the unseen
/// links of the previous level, up to `CrawlConfig::max_pages` pages in
/// total. A failed fetch of the requested URL is an error; failures deeper
/// in the crawl are logged and skipped. Fetched pages are memoised in a
/// [`PageCache`] owned by the provider.
pub struct CrawlingProvider<F> {
    fetcher: Arc<F>,
    cache: PageCache,
    config: CrawlConfig,
}

impl<F: PageFetcher> CrawlingProvider<F> {
    /// Creates a provider with the default crawl configuration.
    #[must_use]
    pub fn new(fetcher: F) -> Self {
        Self::with_config(fetcher, CrawlConfig::default())
    }

    /// Creates a provider with the given crawl configuration.
    #[must_use]
    pub fn with_config(fetcher: F, config: CrawlConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            cache: PageCache::with_capacity(config.cache_ttl(), config.cache_capacity),
            config,
        }
    }

    /// Gets the crawl configuration.
    #[must_use]
    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Gets the page cache.
    #[must_use]
    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    async fn page(&self, url: &str) -> Result<Arc<FetchedPage>, ProviderError> {
        if let Some(cached) = self.cache.get(url) {
            debug!(url, "Page cache hit");
            return Ok(cached);
        }

        let page = Arc::new(self.fetcher.fetch(url).await?);
        self.cache.insert(url, page.clone());
        Ok(page)
    }

    /// Fetches `url` and the pages within `depth` link hops of it.
    ///
    /// The requested page is always first in the returned list.
    async fn crawl(&self, url: &str, depth: u8) -> Result<Vec<Arc<FetchedPage>>, ProviderError> {
        let root = parse_http_url(url)?;
        let root_host = root.host_str().map(str::to_ascii_lowercase);
        let root_page = self.page(root.as_str()).await?;

        let max_pages = self.config.max_pages.max(1);
        let mut seen: HashSet<String> = HashSet::from([root.to_string()]);
        let mut pages = vec![root_page.clone()];
        let mut frontier = vec![root_page];

        for level in 1..=depth {
            let mut next_urls = Vec::new();
            for page in &frontier {
                for link in page_links(page) {
                    if pages.len() + next_urls.len() >= max_pages {
                        break;
                    }
                    if self.config.same_host_only && !same_host(&link, root_host.as_deref()) {
                        continue;
                    }
                    if seen.insert(link.clone()) {
                        next_urls.push(link);
                    }
                }
            }

            if next_urls.is_empty() {
                break;
            }
            debug!(url, level, pages = next_urls.len(), "Crawling level");

            let fetched: Vec<_> = stream::iter(next_urls)
                .map(|link| async move {
                    let result = self.page(&link).await;
                    (link, result)
                })
                .buffered(self.config.max_concurrency.max(1))
                .collect()
                .await;

            frontier = Vec::new();
            for (link, result) in fetched {
                match result {
                    Ok(page) => {
                        pages.push(page.clone());
                        frontier.push(page);
                    }
                    Err(e) => warn!(url = %link, error = %e, "Skipping page"),
                }
            }
        }

        Ok(pages)
    }
}

fn page_links(page: &FetchedPage) -> Vec<String> {
    if !page.is_html() {
        return Vec::new();
    }
    Url::parse(&page.final_url)
        .map(|page_url| html::links(&page.html, &page_url))
        .unwrap_or_default()
}

fn same_host(link: &str, root_host: Option<&str>) -> bool {
    let Some(root_host) = root_host else {
        return false;
    };
    Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.eq_ignore_ascii_case(root_host)))
        .unwrap_or(false)
}

fn dedup(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[async_trait]
impl<F: PageFetcher + 'static> PageContentProvider for CrawlingProvider<F> {
    fn base_url(&self, url: &str) -> Result<String, ProviderError> {
        site_root(url)
    }

    async fn find_tags(
        &self,
        url: &str,
        query: &TagQuery,
        depth: u8,
    ) -> Result<Vec<Tag>, ProviderError> {
        let pages = self.crawl(url, depth).await?;
        Ok(pages
            .iter()
            .filter(|page| page.is_html())
            .flat_map(|page| html::tags(&page.html, &page.final_url, query))
            .collect())
    }

    async fn find_links(&self, url: &str, depth: u8) -> Result<Vec<String>, ProviderError> {
        let pages = self.crawl(url, depth).await?;
        Ok(dedup(pages.iter().flat_map(|page| page_links(page))))
    }

    async fn find_text_matches(
        &self,
        url: &str,
        pattern: &Regex,
    ) -> Result<Vec<String>, ProviderError> {
        let pages = self.crawl(url, 0).await?;
        Ok(pages
            .iter()
            .filter(|page| page.is_html())
            .flat_map(|page| html::text_matches(&page.html, pattern))
            .collect())
    }

    async fn find_emails(&self, url: &str, depth: u8) -> Result<Vec<String>, ProviderError> {
        let pages = self.crawl(url, depth).await?;
        Ok(dedup(
            pages
                .iter()
                .filter(|page| page.is_html())
                .flat_map(|page| html::emails(&page.html)),
        ))
    }

    async fn find_phone_numbers(
        &self,
        url: &str,
        depth: u8,
    ) -> Result<Vec<String>, ProviderError> {
        let pages = self.crawl(url, depth).await?;
        Ok(dedup(
            pages
                .iter()
                .filter(|page| page.is_html())
                .flat_map(|page| html::phone_numbers(&page.html)),
        ))
    }
}

impl<F> std::fmt::Debug for CrawlingProvider<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlingProvider")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticFetcher;
    use pretty_assertions::assert_eq;

    fn site() -> StaticFetcher {
        StaticFetcher::new()
            .with_page(
                "https://acme.com/",
                r#"<a href="/about">About</a>
                   <a href="/missing">Gone</a>
                   <a href="https://twitter.com/acme">Twitter</a>
                   <p>hello@acme.com</p>"#,
            )
            .with_page(
                "https://acme.com/about",
                r#"<a href="/team">Team</a><p>press@acme.com, hello@acme.com</p>"#,
            )
            .with_page("https://acme.com/team", r#"<p>jobs@acme.com</p>"#)
    }

    #[tokio::test]
    async fn test_depth_zero_reads_only_the_page() {
        let provider = CrawlingProvider::new(site());
        let emails = provider.find_emails("https://acme.com/", 0).await.unwrap();
        assert_eq!(emails, vec!["hello@acme.com".to_string()]);
    }

    #[tokio::test]
    async fn test_depth_follows_same_host_links_and_skips_failures() {
        let provider = CrawlingProvider::new(site());
        let emails = provider.find_emails("https://acme.com/", 2).await.unwrap();
        assert_eq!(
            emails,
            vec![
                "hello@acme.com".to_string(),
                "press@acme.com".to_string(),
                "jobs@acme.com".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_find_links_includes_external_links() {
        let provider = CrawlingProvider::new(site());
        let links = provider.find_links("https://acme.com/", 0).await.unwrap();
        assert!(links.contains(&"https://twitter.com/acme".to_string()));
        assert_eq!(links.len(), 3);
    }

    #[tokio::test]
    async fn test_root_failure_is_an_error() {
        let provider = CrawlingProvider::new(site());
        let err = provider.find_links("https://acme.com/nowhere", 1).await.unwrap_err();
        assert!(matches!(err, ProviderError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_pages_are_cached() {
        let fetcher = Arc::new(site());
        let provider = CrawlingProvider::new(fetcher.clone());

        provider.find_links("https://acme.com/", 1).await.unwrap();
        provider.find_emails("https://acme.com/", 1).await.unwrap();

        assert_eq!(fetcher.fetch_count("https://acme.com/"), 1);
        assert_eq!(fetcher.fetch_count("https://acme.com/about"), 1);
    }

    #[tokio::test]
    async fn test_max_pages_caps_the_crawl() {
        let provider =
            CrawlingProvider::with_config(site(), CrawlConfig::new().with_max_pages(2));
        let emails = provider.find_emails("https://acme.com/", 2).await.unwrap();
        assert!(!emails.contains(&"jobs@acme.com".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let provider = CrawlingProvider::new(site());
        let err = provider.find_links("mailto:a@b.com", 0).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidUrl { .. }));
    }

    #[test]
    fn test_base_url() {
        let provider = CrawlingProvider::new(site());
        assert_eq!(
            provider.base_url("https://acme.com/about/team").unwrap(),
            "https://acme.com/"
        );
    }
}
