//! Page content provider.
//!
//! Extractors never fetch or parse HTML themselves. They ask a
//! [`PageContentProvider`] for tags, links, text matches, emails and phone
//! numbers under a URL, bounded by a search depth. [`CrawlingProvider`] is
//! the default implementation: a depth-bounded crawl over a
//! [`PageFetcher`], parsed with `scraper`.

mod cache;
mod config;
mod crawler;
mod fetcher;
pub(crate) mod html;

use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeMap;
use url::Url;

use crate::errors::ProviderError;

pub use cache::PageCache;
pub(crate) use config::seconds;
pub use config::{CrawlConfig, FetchConfig, RetryConfig};
pub use crawler::CrawlingProvider;
#[cfg(feature = "http")]
pub use fetcher::HttpFetcher;
pub use fetcher::{FetchedPage, PageFetcher};

#[cfg(test)]
pub use fetcher::MockPageFetcher;

/// Selects elements by name and attribute values.
///
/// An attribute filter matches when the element's attribute equals one of
/// the wanted values, or when one of its whitespace-separated tokens does.
/// Both comparisons ignore ASCII case, so `rel="Shortcut Icon"` matches a
/// wanted `icon`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagQuery {
    /// Element name, lowercase.
    pub name: String,
    /// Attribute filters; all must match.
    pub attrs: Vec<(String, Vec<String>)>,
}

impl TagQuery {
    /// Selects every element with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    /// Requires `attr` to match one of `values`.
    #[must_use]
    pub fn with_attr<I, S>(mut self, attr: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs.push((
            attr.into().to_ascii_lowercase(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Whether an element with this name and attribute lookup matches.
    pub fn matches<'a>(&self, name: &str, attr: impl Fn(&str) -> Option<&'a str>) -> bool {
        if !name.eq_ignore_ascii_case(&self.name) {
            return false;
        }
        self.attrs.iter().all(|(key, wanted)| {
            attr(key).is_some_and(|value| {
                wanted.iter().any(|w| {
                    value.trim().eq_ignore_ascii_case(w)
                        || value.split_whitespace().any(|token| token.eq_ignore_ascii_case(w))
                })
            })
        })
    }
}

/// An element found on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Element name, lowercase.
    pub name: String,
    /// Attributes, keyed by lowercase name.
    pub attrs: BTreeMap<String, String>,
    /// Whitespace-collapsed text content.
    pub text: String,
    /// The page the element was found on.
    pub page_url: String,
}

impl Tag {
    /// Looks up an attribute.
    #[must_use]
    pub fn get(&self, attr: &str) -> Option<&str> {
        self.attrs.get(attr).map(String::as_str)
    }

    /// The element's text content.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Resolves the element's resource to an absolute URL without fetching it.
    ///
    /// Uses `href`, then `src`, then `content`, joined against the page URL.
    #[must_use]
    pub fn resource_url(&self) -> Option<String> {
        let raw = ["href", "src", "content"]
            .iter()
            .filter_map(|attr| self.get(attr))
            .map(str::trim)
            .find(|v| !v.is_empty())?;

        let base = Url::parse(&self.page_url).ok()?;
        base.join(&html::repair_href(raw)).ok().map(String::from)
    }
}

/// Source of page content for the extractors.
///
/// `depth` is the number of link hops followed from `url`; 0 means only the
/// page itself.
#[async_trait]
pub trait PageContentProvider: Send + Sync {
    /// Returns the root URL of the site `url` belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error if `url` is not an absolute http(s) URL.
    fn base_url(&self, url: &str) -> Result<String, ProviderError>;

    /// Returns elements matching `query` on pages within `depth` of `url`.
    async fn find_tags(
        &self,
        url: &str,
        query: &TagQuery,
        depth: u8,
    ) -> Result<Vec<Tag>, ProviderError>;

    /// Returns the absolute links on pages within `depth` of `url`,
    /// deduplicated in discovery order.
    async fn find_links(&self, url: &str, depth: u8) -> Result<Vec<String>, ProviderError>;

    /// Returns every match of `pattern` in the visible text of `url`.
    async fn find_text_matches(
        &self,
        url: &str,
        pattern: &Regex,
    ) -> Result<Vec<String>, ProviderError>;

    /// Returns email addresses found on pages within `depth` of `url`.
    async fn find_emails(&self, url: &str, depth: u8) -> Result<Vec<String>, ProviderError>;

    /// Returns phone numbers found on pages within `depth` of `url`.
    async fn find_phone_numbers(&self, url: &str, depth: u8)
        -> Result<Vec<String>, ProviderError>;
}

/// Returns `scheme://host[:port]/` for an absolute http(s) URL.
///
/// # Errors
///
/// Returns an error if the URL does not parse, is not http(s) or has no host.
pub fn site_root(url: &str) -> Result<String, ProviderError> {
    let parsed = parse_http_url(url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| ProviderError::invalid_url(url, "missing host"))?;

    Ok(match parsed.port() {
        Some(port) => format!("{}://{}:{}/", parsed.scheme(), host, port),
        None => format!("{}://{}/", parsed.scheme(), host),
    })
}

/// Parses an absolute http(s) URL.
///
/// # Errors
///
/// Returns an error if the URL does not parse or is not http(s).
pub fn parse_http_url(url: &str) -> Result<Url, ProviderError> {
    let parsed =
        Url::parse(url.trim()).map_err(|e| ProviderError::invalid_url(url, e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ProviderError::invalid_url(
            url,
            format!("unsupported scheme `{other}`"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(attrs: &[(&str, &str)]) -> Tag {
        Tag {
            name: "link".to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            text: String::new(),
            page_url: "https://acme.com/about/".to_string(),
        }
    }

    #[test]
    fn test_tag_query_matches_tokens_ignoring_case() {
        let query = TagQuery::new("link").with_attr("rel", ["icon"]);
        assert!(query.matches("link", |_| Some("Shortcut Icon")));
        assert!(query.matches("LINK", |_| Some("icon")));
        assert!(!query.matches("link", |_| Some("stylesheet")));
        assert!(!query.matches("meta", |_| Some("icon")));
        assert!(!query.matches("link", |_| None));
    }

    #[test]
    fn test_tag_query_whole_value_match() {
        let query = TagQuery::new("link").with_attr("rel", ["shortcut icon"]);
        assert!(query.matches("link", |_| Some("shortcut icon")));
    }

    #[test]
    fn test_tag_query_without_filters_matches_by_name() {
        let query = TagQuery::new("title");
        assert!(query.matches("title", |_| None));
    }

    #[test]
    fn test_resource_url_prefers_href() {
        let t = tag(&[("href", "/favicon.ico"), ("content", "ignored")]);
        assert_eq!(t.resource_url().as_deref(), Some("https://acme.com/favicon.ico"));
    }

    #[test]
    fn test_resource_url_relative_content() {
        let t = tag(&[("content", "img/og.png")]);
        assert_eq!(
            t.resource_url().as_deref(),
            Some("https://acme.com/about/img/og.png")
        );
        assert!(tag(&[("content", "  ")]).resource_url().is_none());
    }

    #[test]
    fn test_site_root() {
        assert_eq!(site_root("https://acme.com/a/b?q=1").unwrap(), "https://acme.com/");
        assert_eq!(
            site_root("http://localhost:8080/x").unwrap(),
            "http://localhost:8080/"
        );
        assert!(site_root("ftp://acme.com").is_err());
        assert!(site_root("acme.com").is_err());
    }
}
