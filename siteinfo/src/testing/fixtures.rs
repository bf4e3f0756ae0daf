//! Fixture documents and ready-wired contexts.

use std::sync::Arc;

use super::StaticFetcher;
use crate::cancellation::CancellationToken;
use crate::config::ExtractorConfig;
use crate::engine::SiteInfoExtractor;
use crate::extractors::ExtractionContext;
use crate::provider::CrawlingProvider;
use crate::request::ExtractionTarget;

/// Builder for small HTML documents.
///
/// Head elements render in the order they were added, as do body elements.
#[derive(Debug, Clone, Default)]
pub struct HtmlPage {
    head: Vec<String>,
    body: Vec<String>,
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl HtmlPage {
    /// Creates an empty page.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `<title>`.
    #[must_use]
    pub fn title(mut self, text: &str) -> Self {
        self.head.push(format!("<title>{}</title>", escape(text)));
        self
    }

    /// Adds `<meta property=.. content=..>`.
    #[must_use]
    pub fn meta_property(mut self, property: &str, content: &str) -> Self {
        self.head.push(format!(
            r#"<meta property="{}" content="{}">"#,
            escape(property),
            escape(content)
        ));
        self
    }

    /// Adds `<meta name=.. content=..>`.
    #[must_use]
    pub fn meta_name(mut self, name: &str, content: &str) -> Self {
        self.head.push(format!(
            r#"<meta name="{}" content="{}">"#,
            escape(name),
            escape(content)
        ));
        self
    }

    /// Adds `<link rel=.. href=..>`.
    #[must_use]
    pub fn link(mut self, rel: &str, href: &str) -> Self {
        self.head.push(format!(
            r#"<link rel="{}" href="{}">"#,
            escape(rel),
            escape(href)
        ));
        self
    }

    /// Adds an anchor to the body.
    #[must_use]
    pub fn anchor(mut self, href: &str, text: &str) -> Self {
        self.body
            .push(format!(r#"<a href="{}">{}</a>"#, escape(href), escape(text)));
        self
    }

    /// Adds a paragraph to the body.
    #[must_use]
    pub fn paragraph(mut self, text: &str) -> Self {
        self.body.push(format!("<p>{}</p>", escape(text)));
        self
    }

    /// Adds a script to the body; its text is not page text.
    #[must_use]
    pub fn script(mut self, code: &str) -> Self {
        self.body.push(format!("<script>{code}</script>"));
        self
    }

    /// Renders the document.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "<!DOCTYPE html><html><head>{}</head><body>{}</body></html>",
            self.head.join(""),
            self.body.join("\n")
        )
    }
}

impl From<HtmlPage> for String {
    fn from(page: HtmlPage) -> Self {
        page.render()
    }
}

/// A fetcher serving the given `(url, html)` pairs.
pub fn fetcher<I, S, P>(pages: I) -> StaticFetcher
where
    I: IntoIterator<Item = (S, P)>,
    S: AsRef<str>,
    P: Into<String>,
{
    pages
        .into_iter()
        .fold(StaticFetcher::new(), |fetcher, (url, html)| {
            fetcher.with_page(url.as_ref(), html)
        })
}

/// A root extraction context over the given pages, with default
/// configuration.
///
/// # Panics
///
/// Panics if `url` or `depth` are not a valid target.
#[allow(clippy::expect_used)]
pub fn context<I, S, P>(url: &str, depth: u8, pages: I) -> ExtractionContext
where
    I: IntoIterator<Item = (S, P)>,
    S: AsRef<str>,
    P: Into<String>,
{
    let target = ExtractionTarget::new(url, depth).expect("fixture target is valid");
    ExtractionContext::new(
        &target,
        Arc::new(CrawlingProvider::new(fetcher(pages))),
        Arc::new(ExtractorConfig::default()),
        Arc::new(CancellationToken::new()),
    )
}

/// An extractor over the given pages, without email verification.
pub fn extractor<I, S, P>(pages: I) -> SiteInfoExtractor
where
    I: IntoIterator<Item = (S, P)>,
    S: AsRef<str>,
    P: Into<String>,
{
    SiteInfoExtractor::new(Arc::new(CrawlingProvider::new(fetcher(pages))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_renders_head_and_body() {
        let html = HtmlPage::new()
            .title("Acme & Co")
            .meta_property("og:site_name", "Acme")
            .anchor("/about", "About")
            .render();

        assert!(html.contains("<title>Acme &amp; Co</title>"));
        assert!(html.contains(r#"<meta property="og:site_name" content="Acme">"#));
        assert!(html.contains(r#"<body><a href="/about">About</a></body>"#));
    }

    #[tokio::test]
    async fn test_context_serves_pages() {
        let ctx = context(
            "https://acme.com/",
            0,
            [("https://acme.com/", HtmlPage::new().anchor("/x", "X"))],
        );
        let links = ctx.provider().find_links(ctx.url(), 0).await.unwrap();
        assert_eq!(links, vec!["https://acme.com/x".to_string()]);
    }
}
