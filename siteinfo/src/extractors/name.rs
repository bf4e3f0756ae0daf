//! Site name resolution.

use std::collections::BTreeSet;
use tracing::debug;
use url::Url;

use super::ExtractionContext;
use crate::errors::ExtractionError;
use crate::matching;
use crate::provider::TagQuery;

fn name_queries() -> [TagQuery; 4] {
    [
        TagQuery::new("meta").with_attr("name", ["application-name", "apple-mobile-web-app-title"]),
        TagQuery::new("meta").with_attr("property", ["og:site_name", "og:title"]),
        TagQuery::new("meta").with_attr("itemprop", ["name"]),
        TagQuery::new("title"),
    ]
}

/// Returns the most likely display name of the site.
///
/// Candidates come from the name-bearing meta tags and the `<title>` of the
/// site's base page. The candidate closest to the site's host name wins.
///
/// # Errors
///
/// Returns an error if the base page cannot be read.
pub async fn resolve_name(ctx: &ExtractionContext) -> Result<Option<String>, ExtractionError> {
    ctx.ensure_active()?;
    let base_url = ctx.base_url()?;

    let mut candidates = BTreeSet::new();
    for query in name_queries() {
        let tags = ctx.provider().find_tags(&base_url, &query, 0).await?;
        candidates.extend(tags.iter().filter_map(|tag| {
            let value = tag
                .get("content")
                .map(str::trim)
                .filter(|content| !content.is_empty())
                .unwrap_or_else(|| tag.text().trim());
            (!value.is_empty()).then(|| value.to_string())
        }));
    }

    let host = site_host(&base_url);
    let candidates: Vec<String> = candidates.into_iter().collect();
    let name = matching::best_match(&host, &candidates, ctx.config().name_cutoff);
    debug!(host = %host, candidates = candidates.len(), name = ?name, "Resolved site name");
    Ok(name)
}

/// The host of a URL without a leading `www.`.
pub(crate) fn site_host(url: &str) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_default();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, HtmlPage};

    #[tokio::test]
    async fn test_og_site_name_beats_noisy_title() {
        let ctx = fixtures::context(
            "https://www.acme.com/about",
            0,
            [(
                "https://www.acme.com/",
                HtmlPage::new()
                    .meta_property("og:site_name", "Acme Corp")
                    .title("Home | Welcome to the official website of Acme Corporation Limited"),
            )],
        );

        assert_eq!(resolve_name(&ctx).await.unwrap(), Some("Acme Corp".to_string()));
    }

    #[tokio::test]
    async fn test_no_candidate_close_enough() {
        let ctx = fixtures::context(
            "https://acme.com/",
            0,
            [("https://acme.com/", HtmlPage::new().title("Zzzzzzzzzzzzzzzzzzzzzzzz"))],
        );

        assert_eq!(resolve_name(&ctx).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_name_is_deterministic() {
        let page = HtmlPage::new()
            .meta_name("application-name", "acme")
            .meta_property("og:title", "acme.co")
            .title("Acme");
        let ctx = fixtures::context("https://acme.com/", 0, [("https://acme.com/", page)]);

        let first = resolve_name(&ctx).await.unwrap();
        let second = resolve_name(&ctx).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, Some("acme.co".to_string()));
    }

    #[tokio::test]
    async fn test_empty_content_falls_back_to_text() {
        let page = r#"<html><head>
            <meta itemprop="name" content="  ">
            <title content="">Acme Corp</title>
        </head><body></body></html>"#;
        let ctx = fixtures::context("https://acme.com/", 0, [("https://acme.com/", page)]);

        assert_eq!(resolve_name(&ctx).await.unwrap(), Some("Acme Corp".to_string()));
    }

    #[tokio::test]
    async fn test_missing_base_page_is_an_error() {
        let ctx = fixtures::context("https://acme.com/", 0, Vec::<(&str, String)>::new());
        assert!(resolve_name(&ctx).await.is_err());
    }

    #[test]
    fn test_site_host_strips_www() {
        assert_eq!(site_host("https://www.Acme.com/x"), "acme.com");
        assert_eq!(site_host("https://shop.acme.com/"), "shop.acme.com");
    }
}
