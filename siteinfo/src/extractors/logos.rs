//! Logo and icon resolution.

use std::collections::BTreeSet;

use super::ExtractionContext;
use crate::errors::ExtractionError;
use crate::provider::TagQuery;

const ICON_RELS: [&str; 4] = [
    "icon",
    "shortcut icon",
    "apple-touch-icon",
    "apple-touch-icon-precomposed",
];

const IMAGE_PROPERTIES: [&str; 3] = ["og:image", "twitter:image", "twitter:image:src"];

/// Returns the deduplicated logo and icon URLs of the site.
///
/// Icon `link` tags come from the target; Open Graph and Twitter image
/// tags from the base page. Resources are resolved to absolute URLs, not
/// downloaded.
///
/// # Errors
///
/// Returns an error if a page cannot be read.
pub async fn resolve_logos(ctx: &ExtractionContext) -> Result<Vec<String>, ExtractionError> {
    ctx.ensure_active()?;
    let provider = ctx.provider();

    let icons = TagQuery::new("link").with_attr("rel", ICON_RELS);
    let mut tags = provider.find_tags(ctx.url(), &icons, ctx.depth()).await?;

    let images = TagQuery::new("meta").with_attr("property", IMAGE_PROPERTIES);
    tags.extend(provider.find_tags(&ctx.base_url()?, &images, ctx.depth()).await?);

    let logos: BTreeSet<String> = tags.iter().filter_map(|tag| tag.resource_url()).collect();
    Ok(logos.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, HtmlPage};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_icons_and_social_images() {
        let ctx = fixtures::context(
            "https://acme.com/",
            0,
            [(
                "https://acme.com/",
                HtmlPage::new()
                    .link("Shortcut Icon", "/favicon.ico")
                    .link("apple-touch-icon", "https://cdn.acme.com/touch.png")
                    .link("stylesheet", "/site.css")
                    .meta_property("og:image", "/img/og.png")
                    .meta_property("twitter:image", "/img/og.png")
                    .meta_property("og:image", ""),
            )],
        );

        assert_eq!(
            resolve_logos(&ctx).await.unwrap(),
            vec![
                "https://acme.com/favicon.ico".to_string(),
                "https://acme.com/img/og.png".to_string(),
                "https://cdn.acme.com/touch.png".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_logos() {
        let ctx = fixtures::context("https://acme.com/", 0, [("https://acme.com/", HtmlPage::new())]);
        assert!(resolve_logos(&ctx).await.unwrap().is_empty());
    }
}
