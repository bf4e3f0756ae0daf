//! Sub-page URL guessing.
//!
//! A label such as "contact" is matched against the links of the site in
//! three tiers, first success wins:
//!
//! 1. fuzzy match of the label against the percent-decoded links;
//! 2. case-insensitive substring match against the raw links;
//! 3. case-insensitive substring match against anchor text.
//!
//! Whatever tier wins, the URL is path-trimmed: a path with more than two
//! `/`-separated segments loses its last segment.

use std::collections::HashMap;
use tracing::debug;
use url::Url;

use super::{batch_outcome, ExtractionContext};
use crate::errors::ExtractionError;
use crate::matching;
use crate::provider::TagQuery;
use crate::request::FieldKey;
use crate::result::{FieldOutcome, FieldValue, Leaf};

/// Guesses the URL of the page a label refers to.
///
/// The root context searches from the site's base URL; a context scoped to
/// a sub-page searches from that sub-page.
///
/// # Errors
///
/// Returns an error if the pages cannot be read.
pub async fn guess_page_url(
    ctx: &ExtractionContext,
    label: &str,
) -> Result<Option<String>, ExtractionError> {
    ctx.ensure_active()?;
    let base_url = ctx.base_url()?;
    let root = if ctx.is_scoped() {
        ctx.url().to_string()
    } else {
        base_url.clone()
    };
    let needle = label.to_lowercase();
    let stripped = label.trim().to_lowercase();
    if stripped.is_empty() {
        return Ok(None);
    }

    let links = ctx.provider().find_links(&root, ctx.depth()).await?;

    let mut decoded: HashMap<String, &str> = HashMap::with_capacity(links.len());
    for link in &links {
        decoded.entry(matching::unquote_plus(link)).or_insert(link.as_str());
    }
    let candidates: Vec<&String> = decoded.keys().collect();
    if let Some(best) = matching::close_matches(
        &needle,
        candidates,
        matching::half_or_one(decoded.len()),
        ctx.config().page_cutoff,
    )
    .into_iter()
    .next()
    {
        if let Some(original) = decoded.get(&best) {
            debug!(label, tier = 1, link = %original, "Guessed page");
            return Ok(trim_path(original, &base_url));
        }
    }

    if let Some(link) = links.iter().find(|link| {
        let lower = link.to_lowercase();
        lower.contains(&needle) || lower.contains(&stripped)
    }) {
        debug!(label, tier = 2, link = %link, "Guessed page");
        return Ok(trim_path(link, &base_url));
    }

    let anchors = ctx
        .provider()
        .find_tags(&root, &TagQuery::new("a"), ctx.depth())
        .await?;
    if let Some(href) = anchors
        .iter()
        .filter(|tag| tag.text().to_lowercase().contains(&stripped))
        .find_map(|tag| tag.get("href").and_then(|_| tag.resource_url()))
    {
        debug!(label, tier = 3, link = %href, "Guessed page");
        return Ok(trim_path(&href, &base_url));
    }

    debug!(label, "No page guessed");
    Ok(None)
}

/// Guesses the URLs of several labels concurrently.
///
/// Every label appears in the result; labels with no guess map to empty.
/// A label whose lookup fails maps to empty and is reported as a failure.
pub async fn guess_pages(ctx: &ExtractionContext, labels: Vec<String>) -> FieldOutcome {
    let lookup_ctx = ctx.clone();
    let results = ctx
        .resolver()
        .resolve_all(labels, move |label: String| {
            let ctx = lookup_ctx.clone();
            async move { guess_page_url(&ctx, &label).await }
        })
        .await;

    let (entries, failures) = batch_outcome(FieldKey::PagesUrl, results, |value| {
        Some(Leaf::from_option(value.flatten()))
    });
    FieldOutcome::from(FieldValue::Map(entries)).with_failures(failures)
}

/// Drops the last path segment of paths with more than two segments, then
/// joins the result against the base URL.
#[must_use]
pub fn trim_path(link: &str, base_url: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    let mut url = base.join(link).ok()?;

    let mut segments: Vec<&str> = url.path().split('/').collect();
    if segments.len() > 2 {
        segments.pop();
        let trimmed = segments.join("/");
        url.set_path(&trimmed);
    }
    Some(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, HtmlPage};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn sorted_entries(entries: impl IntoIterator<Item = (String, Leaf)>) -> BTreeMap<String, Leaf> {
        entries.into_iter().collect()
    }

    #[test]
    fn test_trim_path() {
        let base = "https://acme.com/";
        assert_eq!(trim_path("https://acme.com/contact", base).unwrap(), "https://acme.com/contact");
        assert_eq!(trim_path("https://acme.com/about/", base).unwrap(), "https://acme.com/about");
        assert_eq!(
            trim_path("https://acme.com/company/about/team?x=1", base).unwrap(),
            "https://acme.com/company/about?x=1"
        );
        assert_eq!(trim_path("/careers/jobs", base).unwrap(), "https://acme.com/careers");
    }

    #[tokio::test]
    async fn test_external_link_by_substring() {
        let ctx = fixtures::context(
            "https://acme.com/",
            0,
            [(
                "https://acme.com/",
                HtmlPage::new().anchor("https://ab.co/contacts", "x"),
            )],
        );
        assert_eq!(
            guess_page_url(&ctx, "Contact").await.unwrap(),
            Some("https://ab.co/contacts".to_string())
        );
    }

    #[tokio::test]
    async fn test_fuzzy_tier_matches_decoded_link() {
        let ctx = fixtures::context(
            "https://acme.com/",
            0,
            [(
                "https://acme.com/",
                HtmlPage::new().anchor("/about%20us", "Who we are"),
            )],
        );

        assert_eq!(
            guess_page_url(&ctx, "https://acme.com/About-us").await.unwrap(),
            Some("https://acme.com/about%20us".to_string())
        );
    }

    #[tokio::test]
    async fn test_substring_tier_finds_exact_label() {
        let ctx = fixtures::context(
            "https://acme.com/",
            0,
            [(
                "https://acme.com/",
                HtmlPage::new()
                    .anchor("/", "Home")
                    .anchor("/company/careers-at-acme", "Jobs"),
            )],
        );

        assert_eq!(
            guess_page_url(&ctx, "careers").await.unwrap(),
            Some("https://acme.com/company".to_string())
        );
    }

    #[tokio::test]
    async fn test_anchor_text_tier() {
        let ctx = fixtures::context(
            "https://acme.com/",
            0,
            [(
                "https://acme.com/",
                HtmlPage::new().anchor("/p/17", "Our Services"),
            )],
        );

        assert_eq!(
            guess_page_url(&ctx, "services").await.unwrap(),
            Some("https://acme.com/p".to_string())
        );
    }

    #[tokio::test]
    async fn test_no_guess() {
        let ctx = fixtures::context(
            "https://acme.com/",
            0,
            [("https://acme.com/", HtmlPage::new().anchor("/", "Home"))],
        );
        assert_eq!(guess_page_url(&ctx, "products").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_batch_keeps_empty_entries() {
        let ctx = fixtures::context(
            "https://acme.com/",
            0,
            [(
                "https://acme.com/",
                HtmlPage::new().anchor("/about", "About"),
            )],
        );

        let outcome = guess_pages(&ctx, vec!["about".into(), "careers".into()]).await;
        assert!(outcome.failures.is_empty());
        assert_eq!(
            outcome.value,
            FieldValue::Map(sorted_entries([
                ("about".to_string(), Leaf::Text("https://acme.com/about".into())),
                ("careers".to_string(), Leaf::Empty),
            ]))
        );
    }

    #[tokio::test]
    async fn test_batch_reports_failures() {
        let ctx = fixtures::context("https://acme.com/", 0, Vec::<(&str, String)>::new());

        let outcome = guess_pages(&ctx, vec!["about".into()]).await;
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].field, "pages_url.about");
        assert_eq!(
            outcome.value,
            FieldValue::Map(sorted_entries([("about".to_string(), Leaf::Empty)]))
        );
    }
}
