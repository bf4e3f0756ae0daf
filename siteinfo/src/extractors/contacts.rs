//! Emails, phone numbers and links.

use std::collections::HashSet;

use super::ExtractionContext;
use crate::errors::ExtractionError;

/// Returns the distinct email addresses found within the depth bound.
///
/// Only items with exactly one `@` are kept; order is first appearance.
///
/// # Errors
///
/// Returns an error if the target page cannot be read.
pub async fn resolve_emails(ctx: &ExtractionContext) -> Result<Vec<String>, ExtractionError> {
    ctx.ensure_active()?;
    let found = ctx.provider().find_emails(ctx.url(), ctx.depth()).await?;

    let mut seen = HashSet::new();
    Ok(found
        .into_iter()
        .map(|email| email.trim().to_string())
        .filter(|email| email.matches('@').count() == 1)
        .filter(|email| seen.insert(email.to_lowercase()))
        .collect())
}

/// Returns the distinct phone numbers found within the depth bound.
///
/// # Errors
///
/// Returns an error if the target page cannot be read.
pub async fn resolve_phone_numbers(ctx: &ExtractionContext) -> Result<Vec<String>, ExtractionError> {
    ctx.ensure_active()?;
    Ok(ctx
        .provider()
        .find_phone_numbers(ctx.url(), ctx.depth())
        .await?)
}

/// Returns every distinct link found within the depth bound.
///
/// # Errors
///
/// Returns an error if the target page cannot be read.
pub async fn resolve_links(ctx: &ExtractionContext) -> Result<Vec<String>, ExtractionError> {
    ctx.ensure_active()?;
    Ok(ctx.provider().find_links(ctx.url(), ctx.depth()).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, HtmlPage};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_emails_are_deduplicated() {
        let ctx = fixtures::context(
            "https://acme.com/",
            0,
            [(
                "https://acme.com/",
                HtmlPage::new().paragraph("contact: a@x.com, b@x.com, a@x.com"),
            )],
        );

        let mut emails = resolve_emails(&ctx).await.unwrap();
        emails.sort();
        assert_eq!(emails, vec!["a@x.com".to_string(), "b@x.com".to_string()]);
    }

    #[tokio::test]
    async fn test_emails_follow_depth() {
        let ctx = fixtures::context(
            "https://acme.com/",
            1,
            [
                (
                    "https://acme.com/",
                    HtmlPage::new().anchor("/team", "Team"),
                ),
                (
                    "https://acme.com/team",
                    HtmlPage::new().anchor("mailto:jane@acme.com", "Jane"),
                ),
            ],
        );

        assert_eq!(resolve_emails(&ctx).await.unwrap(), vec!["jane@acme.com".to_string()]);
    }

    #[tokio::test]
    async fn test_phone_numbers_and_links() {
        let ctx = fixtures::context(
            "https://acme.com/",
            0,
            [(
                "https://acme.com/",
                HtmlPage::new()
                    .paragraph("Call +1 (555) 010-9999")
                    .anchor("/about", "About")
                    .anchor("/about", "About us"),
            )],
        );

        let phones = resolve_phone_numbers(&ctx).await.unwrap();
        assert_eq!(phones.len(), 1);
        assert!(phones[0].contains("555"));
        assert_eq!(
            resolve_links(&ctx).await.unwrap(),
            vec!["https://acme.com/about".to_string()]
        );
    }
}
