//! Maps each requested field to its extractor and merges the results.

use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::errors::{ExtractionError, ResultShapeError};
use crate::extractors::{self, ExtractionContext};
use crate::observability::SpanTimer;
use crate::request::{FieldKey, InfoRequestSpec, Invocation};
use crate::result::{validate_shape, FieldFailure, FieldOutcome, FieldValue, RawResult};

/// The merged result of every requested field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Extracted value per resolved field.
    pub result: RawResult,
    /// Fields, or batch items, that failed and were degraded to empty.
    pub failures: Vec<FieldFailure>,
}

/// Resolves every field of an info request.
///
/// Fields run one after another; batch fields fan out internally. A field
/// whose extraction fails gets its empty value and a [`FieldFailure`]. Keys
/// that were not requested, or requested with a falsy value, never appear
/// in the result.
///
/// # Errors
///
/// Returns a [`ResultShapeError`] if an extractor produced a value that does
/// not fit the response schema.
pub async fn dispatch(
    ctx: &ExtractionContext,
    spec: &InfoRequestSpec,
) -> Result<DispatchOutcome, ResultShapeError> {
    let mut outcome = DispatchOutcome::default();
    let mut requested = BTreeSet::new();

    for (key, invocation) in spec.invocations() {
        requested.insert(key);
        let timer = SpanTimer::start(key.as_str());
        let field = resolve_field(ctx, key, invocation).await;
        debug!(
            field = %key,
            duration_ms = timer.finish(),
            failures = field.failures.len(),
            "Resolved field"
        );
        outcome.result.insert(key, field.value);
        outcome.failures.extend(field.failures);
    }

    validate_shape(&outcome.result, &requested)?;
    Ok(outcome)
}

/// Resolves one field, degrading it to empty on failure.
pub async fn resolve_field(
    ctx: &ExtractionContext,
    key: FieldKey,
    invocation: Invocation,
) -> FieldOutcome {
    let resolved = match key {
        FieldKey::Name => extractors::resolve_name(ctx)
            .await
            .map(FieldValue::from_option),
        FieldKey::Logos => extractors::resolve_logos(ctx).await.map(FieldValue::List),
        FieldKey::Address => extractors::resolve_addresses(ctx).await.map(|found| {
            if found.is_empty() {
                FieldValue::Empty
            } else {
                FieldValue::List(found)
            }
        }),
        FieldKey::AllPhoneNumbers => extractors::resolve_phone_numbers(ctx)
            .await
            .map(FieldValue::List),
        FieldKey::AllEmails => extractors::resolve_emails(ctx).await.map(FieldValue::List),
        FieldKey::AllLinks => extractors::resolve_links(ctx).await.map(FieldValue::List),
        FieldKey::SocialMediaLinks => {
            extractors::resolve_social_links(ctx, choices(invocation)).await
        }
        FieldKey::SiteSocials => {
            return extractors::resolve_social_handles(ctx, choices(invocation)).await;
        }
        FieldKey::PagesUrl => {
            return extractors::guess_pages(ctx, labels(invocation)).await;
        }
    };

    match resolved {
        Ok(value) => value.into(),
        Err(err) => degraded(key, &err),
    }
}

fn degraded(key: FieldKey, err: &ExtractionError) -> FieldOutcome {
    warn!(field = %key, error = %err, "Field extraction failed, returning empty value");
    FieldOutcome::from(FieldValue::empty_for(key))
        .with_failures(vec![FieldFailure::new(key.as_str(), err.to_string())])
}

/// `None` resolves the default list.
fn choices(invocation: Invocation) -> Option<Vec<String>> {
    match invocation {
        Invocation::Subset(items) | Invocation::List(items) => Some(items),
        Invocation::All | Invocation::Flag => None,
    }
}

fn labels(invocation: Invocation) -> Vec<String> {
    match invocation {
        Invocation::List(items) | Invocation::Subset(items) => items,
        Invocation::All | Invocation::Flag => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{ChoiceSet, FieldRequest};
    use crate::result::Leaf;
    use crate::testing::{fixtures, HtmlPage};
    use pretty_assertions::assert_eq;

    fn page() -> HtmlPage {
        HtmlPage::new()
            .meta_property("og:site_name", "Acme Corp")
            .paragraph("contact: a@x.com, b@x.com, a@x.com")
            .anchor("/about", "About")
            .anchor("https://www.facebook.com/acme", "Facebook")
    }

    #[tokio::test]
    async fn test_only_truthy_keys_are_resolved() {
        let ctx = fixtures::context("https://acme.com/", 0, [("https://acme.com/", page())]);
        let spec = InfoRequestSpec::new()
            .with(FieldKey::Name, FieldRequest::Flag(true))
            .unwrap()
            .with(FieldKey::Logos, FieldRequest::Flag(false))
            .unwrap()
            .with(FieldKey::PagesUrl, FieldRequest::List(Vec::new()))
            .unwrap()
            .with(
                FieldKey::SiteSocials,
                FieldRequest::Choices(ChoiceSet {
                    all: false,
                    choices: Vec::new(),
                }),
            )
            .unwrap();

        let outcome = dispatch(&ctx, &spec).await.unwrap();
        let keys: Vec<_> = outcome.result.keys().copied().collect();
        assert_eq!(keys, vec![FieldKey::Name]);
        assert_eq!(
            outcome.result[&FieldKey::Name],
            FieldValue::Text("Acme Corp".into())
        );
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_emails_and_social_subset() {
        let ctx = fixtures::context("https://acme.com/", 0, [("https://acme.com/", page())]);
        let spec = InfoRequestSpec::new()
            .with(FieldKey::AllEmails, FieldRequest::Flag(true))
            .unwrap()
            .with(
                FieldKey::SocialMediaLinks,
                FieldRequest::Choices(ChoiceSet {
                    all: false,
                    choices: vec!["facebook".into()],
                }),
            )
            .unwrap();

        let outcome = dispatch(&ctx, &spec).await.unwrap();
        let mut emails = outcome.result[&FieldKey::AllEmails].as_list().unwrap().to_vec();
        emails.sort();
        assert_eq!(emails, vec!["a@x.com".to_string(), "b@x.com".to_string()]);
        assert_eq!(
            outcome.result[&FieldKey::SocialMediaLinks]
                .as_map()
                .unwrap()
                .get("facebook"),
            Some(&Leaf::List(vec!["https://www.facebook.com/acme".into()]))
        );
    }

    #[tokio::test]
    async fn test_failed_field_degrades_without_stopping_others() {
        let ctx = fixtures::context("https://acme.com/team", 0, [("https://acme.com/", page())]);
        let spec = InfoRequestSpec::new()
            .with(FieldKey::Name, FieldRequest::Flag(true))
            .unwrap()
            .with(FieldKey::AllLinks, FieldRequest::Flag(true))
            .unwrap();

        let outcome = dispatch(&ctx, &spec).await.unwrap();
        // The name comes from the base page; links need the missing target.
        assert_eq!(
            outcome.result[&FieldKey::Name],
            FieldValue::Text("Acme Corp".into())
        );
        assert_eq!(outcome.result[&FieldKey::AllLinks], FieldValue::List(Vec::new()));
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].field, "all_links");
    }

    #[tokio::test]
    async fn test_cancelled_request_yields_empty_values() {
        let ctx = fixtures::context("https://acme.com/", 0, [("https://acme.com/", page())]);
        ctx.resolver().cancel_token().cancel("client went away");
        let spec = InfoRequestSpec::new()
            .with(FieldKey::Logos, FieldRequest::Flag(true))
            .unwrap()
            .with(FieldKey::PagesUrl, FieldRequest::List(vec!["about".into()]))
            .unwrap();

        let outcome = dispatch(&ctx, &spec).await.unwrap();
        assert_eq!(outcome.result[&FieldKey::Logos], FieldValue::List(Vec::new()));
        assert_eq!(
            outcome.result[&FieldKey::PagesUrl],
            FieldValue::Map([("about".to_string(), Leaf::Empty)].into_iter().collect())
        );
        assert_eq!(outcome.failures.len(), 2);
    }
}
