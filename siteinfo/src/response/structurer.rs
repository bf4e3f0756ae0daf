//! Builds the caller-facing response from a raw result.

use serde::Serialize;
use std::sync::Arc;

use super::verification::{partition_emails, Credential, EmailVerifier};
use crate::dispatcher::DispatchOutcome;
use crate::request::FieldKey;
use crate::resolver::ConcurrentResolver;
use crate::result::{FieldFailure, FieldValue, RawResult};

/// The response returned to the caller.
///
/// Promoted fields are `null` when they were not requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuredResponse {
    /// The raw result, verbatim.
    pub meta_data: RawResult,
    /// Emails the verification service confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_emails: Option<Vec<String>>,
    /// Emails that failed or could not be verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unverified_emails: Option<Vec<String>>,
    /// From `name`.
    pub company_name: FieldValue,
    /// From `all_phone_numbers`.
    pub phone_numbers: FieldValue,
    /// From `address`.
    pub addresses: FieldValue,
    /// From `all_emails`.
    pub emails_found: FieldValue,
    /// From `logos`.
    pub logos: FieldValue,
    /// From `site_socials`.
    pub website_social_handles: FieldValue,
    /// Root URL of the target site.
    pub website_url: String,
    /// Fields that failed and were returned empty.
    pub partial_failures: Vec<FieldFailure>,
}

impl StructuredResponse {
    /// Converts to JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Whether every requested field resolved cleanly.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.partial_failures.is_empty()
    }
}

/// Turns dispatch outcomes into [`StructuredResponse`]s.
#[derive(Clone, Default)]
pub struct ResponseStructurer {
    verifier: Option<Arc<dyn EmailVerifier>>,
}

impl ResponseStructurer {
    /// Creates a structurer without email verification.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifies emails with the given collaborator.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn EmailVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Builds the response.
    ///
    /// Emails are partitioned only when emails were extracted, a credential
    /// was supplied and a verifier is configured.
    pub async fn structure(
        &self,
        outcome: DispatchOutcome,
        website_url: String,
        credential: Option<&Credential>,
        resolver: &ConcurrentResolver,
    ) -> StructuredResponse {
        let DispatchOutcome { result, failures } = outcome;

        let mut verified_emails = None;
        let mut unverified_emails = None;
        if let (Some(emails), Some(credential), Some(verifier)) = (
            result.get(&FieldKey::AllEmails).and_then(FieldValue::as_list),
            credential,
            self.verifier.as_ref(),
        ) {
            let partition =
                partition_emails(Arc::clone(verifier), emails, credential, resolver).await;
            verified_emails = Some(partition.verified);
            unverified_emails = Some(partition.unverified);
        }

        let promoted = |key: FieldKey| result.get(&key).cloned().unwrap_or(FieldValue::Empty);
        StructuredResponse {
            verified_emails,
            unverified_emails,
            company_name: promoted(FieldKey::Name),
            phone_numbers: promoted(FieldKey::AllPhoneNumbers),
            addresses: promoted(FieldKey::Address),
            emails_found: promoted(FieldKey::AllEmails),
            logos: promoted(FieldKey::Logos),
            website_social_handles: promoted(FieldKey::SiteSocials),
            website_url,
            partial_failures: failures,
            meta_data: result,
        }
    }
}

impl std::fmt::Debug for ResponseStructurer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStructurer")
            .field("verifies_emails", &self.verifier.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;
    use crate::response::MockEmailVerifier;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn resolver() -> ConcurrentResolver {
        ConcurrentResolver::new(2, Duration::from_secs(5), Arc::new(CancellationToken::new()))
    }

    fn outcome() -> DispatchOutcome {
        let mut result = RawResult::new();
        result.insert(FieldKey::Name, FieldValue::Text("Acme Corp".into()));
        result.insert(
            FieldKey::AllEmails,
            FieldValue::List(vec!["a@x.com".into(), "b@x.com".into()]),
        );
        DispatchOutcome {
            result,
            failures: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_unrequested_fields_are_null() {
        let response = ResponseStructurer::new()
            .structure(outcome(), "https://acme.com/".into(), None, &resolver())
            .await;

        let body = response.to_json();
        assert_eq!(body["company_name"], json!("Acme Corp"));
        assert_eq!(body["emails_found"], json!(["a@x.com", "b@x.com"]));
        assert_eq!(body["logos"], json!(null));
        assert_eq!(body["website_social_handles"], json!(null));
        assert_eq!(body["addresses"], json!(null));
        assert_eq!(body["website_url"], json!("https://acme.com/"));
        assert_eq!(body["meta_data"]["name"], json!("Acme Corp"));
        assert_eq!(body["partial_failures"], json!([]));
        assert!(body.get("verified_emails").is_none());
    }

    #[tokio::test]
    async fn test_emails_partitioned_with_credential() {
        let mut verifier = MockEmailVerifier::new();
        verifier
            .expect_verify()
            .returning(|email, _| Ok(email == "a@x.com"));
        let structurer = ResponseStructurer::new().with_verifier(Arc::new(verifier));

        let response = structurer
            .structure(
                outcome(),
                "https://acme.com/".into(),
                Some(&Credential::new("key")),
                &resolver(),
            )
            .await;

        assert_eq!(response.verified_emails, Some(vec!["a@x.com".to_string()]));
        assert_eq!(response.unverified_emails, Some(vec!["b@x.com".to_string()]));
    }

    #[tokio::test]
    async fn test_no_credential_skips_verification() {
        let mut verifier = MockEmailVerifier::new();
        verifier.expect_verify().never();
        let structurer = ResponseStructurer::new().with_verifier(Arc::new(verifier));

        let response = structurer
            .structure(outcome(), "https://acme.com/".into(), None, &resolver())
            .await;
        assert!(response.verified_emails.is_none());
        assert!(response.is_complete());
    }
}
