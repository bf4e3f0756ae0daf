//! Email verification through an external service.

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

use crate::errors::VerificationError;
use crate::resolver::ConcurrentResolver;

#[allow(clippy::expect_used)]
static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-|\w.]+@\w+.\w{2,}").expect("static regex"));

/// Whether a value looks like an email address.
#[must_use]
pub fn is_email(value: &str) -> bool {
    EMAIL_SHAPE.is_match(value)
}

/// An opaque caller credential, forwarded to the verification service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a credential.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Checks whether an email address is real and deliverable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailVerifier: Send + Sync {
    /// Verifies one address on behalf of the credential's owner.
    async fn verify(&self, email: &str, credential: &Credential) -> Result<bool, VerificationError>;
}

/// Emails split by verification outcome, each in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailPartition {
    /// Addresses the service confirmed.
    pub verified: Vec<String>,
    /// Addresses that failed or could not be checked.
    pub unverified: Vec<String>,
}

/// Verifies every email concurrently and partitions them.
///
/// Errors, timeouts and negative answers all count as unverified; nothing
/// is raised.
pub async fn partition_emails(
    verifier: Arc<dyn EmailVerifier>,
    emails: &[String],
    credential: &Credential,
    resolver: &ConcurrentResolver,
) -> EmailPartition {
    let credential = credential.clone();
    let results = resolver
        .resolve_all(emails.iter().cloned(), move |email: String| {
            let verifier = Arc::clone(&verifier);
            let credential = credential.clone();
            async move {
                Ok(match verifier.verify(&email, &credential).await {
                    Ok(verified) => verified,
                    Err(err) => {
                        warn!(email = %email, error = %err, "Email verification failed");
                        false
                    }
                })
            }
        })
        .await;

    let mut partition = EmailPartition::default();
    for email in emails {
        if partition.verified.contains(email) || partition.unverified.contains(email) {
            continue;
        }
        match results.get(email) {
            Some(Ok(true)) => partition.verified.push(email.clone()),
            Some(Err(err)) => {
                warn!(email = %email, error = %err, "Email verification did not finish");
                partition.unverified.push(email.clone());
            }
            _ => partition.unverified.push(email.clone()),
        }
    }
    debug!(
        verified = partition.verified.len(),
        unverified = partition.unverified.len(),
        "Partitioned emails"
    );
    partition
}

/// Verifier that posts each address to an HTTP endpoint.
///
/// The address goes in the `email` form field and the credential as a
/// bearer token. An address is verified when the service answers 200 with
/// `{"success": true}`.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpEmailVerifier {
    client: reqwest::Client,
    endpoint: String,
}

#[cfg(feature = "http")]
impl HttpEmailVerifier {
    /// Creates a verifier for an endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, VerificationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VerificationError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Creates a verifier from configuration, or `None` when no endpoint is
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(
        config: &crate::config::VerificationConfig,
    ) -> Result<Option<Self>, VerificationError> {
        config
            .endpoint
            .as_ref()
            .map(|endpoint| Self::new(endpoint.clone(), config.timeout()))
            .transpose()
    }

    /// The endpoint addresses are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl EmailVerifier for HttpEmailVerifier {
    async fn verify(&self, email: &str, credential: &Credential) -> Result<bool, VerificationError> {
        if !is_email(email) {
            return Err(VerificationError::InvalidAddress(email.to_string()));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(credential.expose())
            .form(&[("email", email)])
            .send()
            .await
            .map_err(|e| VerificationError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(VerificationError::Status(status));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| VerificationError::Malformed(e.to_string()))?;
        body.get("success")
            .and_then(serde_json::Value::as_bool)
            .ok_or_else(|| VerificationError::Malformed("missing boolean `success`".to_string()))
    }
}
