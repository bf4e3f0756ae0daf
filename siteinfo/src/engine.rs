//! The extraction entry point.

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::cancellation::CancellationToken;
use crate::config::ExtractorConfig;
use crate::dispatcher::dispatch;
use crate::errors::SiteInfoError;
use crate::extractors::ExtractionContext;
use crate::observability::{ExtractionSummary, SpanTimer};
use crate::provider::PageContentProvider;
use crate::request::{ExtractionRequest, InfoRequestSpec};
use crate::response::{Credential, EmailVerifier, ResponseStructurer, StructuredResponse};

/// Extracts business metadata from websites.
///
/// One extractor serves many requests concurrently; each request gets its
/// own [`ExtractionContext`], resolver and cancellation token.
///
/// ```rust,ignore
/// use siteinfo::prelude::*;
///
/// let extractor = SiteInfoExtractor::http(ExtractorConfig::default())?;
/// let spec = InfoRequestSpec::new().with(FieldKey::Name, FieldRequest::Flag(true))?;
/// let response = extractor.extract("https://acme.com", 0, spec, None).await?;
/// println!("{}", response.to_json());
/// ```
#[derive(Clone)]
pub struct SiteInfoExtractor {
    provider: Arc<dyn PageContentProvider>,
    config: Arc<ExtractorConfig>,
    structurer: ResponseStructurer,
}

impl SiteInfoExtractor {
    /// Creates an extractor over a page content provider, with default
    /// configuration and no email verification.
    #[must_use]
    pub fn new(provider: Arc<dyn PageContentProvider>) -> Self {
        Self {
            provider,
            config: Arc::new(ExtractorConfig::default()),
            structurer: ResponseStructurer::new(),
        }
    }

    /// Creates an extractor that fetches over HTTP.
    ///
    /// Emails are verified when `config.verification.endpoint` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    #[cfg(feature = "http")]
    pub fn http(config: ExtractorConfig) -> Result<Self, SiteInfoError> {
        use crate::provider::{CrawlingProvider, HttpFetcher};
        use crate::response::HttpEmailVerifier;

        let fetcher = HttpFetcher::new(config.fetch.clone())?;
        let provider = CrawlingProvider::with_config(fetcher, config.crawl.clone());
        let verifier = HttpEmailVerifier::from_config(&config.verification)?;

        let mut extractor = Self::new(Arc::new(provider)).with_config(config);
        if let Some(verifier) = verifier {
            extractor = extractor.with_verifier(Arc::new(verifier));
        }
        Ok(extractor)
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ExtractorConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Verifies extracted emails with the given collaborator whenever a
    /// credential is supplied.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn EmailVerifier>) -> Self {
        self.structurer = self.structurer.with_verifier(verifier);
        self
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extracts the requested fields from a site.
    ///
    /// # Errors
    ///
    /// Returns [`SiteInfoError::Validation`] if the URL, depth or spec are
    /// invalid, and [`SiteInfoError::ResultShape`] if an extractor produced
    /// a malformed value. Field failures are not errors; they appear in
    /// `partial_failures`.
    pub async fn extract(
        &self,
        url: &str,
        depth: u8,
        info_request: InfoRequestSpec,
        credential: Option<&Credential>,
    ) -> Result<StructuredResponse, SiteInfoError> {
        let request = ExtractionRequest::new(url, depth, info_request)?;
        self.extract_request(&request, credential).await
    }

    /// Validates a JSON request body and runs it.
    ///
    /// # Errors
    ///
    /// See [`extract`](Self::extract).
    pub async fn extract_json(
        &self,
        body: &Value,
        credential: Option<&Credential>,
    ) -> Result<StructuredResponse, SiteInfoError> {
        let request = ExtractionRequest::from_value(body)?;
        self.extract_request(&request, credential).await
    }

    /// Runs a validated request.
    ///
    /// # Errors
    ///
    /// See [`extract`](Self::extract).
    pub async fn extract_request(
        &self,
        request: &ExtractionRequest,
        credential: Option<&Credential>,
    ) -> Result<StructuredResponse, SiteInfoError> {
        self.extract_with_cancellation(request, credential, Arc::new(CancellationToken::new()))
            .await
    }

    /// Runs a validated request that can be cancelled through `cancel_token`.
    ///
    /// Cancelling stops outstanding sub-lookups; their fields come back
    /// empty and are listed in `partial_failures`.
    ///
    /// # Errors
    ///
    /// Returns [`SiteInfoError::Cancelled`] if the token is already cancelled
    /// before dispatch. See also [`extract`](Self::extract).
    pub async fn extract_with_cancellation(
        &self,
        request: &ExtractionRequest,
        credential: Option<&Credential>,
        cancel_token: Arc<CancellationToken>,
    ) -> Result<StructuredResponse, SiteInfoError> {
        let request_id = Uuid::new_v4().to_string();
        let target = &request.target;
        let span = info_span!(
            "extract",
            request_id = %request_id,
            url = %target.url(),
            depth = target.depth()
        );

        async {
            let timer = SpanTimer::start("extract");
            info!(fields = request.info_request.len(), "Extraction started");

            let website_url = self.provider.base_url(target.url())?;
            let ctx = ExtractionContext::new(
                target,
                Arc::clone(&self.provider),
                Arc::clone(&self.config),
                cancel_token,
            );
            ctx.ensure_active()?;

            let outcome = dispatch(&ctx, &request.info_request).await?;
            let response = self
                .structurer
                .structure(outcome.clone(), website_url, credential, ctx.resolver())
                .await;

            ExtractionSummary::build(
                request_id.as_str(),
                target.url(),
                target.depth(),
                &outcome,
                timer.finish(),
            )
            .emit();
            Ok::<_, SiteInfoError>(response)
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for SiteInfoExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteInfoExtractor")
            .field("config", &self.config)
            .field("structurer", &self.structurer)
            .finish_non_exhaustive()
    }
}
