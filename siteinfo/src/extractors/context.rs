//! The per-request extraction context.

use std::sync::Arc;

use crate::cancellation::CancellationToken;
use crate::config::ExtractorConfig;
use crate::errors::ExtractionError;
use crate::provider::PageContentProvider;
use crate::request::ExtractionTarget;
use crate::resolver::ConcurrentResolver;

/// Everything an extractor needs for one request.
///
/// Built once per extraction and never mutated; cloning is cheap. A
/// context scoped to a sub-page shares the provider, configuration,
/// resolver and cancellation token of its parent.
#[derive(Clone)]
pub struct ExtractionContext {
    url: String,
    depth: u8,
    scoped: bool,
    provider: Arc<dyn PageContentProvider>,
    config: Arc<ExtractorConfig>,
    resolver: ConcurrentResolver,
}

impl ExtractionContext {
    /// Creates the root context of a request.
    #[must_use]
    pub fn new(
        target: &ExtractionTarget,
        provider: Arc<dyn PageContentProvider>,
        config: Arc<ExtractorConfig>,
        cancel_token: Arc<CancellationToken>,
    ) -> Self {
        let resolver = ConcurrentResolver::new(
            config.max_concurrency,
            config.sub_lookup_timeout(),
            cancel_token,
        );
        Self {
            url: target.url().to_string(),
            depth: target.depth(),
            scoped: false,
            provider,
            config,
            resolver,
        }
    }

    /// A context for a sub-page of this site, with the same depth bound.
    ///
    /// Scoping is one level deep: a scoped context cannot be scoped again,
    /// so this returns `None` for it.
    #[must_use]
    pub fn scoped_to(&self, url: impl Into<String>) -> Option<Self> {
        if self.scoped {
            return None;
        }
        Some(Self {
            url: url.into(),
            scoped: true,
            ..self.clone()
        })
    }

    /// The URL extractors run against.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Maximum link hops followed from the URL.
    #[must_use]
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Whether this context was scoped to a sub-page.
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        self.scoped
    }

    /// The page content provider.
    #[must_use]
    pub fn provider(&self) -> &dyn PageContentProvider {
        self.provider.as_ref()
    }

    /// The extractor configuration.
    #[must_use]
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// The resolver for concurrent sub-lookups.
    #[must_use]
    pub fn resolver(&self) -> &ConcurrentResolver {
        &self.resolver
    }

    /// The root URL of the site.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the URL.
    pub fn base_url(&self) -> Result<String, ExtractionError> {
        Ok(self.provider.base_url(&self.url)?)
    }

    /// Fails with [`ExtractionError::Cancelled`] once the request is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the request has been cancelled.
    pub fn ensure_active(&self) -> Result<(), ExtractionError> {
        let token = self.resolver.cancel_token();
        if token.is_cancelled() {
            return Err(ExtractionError::Cancelled(token.reason().unwrap_or_default()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ExtractionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionContext")
            .field("url", &self.url)
            .field("depth", &self.depth)
            .field("scoped", &self.scoped)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::CrawlingProvider;
    use crate::testing::StaticFetcher;

    fn context() -> ExtractionContext {
        let target = ExtractionTarget::new("https://acme.com/team", 1).unwrap();
        ExtractionContext::new(
            &target,
            Arc::new(CrawlingProvider::new(StaticFetcher::new())),
            Arc::new(ExtractorConfig::default()),
            Arc::new(CancellationToken::new()),
        )
    }

    #[test]
    fn test_scoping_is_one_level() {
        let root = context();
        let scoped = root.scoped_to("https://acme.com/contact").unwrap();

        assert_eq!(scoped.url(), "https://acme.com/contact");
        assert_eq!(scoped.depth(), 1);
        assert!(scoped.is_scoped());
        assert!(scoped.scoped_to("https://acme.com/x").is_none());
    }

    #[test]
    fn test_base_url() {
        assert_eq!(context().base_url().unwrap(), "https://acme.com/");
    }

    #[test]
    fn test_ensure_active() {
        let ctx = context();
        assert!(ctx.ensure_active().is_ok());

        ctx.resolver().cancel_token().cancel("stop");
        assert_eq!(
            ctx.ensure_active(),
            Err(ExtractionError::Cancelled("stop".to_string()))
        );
    }
}
