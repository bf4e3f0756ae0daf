//! Bounded fan-out of independent per-key sub-lookups.
//!
//! Batch operations (page guessing, social handles, email verification) run
//! one sub-lookup per key. Each sub-lookup runs on its own task, holds a
//! semaphore permit while working, is raced against the request's
//! cancellation token and gets its own timeout. Each task hands back its key
//! with its outcome, so arrival order does not matter.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::cancellation::CancellationToken;
use crate::errors::ExtractionError;

/// Runs keyed sub-lookups concurrently under a shared concurrency bound.
#[derive(Clone)]
pub struct ConcurrentResolver {
    permits: Arc<Semaphore>,
    max_concurrency: usize,
    timeout: Duration,
    cancel_token: Arc<CancellationToken>,
}

impl ConcurrentResolver {
    /// Creates a resolver.
    ///
    /// `max_concurrency` is clamped to at least one.
    #[must_use]
    pub fn new(
        max_concurrency: usize,
        timeout: Duration,
        cancel_token: Arc<CancellationToken>,
    ) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            timeout,
            cancel_token,
        }
    }

    /// Returns the concurrency bound.
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Returns the per-sub-lookup timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the cancellation token observed by every sub-lookup.
    #[must_use]
    pub fn cancel_token(&self) -> &Arc<CancellationToken> {
        &self.cancel_token
    }

    /// Resolves every key concurrently and merges the results by key.
    ///
    /// Duplicate keys are resolved once. Every input key appears in the
    /// returned map: a sub-lookup that times out, is cancelled or panics
    /// yields an `Err` for its key instead of failing the batch.
    pub async fn resolve_all<K, V, F, Fut>(
        &self,
        keys: impl IntoIterator<Item = K>,
        lookup: F,
    ) -> HashMap<K, Result<V, ExtractionError>>
    where
        K: Eq + Hash + Clone + std::fmt::Debug + Send + 'static,
        V: Send + 'static,
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, ExtractionError>> + Send + 'static,
    {
        let lookup = Arc::new(lookup);
        let mut tasks = JoinSet::new();
        let mut pending = Vec::new();

        for key in keys {
            if pending.contains(&key) {
                continue;
            }
            pending.push(key.clone());

            let lookup = lookup.clone();
            let permits = self.permits.clone();
            let token = self.cancel_token.clone();
            let timeout = self.timeout;

            tasks.spawn(async move {
                let outcome = tokio::select! {
                    reason = token.cancelled() => Err(ExtractionError::Cancelled(reason)),
                    outcome = run_permitted(permits, timeout, lookup(key.clone())) => outcome,
                };
                if let Err(ref e) = outcome {
                    debug!(key = ?key, error = %e, "Sub-lookup did not complete");
                }
                (key, outcome)
            });
        }

        let mut results = HashMap::with_capacity(pending.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, outcome)) => {
                    results.insert(key, outcome);
                }
                Err(join_error) => warn!("Sub-lookup task failed: {}", join_error),
            }
        }

        for key in pending {
            results
                .entry(key)
                .or_insert_with_key(|key| Err(ExtractionError::Aborted(format!("{key:?}"))));
        }
        results
    }
}

async fn run_permitted<V, Fut>(
    permits: Arc<Semaphore>,
    timeout: Duration,
    work: Fut,
) -> Result<V, ExtractionError>
where
    Fut: Future<Output = Result<V, ExtractionError>>,
{
    let _permit = permits
        .acquire_owned()
        .await
        .map_err(|e| ExtractionError::Aborted(e.to_string()))?;

    tokio::time::timeout(timeout, work)
        .await
        .map_err(|_| ExtractionError::Timeout {
            seconds: timeout.as_secs_f64(),
        })?
}

impl std::fmt::Debug for ConcurrentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentResolver")
            .field("max_concurrency", &self.max_concurrency)
            .field("available", &self.permits.available_permits())
            .field("timeout", &self.timeout)
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish()
    }
}
