use std::{future::Future, pin::Pin, sync::Arc};

use crate::domain::SearchOutcome;

/// Anything that can turn a query into ranked results.
///
/// Implementations report failures through [`SearchOutcome`] rather than
/// returning errors, so callers never have to unwind.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync + 'static {
    async fn search(&self, query: &str, max_results: u32) -> SearchOutcome;
}

type OutcomeFuture = Pin<Box<dyn Future<Output = SearchOutcome> + Send>>;

/// Thin wrapper around a boxed async fn, for stub providers and for the
/// fallback used when the HTTP client cannot be built.
#[derive(Clone)]
pub struct FnProvider {
    inner: Arc<dyn Fn(String, u32) -> OutcomeFuture + Send + Sync>,
}

impl FnProvider {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(String, u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SearchOutcome> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |query, max| Box::pin(f(query, max))),
        }
    }

    /// A provider that always fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(move |_query, _max| {
            let message = message.clone();
            async move { SearchOutcome::Failure(message) }
        })
    }
}

#[async_trait::async_trait]
impl SearchProvider for FnProvider {
    async fn search(&self, query: &str, max_results: u32) -> SearchOutcome {
        (self.inner)(query.to_owned(), max_results).await
    }
}
