use std::sync::Arc;
use std::time::Instant;

use crate::domain::SearchOutcome;
use crate::infra::logging::log_metric;
use crate::search::format::format_results;
use crate::search::provider::SearchProvider;

/// Text produced by one search, plus whether it describes a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReply {
    pub text: String,
    pub is_error: bool,
}

impl SearchReply {
    fn ok(text: String) -> Self {
        Self { text, is_error: false }
    }

    fn failed(text: String) -> Self {
        Self { text, is_error: true }
    }
}

/// Wraps a [`SearchProvider`] and turns every outcome into readable text.
#[derive(Clone)]
pub struct SearchAdapter {
    provider: Arc<dyn SearchProvider>,
}

impl SearchAdapter {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }

    /// Search and render. Always returns text, whatever the provider did.
    pub async fn search(&self, query: &str, max_results: u32) -> String {
        self.run(query, max_results).await.text
    }

    pub async fn run(&self, query: &str, max_results: u32) -> SearchReply {
        tracing::info!(query, max_results, "search request");
        metrics::counter!("search_requests_total").increment(1);
        let start = Instant::now();

        let reply = match self.provider.search(query, max_results).await {
            SearchOutcome::Success(mut items) => {
                items.truncate(max_results as usize);
                if items.is_empty() {
                    tracing::warn!(query, "no results");
                } else {
                    tracing::info!(query, count = items.len(), "returning results");
                }
                SearchReply::ok(format_results(query, &items))
            }
            SearchOutcome::Timeout => {
                let msg = format!(
                    "Error: Search request timed out for query '{query}'. Check your internet connection."
                );
                tracing::error!("{msg}");
                metrics::counter!("search_errors_total", "kind" => "timeout").increment(1);
                SearchReply::failed(msg)
            }
            SearchOutcome::Failure(cause) => {
                let msg = format!("Error: Failed to search for '{query}': {cause}");
                tracing::error!("{msg}");
                metrics::counter!("search_errors_total", "kind" => "failure").increment(1);
                SearchReply::failed(msg)
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as f64;
        metrics::histogram!("search_latency_ms").record(elapsed_ms);
        log_metric("web_search", "latency_ms", elapsed_ms);
        reply
    }
}
