use std::sync::Arc;

use crate::api::session::Session;
use crate::clients::DuckDuckGoProvider;
use crate::infra::config::AppConfig;
use crate::search::{FnProvider, SearchProvider};

/// Pick the search provider for this process.
///
/// If the HTTP client cannot be built the server still starts, and every
/// search reports the problem back to the peer as text.
pub fn provider_from_config(cfg: &AppConfig) -> Arc<dyn SearchProvider> {
    match DuckDuckGoProvider::from_config(&cfg.search) {
        Ok(p) => {
            tracing::info!(base_url = p.base_url(), "using DuckDuckGo provider");
            Arc::new(p)
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to build HTTP client; searches will fail");
            Arc::new(FnProvider::failing(format!("HTTP client unavailable: {e}")))
        }
    }
}

pub fn session_from_config(cfg: &AppConfig) -> Session {
    Session::with_provider(provider_from_config(cfg))
}

pub async fn run_server(cfg: &AppConfig) -> anyhow::Result<()> {
    tracing::info!(
        base_url = cfg.search.base_url(),
        timeout_ms = cfg.search.timeout().as_millis() as u64,
        retries = cfg.search.retries(),
        "BOOT search-mcp (stdio)"
    );

    crate::infra::runtime::mcp_transport::serve_stdio(session_from_config(cfg)).await?;
    tracing::info!("search-mcp shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_a_session() {
        let session = session_from_config(&AppConfig::default());
        assert_eq!(session.service().tools().len(), 1);
    }
}
