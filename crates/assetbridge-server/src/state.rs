//! Server state.

use crate::cleanup::CleanupSettings;
use crate::config::BridgeConfig;
use assetbridge_mcp::{McpResult, McpSseClient, OAuthConfig, ToolInvoker};
use std::sync::Arc;

/// Shared state for all handlers.
///
/// Holds no credentials of callers: access tokens arrive with each request
/// and are dropped when it completes.
#[derive(Clone)]
pub struct AppState {
    /// Runs MCP operations against the remote server.
    pub invoker: Arc<dyn ToolInvoker>,
    /// Client for the OAuth token endpoint.
    pub http: reqwest::Client,
    pub oauth: Arc<OAuthConfig>,
    pub cleanup: CleanupSettings,
}

impl AppState {
    /// State backed by a real [`McpSseClient`].
    pub fn new(config: &BridgeConfig) -> McpResult<Self> {
        let client = McpSseClient::new(config.sse_config())?;
        Ok(Self::with_invoker(config, Arc::new(client)))
    }

    /// State backed by any invoker.
    pub fn with_invoker(config: &BridgeConfig, invoker: Arc<dyn ToolInvoker>) -> Self {
        Self {
            invoker,
            http: reqwest::Client::new(),
            oauth: Arc::new(config.oauth.clone()),
            cleanup: config.cleanup.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_mcp_url() {
        let mut config = BridgeConfig::default();
        config.mcp.sse_url = "not a url".to_string();
        assert!(AppState::new(&config).is_err());
    }

    #[test]
    fn test_new_copies_oauth_and_cleanup() {
        let mut config = BridgeConfig::default();
        config.oauth.client_id = "client-1".to_string();
        config.cleanup.delete_pause_ms = 0;

        let state = AppState::new(&config).unwrap();
        assert_eq!(state.oauth.client_id, "client-1");
        assert_eq!(state.cleanup.delete_pause_ms, 0);
    }
}
