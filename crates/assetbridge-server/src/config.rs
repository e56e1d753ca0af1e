//! Bridge configuration.
//!
//! Loaded from an optional JSON file, then overridden by environment
//! variables. OAuth client credentials live here and nowhere else.

use crate::cleanup::CleanupSettings;
use assetbridge_mcp::{OAuthConfig, SseConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "assetbridge.json";

const DEFAULT_SSE_URL: &str = "https://asset-management.mcp.cloudinary.com/sse";
const DEFAULT_TOKEN_ENDPOINT: &str = "https://asset-management.mcp.cloudinary.com/token";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Remote MCP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpSettings {
    /// Event stream URL of the remote MCP server.
    pub sse_url: String,
    pub list_timeout_secs: u64,
    pub call_timeout_secs: u64,
    pub post_timeout_secs: u64,
}

impl Default for McpSettings {
    fn default() -> Self {
        Self {
            sse_url: DEFAULT_SSE_URL.to_string(),
            list_timeout_secs: 15,
            call_timeout_secs: 30,
            post_timeout_secs: 15,
        }
    }
}

/// Top-level bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Listen address.
    pub address: SocketAddr,
    /// Directory served for unmatched GET requests.
    pub static_dir: PathBuf,
    pub oauth: OAuthConfig,
    pub mcp: McpSettings,
    pub cleanup: CleanupSettings,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            static_dir: PathBuf::from("public"),
            oauth: OAuthConfig {
                token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
                redirect_uri: "http://localhost:3000/callback".to_string(),
                ..OAuthConfig::default()
            },
            mcp: McpSettings::default(),
            cleanup: CleanupSettings::default(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, `assetbridge.json` in the
    /// working directory is used if present. Environment variables win over
    /// file values.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load_file(path).await?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if tokio::fs::try_exists(default_path).await.unwrap_or(false) {
                    Self::load_file(default_path).await?
                } else {
                    Self::default()
                }
            }
        };

        config.with_env(|key| std::env::var(key).ok())
    }

    /// Load a single JSON config file.
    pub async fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(path = %path.display(), "Loaded config file");

        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config.with_oauth_defaults())
    }

    /// A partial `oauth` section falls back to the default endpoints.
    fn with_oauth_defaults(mut self) -> Self {
        let defaults = Self::default().oauth;
        if self.oauth.token_endpoint.is_empty() {
            self.oauth.token_endpoint = defaults.token_endpoint;
        }
        if self.oauth.redirect_uri.is_empty() {
            self.oauth.redirect_uri = defaults.redirect_uri;
        }
        self
    }

    /// Apply environment overrides read through `lookup`.
    pub fn with_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(value) = get("ASSETBRIDGE_ADDRESS") {
            self.address = parse_value("ASSETBRIDGE_ADDRESS", &value)?;
        }
        if let Some(value) = get("PORT") {
            self.address.set_port(parse_value("PORT", &value)?);
        }
        if let Some(value) = get("ASSETBRIDGE_STATIC_DIR") {
            self.static_dir = PathBuf::from(value);
        }

        if let Some(value) = get("ASSETBRIDGE_MCP_URL") {
            self.mcp.sse_url = value;
        }
        if let Some(value) = get("ASSETBRIDGE_LIST_TIMEOUT_SECS") {
            self.mcp.list_timeout_secs = parse_value("ASSETBRIDGE_LIST_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = get("ASSETBRIDGE_CALL_TIMEOUT_SECS") {
            self.mcp.call_timeout_secs = parse_value("ASSETBRIDGE_CALL_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = get("ASSETBRIDGE_POST_TIMEOUT_SECS") {
            self.mcp.post_timeout_secs = parse_value("ASSETBRIDGE_POST_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = get("ASSETBRIDGE_TOKEN_ENDPOINT") {
            self.oauth.token_endpoint = value;
        }
        if let Some(value) = get("ASSETBRIDGE_CLIENT_ID") {
            self.oauth.client_id = value;
        }
        if let Some(value) = get("ASSETBRIDGE_CLIENT_SECRET") {
            self.oauth.client_secret = Some(value);
        }
        if let Some(value) = get("ASSETBRIDGE_REDIRECT_URI") {
            self.oauth.redirect_uri = value;
        }
        if let Some(value) = get("ASSETBRIDGE_CODE_VERIFIER") {
            self.oauth.code_verifier = Some(value);
        }

        if let Some(value) = get("ASSETBRIDGE_DELETE_PAUSE_MS") {
            self.cleanup.delete_pause_ms = parse_value("ASSETBRIDGE_DELETE_PAUSE_MS", &value)?;
        }

        Ok(self)
    }

    /// Transport settings for the MCP client.
    pub fn sse_config(&self) -> SseConfig {
        SseConfig {
            list_timeout: Duration::from_secs(self.mcp.list_timeout_secs),
            call_timeout: Duration::from_secs(self.mcp.call_timeout_secs),
            post_timeout: Duration::from_secs(self.mcp.post_timeout_secs),
            ..SseConfig::new(self.mcp.sse_url.clone())
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
