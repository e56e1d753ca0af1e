//! OAuth authorization-code exchange for the remote MCP server.
//!
//! The browser completes the authorization step and hands the bridge a code;
//! this module trades it for an access token at the configured token endpoint.
//! Tokens are returned to the caller and never stored.

use crate::session::truncate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Characters of an upstream body echoed back to callers.
pub const RESPONSE_PREVIEW_CHARS: usize = 200;

/// Characters of an upstream body written to the log.
const LOG_PREVIEW_CHARS: usize = 500;

/// OAuth client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Token endpoint URL.
    pub token_endpoint: String,
    /// Pre-registered client ID.
    pub client_id: String,
    /// Pre-registered client secret (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Redirect URI registered for the client.
    pub redirect_uri: String,
    /// PKCE code verifier paired with the challenge sent at authorization time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,
}

/// Token fields handed back to the browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Errors from the token exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The token request never got a response.
    #[error("Token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with an HTML page.
    #[error("Token endpoint returned HTML instead of JSON")]
    Html { status: u16, preview: String },

    /// The body was neither HTML nor JSON.
    #[error("Failed to parse token endpoint response: {message}")]
    InvalidJson {
        status: u16,
        message: String,
        preview: String,
    },

    /// Non-2xx status with a JSON body.
    #[error("Token endpoint returned HTTP {status}")]
    UpstreamStatus { status: u16, preview: String },

    /// JSON body without an `access_token`.
    #[error("No access_token in token endpoint response")]
    MissingAccessToken(Value),
}

/// Form parameters of the exchange request.
fn exchange_params<'a>(config: &'a OAuthConfig, code: &'a str) -> Vec<(&'static str, &'a str)> {
    let mut params = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("client_id", config.client_id.as_str()),
    ];

    if let Some(secret) = config.client_secret.as_deref() {
        params.push(("client_secret", secret));
    }

    if let Some(verifier) = config.code_verifier.as_deref() {
        params.push(("code_verifier", verifier));
    }

    params
}

/// Exchange an authorization code for tokens.
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
) -> Result<TokenResponse, ExchangeError> {
    info!(code = %truncate(code, 20), endpoint = %config.token_endpoint, "Exchanging authorization code");

    let response = client
        .post(&config.token_endpoint)
        .header("Accept", "application/json")
        .form(&exchange_params(config, code))
        .send()
        .await?;

    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let raw = response.text().await?;

    debug!(
        status = status.as_u16(),
        content_type = %content_type,
        body = %truncate(&raw, LOG_PREVIEW_CHARS),
        "Token endpoint responded"
    );

    let preview = truncate(&raw, RESPONSE_PREVIEW_CHARS);

    if raw.trim_start().starts_with('<') {
        warn!(status = status.as_u16(), "Token endpoint returned HTML");
        return Err(ExchangeError::Html {
            status: status.as_u16(),
            preview,
        });
    }

    let body: Value = serde_json::from_str(&raw).map_err(|e| ExchangeError::InvalidJson {
        status: status.as_u16(),
        message: e.to_string(),
        preview: preview.clone(),
    })?;

    if !status.is_success() {
        warn!(status = status.as_u16(), "Token endpoint rejected the exchange");
        return Err(ExchangeError::UpstreamStatus {
            status: status.as_u16(),
            preview,
        });
    }

    let has_token = body
        .get("access_token")
        .and_then(Value::as_str)
        .is_some_and(|token| !token.is_empty());
    if !has_token {
        return Err(ExchangeError::MissingAccessToken(body));
    }

    let tokens: TokenResponse =
        serde_json::from_value(body.clone()).map_err(|_| ExchangeError::MissingAccessToken(body))?;

    info!(token = %truncate(&tokens.access_token, 20), "Access token received");
    Ok(tokens)
}
