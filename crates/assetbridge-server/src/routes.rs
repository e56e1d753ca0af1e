//! HTTP routes for the bridge.
//!
//! OAuth callback and code exchange for the browser, plus thin wrappers that
//! run MCP operations with the caller's access token.

use crate::{cleanup::FolderCleanup, state::AppState};
use assetbridge_mcp::{exchange_code, ExchangeError, McpError};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

/// Create the router with all routes.
///
/// Unmatched requests are served from `static_dir` when one is given.
pub fn create_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/health", get(health))
        // ===================
        // OAuth endpoints
        // ===================
        .route("/callback", get(oauth_callback))
        .route("/exchange", post(exchange))
        // ===================
        // MCP endpoints
        // ===================
        .route("/list-tools", get(list_tools_query).post(list_tools))
        .route("/call-tool", post(call_tool))
        .route("/cleanup-folders", post(cleanup_folders))
        .with_state(state);

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router.layer(cors).layer(TraceLayer::new_for_http())
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
    code: String,
}

impl ApiError {
    fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }

    fn bad_request(msg: impl Into<String>) -> (StatusCode, Json<Self>) {
        (StatusCode::BAD_REQUEST, Json(Self::new(msg, "BAD_REQUEST")))
    }

    fn internal(msg: impl Into<String>, code: &str) -> (StatusCode, Json<Self>) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Self::new(msg, code)),
        )
    }

    /// Any failed MCP invocation.
    fn invocation(err: &McpError) -> (StatusCode, Json<Self>) {
        let code = match err {
            McpError::Timeout { .. } => "TIMEOUT",
            McpError::ConnectionFailed(_) | McpError::Http(_) => "CONNECTION_FAILED",
            McpError::ProtocolError(_) => "PROTOCOL_ERROR",
            McpError::EnvelopeParse(_) | McpError::Json(_) => "INVALID_RESPONSE",
            McpError::ToolError(_) => "TOOL_ERROR",
        };
        Self::internal(err.to_string(), code)
    }
}

/// Request bodies are parsed leniently: a missing or malformed body reads
/// as empty and the handler reports the missing field.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

/// Trimmed, non-empty value of an optional field.
fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Global endpoints
// =============================================================================

async fn health() -> impl IntoResponse {
    Json(json!({
        "healthy": true,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// =============================================================================
// OAuth endpoints
// =============================================================================

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
}

/// Hand the authorization code to the browser app.
async fn oauth_callback(Query(query): Query<CallbackQuery>) -> Response {
    match required(query.code) {
        Some(code) => {
            let location = format!("/?code={}", urlencoding::encode(&code));
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
        None => ApiError::bad_request("Missing authorization code").into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ExchangeRequest {
    code: Option<String>,
}

async fn exchange(State(state): State<AppState>, body: Bytes) -> Response {
    let request: ExchangeRequest = parse_body(&body);
    let Some(code) = required(request.code) else {
        return ApiError::bad_request("Missing authorization code").into_response();
    };

    match exchange_code(&state.http, &state.oauth, &code).await {
        Ok(tokens) => Json(tokens).into_response(),
        Err(e) => exchange_error_response(e),
    }
}

fn exchange_error_response(err: ExchangeError) -> Response {
    let message = err.to_string();
    match err {
        ExchangeError::Html { status, preview } => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "error": message,
                "status": status,
                "response_preview": preview
            })),
        )
            .into_response(),
        ExchangeError::InvalidJson {
            status,
            message: parse_error,
            preview,
        } => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "error": "Failed to parse token endpoint response",
                "status": status,
                "parse_error": parse_error,
                "response_preview": preview
            })),
        )
            .into_response(),
        ExchangeError::UpstreamStatus { status, preview } => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "error": message,
                "status": status,
                "response_preview": preview
            })),
        )
            .into_response(),
        ExchangeError::MissingAccessToken(upstream) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": message,
                "upstream_response": upstream
            })),
        )
            .into_response(),
        ExchangeError::Transport(e) => {
            error!(error = %e, "Token request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Server error",
                    "message": e.to_string()
                })),
            )
                .into_response()
        }
    }
}

// =============================================================================
// MCP endpoints
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct TokenRequest {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

async fn list_tools(State(state): State<AppState>, body: Bytes) -> Response {
    let request: TokenRequest = parse_body(&body);
    list_tools_with(&state, request.access_token).await
}

async fn list_tools_query(State(state): State<AppState>, Query(query): Query<TokenQuery>) -> Response {
    list_tools_with(&state, query.token).await
}

async fn list_tools_with(state: &AppState, token: Option<String>) -> Response {
    let Some(token) = required(token) else {
        return ApiError::bad_request("Missing access token").into_response();
    };

    match state.invoker.list_tools(&token).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            warn!(error = %e, "Listing tools failed");
            ApiError::invocation(&e).into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CallToolRequest {
    access_token: Option<String>,
    name: Option<String>,
    arguments: Option<Value>,
}

async fn call_tool(State(state): State<AppState>, body: Bytes) -> Response {
    let request: CallToolRequest = parse_body(&body);
    let Some(token) = required(request.access_token) else {
        return ApiError::bad_request("Missing access token").into_response();
    };
    let Some(name) = required(request.name) else {
        return ApiError::bad_request("Missing tool name").into_response();
    };
    let arguments = request.arguments.unwrap_or_else(|| json!({}));

    info!(tool = %name, "Calling tool");
    match state.invoker.call_tool(&token, &name, arguments).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            warn!(tool = %name, error = %e, "Tool call failed");
            ApiError::invocation(&e).into_response()
        }
    }
}

async fn cleanup_folders(State(state): State<AppState>, body: Bytes) -> Response {
    let request: TokenRequest = parse_body(&body);
    let Some(token) = required(request.access_token) else {
        return ApiError::bad_request("Missing access token").into_response();
    };

    let cleanup = FolderCleanup::new(state.invoker.as_ref(), state.cleanup.clone());
    match cleanup.run(&token).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!(error = %e, "Folder cleanup failed");
            ApiError::invocation(&e).into_response()
        }
    }
}
