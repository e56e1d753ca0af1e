//! MCP error types.

use std::time::Duration;
use thiserror::Error;

/// Result type for MCP operations.
pub type McpResult<T> = Result<T, McpError>;

/// Errors that can occur while driving a remote MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    /// The event stream could not be opened, failed, or ended before the
    /// awaited reply arrived, or a handshake POST was rejected.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The correlated reply carried an error field.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// No reply with the awaited id arrived before the deadline.
    #[error("Timeout after {after:?} waiting for {method} response")]
    Timeout {
        method: &'static str,
        after: Duration,
    },

    /// The JSON nested inside a tool result could not be decoded.
    #[error("Invalid tool result envelope: {0}")]
    EnvelopeParse(String),

    /// The tool ran but reported failure (`isError: true`).
    #[error("Tool execution failed: {0}")]
    ToolError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl McpError {
    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create a protocol error.
    pub fn protocol_error(message: impl Into<String>) -> Self {
        Self::ProtocolError(message.into())
    }

    /// Create a tool error.
    pub fn tool_error(message: impl Into<String>) -> Self {
        Self::ToolError(message.into())
    }

    /// Whether this error is a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = vec![
            (
                McpError::ConnectionFailed("refused".to_string()),
                "Connection failed: refused",
            ),
            (
                McpError::ProtocolError("invalid".to_string()),
                "Protocol error: invalid",
            ),
            (
                McpError::EnvelopeParse("expected value".to_string()),
                "Invalid tool result envelope: expected value",
            ),
            (
                McpError::ToolError("failed".to_string()),
                "Tool execution failed: failed",
            ),
        ];

        for (error, expected) in errors {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_timeout_display_starts_with_timeout() {
        let err = McpError::Timeout {
            method: "tools/call",
            after: Duration::from_secs(30),
        };
        assert_eq!(
            err.to_string(),
            "Timeout after 30s waiting for tools/call response"
        );
        assert!(err.is_timeout());
    }

    #[test]
    fn test_error_constructors() {
        let conn_err = McpError::connection_failed("failed to connect");
        assert!(conn_err.to_string().contains("Connection failed"));
        assert!(!conn_err.is_timeout());

        let proto_err = McpError::protocol_error("invalid message");
        assert!(proto_err.to_string().contains("Protocol error"));

        let tool_err = McpError::tool_error("execution failed");
        assert!(tool_err.to_string().contains("Tool execution failed"));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let mcp_err: McpError = json_err.into();
        assert!(mcp_err.to_string().contains("JSON error"));
    }
}
