//! Session handshake for the MCP SSE transport.
//!
//! The first endpoint-shaped payload on a fresh stream names the session's
//! private POST endpoint. Once it is known the client sends, in order:
//!
//! ```text
//! initialize                 (id 1)
//! notifications/initialized  (no id)
//! tools/list | tools/call    (id 2)  <- reply arrives on the stream
//! ```

use crate::error::{McpError, McpResult};
use crate::protocol::{
    CallToolParams, InitializeParams, JsonRpcRequest, INITIALIZE_ID, METHOD_INITIALIZE,
    METHOD_INITIALIZED, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, OPERATION_ID,
};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// The awaited operation of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// `tools/list`.
    ListTools,
    /// `tools/call` for one named tool.
    CallTool { name: String, arguments: Value },
}

impl Operation {
    /// Convenience constructor for a tool call.
    pub fn call(name: impl Into<String>, arguments: Value) -> Self {
        Self::CallTool {
            name: name.into(),
            arguments,
        }
    }

    /// JSON-RPC method sent for this operation.
    pub fn method(&self) -> &'static str {
        match self {
            Self::ListTools => METHOD_TOOLS_LIST,
            Self::CallTool { .. } => METHOD_TOOLS_CALL,
        }
    }

    /// The id-2 request carrying this operation.
    pub fn to_request(&self) -> McpResult<JsonRpcRequest> {
        let params = match self {
            Self::ListTools => None,
            Self::CallTool { name, arguments } => Some(serde_json::to_value(CallToolParams {
                name: name.clone(),
                arguments: Some(arguments.clone()),
            })?),
        };
        Ok(JsonRpcRequest::new(OPERATION_ID, self.method(), params))
    }
}

/// Handshake phase of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum HandshakePhase {
    AwaitingEndpoint,
    EndpointFound(Url),
}

impl HandshakePhase {
    /// Offer a payload while awaiting the endpoint.
    ///
    /// Returns the endpoint when this payload is the one that completes the
    /// transition. Payloads are ignored once an endpoint is known.
    pub fn offer(&mut self, base: &Url, payload: &str) -> McpResult<Option<Url>> {
        if matches!(self, Self::EndpointFound(_)) || !is_endpoint_payload(payload) {
            return Ok(None);
        }

        let endpoint = base.join(payload).map_err(|e| {
            McpError::connection_failed(format!("Invalid session endpoint {payload:?}: {e}"))
        })?;
        *self = Self::EndpointFound(endpoint.clone());
        Ok(Some(endpoint))
    }
}

/// Whether a payload names a callback endpoint (a path or an absolute URL).
pub fn is_endpoint_payload(payload: &str) -> bool {
    payload.starts_with('/') || payload.starts_with("http://") || payload.starts_with("https://")
}

/// Sends the three handshake POSTs for one session.
#[derive(Debug, Clone)]
pub struct Handshake {
    client: Client,
    endpoint: Url,
    credential: String,
    post_timeout: Duration,
}

impl Handshake {
    pub fn new(client: Client, endpoint: Url, credential: &str, post_timeout: Duration) -> Self {
        Self {
            client,
            endpoint,
            credential: credential.to_string(),
            post_timeout,
        }
    }

    /// Send `initialize`, `notifications/initialized` and the operation, each
    /// awaited before the next.
    ///
    /// Only transport failures and non-2xx statuses matter here; replies come
    /// back on the event stream.
    pub async fn run(&self, operation: &Operation) -> McpResult<()> {
        let initialize = JsonRpcRequest::new(
            INITIALIZE_ID,
            METHOD_INITIALIZE,
            Some(serde_json::to_value(InitializeParams::default())?),
        );
        self.post(&initialize).await?;

        self.post(&JsonRpcRequest::notification(METHOD_INITIALIZED, None))
            .await?;

        self.post(&operation.to_request()?).await
    }

    async fn post(&self, message: &JsonRpcRequest) -> McpResult<()> {
        debug!(id = ?message.id, method = %message.method, endpoint = %self.endpoint, "Sending MCP message");

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.credential)
            .header("Content-Type", "application/json")
            .timeout(self.post_timeout)
            .json(message)
            .send()
            .await
            .map_err(|e| {
                McpError::connection_failed(format!("{} request failed: {e}", message.method))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(McpError::connection_failed(format!(
                "{} rejected with {status}: {}",
                message.method,
                truncate(&text, 200)
            )));
        }

        Ok(())
    }
}

/// First `max` characters of `text`.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("https://mcp.example.com/sse").unwrap()
    }

    #[test]
    fn test_endpoint_payload_detection() {
        assert!(is_endpoint_payload("/messages?session_id=1"));
        assert!(is_endpoint_payload("https://other.example.com/messages"));
        assert!(is_endpoint_payload("http://localhost:9000/m"));
        assert!(!is_endpoint_payload("ping"));
        assert!(!is_endpoint_payload("{\"id\":1}"));
        assert!(!is_endpoint_payload(""));
    }

    #[test]
    fn test_relative_endpoint_joins_origin() {
        let mut phase = HandshakePhase::AwaitingEndpoint;
        let endpoint = phase
            .offer(&base(), "/messages?session_id=abc")
            .unwrap()
            .unwrap();
        assert_eq!(
            endpoint.as_str(),
            "https://mcp.example.com/messages?session_id=abc"
        );
        assert_eq!(phase, HandshakePhase::EndpointFound(endpoint));
    }

    #[test]
    fn test_absolute_endpoint_is_used_as_is() {
        let mut phase = HandshakePhase::AwaitingEndpoint;
        let endpoint = phase
            .offer(&base(), "https://callback.example.net/s/1")
            .unwrap()
            .unwrap();
        assert_eq!(endpoint.as_str(), "https://callback.example.net/s/1");
    }

    #[test]
    fn test_non_endpoint_payloads_keep_waiting() {
        let mut phase = HandshakePhase::AwaitingEndpoint;
        assert!(phase.offer(&base(), "ping").unwrap().is_none());
        assert_eq!(phase, HandshakePhase::AwaitingEndpoint);
    }

    #[test]
    fn test_only_first_endpoint_counts() {
        let mut phase = HandshakePhase::AwaitingEndpoint;
        assert!(phase.offer(&base(), "/first").unwrap().is_some());
        assert!(phase.offer(&base(), "/second").unwrap().is_none());
        match phase {
            HandshakePhase::EndpointFound(url) => assert_eq!(url.path(), "/first"),
            other => panic!("Unexpected phase {other:?}"),
        }
    }

    #[test]
    fn test_unjoinable_endpoint_is_connection_error() {
        let mut phase = HandshakePhase::AwaitingEndpoint;
        let err = phase.offer(&base(), "http://[::1").unwrap_err();
        assert!(matches!(err, McpError::ConnectionFailed(_)));
    }

    #[test]
    fn test_operation_requests() {
        let list = Operation::ListTools.to_request().unwrap();
        assert_eq!(
            serde_json::to_value(&list).unwrap(),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})
        );

        let call = Operation::call("delete-folder", json!({"folder": "/a"}))
            .to_request()
            .unwrap();
        assert_eq!(
            serde_json::to_value(&call).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": {"name": "delete-folder", "arguments": {"folder": "/a"}}
            })
        );
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
