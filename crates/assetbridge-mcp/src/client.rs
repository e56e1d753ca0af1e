//! MCP client over the split SSE transport.
//!
//! Requests go out as individual POSTs to a per-session endpoint while every
//! reply comes back on the event stream that announced that endpoint. Each
//! invocation opens its own stream, so sessions never share state.

use crate::correlator::Correlator;
use crate::error::{McpError, McpResult};
use crate::invoker::ToolInvoker;
use crate::protocol::OPERATION_ID;
use crate::session::{Handshake, HandshakePhase, Operation};
use crate::sse::FrameReader;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// SSE transport configuration.
#[derive(Debug, Clone)]
pub struct SseConfig {
    /// The event stream URL (e.g., `https://mcp.example.com/sse`).
    pub url: String,
    /// Deadline for a `tools/list` invocation.
    pub list_timeout: Duration,
    /// Deadline for a `tools/call` invocation.
    pub call_timeout: Duration,
    /// Per-request timeout for each handshake POST.
    pub post_timeout: Duration,
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            list_timeout: Duration::from_secs(15),
            call_timeout: Duration::from_secs(30),
            post_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl SseConfig {
    /// Create a config for `url` with default timeouts.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Deadline that applies to `operation`.
    pub fn timeout_for(&self, operation: &Operation) -> Duration {
        match operation {
            Operation::ListTools => self.list_timeout,
            Operation::CallTool { .. } => self.call_timeout,
        }
    }
}

/// MCP client that runs each operation in its own SSE session.
#[derive(Debug, Clone)]
pub struct McpSseClient {
    config: SseConfig,
    url: Url,
    client: Client,
}

impl McpSseClient {
    /// Create a new client.
    pub fn new(config: SseConfig) -> McpResult<Self> {
        let url = Url::parse(&config.url)
            .map_err(|e| McpError::connection_failed(format!("Invalid SSE URL {}: {e}", config.url)))?;

        // No overall request timeout: it would cut the event stream short.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| {
                McpError::connection_failed(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            url,
            client,
        })
    }

    pub fn config(&self) -> &SseConfig {
        &self.config
    }

    /// Open the stream, run the handshake and wait for the id-2 reply.
    async fn run_session(
        &self,
        credential: &str,
        operation: &Operation,
        cancel: &CancellationToken,
    ) -> McpResult<Value> {
        let response = self
            .client
            .get(self.url.clone())
            .bearer_auth(credential)
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| McpError::connection_failed(format!("Event stream request failed: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            return Err(McpError::connection_failed(format!(
                "Event stream returned {status}: {}",
                crate::session::truncate(&text, 200)
            )));
        }

        let (correlator, rx) = Correlator::new(OPERATION_ID);
        let session = StreamSession {
            client: self.client.clone(),
            base: self.url.clone(),
            credential: credential.to_string(),
            operation: operation.clone(),
            post_timeout: self.config.post_timeout,
            correlator: Arc::new(correlator),
            cancel: cancel.clone(),
        };
        tokio::spawn(session.drive(response));

        rx.await.unwrap_or_else(|_| {
            Err(McpError::connection_failed(
                "Session ended without delivering a reply",
            ))
        })
    }
}

#[async_trait]
impl ToolInvoker for McpSseClient {
    async fn execute(&self, credential: &str, operation: Operation) -> McpResult<Value> {
        let method = operation.method();
        let deadline = self.config.timeout_for(&operation);

        // Tears down the stream reader and any in-flight handshake POST on
        // every exit path, including the timeout below.
        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();

        debug!(method, timeout = ?deadline, "Starting MCP session");

        match tokio::time::timeout(deadline, self.run_session(credential, &operation, &cancel))
            .await
        {
            Ok(Ok(result)) => {
                info!(method, "MCP operation completed");
                Ok(result)
            }
            Ok(Err(e)) => {
                warn!(method, error = %e, "MCP operation failed");
                Err(e)
            }
            Err(_) => {
                warn!(method, timeout = ?deadline, "MCP operation timed out");
                Err(McpError::Timeout {
                    method,
                    after: deadline,
                })
            }
        }
    }
}

/// State owned by the stream reader task of one session.
struct StreamSession {
    client: Client,
    base: Url,
    credential: String,
    operation: Operation,
    post_timeout: Duration,
    correlator: Arc<Correlator>,
    cancel: CancellationToken,
}

impl StreamSession {
    /// Read the stream until the session resolves, fails or is cancelled.
    async fn drive(self, response: reqwest::Response) {
        let mut stream = response.bytes_stream();
        let mut frames = FrameReader::new();
        let mut phase = HandshakePhase::AwaitingEndpoint;

        loop {
            let chunk = tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("Event stream cancelled");
                    return;
                }
                chunk = stream.next() => chunk,
            };

            let bytes = match chunk {
                Some(Ok(bytes)) => bytes,
                Some(Err(e)) => {
                    self.correlator.fail(Err(McpError::connection_failed(format!(
                        "Event stream failed: {e}"
                    ))));
                    return;
                }
                None => {
                    self.correlator.fail(Err(McpError::connection_failed(
                        "Event stream closed before a reply arrived",
                    )));
                    return;
                }
            };

            let payloads = match frames.push(&bytes) {
                Ok(payloads) => payloads,
                Err(e) => {
                    self.correlator.fail(Err(e));
                    return;
                }
            };

            for payload in payloads {
                if matches!(phase, HandshakePhase::AwaitingEndpoint) {
                    match phase.offer(&self.base, &payload) {
                        Ok(Some(endpoint)) => self.start_handshake(endpoint),
                        Ok(None) => debug!(payload = %payload, "Waiting for session endpoint"),
                        Err(e) => {
                            self.correlator.fail(Err(e));
                            return;
                        }
                    }
                } else if self.correlator.observe(&payload) {
                    debug!("Reply correlated, closing event stream");
                    return;
                }
            }
        }
    }

    /// Fire the handshake without blocking the reader.
    fn start_handshake(&self, endpoint: Url) {
        debug!(endpoint = %endpoint, "Session endpoint discovered");

        let handshake = Handshake::new(
            self.client.clone(),
            endpoint,
            &self.credential,
            self.post_timeout,
        );
        let operation = self.operation.clone();
        let correlator = self.correlator.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => debug!("Handshake cancelled"),
                result = handshake.run(&operation) => {
                    if let Err(e) = result {
                        correlator.fail(Err(e));
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_config_default() {
        let config = SseConfig::default();
        assert!(config.url.is_empty());
        assert_eq!(config.list_timeout, Duration::from_secs(15));
        assert_eq!(config.call_timeout, Duration::from_secs(30));
        assert!(config.list_timeout < config.call_timeout);
    }

    #[test]
    fn test_timeout_for_operation() {
        let config = SseConfig {
            list_timeout: Duration::from_millis(100),
            call_timeout: Duration::from_millis(200),
            ..SseConfig::new("http://localhost/sse")
        };
        assert_eq!(
            config.timeout_for(&Operation::ListTools),
            Duration::from_millis(100)
        );
        assert_eq!(
            config.timeout_for(&Operation::call("x", serde_json::json!({}))),
            Duration::from_millis(200)
        );
    }

    #[test]
    fn test_client_rejects_invalid_url() {
        let result = McpSseClient::new(SseConfig::new("not a url"));
        assert!(matches!(result, Err(McpError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_connection_error() {
        let client = McpSseClient::new(SseConfig::new("http://127.0.0.1:1/sse")).unwrap();
        let result = client.list_tools("token").await;
        assert!(matches!(result, Err(McpError::ConnectionFailed(_))));
    }
}
