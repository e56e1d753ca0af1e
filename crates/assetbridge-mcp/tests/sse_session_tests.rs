//! End-to-end session tests against the in-process mock upstream.

use assetbridge_mcp::{McpError, McpSseClient, SseConfig, ToolInvoker};
use assetbridge_test_utils::{fixtures, EndpointStyle, MockUpstream, Reply, UpstreamBehavior};
use serde_json::json;
use std::time::{Duration, Instant};

fn client_for(upstream: &MockUpstream, timeout: Duration) -> McpSseClient {
    McpSseClient::new(SseConfig {
        list_timeout: timeout,
        call_timeout: timeout,
        ..SseConfig::new(upstream.sse_url())
    })
    .expect("client")
}

/// A list call performs the full handshake and returns the id-2 result.
#[tokio::test]
async fn test_list_tools_handshake_on_the_wire() {
    let upstream = MockUpstream::start(
        UpstreamBehavior::default().with_responder(|_| Reply::Result(fixtures::tools_list())),
    )
    .await;
    let client = client_for(&upstream, Duration::from_secs(5));

    let result = client.list_tools("tok-1").await.expect("list tools");
    assert_eq!(result["tools"][0]["name"], "search-folders");

    let streams = upstream.streams();
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].authorization.as_deref(), Some("Bearer tok-1"));
    assert_eq!(streams[0].accept.as_deref(), Some("text/event-stream"));

    let requests = upstream.requests();
    let methods: Vec<&str> = requests.iter().map(|r| r.method()).collect();
    assert_eq!(
        methods,
        vec!["initialize", "notifications/initialized", "tools/list"]
    );
    assert_eq!(requests[0].id(), Some(1));
    assert_eq!(requests[0].body["jsonrpc"], "2.0");
    assert_eq!(requests[0].body["params"]["clientInfo"]["name"], "assetbridge");
    assert!(requests[0].body["params"]["protocolVersion"].is_string());
    assert!(requests[1].body.get("id").is_none());
    assert_eq!(requests[2].id(), Some(2));

    for request in &requests {
        assert_eq!(request.authorization.as_deref(), Some("Bearer tok-1"));
        assert_eq!(request.content_type.as_deref(), Some("application/json"));
        assert_eq!(request.session_id, "1");
    }
}

/// Absolute endpoints and one-byte stream delivery work the same way.
#[tokio::test]
async fn test_call_tool_absolute_endpoint_byte_by_byte() {
    let upstream = MockUpstream::start(
        UpstreamBehavior::default()
            .with_endpoint(EndpointStyle::Absolute)
            .with_chunk_size(1)
            .with_responder(|req| {
                Reply::tool_text(&format!("deleted {}", req.tool_arguments()["folder"]))
            }),
    )
    .await;
    let client = client_for(&upstream, Duration::from_secs(5));

    let result = client
        .call_tool("tok", "delete-folder", json!({"folder": "samples"}))
        .await
        .expect("call tool");
    assert_eq!(result["content"][0]["text"], "deleted \"samples\"");

    let calls = upstream.tool_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].tool_name(), Some("delete-folder"));
    assert_eq!(calls[0].tool_arguments(), json!({"folder": "samples"}));
}

/// An error field on the correlated reply surfaces as a protocol error.
#[tokio::test]
async fn test_error_reply_is_protocol_error() {
    let upstream = MockUpstream::start(UpstreamBehavior::default().with_responder(|_| {
        Reply::Error(json!({"code": -32602, "message": "Unknown tool: nope"}))
    }))
    .await;
    let client = client_for(&upstream, Duration::from_secs(5));

    match client.call_tool("tok", "nope", json!({})).await {
        Err(McpError::ProtocolError(message)) => assert_eq!(message, "Unknown tool: nope"),
        other => panic!("Expected protocol error, got {other:?}"),
    }
}

/// Only the first of two replies with the awaited id counts.
#[tokio::test]
async fn test_duplicate_reply_resolves_on_first() {
    let upstream = MockUpstream::start(
        UpstreamBehavior::default()
            .with_responder(|_| Reply::Duplicate(json!("first"), json!("second"))),
    )
    .await;
    let client = client_for(&upstream, Duration::from_secs(5));

    let result = client.list_tools("tok").await.expect("list tools");
    assert_eq!(result, json!("first"));
}

/// No reply: the call fails with a timeout, and not before the deadline.
#[tokio::test]
async fn test_silent_upstream_times_out_after_deadline() {
    let upstream =
        MockUpstream::start(UpstreamBehavior::default().with_responder(|_| Reply::Silent)).await;
    let deadline = Duration::from_millis(400);
    let client = client_for(&upstream, deadline);

    let started = Instant::now();
    let err = client
        .call_tool("tok", "delete-folder", json!({"folder": "x"}))
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_timeout(), "unexpected error {err:?}");
    assert!(err.to_string().starts_with("Timeout"));
    assert!(elapsed >= deadline, "timed out early after {elapsed:?}");
    assert!(elapsed < deadline * 10, "timed out late after {elapsed:?}");
    assert_eq!(upstream.tool_calls().len(), 1);
}

/// A stream that never announces an endpoint never dispatches anything.
#[tokio::test]
async fn test_missing_endpoint_times_out_without_posts() {
    let upstream =
        MockUpstream::start(UpstreamBehavior::default().with_endpoint(EndpointStyle::Never)).await;
    let client = client_for(&upstream, Duration::from_millis(300));

    let err = client.list_tools("tok").await.unwrap_err();
    assert!(err.is_timeout());
    assert!(upstream.requests().is_empty());
}

/// A non-200 stream response fails before any handshake.
#[tokio::test]
async fn test_stream_rejection_is_connection_error() {
    let upstream = MockUpstream::start(UpstreamBehavior::default().with_stream_status(401)).await;
    let client = client_for(&upstream, Duration::from_secs(5));

    match client.list_tools("bad-token").await {
        Err(McpError::ConnectionFailed(message)) => assert!(message.contains("401")),
        other => panic!("Expected connection error, got {other:?}"),
    }
    assert!(upstream.requests().is_empty());
}

/// A rejected handshake POST fails the invocation immediately.
#[tokio::test]
async fn test_rejected_initialize_fails_fast() {
    let upstream =
        MockUpstream::start(UpstreamBehavior::default().failing_method("initialize")).await;
    let client = client_for(&upstream, Duration::from_secs(10));

    let started = Instant::now();
    match client.list_tools("tok").await {
        Err(McpError::ConnectionFailed(message)) => assert!(message.contains("initialize")),
        other => panic!("Expected connection error, got {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(5));

    let methods: Vec<String> = upstream
        .requests()
        .iter()
        .map(|r| r.method().to_string())
        .collect();
    assert_eq!(methods, vec!["initialize"]);
}

/// The stream ending before the reply is a connection error.
#[tokio::test]
async fn test_stream_closed_before_reply() {
    let upstream =
        MockUpstream::start(UpstreamBehavior::default().with_responder(|_| Reply::CloseStream))
            .await;
    let client = client_for(&upstream, Duration::from_secs(5));

    let err = client.list_tools("tok").await.unwrap_err();
    assert!(matches!(err, McpError::ConnectionFailed(_)), "{err:?}");
}

/// Each invocation gets its own stream and session endpoint.
#[tokio::test]
async fn test_invocations_use_separate_sessions() {
    let upstream = MockUpstream::start(
        UpstreamBehavior::default().with_responder(|req| Reply::Result(json!(req.session_id))),
    )
    .await;
    let client = client_for(&upstream, Duration::from_secs(5));

    assert_eq!(client.list_tools("tok").await.unwrap(), json!("1"));
    assert_eq!(client.list_tools("tok").await.unwrap(), json!("2"));
    assert_eq!(upstream.streams().len(), 2);
}
