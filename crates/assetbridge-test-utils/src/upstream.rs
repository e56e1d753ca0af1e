//! In-process mock of a remote MCP server speaking the split SSE transport.
//!
//! `GET /sse` opens an event stream that announces a per-session
//! `/messages?session_id=N` endpoint. `POST /messages` records the JSON-RPC
//! message, answers `202 Accepted`, and pushes the scripted reply onto the
//! stream of the session that sent it.
//!
//! # Example
//!
//! ```rust,ignore
//! use assetbridge_test_utils::upstream::{MockUpstream, Reply, UpstreamBehavior};
//!
//! let upstream = MockUpstream::start(
//!     UpstreamBehavior::default().with_responder(|_| Reply::Result(json!({"tools": []}))),
//! )
//! .await;
//!
//! let url = upstream.sse_url();
//! ```

use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Reply pushed onto the stream for an id-bearing request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// `{"id": <id>, "result": ...}`
    Result(Value),
    /// `{"id": <id>, "error": ...}`
    Error(Value),
    /// The same result twice.
    Duplicate(Value, Value),
    /// Nothing: the caller will time out.
    Silent,
    /// Close the stream without replying.
    CloseStream,
}

impl Reply {
    /// A tool result whose first text content is `document` serialized to JSON.
    pub fn tool_json(document: Value) -> Self {
        Self::Result(crate::fixtures::text_result(&document.to_string()))
    }

    /// A tool result with plain text content.
    pub fn tool_text(text: &str) -> Self {
        Self::Result(crate::fixtures::text_result(text))
    }
}

/// How the session endpoint is announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointStyle {
    /// `data: /messages?session_id=N`
    Relative,
    /// `data: http://127.0.0.1:port/messages?session_id=N`
    Absolute,
    /// Only keep-alives, never an endpoint.
    Never,
}

/// One POST received by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub session_id: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Value,
}

impl RecordedRequest {
    pub fn method(&self) -> &str {
        self.body.get("method").and_then(Value::as_str).unwrap_or("")
    }

    pub fn id(&self) -> Option<u64> {
        self.body.get("id").and_then(Value::as_u64)
    }

    /// Tool name of a `tools/call` request.
    pub fn tool_name(&self) -> Option<&str> {
        self.body.pointer("/params/name").and_then(Value::as_str)
    }

    /// Arguments of a `tools/call` request.
    pub fn tool_arguments(&self) -> Value {
        self.body
            .pointer("/params/arguments")
            .cloned()
            .unwrap_or(Value::Null)
    }
}

/// One event stream opened against the mock.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub authorization: Option<String>,
    pub accept: Option<String>,
}

type Responder = Arc<dyn Fn(&RecordedRequest) -> Reply + Send + Sync>;

/// Scripted behaviour of the mock upstream.
#[derive(Clone)]
pub struct UpstreamBehavior {
    stream_status: StatusCode,
    endpoint: EndpointStyle,
    chunk_size: Option<usize>,
    failing_method: Option<String>,
    responder: Responder,
}

impl Default for UpstreamBehavior {
    fn default() -> Self {
        Self {
            stream_status: StatusCode::OK,
            endpoint: EndpointStyle::Relative,
            chunk_size: None,
            failing_method: None,
            responder: Arc::new(|_| Reply::Result(json!({}))),
        }
    }
}

impl UpstreamBehavior {
    /// Decide the reply to every id-2 request.
    pub fn with_responder(
        mut self,
        responder: impl Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
    ) -> Self {
        self.responder = Arc::new(responder);
        self
    }

    /// Answer the event stream GET with this status instead of 200.
    pub fn with_stream_status(mut self, status: u16) -> Self {
        self.stream_status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
        self
    }

    pub fn with_endpoint(mut self, endpoint: EndpointStyle) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Deliver stream bytes in pieces of at most `size` bytes.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    /// Answer POSTs of this JSON-RPC method with 500.
    pub fn failing_method(mut self, method: impl Into<String>) -> Self {
        self.failing_method = Some(method.into());
        self
    }
}

struct UpstreamState {
    addr: SocketAddr,
    behavior: UpstreamBehavior,
    next_session: AtomicU64,
    sessions: Mutex<HashMap<String, mpsc::UnboundedSender<String>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    streams: Mutex<Vec<StreamRequest>>,
}

impl UpstreamState {
    fn push_frame(&self, session_id: &str, data: &str) {
        if let Some(tx) = self.sessions.lock().unwrap().get(session_id) {
            let _ = tx.send(format!("data: {data}\n\n"));
        }
    }

    fn close_session(&self, session_id: &str) {
        self.sessions.lock().unwrap().remove(session_id);
    }
}

/// A running mock upstream. Shut down on drop.
pub struct MockUpstream {
    state: Arc<UpstreamState>,
    server: JoinHandle<()>,
}

impl MockUpstream {
    /// Bind to an ephemeral port and start serving.
    pub async fn start(behavior: UpstreamBehavior) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock upstream");
        let addr = listener.local_addr().expect("Mock upstream has no address");

        let state = Arc::new(UpstreamState {
            addr,
            behavior,
            next_session: AtomicU64::new(1),
            sessions: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            streams: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/sse", get(open_stream))
            .route("/messages", post(receive_message))
            .with_state(state.clone());

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { state, server }
    }

    /// URL of the event stream.
    pub fn sse_url(&self) -> String {
        format!("http://{}/sse", self.state.addr)
    }

    /// Every POST received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Every event stream opened so far.
    pub fn streams(&self) -> Vec<StreamRequest> {
        self.state.streams.lock().unwrap().clone()
    }

    /// `tools/call` requests received so far.
    pub fn tool_calls(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method() == "tools/call")
            .collect()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn open_stream(State(state): State<Arc<UpstreamState>>, headers: HeaderMap) -> Response {
    state.streams.lock().unwrap().push(StreamRequest {
        authorization: header_value(&headers, header::AUTHORIZATION),
        accept: header_value(&headers, header::ACCEPT),
    });

    let behavior = &state.behavior;
    if behavior.stream_status != StatusCode::OK {
        return (behavior.stream_status, "stream refused").into_response();
    }

    let session_id = state.next_session.fetch_add(1, Ordering::SeqCst).to_string();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let _ = tx.send(": connected\n\n".to_string());
    let _ = tx.send("data: ping\n\n".to_string());
    match behavior.endpoint {
        EndpointStyle::Relative => {
            let _ = tx.send(format!(
                "event: endpoint\ndata: /messages?session_id={session_id}\n\n"
            ));
        }
        EndpointStyle::Absolute => {
            let _ = tx.send(format!(
                "event: endpoint\ndata: http://{}/messages?session_id={session_id}\n\n",
                state.addr
            ));
        }
        EndpointStyle::Never => {}
    }
    state.sessions.lock().unwrap().insert(session_id, tx);

    let chunk_size = behavior.chunk_size;
    let body = async_stream::stream! {
        while let Some(frame) = rx.recv().await {
            let bytes = frame.into_bytes();
            let size = chunk_size.unwrap_or(bytes.len()).max(1);
            for piece in bytes.chunks(size) {
                yield Ok::<_, Infallible>(Bytes::copy_from_slice(piece));
            }
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(body))
        .unwrap()
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: String,
}

async fn receive_message(
    State(state): State<Arc<UpstreamState>>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let request = RecordedRequest {
        session_id: query.session_id.clone(),
        authorization: header_value(&headers, header::AUTHORIZATION),
        content_type: header_value(&headers, header::CONTENT_TYPE),
        body,
    };
    state.requests.lock().unwrap().push(request.clone());

    if state.behavior.failing_method.as_deref() == Some(request.method()) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }

    let session_id = query.session_id.as_str();
    match request.id() {
        Some(1) => {
            let reply = json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": "mock-upstream", "version": "0.1.0"}
                }
            });
            state.push_frame(session_id, &reply.to_string());
        }
        Some(id) => {
            state.push_frame(session_id, "keep-alive");
            match (state.behavior.responder)(&request) {
                Reply::Result(result) => {
                    let reply = json!({"jsonrpc": "2.0", "id": id, "result": result});
                    state.push_frame(session_id, &reply.to_string());
                }
                Reply::Error(error) => {
                    let reply = json!({"jsonrpc": "2.0", "id": id, "error": error});
                    state.push_frame(session_id, &reply.to_string());
                }
                Reply::Duplicate(first, second) => {
                    for result in [first, second] {
                        let reply = json!({"jsonrpc": "2.0", "id": id, "result": result});
                        state.push_frame(session_id, &reply.to_string());
                    }
                }
                Reply::Silent => {}
                Reply::CloseStream => state.close_session(session_id),
            }
        }
        None => {}
    }

    (StatusCode::ACCEPTED, "Accepted").into_response()
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
