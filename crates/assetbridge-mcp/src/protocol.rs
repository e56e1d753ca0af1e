//! MCP protocol types.
//!
//! Implements the JSON-RPC based MCP protocol as spoken over the SSE transport.
//! See: <https://spec.modelcontextprotocol.io/>

use crate::error::{McpError, McpResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// MCP protocol version.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Id of the `initialize` request within a session.
pub const INITIALIZE_ID: u64 = 1;

/// Id reserved for the single awaited operation of a session.
pub const OPERATION_ID: u64 = 2;

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_INITIALIZED: &str = "notifications/initialized";
pub const METHOD_TOOLS_LIST: &str = "tools/list";
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// JSON-RPC request (or notification if id is None).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// Request ID. None for notifications (which don't expect a response).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request.
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    /// Create a notification (no id, no response expected).
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: method.into(),
            params,
        }
    }
}

/// Inbound message read off the event stream.
///
/// Deliberately loose: servers interleave replies, notifications and their
/// own requests on the same stream, and only the id matters for correlation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonRpcMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl JsonRpcMessage {
    /// Numeric id, if the message has one.
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.as_ref().and_then(Value::as_u64)
    }

    /// Turn a correlated reply into the operation outcome.
    pub fn into_outcome(self) -> McpResult<Value> {
        match self.error {
            Some(error) => Err(McpError::protocol_error(describe_rpc_error(&error))),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Text of a JSON-RPC error field: its `message` when present, else the raw JSON.
fn describe_rpc_error(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => error.to_string(),
        },
        other => other.to_string(),
    }
}

/// MCP initialization parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub capabilities: ClientCapabilities,
    pub client_info: ClientInfo,
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: ClientInfo::default(),
        }
    }
}

/// Client capabilities. The bridge advertises none.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientCapabilities {}

/// Client info.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: "assetbridge".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Tool call parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// Tool call result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    #[serde(default)]
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Decode a raw `result` value.
    pub fn from_value(raw: Value) -> McpResult<Self> {
        serde_json::from_value(raw).map_err(|e| McpError::EnvelopeParse(e.to_string()))
    }

    /// Text of the first content element, if it is text.
    pub fn first_text(&self) -> Option<&str> {
        match self.content.first() {
            Some(ToolContent::Text { text }) => Some(text),
            _ => None,
        }
    }

    /// Parse the JSON document carried as text in the first content element.
    pub fn decode_text<T: DeserializeOwned>(&self) -> McpResult<T> {
        let text = self
            .first_text()
            .ok_or_else(|| McpError::EnvelopeParse("first content element is not text".into()))?;
        serde_json::from_str(text).map_err(|e| McpError::EnvelopeParse(e.to_string()))
    }
}

/// Decode the nested JSON document of a raw tool result in one step.
pub fn decode_tool_text<T: DeserializeOwned>(raw: Value) -> McpResult<T> {
    ToolCallResult::from_value(raw)?.decode_text()
}

/// Tool content item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    #[serde(rename = "resource")]
    Resource { resource: Value },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_rpc_request_serialization() {
        let req = JsonRpcRequest::new(1, "initialize", Some(json!({"test": true})));
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"method\":\"initialize\""));
    }

    #[test]
    fn test_notification_has_no_id_field() {
        let note = JsonRpcRequest::notification(METHOD_INITIALIZED, None);
        assert!(note.id.is_none());
        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(
            value,
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"})
        );
    }

    #[test]
    fn test_initialize_params() {
        let params = serde_json::to_value(InitializeParams::default()).unwrap();
        assert_eq!(params["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(params["clientInfo"]["name"], "assetbridge");
        assert_eq!(params["capabilities"], json!({}));
    }

    #[test]
    fn test_message_outcome_result() {
        let msg: JsonRpcMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":2,"result":{"tools":[]}}"#).unwrap();
        assert_eq!(msg.numeric_id(), Some(2));
        assert_eq!(msg.into_outcome().unwrap(), json!({"tools": []}));
    }

    #[test]
    fn test_message_outcome_error_uses_message() {
        let msg: JsonRpcMessage = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32602,"message":"Unknown tool"}}"#,
        )
        .unwrap();
        match msg.into_outcome() {
            Err(McpError::ProtocolError(text)) => assert_eq!(text, "Unknown tool"),
            other => panic!("Expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_message_outcome_error_without_message_is_verbatim() {
        let msg: JsonRpcMessage =
            serde_json::from_str(r#"{"id":2,"error":{"code":-1}}"#).unwrap();
        match msg.into_outcome() {
            Err(McpError::ProtocolError(text)) => assert_eq!(text, r#"{"code":-1}"#),
            other => panic!("Expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_null_error_counts_as_success() {
        let msg: JsonRpcMessage =
            serde_json::from_str(r#"{"id":2,"error":null,"result":"ok"}"#).unwrap();
        assert_eq!(msg.into_outcome().unwrap(), json!("ok"));
    }

    #[test]
    fn test_string_id_is_not_numeric() {
        let msg: JsonRpcMessage = serde_json::from_str(r#"{"id":"2","result":1}"#).unwrap();
        assert_eq!(msg.numeric_id(), None);
    }

    #[test]
    fn test_tool_content_deserialization() {
        let json = r#"{"type": "text", "text": "Hello"}"#;
        let content: ToolContent = serde_json::from_str(json).unwrap();
        match content {
            ToolContent::Text { text } => assert_eq!(text, "Hello"),
            _ => panic!("Expected Text content"),
        }

        let unknown: ToolContent = serde_json::from_str(r#"{"type": "audio"}"#).unwrap();
        assert!(matches!(unknown, ToolContent::Other));
    }

    #[test]
    fn test_decode_tool_text() {
        #[derive(Deserialize)]
        struct Folders {
            folders: Vec<Value>,
        }

        let raw = json!({
            "content": [{"type": "text", "text": "{\"folders\":[{\"path\":\"/a\"}]}"}]
        });
        let decoded: Folders = decode_tool_text(raw).unwrap();
        assert_eq!(decoded.folders.len(), 1);

        let broken = json!({"content": [{"type": "text", "text": "not json"}]});
        assert!(matches!(
            decode_tool_text::<Folders>(broken),
            Err(McpError::EnvelopeParse(_))
        ));

        let empty = json!({"content": []});
        assert!(matches!(
            decode_tool_text::<Folders>(empty),
            Err(McpError::EnvelopeParse(_))
        ));
    }
}
