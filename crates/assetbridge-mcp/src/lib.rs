//! Model Context Protocol (MCP) client for assetbridge.
//!
//! The remote asset-management server speaks MCP over a split transport:
//! requests are POSTed to a per-session endpoint, replies arrive on a
//! Server-Sent-Events stream.
//!
//! # Architecture
//!
//! ```text
//!                 GET (text/event-stream)
//! ┌────────────┐ ◀──────────────────────── ┌─────────────┐
//! │ McpSse     │   data: /messages?sid=…   │  MCP server │
//! │ Client     │   data: {"id":2,…}        │             │
//! │            │ ────────────────────────▶ │             │
//! └────────────┘   POST initialize / …     └─────────────┘
//!    FrameReader → HandshakePhase → Correlator
//! ```
//!
//! Every invocation runs in a fresh session: one stream, three POSTs, one
//! awaited reply with id 2.
//!
//! # Example
//!
//! ```no_run
//! use assetbridge_mcp::{McpSseClient, SseConfig, ToolInvoker};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = McpSseClient::new(SseConfig::new("https://mcp.example.com/sse"))?;
//!
//! let tools = client.list_tools("access-token").await?;
//! let result = client
//!     .call_tool("access-token", "delete-folder", serde_json::json!({ "folder": "old" }))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod correlator;
mod error;
mod invoker;
pub mod oauth;
pub mod protocol;
pub mod session;
pub mod sse;

pub use client::{McpSseClient, SseConfig};
pub use error::{McpError, McpResult};
pub use invoker::ToolInvoker;
pub use oauth::{exchange_code, ExchangeError, OAuthConfig, TokenResponse};
pub use protocol::{decode_tool_text, ToolCallResult, ToolContent};
pub use session::Operation;
pub use sse::FrameReader;
