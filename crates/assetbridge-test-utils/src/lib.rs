//! Testing utilities for assetbridge.
//!
//! - **Upstream**: an in-process MCP server speaking the split POST/SSE
//!   transport, with scripted replies and request recording
//! - **Fixtures**: canned tool results and search documents
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use assetbridge_test_utils::{fixtures, MockUpstream, Reply, UpstreamBehavior};
//!
//! #[tokio::test]
//! async fn test_with_upstream() {
//!     let upstream = MockUpstream::start(
//!         UpstreamBehavior::default()
//!             .with_responder(|_| Reply::Result(fixtures::tools_list())),
//!     )
//!     .await;
//!     // point a client at upstream.sse_url()
//! }
//! ```

pub mod fixtures;
pub mod upstream;

pub use upstream::{EndpointStyle, MockUpstream, RecordedRequest, Reply, UpstreamBehavior};
