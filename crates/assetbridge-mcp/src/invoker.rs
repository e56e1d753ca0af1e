//! Tool invocation seam.

use crate::error::McpResult;
use crate::session::Operation;
use async_trait::async_trait;
use serde_json::Value;

/// Runs one MCP operation on behalf of a caller-supplied credential.
///
/// [`crate::McpSseClient`] is the real implementation; workflows and HTTP
/// handlers only depend on this trait.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Run one operation in a fresh session and return its raw result.
    async fn execute(&self, credential: &str, operation: Operation) -> McpResult<Value>;

    /// `tools/list`.
    async fn list_tools(&self, credential: &str) -> McpResult<Value> {
        self.execute(credential, Operation::ListTools).await
    }

    /// `tools/call` for `name` with `arguments`.
    async fn call_tool(&self, credential: &str, name: &str, arguments: Value) -> McpResult<Value> {
        self.execute(credential, Operation::call(name, arguments))
            .await
    }
}
