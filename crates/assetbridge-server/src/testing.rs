//! Scripted [`ToolInvoker`] for unit tests.

use assetbridge_mcp::{McpResult, Operation, ToolInvoker};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

type Script = Box<dyn Fn(&str, &Value) -> McpResult<Value> + Send + Sync>;

/// Answers each operation from a closure and records what it was asked.
///
/// The closure sees the tool name (or `tools/list`) and the arguments.
pub struct ScriptedInvoker {
    script: Script,
    calls: Mutex<Vec<(String, Value)>>,
    credentials: Mutex<Vec<String>>,
}

impl ScriptedInvoker {
    pub fn new(script: impl Fn(&str, &Value) -> McpResult<Value> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
            credentials: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn credentials(&self) -> Vec<String> {
        self.credentials.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolInvoker for ScriptedInvoker {
    async fn execute(&self, credential: &str, operation: Operation) -> McpResult<Value> {
        let (name, arguments) = match operation {
            Operation::ListTools => ("tools/list".to_string(), Value::Null),
            Operation::CallTool { name, arguments } => (name, arguments),
        };
        self.credentials.lock().unwrap().push(credential.to_string());
        self.calls
            .lock()
            .unwrap()
            .push((name.clone(), arguments.clone()));
        (self.script)(&name, &arguments)
    }
}
