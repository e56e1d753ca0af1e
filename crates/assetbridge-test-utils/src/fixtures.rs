//! Canned MCP payloads for tests.

use serde_json::{json, Value};

/// A `tools/call` result with one text content element.
pub fn text_result(text: &str) -> Value {
    json!({
        "content": [{"type": "text", "text": text}],
        "isError": false
    })
}

/// A `tools/call` result flagged as a tool-side failure.
pub fn error_result(text: &str) -> Value {
    json!({
        "content": [{"type": "text", "text": text}],
        "isError": true
    })
}

/// The nested document returned by `search-folders` for these paths.
pub fn folders_document(paths: &[&str]) -> Value {
    let folders: Vec<Value> = paths
        .iter()
        .map(|path| {
            let name = path.rsplit('/').next().unwrap_or(path);
            json!({"name": name, "path": path, "external_id": format!("ext-{name}")})
        })
        .collect();
    json!({"folders": folders, "total_count": paths.len()})
}

/// A full `search-folders` tool result for these paths.
pub fn search_result(paths: &[&str]) -> Value {
    text_result(&folders_document(paths).to_string())
}

/// A `tools/list` result with the folder tools.
pub fn tools_list() -> Value {
    json!({
        "tools": [
            {
                "name": "search-folders",
                "description": "Search asset folders",
                "inputSchema": {"type": "object"}
            },
            {
                "name": "delete-folder",
                "description": "Delete an empty folder",
                "inputSchema": {
                    "type": "object",
                    "properties": {"folder": {"type": "string"}},
                    "required": ["folder"]
                }
            }
        ]
    })
}
