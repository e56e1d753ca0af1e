//! Folder cleanup workflow.
//!
//! Searches the remote asset store for folders, then deletes each one in
//! turn. Every deletion is attempted and reported individually; one failure
//! never stops the rest.

use assetbridge_mcp::{decode_tool_text, McpError, McpResult, ToolCallResult, ToolInvoker};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{info, warn};

/// Remote tool that lists folders.
pub const SEARCH_FOLDERS_TOOL: &str = "search-folders";

/// Remote tool that deletes one folder.
pub const DELETE_FOLDER_TOOL: &str = "delete-folder";

/// Cleanup tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupSettings {
    /// Upper bound passed to the folder search.
    pub max_results: u32,
    /// Pause between consecutive deletions, in milliseconds.
    pub delete_pause_ms: u64,
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            max_results: 500,
            delete_pause_ms: 250,
        }
    }
}

/// One folder from the search result. Fields other than `path` are kept
/// verbatim for the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub path: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct FolderSearchDocument {
    #[serde(default)]
    folders: Vec<Value>,
}

impl FolderSearchDocument {
    /// Records with a string `path`; any other entry is logged and skipped.
    fn into_records(self) -> Vec<FolderRecord> {
        self.folders.into_iter().filter_map(folder_record).collect()
    }
}

fn folder_record(entry: Value) -> Option<FolderRecord> {
    match FolderRecord::deserialize(&entry) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(entry = %entry, error = %e, "Skipping folder entry without a path");
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeletionStatus {
    Success,
    Failed,
}

/// Result of one deletion attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeletionOutcome {
    pub folder: String,
    pub status: DeletionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeletionOutcome {
    fn success(folder: &str, details: String) -> Self {
        Self {
            folder: folder.to_string(),
            status: DeletionStatus::Success,
            details: Some(details),
            error: None,
        }
    }

    fn failed(folder: &str, error: String) -> Self {
        Self {
            folder: folder.to_string(),
            status: DeletionStatus::Failed,
            details: None,
            error: Some(error),
        }
    }
}

/// Full cleanup report, in search order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub folders_found: Vec<FolderRecord>,
    pub deletion_report: Vec<DeletionOutcome>,
}

impl CleanupReport {
    pub fn failures(&self) -> usize {
        self.deletion_report
            .iter()
            .filter(|o| o.status == DeletionStatus::Failed)
            .count()
    }
}

/// Runs the search-then-delete workflow through a [`ToolInvoker`].
pub struct FolderCleanup<'a> {
    invoker: &'a dyn ToolInvoker,
    settings: CleanupSettings,
}

impl<'a> FolderCleanup<'a> {
    pub fn new(invoker: &'a dyn ToolInvoker, settings: CleanupSettings) -> Self {
        Self { invoker, settings }
    }

    /// Search, then delete every folder found.
    ///
    /// Only a failed search invocation is an error. Deletion failures land
    /// in the report.
    pub async fn run(&self, credential: &str) -> McpResult<CleanupReport> {
        let folders = self.search(credential).await?;
        info!(count = folders.len(), "Folders found for cleanup");

        let pause = Duration::from_millis(self.settings.delete_pause_ms);
        let mut deletion_report = Vec::with_capacity(folders.len());

        for (index, folder) in folders.iter().enumerate() {
            if index > 0 && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
            deletion_report.push(self.delete(credential, &folder.path).await);
        }

        let report = CleanupReport {
            folders_found: folders,
            deletion_report,
        };
        info!(
            deleted = report.deletion_report.len() - report.failures(),
            failed = report.failures(),
            "Folder cleanup finished"
        );
        Ok(report)
    }

    async fn search(&self, credential: &str) -> McpResult<Vec<FolderRecord>> {
        let raw = self
            .invoker
            .call_tool(credential, SEARCH_FOLDERS_TOOL, self.search_arguments())
            .await?;

        match decode_tool_text::<FolderSearchDocument>(raw) {
            Ok(document) => Ok(document.into_records()),
            Err(e) => {
                warn!(error = %e, "Unreadable folder search result, nothing to delete");
                Ok(Vec::new())
            }
        }
    }

    fn search_arguments(&self) -> Value {
        json!({
            "sort_by": [],
            "max_results": self.settings.max_results,
        })
    }

    async fn delete(&self, credential: &str, path: &str) -> DeletionOutcome {
        let outcome = self
            .invoker
            .call_tool(credential, DELETE_FOLDER_TOOL, json!({ "folder": path }))
            .await
            .and_then(deletion_details);

        match outcome {
            Ok(details) => {
                info!(folder = %path, "Folder deleted");
                DeletionOutcome::success(path, details)
            }
            Err(e) => {
                warn!(folder = %path, error = %e, "Folder deletion failed");
                DeletionOutcome::failed(path, e.to_string())
            }
        }
    }
}

/// Text detail of a deletion result. Results flagged `isError` count as
/// failures.
fn deletion_details(raw: Value) -> McpResult<String> {
    match ToolCallResult::from_value(raw.clone()) {
        Ok(result) if result.is_error => Err(McpError::tool_error(
            result.first_text().unwrap_or("tool reported an error"),
        )),
        Ok(result) => Ok(result
            .first_text()
            .map(str::to_string)
            .unwrap_or_else(|| raw.to_string())),
        Err(_) => Ok(raw.to_string()),
    }
}
