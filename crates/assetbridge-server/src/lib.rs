//! HTTP server for assetbridge.
//!
//! Serves the browser app, completes the OAuth code exchange, and exposes
//! MCP operations and the folder cleanup workflow as JSON endpoints.

pub mod cleanup;
pub mod config;
pub mod routes;
pub mod state;

#[cfg(test)]
mod testing;

pub use cleanup::{
    CleanupReport, CleanupSettings, DeletionOutcome, DeletionStatus, FolderCleanup, FolderRecord,
};
pub use config::{BridgeConfig, ConfigError, McpSettings};
pub use routes::create_router;
pub use state::AppState;
