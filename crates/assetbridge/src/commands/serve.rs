//! Server command.

use assetbridge_server::{create_router, AppState, BridgeConfig};
use tracing::{info, warn};

/// Run the bridge until the listener fails.
pub async fn run_server(config: BridgeConfig) -> anyhow::Result<()> {
    if config.oauth.client_id.is_empty() {
        warn!("No OAuth client id configured, code exchange will be rejected upstream");
    }

    let state = AppState::new(&config)?;

    let static_dir = config.static_dir.is_dir().then_some(config.static_dir.as_path());
    match static_dir {
        Some(dir) => info!(dir = %dir.display(), "Serving static files"),
        None => warn!(
            dir = %config.static_dir.display(),
            "Static directory not found, serving API only"
        ),
    }

    let app = create_router(state, static_dir);

    let listener = tokio::net::TcpListener::bind(config.address).await?;
    info!(
        address = %config.address,
        mcp = %config.mcp.sse_url,
        "assetbridge listening on http://{}",
        config.address
    );

    axum::serve(listener, app).await?;

    Ok(())
}
