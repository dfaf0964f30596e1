//! HTTP server command.

use anyhow::Context;
use gmail_mcp_core::{Config, ProxyClient};
use gmail_mcp_server::{create_mcp_router, McpHttpState, SSE_MESSAGE_PATH};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// How long open streams may keep the process alive after Ctrl-C.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Serve both MCP transports until Ctrl-C.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let proxy = ProxyClient::new(&config.backend_url, config.request_timeout())?;
    let registry = gmail_mcp_tools::build_registry(&config, proxy)?;
    let tool_count = registry.len();

    let state = McpHttpState::new(&config.server.name, &config.server.version, registry);
    let reaper = state.spawn_reaper(config.idle_timeout());
    let app = create_mcp_router(state);

    let address = config.server.address;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    info!(
        address = %address,
        backend = %config.backend_url,
        tools = tool_count,
        "Gmail MCP server listening"
    );
    info!("  SSE endpoint: http://{address}/sse (messages: {SSE_MESSAGE_PATH})");
    info!("  Streamable endpoint: http://{address}/mcp");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_ctrl_c().await;
        let _ = shutdown_tx.send(true);
    });

    let mut graceful = shutdown_rx.clone();
    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = graceful.changed().await;
            })
            .await
    };

    let mut deadline = shutdown_rx;
    tokio::select! {
        result = server => result?,
        _ = async move {
            let _ = deadline.changed().await;
            tokio::time::sleep(DRAIN_TIMEOUT).await;
        } => warn!("Open streams did not close within {DRAIN_TIMEOUT:?}, exiting"),
    }

    reaper.abort();
    info!("Server stopped");
    Ok(())
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
