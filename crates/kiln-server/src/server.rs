use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use kiln_core::ComponentManager;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::components::demo_registry;
use crate::config::ServerConfig;
use crate::renderer::FileRenderer;
use crate::routes;

/// How often idle components are swept from the cache.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Build the component manager for the demo components.
pub fn build_manager(config: &ServerConfig) -> Arc<ComponentManager> {
    let renderer = FileRenderer::new(&config.server.templates_dir);
    Arc::new(ComponentManager::new(
        demo_registry(),
        Arc::new(renderer),
        &config.runtime.cache,
    ))
}

/// Periodically drop expired components until the task is aborted.
pub fn spawn_purge_task(manager: Arc<ComponentManager>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            manager.purge_expired();
        }
    })
}

/// Serve until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let manager = build_manager(&config);
    let purge = spawn_purge_task(Arc::clone(&manager), PURGE_INTERVAL);
    let app = routes::router(manager);

    let listener = TcpListener::bind(config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind_addr))?;

    tracing::info!(
        addr = %config.server.bind_addr,
        templates_dir = %config.server.templates_dir.display(),
        "Kiln listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await
        .context("Server error")?;

    purge.abort();
    tracing::info!("Kiln shut down");
    Ok(())
}
