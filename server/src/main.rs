//! Job Search Server
//!
//! Fetches provider listings on request and serves the current result set,
//! with sorting, filtering and file export, over a REST API using Axum.

use anyhow::Context;
use server::{AppState, ServerConfig, build_router};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pipeline::telemetry::init();

    let config = ServerConfig::from_env().context("loading server configuration")?;
    let addr = config.bind;
    info!(
        data_dir = %config.data_dir.display(),
        policy = ?config.merge_policy,
        country = %config.fetcher.country,
        "configuration loaded"
    );

    let app = build_router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "🌐 server running; try: curl -X POST http://{addr}/fetch -H 'content-type: application/json' -d '{{}}'");

    let server = axum::serve(listener, app).with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("ctrl-c received; shutting down");
    });

    if let Err(e) = server.await {
        error!(error = %e, "server error");
    }

    Ok(())
}
