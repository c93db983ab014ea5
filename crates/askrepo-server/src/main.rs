//! askrepo server binary.
//!
//! One process serves both surfaces: the JSON API with the NDJSON
//! streaming question endpoint, and the MCP server at `/mcp`.

mod config;
mod http;
mod mcp;
mod state;

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::{Args, Config};
use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match Config::resolve(args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(2);
        }
    };

    info!(
        agent = %config.agent_kind,
        projects_dir = %config.projects_dir.display(),
        "askrepo server starting"
    );

    if let Err(e) = tokio::fs::create_dir_all(&config.projects_dir).await {
        error!(error = %e, dir = %config.projects_dir.display(), "Cannot create projects directory");
        std::process::exit(1);
    }

    let state = Arc::new(AppState::new(&config));
    let ct = CancellationToken::new();

    let app = http::create_router(state.clone()).merge(mcp::create_mcp_router(state, ct.clone()));

    let listener = match tokio::net::TcpListener::bind(&config.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, addr = %config.listen, "Failed to bind listen address");
            std::process::exit(1);
        }
    };

    info!(addr = %config.listen, "Listening");

    let shutdown_ct = ct.clone();
    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
        shutdown_ct.cancel();
    });

    if let Err(e) = serve.await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }

    info!("askrepo server stopped");
}
