use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;

use swarmlens_sessions::SessionStore;

use crate::api;

pub async fn handle_serve_command(store: SessionStore, host: &str, port: u16) -> Result<()> {
    let router = api::create_router(Arc::new(store));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind API server to {}", addr))?;

    tracing::info!("Serving session API on {}", addr);
    eprintln!();
    eprintln!(
        "  {} {}",
        "->".bright_green(),
        format!("API listening on http://{}/api/sessions", addr).bold()
    );
    eprintln!("  {} Press {} to stop", "->".dimmed(), "Ctrl+C".bold());
    eprintln!();

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    eprintln!("\nShutting down...");
}
