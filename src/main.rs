//! mutation-relay server entry point.
//!
//! Connects to the bus, starts the queue consumers and serves the
//! WebSocket and health endpoints until Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use mutation_relay::api;
use mutation_relay::app_state::AppState;
use mutation_relay::bus;
use mutation_relay::config::RelayConfig;
use mutation_relay::notify::{run_notify_consumer, run_register_sink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Load configuration
    let config = RelayConfig::from_env()?;
    config.ensure_external_bus()?;
    tracing::info!(addr = %config.listen_addr, "starting mutation-relay");

    // Connect the bus
    let bus = bus::from_config(&config)?;

    // Build broker state
    let app_state = AppState::new(config.pong_delay, config.outbound_channel_capacity);

    // Start consumers
    let notify = bus
        .consume(&config.topology.notify_queue)
        .await
        .context("consuming notify queue")?;
    tokio::spawn(run_notify_consumer(notify, Arc::clone(&app_state.router)));
    let register = bus
        .consume(&config.topology.register_queue)
        .await
        .context("consuming register queue")?;
    tokio::spawn(run_register_sink(register));

    // Build router
    let app = api::build_router(app_state, &config.ws_path);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, ws_path = %config.ws_path, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
