//! Beat Duel - tempo-locked two-sided duel
//!
//! Entry point. Depending on `ROLE` this process:
//! - plays against the CPU (`local`)
//! - runs the authoritative duel and serves one opponent over WebSocket (`host`)
//! - joins a host and mirrors its state (`client`)

mod app;
mod config;
mod game;
mod http;
mod util;
mod ws;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::{input, AppState, ConsolePresenter, Presenter};
use crate::config::{Config, ConfigError};
use crate::game::{Command, DuelMatch, Role, SessionEvent};
use crate::http::build_router;
use crate::util::time::init_server_time;
use crate::ws::PeerLink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    init_server_time();

    info!("Starting Beat Duel");
    info!(role = ?config.role, bpm = config.bpm, "Configuration loaded");

    let link = PeerLink::new();
    let presenter: Arc<dyn Presenter> = Arc::new(ConsolePresenter::new());
    let (duel, handle) = DuelMatch::new(&config, link.clone(), presenter);

    match config.role {
        Role::Host => {
            let state = AppState::new(config.clone(), handle.clone(), link.clone());
            let router = build_router(state);

            let addr = config.server_addr;
            let listener = TcpListener::bind(addr).await?;

            info!("Listening on {}", addr);
            info!("Health check: http://{}/health", addr);
            info!("Opponent joins with HOST_URL=ws://{}/ws", addr);

            tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, router).await {
                    error!(error = %e, "HTTP server stopped");
                }
            });
        }
        Role::Client => {
            let url = config
                .host_url
                .clone()
                .ok_or(ConfigError::Missing("HOST_URL"))?;
            ws::client::spawn_connector(url, link.clone(), handle.events());
        }
        Role::Local => {}
    }

    info!("Controls: {}", input::HELP);
    tokio::spawn(input::read_stdin(handle.events()));

    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_handle
            .send(SessionEvent::Command(Command::Exit))
            .await;
    });

    duel.run().await?;

    info!("Shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, leaving the duel");
        }
        _ = terminate => {
            info!("Received terminate signal, leaving the duel");
        }
    }
}
