//! Lobby Chat Server - Entry Point
//!
//! Reads the configuration, binds the listening endpoint and runs the
//! control loop until the listener fails or Ctrl-C is pressed.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lobby_chat::{ChatServer, ServerConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=lobby_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lobby_chat=info")),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Binding to {}", config.bind_addr);
    let server = match ChatServer::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let reason = server.run(interrupted()).await;
    info!("Server stopped: {:?}", reason);

    ExitCode::SUCCESS
}

/// Completes on Ctrl-C; never completes if the signal cannot be watched
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
