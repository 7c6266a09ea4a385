#![forbid(unsafe_code)]

//! Standalone authentication server binary.

use std::net::SocketAddr;
use std::process;

use anyhow::Context;
use clap::Parser;
use keygate_server::handler;
use keygate_server::service::{ServiceConfig, ServiceState, initialize_tracing};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tower_http::trace::TraceLayer;

const TRACING_TARGET_STARTUP: &str = "keygate::startup";
const TRACING_TARGET_SHUTDOWN: &str = "keygate::shutdown";

/// Command-line arguments for the authentication server.
#[derive(Debug, Parser)]
#[command(name = "keygate", version, about = "Token-based authentication server")]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "LISTEN_ADDRESS", default_value = "127.0.0.1:8000")]
    listen_address: SocketAddr,

    /// Authentication service configuration.
    #[command(flatten)]
    service: ServiceConfig,
}

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    initialize_tracing().context("failed to initialize tracing")?;

    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        environment = ?cli.service.environment,
        "starting authentication server"
    );

    let state = ServiceState::from_config(&cli.service)
        .context("invalid service configuration")?;
    let router = handler::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(cli.listen_address)
        .await
        .with_context(|| format!("failed to bind to {}", cli.listen_address))?;

    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        addr = %cli.listen_address,
        "server is ready and listening for connections"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server encountered a fatal error")?;

    tracing::info!(
        target: TRACING_TARGET_SHUTDOWN,
        "server shut down gracefully"
    );

    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT/Ctrl+C).
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(error) = ctrl_c().await {
            tracing::error!(
                target: TRACING_TARGET_SHUTDOWN,
                error = %error,
                "failed to install Ctrl+C handler"
            );
        } else {
            tracing::info!(
                target: TRACING_TARGET_SHUTDOWN,
                "received Ctrl+C, initiating graceful shutdown"
            );
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                tracing::info!(
                    target: TRACING_TARGET_SHUTDOWN,
                    "received SIGTERM, initiating graceful shutdown"
                );
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_SHUTDOWN,
                    error = %error,
                    "failed to install SIGTERM handler"
                );
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }
}
