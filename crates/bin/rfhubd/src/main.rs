//! # rfhubd, the rfhub daemon
//!
//! Composition root that wires a device backend, the services and the HTTP
//! adapter together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Open the configured device backend; refuse to start if the native
//!   library cannot be loaded
//! - Load group definitions from the configured file
//! - Bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT or `POST /shutdown`)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use rfhub_adapter_http_axum::server::Server;
use rfhub_adapter_http_axum::state::{AppState, Shutdown};
use rfhub_adapter_telldus::TelldusLibrary;
use rfhub_adapter_virtual::VirtualLibrary;
use rfhub_app::ports::DeviceLibrary;

use config::{BackendKind, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    match config.backend.kind {
        BackendKind::Virtual => {
            tracing::info!("using virtual demo devices");
            run(&config, VirtualLibrary::with_demo_devices()).await
        }
        BackendKind::Telldus => {
            let library = TelldusLibrary::open(config.backend.library_path.as_deref())
                .inspect_err(|err| {
                    tracing::error!(error = %err, "telldus-core unavailable, refusing to start");
                })?;
            run(&config, library).await
        }
    }
}

async fn run<L: DeviceLibrary + 'static>(
    config: &Config,
    library: L,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::new(Arc::new(library));

    if let Some(text) = config.groups_text()? {
        state.group_service.load_config(&text)?;
    }

    let handle = Server::bind(config.bind_addr(), state).await?;
    tokio::spawn(stop_on_signal(handle.shutdown().clone()));
    handle.stopped().await?;
    Ok(())
}

/// Trigger `shutdown` on Ctrl+C or SIGTERM.
async fn stop_on_signal(shutdown: Shutdown) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "unable to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
        () = shutdown.wait() => return,
    }
    shutdown.trigger();
}
