//! imageproxy: a caching, transforming image proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──▶ http server ──▶ resilience ──▶ routing ──▶ imaging ──▶ security
//!         (request id,    (deadline)     (prefix     (URL +      (referrer,
//!          tracing)                       remap)      options)    host, HMAC)
//!                                                                    │
//!                                                                    ▼
//!     Client Response                                          transport
//!     ◀── header projection ◀─────────────────────── cache → transform → cache → origin
//! ```

use clap::Parser;
use tokio::net::TcpListener;

use imageproxy::config::cli::Cli;
use imageproxy::lifecycle::{signals, startup};
use imageproxy::observability::{logging, metrics};
use imageproxy::{Shutdown, StartupError};

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let cli = Cli::parse();
    let config = cli.load()?;

    logging::init_logging(&config.observability, config.verbose);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "imageproxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        cache = ?config.cache.backend,
        timeout_secs = config.timeout_secs,
        whitelist = ?config.whitelist,
        signed = config.signature_key.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let server = startup::build_server(&config, &shutdown).await?;

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server
        .run(listener, server_shutdown)
        .await
        .map_err(StartupError::Serve)?;

    tracing::info!("Shutdown complete");
    Ok(())
}
