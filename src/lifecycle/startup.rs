//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the transport stack from the cache settings
//! - Load the initial route mapping and start its refresher
//! - Assemble the HTTP server
//!
//! # Design Decisions
//! - Fail fast: the initial mapping fetch is fatal, later refreshes are not
//! - No mapping URL means an empty table and no background task

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Cache, MemoryCache, NopCache};
use crate::config::loader::load_signature_key;
use crate::config::{CacheBackend, CacheConfig, ProxyConfig};
use crate::error::StartupError;
use crate::http::{AppState, HttpServer};
use crate::imaging::ImageTransformer;
use crate::lifecycle::Shutdown;
use crate::routing::{MappingRefresher, MappingSource, RouteRemapper};
use crate::transport::{build_client, ReqwestTransport, RoundTrip};

/// Connect timeout for origin fetches.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// The store selected by the cache settings.
pub fn build_cache(config: &CacheConfig) -> Arc<dyn Cache> {
    match config.backend {
        CacheBackend::None => Arc::new(NopCache),
        CacheBackend::Memory => Arc::new(MemoryCache::new(config.max_bytes)),
    }
}

/// The full caching and transforming client over the network.
pub fn build_transport(config: &ProxyConfig) -> Result<Arc<dyn RoundTrip>, StartupError> {
    let plain: Arc<dyn RoundTrip> = Arc::new(ReqwestTransport::new(CONNECT_TIMEOUT)?);
    Ok(build_client(
        plain,
        build_cache(&config.cache),
        Arc::new(ImageTransformer),
        config.verbose,
    ))
}

/// Load the initial route mapping and spawn its refresher.
pub async fn initialize_route_mapping(
    config: &ProxyConfig,
    shutdown: &Shutdown,
) -> Result<Arc<RouteRemapper>, StartupError> {
    let mapping = &config.route_mapping;
    let remapper = Arc::new(RouteRemapper::new(mapping.exclusive));

    let Some(url) = mapping.url.as_deref() else {
        tracing::info!("No route mapping URL configured, remapping disabled");
        return Ok(remapper);
    };

    let source = MappingSource::new(url);
    let entries = source.load_into(&remapper).await?;
    tracing::info!(url = %url, entries, exclusive = mapping.exclusive, "Route mapping loaded");

    let refresher = MappingRefresher::new(
        source,
        remapper.clone(),
        Duration::from_secs(mapping.refresh_secs),
    );
    tokio::spawn(refresher.run(shutdown.subscribe()));

    Ok(remapper)
}

/// Build everything the server needs, in dependency order.
pub async fn build_server(config: &ProxyConfig, shutdown: &Shutdown) -> Result<HttpServer, StartupError> {
    let signature_key =
        load_signature_key(config.signature_key.as_deref()).map_err(StartupError::SignatureKey)?;
    let client = build_transport(config)?;
    let remapper = initialize_route_mapping(config, shutdown).await?;

    let state = AppState::new(config, client, remapper, signature_key)?;
    Ok(HttpServer::new(config, state))
}
