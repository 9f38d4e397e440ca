//! Route mapping source and periodic refresh.
//!
//! # Responsibilities
//! - Fetch the JSON mapping document over HTTP(S)
//! - Load it once at startup (failure is fatal to the caller)
//! - Re-fetch on a fixed interval until shutdown
//!
//! # Design Decisions
//! - Refresh failures keep the current table and are only logged
//! - The remapper is injected, never a global

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::observability::metrics;
use crate::routing::remapper::{RouteMappingTable, RouteRemapper};

/// Errors fetching or decoding the mapping document.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("failed to fetch route mapping from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("route mapping at {url} is not a JSON object of strings: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// HTTP endpoint serving the mapping document.
#[derive(Debug, Clone)]
pub struct MappingSource {
    client: reqwest::Client,
    url: String,
}

impl MappingSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and decode the current mapping.
    pub async fn fetch(&self) -> Result<RouteMappingTable, MappingError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| MappingError::Fetch {
                url: self.url.clone(),
                source,
            })?;

        let mapping: HashMap<String, String> =
            response
                .json()
                .await
                .map_err(|source| MappingError::Decode {
                    url: self.url.clone(),
                    source,
                })?;

        Ok(RouteMappingTable::new(mapping))
    }

    /// Fetch the mapping and install it into `remapper`.
    pub async fn load_into(&self, remapper: &RouteRemapper) -> Result<usize, MappingError> {
        let table = self.fetch().await?;
        let entries = table.len();
        remapper.set(table);
        Ok(entries)
    }
}

/// Background task that keeps a [`RouteRemapper`] current.
pub struct MappingRefresher {
    source: MappingSource,
    remapper: Arc<RouteRemapper>,
    interval: Duration,
}

impl MappingRefresher {
    pub fn new(source: MappingSource, remapper: Arc<RouteRemapper>, interval: Duration) -> Self {
        Self {
            source,
            remapper,
            interval,
        }
    }

    /// Refresh on every interval until a shutdown signal arrives.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            url = %self.source.url(),
            interval_secs = self.interval.as_secs(),
            "Route mapping refresher starting"
        );

        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Route mapping refresher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn refresh(&self) {
        match self.source.load_into(&self.remapper).await {
            Ok(entries) => {
                metrics::record_mapping_refresh(true);
                tracing::debug!(entries, "Route mapping refreshed");
            }
            Err(e) => {
                metrics::record_mapping_refresh(false);
                tracing::error!(error = %e, "Failed to refresh route mapping. Keeping current table.");
            }
        }
    }
}
