//! Outbound HTTP transport stack.
//!
//! # Data Flow
//! ```text
//! Dispatcher fetch of "remote_url#options"
//!     → caching.rs (outer: keyed by URL with options)
//!     → transforming.rs
//!         no fragment: → plain.rs (network)
//!         fragment:    → caching.rs (inner: keyed by bare URL) → plain.rs
//!                      → engine transform → wire.rs (encode + re-parse)
//! ```
//!
//! # Design Decisions
//! - Every layer implements the same [`RoundTrip`] trait
//! - Both caching layers share one store. Variants are keyed by URL plus
//!   fragment; a bare URL key always holds the untransformed original, so
//!   either layer may serve it
//! - Responses are fully buffered (`Response<Bytes>`)

pub mod caching;
pub mod conditional;
pub mod plain;
pub mod transforming;
pub mod wire;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Response};
use thiserror::Error;
use url::Url;

use crate::cache::Cache;
use crate::imaging::TransformEngine;

pub use caching::CachingTransport;
pub use conditional::should_serve_304;
pub use plain::ReqwestTransport;
pub use transforming::TransformingTransport;

/// Header marking responses served from a cache.
pub const X_FROM_CACHE: &str = "x-from-cache";

/// A fully buffered HTTP response.
pub type HttpResponse = Response<Bytes>;

/// A GET request travelling through the transport stack.
///
/// The URL keeps its fragment; transform options ride in it.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: Url,
    pub headers: HeaderMap,
}

impl OutboundRequest {
    pub fn get(url: Url) -> Self {
        Self {
            url,
            headers: HeaderMap::new(),
        }
    }
}

/// Errors from performing a round trip.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed HTTP response: {0}")]
    Malformed(String),
}

/// A single HTTP round trip.
#[async_trait]
pub trait RoundTrip: Send + Sync {
    async fn round_trip(&self, req: OutboundRequest) -> Result<HttpResponse, TransportError>;
}

/// Assemble the full client: outer cache → transforming transport → inner
/// cache → `plain`.
pub fn build_client(
    plain: Arc<dyn RoundTrip>,
    cache: Arc<dyn Cache>,
    engine: Arc<dyn TransformEngine>,
    verbose: bool,
) -> Arc<dyn RoundTrip> {
    let inner: Arc<dyn RoundTrip> =
        Arc::new(CachingTransport::new(plain.clone(), cache.clone()).layer("origin"));
    let transforming = Arc::new(TransformingTransport::new(plain, inner, engine).verbose(verbose));
    Arc::new(CachingTransport::new(transforming, cache).layer("transformed"))
}

/// Value of a response header as a string.
pub(crate) fn header_str(headers: &HeaderMap, name: impl http::header::AsHeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
