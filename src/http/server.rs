//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with the health and favicon short-circuits
//! - Wire up middleware (request ID, tracing, image deadline)
//! - Dispatch image requests: remap → parse → authorize → fetch → project
//! - Bind server to listener and stop on shutdown

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use url::Url;

use crate::config::ProxyConfig;
use crate::error::{ProxyError, StartupError};
use crate::http::request::{MakeRequestUuidV4, RequestIdExt, X_REQUEST_ID};
use crate::http::response::{copy_headers, ENTITY_HEADERS, VALIDATOR_HEADERS};
use crate::imaging::ParsedRequest;
use crate::observability::metrics;
use crate::resilience::timeouts::enforce_deadline;
use crate::routing::RouteRemapper;
use crate::security::{allowed, AccessPolicy};
use crate::transport::{should_serve_304, OutboundRequest, RoundTrip, X_FROM_CACHE};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Outer caching client (cache → transform → cache → network).
    pub client: Arc<dyn RoundTrip>,
    pub remapper: Arc<RouteRemapper>,
    pub policy: Arc<AccessPolicy>,
    pub base_url: Option<Url>,
    pub scale_up: bool,
    pub verbose: bool,
}

impl AppState {
    pub fn new(
        config: &ProxyConfig,
        client: Arc<dyn RoundTrip>,
        remapper: Arc<RouteRemapper>,
        signature_key: Vec<u8>,
    ) -> Result<Self, StartupError> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|source| StartupError::BaseUrl {
                    url: raw.to_string(),
                    source,
                })
            })
            .transpose()?;

        let policy = AccessPolicy {
            whitelist: config.whitelist.clone(),
            referrers: config.referrers.clone(),
            signature_key,
        };

        Ok(Self {
            client,
            remapper,
            policy: Arc::new(policy),
            base_url,
            scale_up: config.scale_up,
            verbose: config.verbose,
        })
    }
}

/// HTTP server for the image proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ProxyConfig, state: AppState) -> Self {
        let router = Self::build_router(config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mut images = Router::new().fallback(serve_image).with_state(state);
        if config.timeout_secs > 0 {
            images = images.layer(middleware::from_fn_with_state(
                Duration::from_secs(config.timeout_secs),
                enforce_deadline,
            ));
        }

        Router::new()
            .route("/favicon.ico", any(favicon))
            .route("/", any(health_check))
            .route("/health-check", any(health_check))
            .fallback_service(images)
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request.request_id(),
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn favicon() -> StatusCode {
    StatusCode::OK
}

async fn health_check() -> &'static str {
    "OK"
}

/// Image request handler.
async fn serve_image(State(state): State<AppState>, request: Request) -> Response {
    let start = Instant::now();
    let (parts, _body) = request.into_parts();

    let response = match dispatch(&state, &parts.uri, &parts.headers).await {
        Ok(response) => response,
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                tracing::error!(uri = %parts.uri, status = status.as_u16(), error = %e, "Image request failed");
            } else {
                tracing::warn!(uri = %parts.uri, status = status.as_u16(), error = %e, "Image request rejected");
            }
            e.into_response()
        }
    };

    metrics::record_request(response.status().as_u16(), start);
    response
}

async fn dispatch(state: &AppState, uri: &Uri, inbound: &HeaderMap) -> Result<Response, ProxyError> {
    let uri = state.remapper.remap(uri)?;

    let mut req = ParsedRequest::parse(&uri, inbound, state.base_url.as_ref())?;
    req.options.scale_up = state.scale_up;

    allowed(&req, &state.policy)?;

    let fetched = state
        .client
        .round_trip(OutboundRequest::get(req.fetch_url()))
        .await?;

    if state.verbose {
        let cached = fetched
            .headers()
            .get(X_FROM_CACHE)
            .is_some_and(|v| v == "1");
        tracing::info!(request = %req, cached, "Serving image");
    }

    let mut headers = HeaderMap::new();
    copy_headers(&mut headers, fetched.headers(), &VALIDATOR_HEADERS);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );

    if should_serve_304(inbound, fetched.headers()) {
        return Ok((StatusCode::NOT_MODIFIED, headers).into_response());
    }

    copy_headers(&mut headers, fetched.headers(), &ENTITY_HEADERS);

    let (parts, body) = fetched.into_parts();
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = parts.status;
    *response.headers_mut() = headers;
    Ok(response)
}
