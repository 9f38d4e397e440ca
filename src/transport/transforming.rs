//! Transport that applies transformation options carried in the URL fragment.
//!
//! Requests without a fragment go straight to the network transport. For
//! the rest, the untransformed image is fetched through the inner caching
//! client, transformed, and replayed as a regular HTTP response.

use std::sync::Arc;

use async_trait::async_trait;
use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Response, StatusCode};

use super::{
    header_str, should_serve_304, wire, HttpResponse, OutboundRequest, RoundTrip, TransportError,
    X_FROM_CACHE,
};
use crate::imaging::engine::sniff_content_type;
use crate::imaging::{Options, TransformEngine};
use crate::observability::metrics;

pub struct TransformingTransport {
    /// Used for requests that carry no options.
    transport: Arc<dyn RoundTrip>,
    /// Used to fetch the untransformed image.
    caching_client: Arc<dyn RoundTrip>,
    engine: Arc<dyn TransformEngine>,
    verbose: bool,
}

impl TransformingTransport {
    pub fn new(
        transport: Arc<dyn RoundTrip>,
        caching_client: Arc<dyn RoundTrip>,
        engine: Arc<dyn TransformEngine>,
    ) -> Self {
        Self {
            transport,
            caching_client,
            engine,
            verbose: false,
        }
    }

    /// Log every transformation at info level.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Origin content types the transformed output is never labelled with.
fn drops_origin_content_type(content_type: Option<&str>) -> bool {
    matches!(content_type, Some(ct) if ct.starts_with("image/webp") || ct.starts_with("image/tiff"))
}

#[async_trait]
impl RoundTrip for TransformingTransport {
    async fn round_trip(&self, req: OutboundRequest) -> Result<HttpResponse, TransportError> {
        let options = match req.url.fragment() {
            Some(fragment) if !fragment.is_empty() => Options::parse(fragment),
            _ => return self.transport.round_trip(req).await,
        };

        let mut url = req.url.clone();
        url.set_fragment(None);

        let response = self
            .caching_client
            .round_trip(OutboundRequest::get(url.clone()))
            .await?;

        if should_serve_304(&req.headers, response.headers()) {
            let mut not_modified = Response::default();
            *not_modified.status_mut() = StatusCode::NOT_MODIFIED;
            return Ok(not_modified);
        }

        if self.verbose {
            tracing::info!(url = %url, options = %options, "Transforming image");
        }

        let source = response.body().clone();
        let engine = self.engine.clone();
        let task_options = options.clone();
        // A panicking engine is treated like any other transform failure.
        let result = match tokio::task::spawn_blocking(move || {
            engine.transform(&source, &task_options)
        })
        .await
        {
            Ok(transformed) => transformed.map_err(|e| e.to_string()),
            Err(join_error) => Err(join_error.to_string()),
        };

        let image = match result {
            Ok(image) => {
                metrics::record_transform(true);
                image
            }
            Err(e) => {
                tracing::error!(url = %url, options = %options, error = %e, "Image transform failed, serving original");
                metrics::record_transform(false);
                response.body().to_vec()
            }
        };

        let mut headers = response.headers().clone();
        headers.remove(CONTENT_LENGTH);
        headers.remove(X_FROM_CACHE);
        if options.format.is_some() || drops_origin_content_type(header_str(&headers, CONTENT_TYPE)) {
            headers.remove(CONTENT_TYPE);
        }
        if !headers.contains_key(CONTENT_TYPE) {
            if let Some(content_type) = sniff_content_type(&image) {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            }
        }
        headers.insert(CONTENT_LENGTH, HeaderValue::from(image.len()));

        wire::parse_response(&wire::encode_response(response.status(), &headers, &image))
    }
}
