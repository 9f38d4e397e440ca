//! Timeout enforcement for the image path.
//!
//! # Design Decisions
//! - The inner handler runs in its own task, so the deadline only decides
//!   what the client sees
//! - Timed-out requests return 504 Gateway Timeout

use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ProxyError;

/// Middleware returning 504 when `next` does not answer within `deadline`.
pub async fn enforce_deadline(
    State(deadline): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let uri = request.uri().clone();
    let handle = tokio::spawn(next.run(request));

    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::error!(uri = %uri, error = %e, "Image handler task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(_) => {
            tracing::warn!(uri = %uri, deadline_ms = deadline.as_millis() as u64, "Request deadline exceeded");
            ProxyError::Timeout.into_response()
        }
    }
}
