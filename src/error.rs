//! Error types surfaced at the process and HTTP boundaries.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::imaging::UrlError;
use crate::routing::{MappingError, RemapError};
use crate::security::AccessDenied;
use crate::transport::TransportError;

/// Message sent with 504 responses.
pub const TIMEOUT_MESSAGE: &str = "Gateway timeout waiting for remote resource.";

/// Failures of a single image request, each mapped to one status code.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid request URL: {0}")]
    InvalidRequest(#[from] UrlError),

    #[error("{0}")]
    AccessDenied(#[from] AccessDenied),

    #[error("invalid request URL: {0}")]
    RouteNotFound(String),

    #[error("invalid request URL: {0}")]
    InvalidTarget(String),

    #[error("error fetching remote image: {0}")]
    Fetch(#[from] TransportError),

    #[error("{}", TIMEOUT_MESSAGE)]
    Timeout,
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::AccessDenied(_) => StatusCode::FORBIDDEN,
            ProxyError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            ProxyError::Fetch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<RemapError> for ProxyError {
    fn from(err: RemapError) -> Self {
        match err {
            RemapError::NotFound { target } => ProxyError::RouteNotFound(target),
            RemapError::InvalidTarget { target } => ProxyError::InvalidTarget(target),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Failures that stop the process before or while serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read signature key: {0}")]
    SignatureKey(#[source] std::io::Error),

    #[error("initial route mapping load failed: {0}")]
    RouteMapping(#[from] MappingError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] TransportError),

    #[error("invalid base URL {url:?}: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = ProxyError::from(RemapError::NotFound { target: "/x/a.jpg".into() });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.to_string(), "invalid request URL: /x/a.jpg");

        let denied = ProxyError::from(AccessDenied::HostOrSignature("http://a/b".into()));
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);

        assert_eq!(ProxyError::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ProxyError::Timeout.to_string(), TIMEOUT_MESSAGE);
    }

    #[test]
    fn test_fetch_message() {
        let err = ProxyError::from(TransportError::Malformed("bad head".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "error fetching remote image: malformed HTTP response: bad head");
    }
}
