//! Network transport backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;
use http::header::{self, HeaderName};
use http::Response;

use super::{HttpResponse, OutboundRequest, RoundTrip, TransportError};

/// Connection-level headers that do not survive buffering the body.
const HOP_BY_HOP: [HeaderName; 6] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
    header::PROXY_AUTHENTICATE,
];

/// Fetches remote URLs over the network.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("imageproxy/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RoundTrip for ReqwestTransport {
    async fn round_trip(&self, req: OutboundRequest) -> Result<HttpResponse, TransportError> {
        let mut url = req.url;
        url.set_fragment(None);

        let response = self.client.get(url).headers(req.headers).send().await?;

        let status = response.status();
        let version = response.version();
        let mut headers = response.headers().clone();
        for name in HOP_BY_HOP.iter() {
            headers.remove(name);
        }
        headers.remove("keep-alive");

        let body = response.bytes().await?;

        let mut out = Response::new(body);
        *out.status_mut() = status;
        *out.version_mut() = version;
        *out.headers_mut() = headers;
        Ok(out)
    }
}
