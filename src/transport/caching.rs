//! HTTP freshness caching decorator.
//!
//! # Responsibilities
//! - Serve fresh stored responses without a round trip
//! - Revalidate stale responses with their validators
//! - Store cacheable responses in wire form
//!
//! # Design Decisions
//! - Key is the full request URL, fragment included
//! - Responses served from the store carry `X-From-Cache: 1`
//! - Only 200, 203, 300, 301 and 410 responses are stored

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::{
    CACHE_CONTROL, CONTENT_LENGTH, DATE, ETAG, EXPIRES, IF_MODIFIED_SINCE, IF_NONE_MATCH,
    LAST_MODIFIED,
};
use http::{HeaderMap, HeaderValue, StatusCode};

use super::conditional::parse_http_date;
use super::{header_str, wire, HttpResponse, OutboundRequest, RoundTrip, TransportError, X_FROM_CACHE};
use crate::cache::Cache;
use crate::observability::metrics;

/// How a stored response relates to a new request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Serve from the store.
    Fresh,
    /// Revalidate with the origin.
    Stale,
    /// Bypass the store for this request.
    Transparent,
}

/// Parsed `Cache-Control` directives.
#[derive(Debug, Default)]
struct CacheControl(HashMap<String, Option<String>>);

impl CacheControl {
    fn from_headers(headers: &HeaderMap) -> Self {
        let mut directives = HashMap::new();
        for value in headers.get_all(CACHE_CONTROL) {
            let Ok(value) = value.to_str() else { continue };
            for part in value.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                match part.split_once('=') {
                    Some((k, v)) => directives.insert(
                        k.trim().to_ascii_lowercase(),
                        Some(v.trim().trim_matches('"').to_string()),
                    ),
                    None => directives.insert(part.to_ascii_lowercase(), None),
                };
            }
        }
        Self(directives)
    }

    fn has(&self, directive: &str) -> bool {
        self.0.contains_key(directive)
    }

    fn seconds(&self, directive: &str) -> Option<i64> {
        self.0.get(directive)?.as_deref()?.parse().ok()
    }
}

/// Decide whether a stored response may be served for `request` at `now`.
pub fn freshness(request: &HeaderMap, stored: &HeaderMap, now: DateTime<Utc>) -> Freshness {
    let req_cc = CacheControl::from_headers(request);
    let resp_cc = CacheControl::from_headers(stored);

    if req_cc.has("no-cache") {
        return Freshness::Transparent;
    }
    if resp_cc.has("no-cache") {
        return Freshness::Stale;
    }
    if req_cc.has("only-if-cached") {
        return Freshness::Fresh;
    }

    let Some(date) = header_str(stored, DATE).and_then(parse_http_date) else {
        return Freshness::Stale;
    };
    let mut current_age = (now - date.with_timezone(&Utc)).num_seconds();

    let mut lifetime = match resp_cc.seconds("max-age") {
        Some(max_age) => max_age,
        None => header_str(stored, EXPIRES)
            .and_then(parse_http_date)
            .map(|expires| (expires - date).num_seconds())
            .unwrap_or(0),
    };

    if let Some(max_age) = req_cc.seconds("max-age") {
        lifetime = max_age;
    }
    if let Some(min_fresh) = req_cc.seconds("min-fresh") {
        current_age += min_fresh;
    }

    if lifetime > current_age {
        Freshness::Fresh
    } else {
        Freshness::Stale
    }
}

fn is_storable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 200 | 203 | 300 | 301 | 410)
}

/// Caching decorator over another [`RoundTrip`].
pub struct CachingTransport {
    transport: Arc<dyn RoundTrip>,
    cache: Arc<dyn Cache>,
    layer: &'static str,
}

impl CachingTransport {
    pub fn new(transport: Arc<dyn RoundTrip>, cache: Arc<dyn Cache>) -> Self {
        Self {
            transport,
            cache,
            layer: "cache",
        }
    }

    /// Name used for this layer in logs and metrics.
    pub fn layer(mut self, name: &'static str) -> Self {
        self.layer = name;
        self
    }

    fn load(&self, key: &str) -> Option<HttpResponse> {
        let bytes = self.cache.get(key)?;
        match wire::parse_response(&bytes) {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Dropping unreadable cache entry");
                self.cache.delete(key);
                None
            }
        }
    }

    fn store(&self, key: &str, response: &HttpResponse) {
        self.cache.set(key, Bytes::from(wire::encode(response)));
    }
}

fn mark_cached(mut response: HttpResponse) -> HttpResponse {
    response
        .headers_mut()
        .insert(X_FROM_CACHE, HeaderValue::from_static("1"));
    response
}

/// Copy end-to-end headers of a 304 onto the stored response.
fn merge_not_modified(mut stored: HttpResponse, not_modified: &HttpResponse) -> HttpResponse {
    for name in not_modified.headers().keys() {
        if name == CONTENT_LENGTH || name.as_str() == X_FROM_CACHE {
            continue;
        }
        stored.headers_mut().remove(name);
        for value in not_modified.headers().get_all(name) {
            stored.headers_mut().append(name.clone(), value.clone());
        }
    }
    stored
}

#[async_trait]
impl RoundTrip for CachingTransport {
    async fn round_trip(&self, req: OutboundRequest) -> Result<HttpResponse, TransportError> {
        let key = req.url.as_str().to_string();
        let req_cc = CacheControl::from_headers(&req.headers);

        let cached = if req_cc.has("no-store") {
            None
        } else {
            self.load(&key)
        };

        let mut outbound = req.clone();
        if let Some(stored) = &cached {
            match freshness(&req.headers, stored.headers(), Utc::now()) {
                Freshness::Fresh => {
                    metrics::record_cache_lookup(self.layer, true);
                    tracing::debug!(layer = self.layer, key = %key, "Serving fresh cached response");
                    return Ok(mark_cached(stored.clone()));
                }
                Freshness::Stale => {
                    if let Some(etag) = stored.headers().get(ETAG) {
                        if !outbound.headers.contains_key(IF_NONE_MATCH) {
                            outbound.headers.insert(IF_NONE_MATCH, etag.clone());
                        }
                    }
                    if let Some(last_modified) = stored.headers().get(LAST_MODIFIED) {
                        if !outbound.headers.contains_key(IF_MODIFIED_SINCE) {
                            outbound.headers.insert(IF_MODIFIED_SINCE, last_modified.clone());
                        }
                    }
                }
                Freshness::Transparent => {}
            }
        }
        metrics::record_cache_lookup(self.layer, false);

        let response = self.transport.round_trip(outbound).await?;

        if response.status() == StatusCode::NOT_MODIFIED {
            if let Some(stored) = cached {
                tracing::debug!(layer = self.layer, key = %key, "Cached response revalidated");
                let refreshed = merge_not_modified(stored, &response);
                self.store(&key, &refreshed);
                return Ok(mark_cached(refreshed));
            }
            return Ok(response);
        }

        let resp_cc = CacheControl::from_headers(response.headers());
        if is_storable_status(response.status()) && !req_cc.has("no-store") && !resp_cc.has("no-store") {
            self.store(&key, &response);
        } else {
            self.cache.delete(&key);
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use chrono::Duration;
    use http::Response;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use url::Url;

    /// Origin returning canned responses and recording request headers.
    struct ScriptedOrigin {
        responses: Mutex<Vec<HttpResponse>>,
        seen: Mutex<Vec<HeaderMap>>,
        calls: AtomicUsize,
    }

    impl ScriptedOrigin {
        fn new(responses: Vec<HttpResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RoundTrip for ScriptedOrigin {
        async fn round_trip(&self, req: OutboundRequest) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(req.headers);
            Ok(self.responses.lock().unwrap().remove(0))
        }
    }

    fn http_date(t: DateTime<Utc>) -> String {
        t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
    }

    fn response(status: u16, headers: &[(&str, String)], body: &'static [u8]) -> HttpResponse {
        let mut builder = Response::builder().status(status);
        for (k, v) in headers {
            builder = builder.header(*k, v.as_str());
        }
        builder.body(Bytes::from_static(body)).unwrap()
    }

    fn get(url: &str) -> OutboundRequest {
        OutboundRequest::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_freshness_max_age() {
        let now = Utc::now();
        let mut stored = HeaderMap::new();
        stored.insert(DATE, http_date(now - Duration::seconds(10)).parse().unwrap());
        stored.insert(CACHE_CONTROL, "max-age=60".parse().unwrap());
        assert_eq!(freshness(&HeaderMap::new(), &stored, now), Freshness::Fresh);

        stored.insert(CACHE_CONTROL, "max-age=5".parse().unwrap());
        assert_eq!(freshness(&HeaderMap::new(), &stored, now), Freshness::Stale);
    }

    #[test]
    fn test_freshness_expires_and_request_directives() {
        let now = Utc::now();
        let mut stored = HeaderMap::new();
        stored.insert(DATE, http_date(now).parse().unwrap());
        stored.insert(EXPIRES, http_date(now + Duration::seconds(100)).parse().unwrap());
        assert_eq!(freshness(&HeaderMap::new(), &stored, now), Freshness::Fresh);

        let mut req = HeaderMap::new();
        req.insert(CACHE_CONTROL, "min-fresh=200".parse().unwrap());
        assert_eq!(freshness(&req, &stored, now), Freshness::Stale);

        req.insert(CACHE_CONTROL, "no-cache".parse().unwrap());
        assert_eq!(freshness(&req, &stored, now), Freshness::Transparent);
    }

    #[test]
    fn test_missing_date_is_stale() {
        let mut stored = HeaderMap::new();
        stored.insert(CACHE_CONTROL, "max-age=600".parse().unwrap());
        assert_eq!(freshness(&HeaderMap::new(), &stored, Utc::now()), Freshness::Stale);
    }

    #[tokio::test]
    async fn test_fresh_response_served_from_cache() {
        let origin = ScriptedOrigin::new(vec![response(
            200,
            &[
                ("date", http_date(Utc::now())),
                ("cache-control", "max-age=600".into()),
            ],
            b"image",
        )]);
        let transport = CachingTransport::new(origin.clone(), Arc::new(MemoryCache::new(1 << 20)));

        let first = transport.round_trip(get("http://origin.test/a.jpg")).await.unwrap();
        assert!(!first.headers().contains_key(X_FROM_CACHE));

        let second = transport.round_trip(get("http://origin.test/a.jpg")).await.unwrap();
        assert_eq!(second.headers()[X_FROM_CACHE], "1");
        assert_eq!(second.body().as_ref(), b"image");
        assert_eq!(origin.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fragment_is_part_of_key() {
        let origin = ScriptedOrigin::new(vec![
            response(200, &[("date", http_date(Utc::now())), ("cache-control", "max-age=600".into())], b"plain"),
            response(200, &[("date", http_date(Utc::now())), ("cache-control", "max-age=600".into())], b"variant"),
        ]);
        let transport = CachingTransport::new(origin.clone(), Arc::new(MemoryCache::new(1 << 20)));

        transport.round_trip(get("http://origin.test/a.jpg")).await.unwrap();
        let variant = transport.round_trip(get("http://origin.test/a.jpg#100x100")).await.unwrap();
        assert_eq!(variant.body().as_ref(), b"variant");
        assert_eq!(origin.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_response_revalidated() {
        let origin = ScriptedOrigin::new(vec![
            response(200, &[("etag", "\"v1\"".into())], b"image"),
            response(304, &[("cache-control", "max-age=0".into())], b""),
        ]);
        let transport = CachingTransport::new(origin.clone(), Arc::new(MemoryCache::new(1 << 20)));

        transport.round_trip(get("http://origin.test/a.jpg")).await.unwrap();
        let revalidated = transport.round_trip(get("http://origin.test/a.jpg")).await.unwrap();

        assert_eq!(revalidated.status(), StatusCode::OK);
        assert_eq!(revalidated.body().as_ref(), b"image");
        assert_eq!(revalidated.headers()[X_FROM_CACHE], "1");
        assert_eq!(revalidated.headers()[CACHE_CONTROL], "max-age=0");

        let seen = origin.seen.lock().unwrap();
        assert_eq!(seen[1][IF_NONE_MATCH], "\"v1\"");
    }

    #[tokio::test]
    async fn test_no_store_and_errors_not_cached() {
        let cache = Arc::new(MemoryCache::new(1 << 20));
        let origin = ScriptedOrigin::new(vec![
            response(200, &[("cache-control", "no-store".into())], b"secret"),
            response(500, &[], b"boom"),
        ]);
        let transport = CachingTransport::new(origin, cache.clone());

        transport.round_trip(get("http://origin.test/a.jpg")).await.unwrap();
        assert!(cache.get("http://origin.test/a.jpg").is_none());

        transport.round_trip(get("http://origin.test/b.jpg")).await.unwrap();
        assert!(cache.get("http://origin.test/b.jpg").is_none());
    }
}
