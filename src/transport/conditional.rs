//! Conditional request evaluation.

use chrono::{DateTime, FixedOffset};
use http::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use http::HeaderMap;

use super::header_str;

/// Whether a response with `response` validators should be answered with
/// 304 Not Modified for a request carrying `request` conditionals.
///
/// An `ETag` equal to `If-None-Match` wins. Otherwise `Last-Modified` must be
/// at or before `If-Modified-Since`. A missing or unparseable date on either
/// side means the full response is served.
pub fn should_serve_304(request: &HeaderMap, response: &HeaderMap) -> bool {
    if let Some(etag) = header_str(response, ETAG).filter(|e| !e.is_empty()) {
        if header_str(request, IF_NONE_MATCH) == Some(etag) {
            return true;
        }
    }

    let Some(last_modified) = header_str(response, LAST_MODIFIED).and_then(parse_http_date) else {
        return false;
    };
    let Some(if_modified_since) = header_str(request, IF_MODIFIED_SINCE).and_then(parse_http_date) else {
        return false;
    };

    last_modified <= if_modified_since
}

/// Parse an HTTP-date (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn parse_http_date(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(value.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(http::header::HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(k.clone(), HeaderValue::from_static(v));
        }
        map
    }

    const T1: &str = "Mon, 02 Jan 2006 15:04:05 GMT";
    const T2: &str = "Tue, 03 Jan 2006 15:04:05 GMT";

    #[test]
    fn test_etag_match() {
        let req = headers(&[(IF_NONE_MATCH, "\"abc\"")]);
        let resp = headers(&[(ETAG, "\"abc\"")]);
        assert!(should_serve_304(&req, &resp));

        let other = headers(&[(ETAG, "\"def\"")]);
        assert!(!should_serve_304(&req, &other));
    }

    #[test]
    fn test_etag_compared_verbatim() {
        let resp = headers(&[(ETAG, "\"abc\"")]);
        assert!(!should_serve_304(&headers(&[(IF_NONE_MATCH, "\"xyz\", \"abc\"")]), &resp));
        assert!(!should_serve_304(&headers(&[(IF_NONE_MATCH, "*")]), &resp));
        assert!(!should_serve_304(&headers(&[(IF_NONE_MATCH, "W/\"abc\"")]), &resp));
    }

    #[test]
    fn test_empty_headers() {
        assert!(!should_serve_304(&HeaderMap::new(), &HeaderMap::new()));
    }

    #[test]
    fn test_last_modified_before_or_equal() {
        let resp = headers(&[(LAST_MODIFIED, T1)]);
        assert!(should_serve_304(&headers(&[(IF_MODIFIED_SINCE, T2)]), &resp));
        assert!(should_serve_304(&headers(&[(IF_MODIFIED_SINCE, T1)]), &resp));
    }

    #[test]
    fn test_last_modified_after() {
        let resp = headers(&[(LAST_MODIFIED, T2)]);
        assert!(!should_serve_304(&headers(&[(IF_MODIFIED_SINCE, T1)]), &resp));
    }

    #[test]
    fn test_malformed_dates() {
        let resp = headers(&[(LAST_MODIFIED, "yesterday")]);
        assert!(!should_serve_304(&headers(&[(IF_MODIFIED_SINCE, T2)]), &resp));

        let resp = headers(&[(LAST_MODIFIED, T1)]);
        assert!(!should_serve_304(&headers(&[(IF_MODIFIED_SINCE, "soon")]), &resp));
    }

    #[test]
    fn test_etag_mismatch_falls_back_to_dates() {
        let req = headers(&[(IF_NONE_MATCH, "\"old\""), (IF_MODIFIED_SINCE, T2)]);
        let resp = headers(&[(ETAG, "\"new\""), (LAST_MODIFIED, T1)]);
        assert!(should_serve_304(&req, &resp));
    }
}
