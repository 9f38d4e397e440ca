//! HTTP/1.x response wire codec.
//!
//! Cached responses and transformed responses are both stored as raw
//! response messages and decoded through [`parse_response`], so a
//! reconstructed response is indistinguishable from a fetched one.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH};
use http::{HeaderMap, Response, StatusCode, Version};

use super::{HttpResponse, TransportError};

const MAX_HEADERS: usize = 128;

/// Serialize a response. Header names are written in sorted order, so equal
/// inputs always produce identical bytes.
pub fn encode_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 512);

    out.extend_from_slice(b"HTTP/1.1 ");
    out.extend_from_slice(status.as_str().as_bytes());
    out.push(b' ');
    out.extend_from_slice(status.canonical_reason().unwrap_or("Unknown").as_bytes());
    out.extend_from_slice(b"\r\n");

    let mut names: Vec<&HeaderName> = headers.keys().collect();
    names.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    for name in names {
        for value in headers.get_all(name) {
            out.extend_from_slice(name.as_str().as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
    }

    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out
}

/// Serialize an existing response.
pub fn encode(response: &HttpResponse) -> Vec<u8> {
    encode_response(response.status(), response.headers(), response.body())
}

/// Parse a complete response message.
///
/// The body runs to `Content-Length` when present, otherwise to the end of
/// the input.
pub fn parse_response(wire: &[u8]) -> Result<HttpResponse, TransportError> {
    let mut storage = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Response::new(&mut storage);

    let header_len = match parsed.parse(wire) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => {
            return Err(TransportError::Malformed("incomplete response head".into()))
        }
        Err(e) => return Err(TransportError::Malformed(e.to_string())),
    };

    let code = parsed
        .code
        .ok_or_else(|| TransportError::Malformed("missing status code".into()))?;
    let status = StatusCode::from_u16(code)
        .map_err(|e| TransportError::Malformed(e.to_string()))?;
    let version = match parsed.version {
        Some(0) => Version::HTTP_10,
        _ => Version::HTTP_11,
    };

    let mut headers = HeaderMap::with_capacity(parsed.headers.len());
    for h in parsed.headers.iter() {
        let name = HeaderName::from_bytes(h.name.as_bytes())
            .map_err(|e| TransportError::Malformed(e.to_string()))?;
        let value = HeaderValue::from_bytes(h.value)
            .map_err(|e| TransportError::Malformed(e.to_string()))?;
        headers.append(name, value);
    }

    let rest = &wire[header_len..];
    let body = match headers.get(CONTENT_LENGTH) {
        Some(value) => {
            let len: usize = value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .ok_or_else(|| TransportError::Malformed("invalid Content-Length".into()))?;
            if rest.len() < len {
                return Err(TransportError::Malformed(format!(
                    "body shorter than Content-Length ({} < {})",
                    rest.len(),
                    len
                )));
            }
            &rest[..len]
        }
        None => rest,
    };

    let mut response = Response::new(Bytes::copy_from_slice(body));
    *response.status_mut() = status;
    *response.version_mut() = version;
    *response.headers_mut() = headers;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CONTENT_TYPE, ETAG};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_encode_is_deterministic() {
        let a = headers(&[("etag", "\"1\""), ("content-type", "image/png"), ("link", "<a>"), ("link", "<b>")]);
        let b = headers(&[("link", "<a>"), ("content-type", "image/png"), ("link", "<b>"), ("etag", "\"1\"")]);

        let wire_a = encode_response(StatusCode::OK, &a, b"body");
        let wire_b = encode_response(StatusCode::OK, &b, b"body");
        assert_eq!(wire_a, wire_b);
        assert_eq!(wire_a, encode_response(StatusCode::OK, &a, b"body"));
        assert_eq!(
            String::from_utf8(wire_a).unwrap(),
            "HTTP/1.1 200 OK\r\ncontent-type: image/png\r\netag: \"1\"\r\nlink: <a>\r\nlink: <b>\r\n\r\nbody"
        );
    }

    #[test]
    fn test_parse_round_trips_encoded_response() {
        let h = headers(&[("content-type", "image/png"), ("content-length", "4"), ("etag", "\"x\"")]);
        let wire = encode_response(StatusCode::NOT_FOUND, &h, b"data");

        let response = parse_response(&wire).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[CONTENT_TYPE], "image/png");
        assert_eq!(response.headers()[ETAG], "\"x\"");
        assert_eq!(response.body().as_ref(), b"data");
    }

    #[test]
    fn test_parse_respects_content_length() {
        let response = parse_response(b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\nabcdef").unwrap();
        assert_eq!(response.body().as_ref(), b"abc");
    }

    #[test]
    fn test_parse_without_content_length_reads_to_end() {
        let response = parse_response(b"HTTP/1.0 200 OK\r\n\r\nabcdef").unwrap();
        assert_eq!(response.version(), Version::HTTP_10);
        assert_eq!(response.body().as_ref(), b"abcdef");
    }

    #[test]
    fn test_parse_rejects_truncated_input() {
        assert!(parse_response(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc").is_err());
        assert!(parse_response(b"HTTP/1.1 200 OK\r\nContent-").is_err());
        assert!(parse_response(b"garbage").is_err());
    }

    #[test]
    fn test_binary_body_survives() {
        let body: Vec<u8> = (0..=255).collect();
        let wire = encode_response(StatusCode::OK, &HeaderMap::new(), &body);
        assert_eq!(parse_response(&wire).unwrap().body().as_ref(), body.as_slice());
    }
}
