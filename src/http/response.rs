//! Response header projection.

use axum::http::{HeaderMap, HeaderName};
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG, EXPIRES, LAST_MODIFIED, LINK};

/// Headers forwarded on every image response, including 304s.
pub const VALIDATOR_HEADERS: [HeaderName; 5] = [CACHE_CONTROL, LAST_MODIFIED, EXPIRES, ETAG, LINK];

/// Headers forwarded only with a body.
pub const ENTITY_HEADERS: [HeaderName; 2] = [CONTENT_LENGTH, CONTENT_TYPE];

/// Append every value of each header in `names` from `src` to `dst`.
pub fn copy_headers(dst: &mut HeaderMap, src: &HeaderMap, names: &[HeaderName]) {
    for name in names {
        for value in src.get_all(name) {
            dst.append(name.clone(), value.clone());
        }
    }
}
