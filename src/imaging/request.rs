//! Parsing of inbound proxy requests.
//!
//! Options and the remote image URL are given in the request path as
//! `/{options}/{remote_url}`. Options may be omitted, so a path may simply
//! be `/{remote_url}`. The remote URL must resolve to an absolute http or
//! https URL, is not URL encoded, and takes the inbound query string.

use std::fmt;

use http::{HeaderMap, Uri};
use thiserror::Error;
use url::Url;

use super::options::Options;

/// A request that could not be turned into a remote image URL.
#[derive(Debug, Clone, Error)]
#[error("malformed URL {uri:?}: {message}")]
pub struct UrlError {
    pub message: String,
    pub uri: String,
}

impl UrlError {
    fn new(message: impl Into<String>, uri: &Uri) -> Self {
        Self {
            message: message.into(),
            uri: uri.to_string(),
        }
    }
}

/// An inbound request resolved to a remote image and transform options.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    /// Absolute URL of the remote image, without options.
    pub url: Url,

    /// Transformation options.
    pub options: Options,

    /// Headers of the inbound request (Referer, conditional headers).
    pub original_headers: HeaderMap,
}

impl ParsedRequest {
    /// Parse an inbound request target, resolving relative remote URLs
    /// against `base_url`.
    pub fn parse(uri: &Uri, headers: &HeaderMap, base_url: Option<&Url>) -> Result<Self, UrlError> {
        let path = uri.path().strip_prefix('/').unwrap_or(uri.path());

        let (target, options) = match Url::parse(&normalize_scheme(path)) {
            Ok(url) => (Target::Absolute(url), Options::default()),
            Err(_) => {
                let (opts, rest) = path
                    .split_once('/')
                    .ok_or_else(|| UrlError::new("too few path segments", uri))?;

                let target = parse_target(rest).map_err(|e| {
                    UrlError::new(format!("unable to parse remote URL: {}", e), uri)
                })?;
                (target, Options::parse(opts))
            }
        };

        let mut url = match (target, base_url) {
            (Target::Absolute(url), _) => url,
            (Target::Relative(rel), Some(base)) => base.join(&rel).map_err(|e| {
                UrlError::new(format!("unable to parse remote URL: {}", e), uri)
            })?,
            (Target::Relative(_), None) => {
                return Err(UrlError::new("must provide absolute remote URL", uri))
            }
        };

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(UrlError::new("remote URL must have http or https scheme", uri));
        }

        // query string is always part of the remote URL
        url.set_query(uri.query());
        url.set_fragment(None);

        Ok(Self {
            url,
            options,
            original_headers: headers.clone(),
        })
    }

    /// The URL used to fetch this request through the transport stack: the
    /// remote URL with serialized options as its fragment.
    pub fn fetch_url(&self) -> Url {
        let mut url = self.url.clone();
        let options = self.options.to_string();
        if !options.is_empty() {
            url.set_fragment(Some(&options));
        }
        url
    }
}

impl fmt::Display for ParsedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.fetch_url().as_str())
    }
}

enum Target {
    Absolute(Url),
    Relative(String),
}

fn parse_target(s: &str) -> Result<Target, url::ParseError> {
    let normalized = normalize_scheme(s);
    match Url::parse(&normalized) {
        Ok(url) => Ok(Target::Absolute(url)),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Target::Relative(normalized)),
        Err(e) => Err(e),
    }
}

/// Restore `scheme://host` for remote URLs whose slashes were collapsed by
/// path cleaning or a front end web server (`http:/host`, `https:host`).
fn normalize_scheme(s: &str) -> String {
    for scheme in ["https:", "http:"] {
        if let Some(rest) = s.strip_prefix(scheme) {
            let host = rest.trim_start_matches('/');
            if !host.is_empty() {
                return format!("{}//{}", scheme, host);
            }
        }
    }
    s.to_string()
}
