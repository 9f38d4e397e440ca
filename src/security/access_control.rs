//! Access policy for proxied images.
//!
//! Policy, evaluated in order:
//! 1. A configured referrer list must match the `Referer` host, otherwise deny.
//! 2. No host whitelist and no signing key: allow everything.
//! 3. Target host on the whitelist: allow.
//! 4. Valid signature for the target URL: allow.
//! 5. Deny.

use http::header::REFERER;
use thiserror::Error;
use url::Url;

use crate::imaging::ParsedRequest;
use crate::security::signature;

/// Static access settings shared by all requests.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    /// Allowed remote hosts (`host` or `*.suffix`).
    pub whitelist: Vec<String>,
    /// Allowed referring hosts.
    pub referrers: Vec<String>,
    /// HMAC key; empty disables signatures.
    pub signature_key: Vec<u8>,
}

/// Why a request was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("request does not contain an allowed referrer: {0}")]
    Referrer(String),

    #[error("request does not contain an allowed host or valid signature: {0}")]
    HostOrSignature(String),
}

/// Determine whether `req` is allowed under `policy`.
pub fn allowed(req: &ParsedRequest, policy: &AccessPolicy) -> Result<(), AccessDenied> {
    if !policy.referrers.is_empty() && !valid_referrer(&policy.referrers, req) {
        return Err(AccessDenied::Referrer(req.to_string()));
    }

    if policy.whitelist.is_empty() && policy.signature_key.is_empty() {
        return Ok(()); // no whitelist or signature key, all requests accepted
    }

    if !policy.whitelist.is_empty() && valid_host(&policy.whitelist, &req.url) {
        return Ok(());
    }

    if !policy.signature_key.is_empty()
        && signature::verify(&policy.signature_key, &req.url, &req.options.signature)
    {
        return Ok(());
    }

    Err(AccessDenied::HostOrSignature(req.to_string()))
}

/// Whether the host of `url` matches one of `hosts`.
///
/// An explicit port is part of the host, so `example.com` does not match
/// `example.com:8443`.
pub fn valid_host(hosts: &[String], url: &Url) -> bool {
    let host = match (url.host_str(), url.port()) {
        (Some(name), Some(port)) => format!("{name}:{port}"),
        (Some(name), None) => name.to_string(),
        (None, _) => return false,
    };

    hosts.iter().any(|pattern| {
        if host == *pattern {
            return true;
        }
        match pattern.strip_prefix("*.") {
            Some(suffix) => host
                .strip_suffix(suffix)
                .is_some_and(|prefix| prefix.ends_with('.')),
            None => false,
        }
    })
}

/// Whether the request's `Referer` header names an allowed host.
/// A missing or malformed header is never allowed.
fn valid_referrer(hosts: &[String], req: &ParsedRequest) -> bool {
    req.original_headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Url::parse(v).ok())
        .is_some_and(|u| valid_host(hosts, &u))
}
