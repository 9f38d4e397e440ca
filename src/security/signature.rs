//! HMAC-SHA256 request signatures.
//!
//! The signature covers the remote URL exactly as the proxy serializes it,
//! without options. Signatures travel in the options segment as URL-safe
//! base64; clients commonly drop the trailing `=` padding.

use base64::{
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
    Engine,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Compute the unpadded URL-safe signature for `url`.
pub fn sign(key: &[u8], url: &Url) -> String {
    URL_SAFE_NO_PAD.encode(mac_for(key, url).finalize().into_bytes())
}

/// Check `signature` against the expected HMAC of `url`.
///
/// Returns false on any decoding error or mismatch. The comparison is
/// constant-time.
pub fn verify(key: &[u8], url: &Url, signature: &str) -> bool {
    let mut padded = signature.to_string();
    let rem = padded.len() % 4;
    if rem != 0 {
        padded.push_str(&"=".repeat(4 - rem));
    }

    let decoded = match URL_SAFE.decode(padded.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(signature = %signature, error = %e, "Failed to decode signature");
            return false;
        }
    };

    mac_for(key, url).verify_slice(&decoded).is_ok()
}

fn mac_for(key: &[u8], url: &Url) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(url.as_str().as_bytes());
    mac
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let u = url("http://example.com/image.jpg");
        let sig = sign(b"secret", &u);
        assert!(verify(b"secret", &u, &sig));
    }

    #[test]
    fn test_tampered_url_fails() {
        let sig = sign(b"secret", &url("http://example.com/image.jpg"));
        assert!(!verify(b"secret", &url("http://example.com/image.png"), &sig));
        assert!(!verify(b"secret", &url("http://example.org/image.jpg"), &sig));
    }

    #[test]
    fn test_different_key_fails() {
        let u = url("http://example.com/image.jpg");
        let sig = sign(b"secret", &u);
        assert!(!verify(b"other", &u, &sig));
    }

    #[test]
    fn test_padding_is_optional() {
        let u = url("http://example.com/image.jpg");
        let unpadded = sign(b"secret", &u);
        // 32-byte MAC encodes to 43 chars, one pad char short
        assert_eq!(unpadded.len() % 4, 3);
        let padded = format!("{}=", unpadded);

        assert!(verify(b"secret", &u, &unpadded));
        assert!(verify(b"secret", &u, &padded));
    }

    #[test]
    fn test_malformed_signature() {
        let u = url("http://example.com/image.jpg");
        assert!(!verify(b"secret", &u, "not base64!"));
        assert!(!verify(b"secret", &u, ""));
    }
}
