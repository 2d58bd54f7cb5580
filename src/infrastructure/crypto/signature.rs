//! Message signing and token hashing
//!
//! - Webhook bodies are signed with HMAC-SHA256; receivers recompute the
//!   signature over the raw body with the shared secret.
//! - Refresh tokens are stored as SHA-256 hex digests; the token itself
//!   never touches the database.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// `sha256=<hex(HMAC-SHA256(secret, body))>` header value for a webhook body.
pub fn webhook_signature(secret: &str, body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(body.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Verify a received webhook signature against the raw body.
pub fn verify_webhook_signature(secret: &str, body: &str, signature: &str) -> bool {
    // Constant-time comparison via the Mac verifier.
    let Some(hex_part) = signature.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_part) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(body.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// SHA-256 hex digest of an opaque token.
pub fn token_hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trips() {
        let secret = "a-shared-secret-of-reasonable-length";
        let body = r#"{"event":"stop.completed","routeId":"r1"}"#;
        let signature = webhook_signature(secret, body);
        assert!(signature.starts_with("sha256="));
        assert!(verify_webhook_signature(secret, body, &signature));
    }

    #[test]
    fn signature_rejects_tampered_body_or_wrong_secret() {
        let secret = "a-shared-secret-of-reasonable-length";
        let body = r#"{"event":"stop.completed"}"#;
        let signature = webhook_signature(secret, body);
        assert!(!verify_webhook_signature(secret, r#"{"event":"stop.failed"}"#, &signature));
        assert!(!verify_webhook_signature("other-secret", body, &signature));
        assert!(!verify_webhook_signature(secret, body, "md5=abc"));
    }

    #[test]
    fn token_hash_is_stable_hex() {
        let a = token_hash("token-a");
        assert_eq!(a.len(), 64);
        assert_eq!(a, token_hash("token-a"));
        assert_ne!(a, token_hash("token-b"));
    }
}
