//! Webhook body signing.
//!
//! Chain monitors sign the raw request body with a shared secret:
//!
//! ```text
//! X-Webhook-Signature: hex(HMAC-SHA256(raw_body, secret))
//! ```
//!
//! The receiver recomputes the digest over the exact bytes it received and
//! compares in constant time. Hex digits are accepted in either case.

use ring::hmac;

/// Header name carrying the hex-encoded HMAC signature.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("missing signature")]
    Missing,
    #[error("invalid hex encoding")]
    InvalidHex,
    #[error("invalid signature")]
    SignatureMismatch,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

/// Sign `body` with `key`, returning the lowercase hex digest.
pub fn sign_body(body: &[u8], key: &[u8]) -> String {
    let tag = hmac::sign(&hmac::Key::new(hmac::HMAC_SHA256, key), body);
    hex::encode(tag.as_ref())
}

/// Verify a hex signature over `body`.
///
/// Surrounding whitespace in the header value is ignored.
pub fn verify_body(body: &[u8], signature_hex: &str, key: &[u8]) -> Result<(), SignatureError> {
    let signature_hex = signature_hex.trim();
    if signature_hex.is_empty() {
        return Err(SignatureError::Missing);
    }
    let signature = hex::decode(signature_hex).map_err(|_| SignatureError::InvalidHex)?;
    hmac::verify(
        &hmac::Key::new(hmac::HMAC_SHA256, key),
        body,
        &signature,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"monitor-shared-secret";

    #[test]
    fn sign_then_verify() {
        let body = br#"{"event_id":"evt-1","network":"ETH"}"#;
        let sig = sign_body(body, SECRET);
        assert_eq!(sig.len(), 64);
        assert!(verify_body(body, &sig, SECRET).is_ok());
    }

    #[test]
    fn uppercase_hex_is_accepted() {
        let body = b"payload";
        let sig = sign_body(body, SECRET).to_uppercase();
        assert!(verify_body(body, &sig, SECRET).is_ok());
    }

    #[test]
    fn tampered_body_is_rejected() {
        let sig = sign_body(b"confirmations=3", SECRET);
        let err = verify_body(b"confirmations=4", &sig, SECRET).unwrap_err();
        assert!(matches!(err, SignatureError::SignatureMismatch));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let sig = sign_body(b"payload", b"other-secret");
        assert!(matches!(
            verify_body(b"payload", &sig, SECRET),
            Err(SignatureError::SignatureMismatch)
        ));
    }

    #[test]
    fn non_hex_signature_is_rejected() {
        assert!(matches!(
            verify_body(b"payload", "not-a-hex-digest", SECRET),
            Err(SignatureError::InvalidHex)
        ));
    }

    #[test]
    fn empty_signature_is_missing() {
        assert!(matches!(
            verify_body(b"payload", "  ", SECRET),
            Err(SignatureError::Missing)
        ));
    }

    #[test]
    fn truncated_signature_is_rejected() {
        let sig = sign_body(b"payload", SECRET);
        assert!(verify_body(b"payload", &sig[..32], SECRET).is_err());
    }
}
