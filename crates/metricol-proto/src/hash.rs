//! HMAC-SHA256 body signing.
//!
//! Signatures travel hex-encoded in the [`HASH_HEADER`](crate::HASH_HEADER)
//! header and cover the raw body bytes exactly as sent.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::Error;

type HmacSha256 = Hmac<Sha256>;

fn mac(key: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC can take key of any size")
}

/// Raw HMAC-SHA256 of `body` under `key`.
pub fn digest(key: &[u8], body: &[u8]) -> Vec<u8> {
    let mut mac = mac(key);
    mac.update(body);
    mac.finalize().into_bytes().to_vec()
}

/// Hex-encoded HMAC-SHA256 of `body` under `key`.
pub fn sign(key: &[u8], body: &[u8]) -> String {
    hex::encode(digest(key, body))
}

/// Check a hex-encoded signature, failing on malformed hex.
pub fn check(key: &[u8], body: &[u8], signature: &str) -> Result<bool, Error> {
    let expected =
        hex::decode(signature.trim()).map_err(|e| Error::MalformedSignature(e.to_string()))?;

    let mut mac = mac(key);
    mac.update(body);
    Ok(mac.verify_slice(&expected).is_ok())
}

/// Whether `signature` is the hex HMAC of `body`. Malformed hex never verifies.
pub fn verify(key: &[u8], body: &[u8], signature: &str) -> bool {
    check(key, body, signature).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2.
        let signature = sign(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            signature,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_tampered_body_fails() {
        let body = br#"[{"id":"a","type":"counter","delta":5}]"#;
        let signature = sign(b"key", body);
        assert!(verify(b"key", body, &signature));

        let tampered = br#"[{"id":"a","type":"counter","delta":6}]"#;
        assert!(!verify(b"key", tampered, &signature));
    }

    #[test]
    fn test_wrong_key_fails() {
        let signature = sign(b"key", b"body");
        assert!(!verify(b"other", b"body", &signature));
    }

    #[test]
    fn test_malformed_signature() {
        assert!(matches!(
            check(b"key", b"body", "not-hex"),
            Err(Error::MalformedSignature(_))
        ));
        assert!(!verify(b"key", b"body", "not-hex"));
    }
}
