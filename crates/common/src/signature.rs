//! Webhook payload signatures.
//!
//! Every outbound webhook body is signed with HMAC-SHA256 keyed by the tenant's
//! secret and sent as `X-PingFox-Signature: sha256=<hex digest>`. Receivers
//! recompute the MAC over the raw body bytes, so the bytes signed must be the
//! bytes sent.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "X-PingFox-Signature";

/// Scheme prefix of the signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

#[allow(clippy::expect_used)] // HMAC accepts any key size, this cannot fail
fn mac_for(secret: &str, payload: &[u8]) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    mac
}

/// Hex-encoded HMAC-SHA256 digest of `payload` under `secret`.
#[must_use]
pub fn signature_hex(payload: &[u8], secret: &str) -> String {
    hex::encode(mac_for(secret, payload).finalize().into_bytes())
}

/// Full signature header value (`sha256=<hex>`) for `payload`.
#[must_use]
pub fn sign(payload: &[u8], secret: &str) -> String {
    format!("{SIGNATURE_PREFIX}{}", signature_hex(payload, secret))
}

/// Verify a received signature header against `payload`.
///
/// The digest comparison is constant-time. A header without the `sha256=`
/// prefix, or whose digest is not valid hex, never verifies.
#[must_use]
pub fn verify(payload: &[u8], received_signature: &str, secret: &str) -> bool {
    let Some(hex_digest) = received_signature.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };

    mac_for(secret, payload).verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"id":"evt_1"}"#;

    #[test]
    fn test_known_vector() {
        assert_eq!(
            signature_hex(BODY, "s3cr3t"),
            "93b398b9ca62b21fe8c9a04b5fc3cb0b63f6bfa54334900bbc11785aef08f27d"
        );
        assert_eq!(
            sign(BODY, "s3cr3t"),
            "sha256=93b398b9ca62b21fe8c9a04b5fc3cb0b63f6bfa54334900bbc11785aef08f27d"
        );
    }

    #[test]
    fn test_sign_and_verify() {
        let header = sign(BODY, "supersecrettoken");
        assert!(verify(BODY, &header, "supersecrettoken"));
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let header = sign(BODY, "s3cr3t");
        assert!(!verify(BODY, &header, "s3cr3t-rotated"));
    }

    #[test]
    fn test_verify_rejects_any_altered_payload_byte() {
        let header = sign(BODY, "s3cr3t");
        for i in 0..BODY.len() {
            let mut tampered = BODY.to_vec();
            tampered[i] ^= 0x01;
            assert!(!verify(&tampered, &header, "s3cr3t"), "byte {i} altered");
        }
    }

    #[test]
    fn test_verify_rejects_any_altered_signature_char() {
        let header = sign(BODY, "s3cr3t");
        for i in SIGNATURE_PREFIX.len()..header.len() {
            let mut chars: Vec<char> = header.chars().collect();
            chars[i] = if chars[i] == '0' { '1' } else { '0' };
            let tampered: String = chars.into_iter().collect();
            assert!(!verify(BODY, &tampered, "s3cr3t"), "char {i} altered");
        }
    }

    #[test]
    fn test_verify_rejects_malformed_headers() {
        let digest = signature_hex(BODY, "s3cr3t");

        // Missing scheme prefix
        assert!(!verify(BODY, &digest, "s3cr3t"));
        // Wrong scheme
        assert!(!verify(BODY, &format!("sha1={digest}"), "s3cr3t"));
        // Not hex
        assert!(!verify(BODY, "sha256=zz", "s3cr3t"));
        // Truncated digest
        assert!(!verify(BODY, &format!("sha256={}", &digest[..32]), "s3cr3t"));
        assert!(!verify(BODY, "", "s3cr3t"));
    }

    #[test]
    fn test_empty_payload_round_trip() {
        let header = sign(b"", "s3cr3t");
        assert!(verify(b"", &header, "s3cr3t"));
    }
}
