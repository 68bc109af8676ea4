//! HMAC-SHA256 webhook signature verification for the opaque payment
//! Gateway contract (`spec.md` §6: `verifyWebhookSignature(rawBody, sig,
//! secret)`).

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Returns whether `signature_hex` is the correct HMAC-SHA256 of
/// `raw_body` under `secret`, encoded as lowercase hex.
pub fn verify_webhook_signature(raw_body: &[u8], signature_hex: &str, secret: &[u8]) -> bool {
    let Ok(signature_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(raw_body);
    mac.verify_slice(&signature_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(body: &[u8], secret: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn verifies_correctly_signed_payload() {
        let secret = b"gateway-secret";
        let body = br#"{"event":"payment.captured"}"#;
        let sig = sign(body, secret);
        assert!(verify_webhook_signature(body, &sig, secret));
    }

    #[test]
    fn rejects_tampered_payload() {
        let secret = b"gateway-secret";
        let body = br#"{"event":"payment.captured"}"#;
        let sig = sign(body, secret);
        let tampered = br#"{"event":"payment.refunded"}"#;
        assert!(!verify_webhook_signature(tampered, &sig, secret));
    }

    #[test]
    fn rejects_malformed_signature() {
        assert!(!verify_webhook_signature(b"body", "not-hex!!", b"secret"));
    }
}
