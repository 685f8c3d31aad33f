//! Webhook signature verification
//!
//! Each source has its own scheme. Both operate on the raw request bytes,
//! before any JSON parsing: re-serialized JSON would not match the
//! signature.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::error::ProcessError;

/// Accepted clock skew for Stripe's timestamped signatures (seconds)
const STRIPE_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Whether signature verification is enforced.
///
/// `Bypass` exists for local testing only. The service config refuses to
/// construct it when the deployment environment is production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMode {
    Enforce,
    Bypass,
}

/// Verifier for Stripe's signed-event scheme.
///
/// The `Stripe-Signature` header carries `t=<timestamp>,v1=<hex hmac>`;
/// the HMAC-SHA256 is computed over `"{timestamp}.{raw body}"` with the
/// shared webhook secret. Signatures older than the tolerance window are
/// rejected to limit replay of captured requests.
#[derive(Clone)]
pub struct StripeSignatureVerifier {
    secret: String,
}

impl StripeSignatureVerifier {
    /// Create a verifier with the shared webhook secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verify a raw body against a `Stripe-Signature` header value
    pub fn verify(&self, payload: &[u8], signature: &str) -> Result<(), ProcessError> {
        // Parse signature header: t=timestamp,v1=signature
        let mut timestamp: Option<&str> = None;
        let mut sig_v1: Option<&str> = None;

        for part in signature.split(',') {
            if let Some((key, value)) = part.split_once('=') {
                match key {
                    "t" => timestamp = Some(value),
                    "v1" => sig_v1 = Some(value),
                    _ => {}
                }
            }
        }

        let Some(timestamp) = timestamp else {
            warn!("Missing timestamp in Stripe signature header");
            return Err(ProcessError::InvalidSignature);
        };
        let Some(sig_v1) = sig_v1 else {
            warn!("Missing v1 signature in Stripe signature header");
            return Err(ProcessError::InvalidSignature);
        };

        let body = std::str::from_utf8(payload).map_err(|_| ProcessError::InvalidSignature)?;
        let signed_payload = format!("{timestamp}.{body}");

        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes())
            .map_err(|_| ProcessError::Internal("HMAC key error".to_string()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        if !constant_time_eq(sig_v1.as_bytes(), expected.as_bytes()) {
            warn!("Stripe webhook signature mismatch");
            return Err(ProcessError::InvalidSignature);
        }

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| ProcessError::InvalidSignature)?;
        let now = Utc::now().timestamp();
        if (now - ts).abs() > STRIPE_TIMESTAMP_TOLERANCE_SECS {
            warn!(timestamp = ts, now, "Stripe webhook timestamp outside tolerance");
            return Err(ProcessError::InvalidSignature);
        }

        Ok(())
    }
}

/// Generic HMAC-SHA256 verifier used for Invoice Ninja.
///
/// The `X-Ninja-Signature` header is the hex-encoded HMAC-SHA256 of the
/// raw body. A missing secret or missing header is a verification
/// failure, never "verification skipped".
#[derive(Clone)]
pub struct NinjaSignatureVerifier {
    secret: Option<String>,
}

impl NinjaSignatureVerifier {
    /// Create a verifier; `None` means the secret is unconfigured and all
    /// verification fails
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    /// Verify a raw body against an `X-Ninja-Signature` header value
    pub fn verify(&self, payload: &[u8], signature: Option<&str>) -> Result<(), ProcessError> {
        let Some(secret) = self.secret.as_deref() else {
            warn!("Invoice Ninja webhook secret not configured");
            return Err(ProcessError::InvalidSignature);
        };
        let Some(signature) = signature else {
            warn!("Missing X-Ninja-Signature header");
            return Err(ProcessError::InvalidSignature);
        };

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .map_err(|_| ProcessError::Internal("HMAC key error".to_string()))?;
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());

        if !constant_time_eq(signature.as_bytes(), expected.as_bytes()) {
            warn!("Invoice Ninja webhook signature mismatch");
            return Err(ProcessError::InvalidSignature);
        }

        Ok(())
    }
}

/// Constant-time comparison
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_stripe(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let signed = format!("{}.{}", timestamp, std::str::from_utf8(payload).unwrap());
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed.as_bytes());
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    fn sign_ninja(payload: &[u8], secret: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn stripe_accepts_valid_signature() {
        let verifier = StripeSignatureVerifier::new("whsec_test");
        let body = br#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;
        let sig = sign_stripe(body, "whsec_test", Utc::now().timestamp());
        assert!(verifier.verify(body, &sig).is_ok());
    }

    #[test]
    fn stripe_rejects_wrong_secret() {
        let verifier = StripeSignatureVerifier::new("whsec_test");
        let body = br#"{"id":"evt_1"}"#;
        let sig = sign_stripe(body, "whsec_other", Utc::now().timestamp());
        assert!(matches!(
            verifier.verify(body, &sig),
            Err(ProcessError::InvalidSignature)
        ));
    }

    #[test]
    fn stripe_rejects_tampered_body() {
        let verifier = StripeSignatureVerifier::new("whsec_test");
        let sig = sign_stripe(br#"{"amount":100}"#, "whsec_test", Utc::now().timestamp());
        assert!(verifier.verify(br#"{"amount":999}"#, &sig).is_err());
    }

    #[test]
    fn stripe_rejects_stale_timestamp() {
        let verifier = StripeSignatureVerifier::new("whsec_test");
        let body = br#"{"id":"evt_1"}"#;
        let sig = sign_stripe(body, "whsec_test", Utc::now().timestamp() - 600);
        assert!(verifier.verify(body, &sig).is_err());
    }

    #[test]
    fn stripe_rejects_missing_components() {
        let verifier = StripeSignatureVerifier::new("whsec_test");
        let body = b"{}";
        assert!(verifier.verify(body, "v1=abc").is_err());
        assert!(verifier.verify(body, "t=123").is_err());
        assert!(verifier.verify(body, "").is_err());
    }

    #[test]
    fn ninja_accepts_valid_signature() {
        let verifier = NinjaSignatureVerifier::new(Some("ninja_secret".to_string()));
        let body = br#"{"event":"payment.created"}"#;
        let sig = sign_ninja(body, "ninja_secret");
        assert!(verifier.verify(body, Some(&sig)).is_ok());
    }

    #[test]
    fn ninja_rejects_wrong_signature() {
        let verifier = NinjaSignatureVerifier::new(Some("ninja_secret".to_string()));
        let body = br#"{"event":"payment.created"}"#;
        let sig = sign_ninja(body, "other_secret");
        assert!(verifier.verify(body, Some(&sig)).is_err());
    }

    #[test]
    fn ninja_missing_secret_is_failure_not_skip() {
        let verifier = NinjaSignatureVerifier::new(None);
        let body = b"{}";
        let sig = sign_ninja(body, "anything");
        assert!(verifier.verify(body, Some(&sig)).is_err());
    }

    #[test]
    fn ninja_missing_header_is_failure() {
        let verifier = NinjaSignatureVerifier::new(Some("s".to_string()));
        assert!(verifier.verify(b"{}", None).is_err());
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq(b"abc123", b"abc123"));
        assert!(!constant_time_eq(b"abc123", b"abc124"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }
}
