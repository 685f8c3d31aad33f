//! Webhook security tests
//!
//! Signature verification and admin credential checks as exercised by the
//! service endpoints.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use opsdesk_webhook_core::{
    signature::constant_time_eq, AdminToken, NinjaSignatureVerifier, StripeSignatureVerifier,
};

/// Generate a valid Stripe webhook signature for testing
fn generate_stripe_signature(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let signed_payload = format!("{}.{}", timestamp, std::str::from_utf8(payload).unwrap());

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(signed_payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    format!("t={},v1={}", timestamp, signature)
}

/// Generate a webhook payload for testing
fn test_webhook_payload(event_type: &str) -> Vec<u8> {
    let payload = serde_json::json!({
        "id": "evt_test_123",
        "type": event_type,
        "created": Utc::now().timestamp(),
        "data": {
            "object": {
                "id": "pi_test_123",
                "amount": 250000,
                "currency": "usd",
                "created": Utc::now().timestamp(),
                "metadata": {
                    "invoice_id": "7b41e1c2-6f5a-4f9e-9a4e-0a6f5d1c2b3a"
                },
                "payment_method_types": ["card"]
            }
        }
    });
    serde_json::to_vec(&payload).unwrap()
}

#[test]
fn accepts_valid_stripe_signature() {
    let secret = "whsec_test_secret_key";
    let verifier = StripeSignatureVerifier::new(secret);
    let payload = test_webhook_payload("payment_intent.succeeded");
    let signature = generate_stripe_signature(&payload, secret, Utc::now().timestamp());

    assert!(verifier.verify(&payload, &signature).is_ok());
}

#[test]
fn rejects_signature_from_wrong_secret() {
    let verifier = StripeSignatureVerifier::new("whsec_test_secret_key");
    let payload = test_webhook_payload("payment_intent.succeeded");
    let signature = generate_stripe_signature(&payload, "whsec_attacker", Utc::now().timestamp());

    assert!(verifier.verify(&payload, &signature).is_err());
}

#[test]
fn rejects_tampered_payload() {
    let secret = "whsec_test_secret_key";
    let verifier = StripeSignatureVerifier::new(secret);
    let payload = test_webhook_payload("payment_intent.succeeded");
    let signature = generate_stripe_signature(&payload, secret, Utc::now().timestamp());

    let mut tampered = payload.clone();
    let pos = tampered.windows(6).position(|w| w == b"250000").unwrap();
    tampered[pos..pos + 6].copy_from_slice(b"999999");

    assert!(verifier.verify(&tampered, &signature).is_err());
}

#[test]
fn rejects_stale_timestamp() {
    // Reusing a captured signature fails once outside the tolerance window
    let secret = "whsec_test_secret_key";
    let verifier = StripeSignatureVerifier::new(secret);
    let payload = test_webhook_payload("payment_intent.succeeded");
    let old_timestamp = Utc::now().timestamp() - 600;
    let signature = generate_stripe_signature(&payload, secret, old_timestamp);

    assert!(verifier.verify(&payload, &signature).is_err());
}

#[test]
fn rejects_malformed_signature_headers() {
    let verifier = StripeSignatureVerifier::new("whsec_test_secret_key");
    let payload = test_webhook_payload("payment_intent.succeeded");

    for bad in ["v1=abc123", "t=1234567890", "", "invalid_format"] {
        assert!(verifier.verify(&payload, bad).is_err(), "accepted {bad:?}");
    }
}

#[test]
fn ninja_hmac_verification_roundtrip() {
    let secret = "ninja_test_secret";
    let verifier = NinjaSignatureVerifier::new(Some(secret.to_string()));
    let payload = br#"{"event":"payment.created"}"#;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload);
    let signature = hex::encode(mac.finalize().into_bytes());

    assert!(verifier.verify(payload, Some(&signature)).is_ok());
    assert!(verifier.verify(payload, Some("deadbeef")).is_err());
    assert!(verifier.verify(payload, None).is_err());
}

#[test]
fn ninja_unconfigured_secret_rejects_everything() {
    let verifier = NinjaSignatureVerifier::new(None);
    assert!(verifier.verify(b"{}", Some("anything")).is_err());
}

#[test]
fn constant_time_comparison_basics() {
    assert!(constant_time_eq(b"abc123", b"abc123"));
    assert!(!constant_time_eq(b"abc123", b"abc124"));
    assert!(!constant_time_eq(b"abc", b"abcd"));
    assert!(constant_time_eq(b"", b""));
}

#[test]
fn admin_token_bearer_checks() {
    let admin = AdminToken::new("replay-admin-key");

    assert!(admin.verify_bearer(Some("Bearer replay-admin-key")));
    assert!(!admin.verify_bearer(Some("Bearer wrong-key")));
    assert!(!admin.verify_bearer(Some("replay-admin-key")));
    assert!(!admin.verify_bearer(Some("Basic replay-admin-key")));
    assert!(!admin.verify_bearer(None));
}
