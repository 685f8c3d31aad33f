//! Admin credential check
//!
//! Single shared-secret bearer-token comparison, constant time. Gates the
//! replay endpoints; replay trusts this credential instead of a webhook
//! signature.

use tracing::warn;

use crate::signature::constant_time_eq;

/// Configured admin API key
#[derive(Clone)]
pub struct AdminToken {
    secret: String,
}

impl AdminToken {
    /// Create from the configured admin API key
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verify an `Authorization` header value (`Bearer <token>`)
    pub fn verify_bearer(&self, header: Option<&str>) -> bool {
        let Some(header) = header else {
            warn!("Missing Authorization header on admin request");
            return false;
        };
        let Some(token) = header.strip_prefix("Bearer ") else {
            warn!("Malformed Authorization header on admin request");
            return false;
        };
        constant_time_eq(token.as_bytes(), self.secret.as_bytes())
    }
}
