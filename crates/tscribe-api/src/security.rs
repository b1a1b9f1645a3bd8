//! Worker callback authentication.
//!
//! The worker signs the raw request body with HMAC-SHA256 using a shared
//! secret and sends the hex digest in `X-Webhook-Signature`. The body must
//! not be parsed before [`WebhookVerifier::verify`] succeeds.

use std::fmt;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the callback signature.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Missing webhook signature")]
    Missing,

    #[error("Invalid webhook signature")]
    Malformed,

    #[error("Invalid webhook signature")]
    Mismatch,

    /// No secret is configured, so nothing can be authenticated.
    #[error("Webhook secret is not configured")]
    NotConfigured,
}

/// Verifies callback signatures against the shared secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Arc<[u8]>,
}

impl fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl WebhookVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.secret.is_empty()
    }

    fn mac(&self) -> Result<HmacSha256, SignatureError> {
        if !self.is_configured() {
            return Err(SignatureError::NotConfigured);
        }
        HmacSha256::new_from_slice(&self.secret).map_err(|_| SignatureError::NotConfigured)
    }

    /// Check `signature` (hex, either case) against the body.
    ///
    /// The digest comparison is constant-time.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<(), SignatureError> {
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SignatureError::Missing)?;

        let mut mac = self.mac()?;

        let provided = hex::decode(signature).map_err(|_| SignatureError::Malformed)?;

        mac.update(body);
        mac.verify_slice(&provided)
            .map_err(|_| SignatureError::Mismatch)
    }

    /// Lowercase hex signature for `body`, as the worker computes it.
    pub fn sign(&self, body: &[u8]) -> Result<String, SignatureError> {
        let mut mac = self.mac()?;
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}
