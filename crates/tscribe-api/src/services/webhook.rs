//! Worker callback ingestion.

use std::sync::Arc;

use tracing::{info, warn};

use tscribe_models::{Job, WebhookPayload};
use tscribe_store::JobStore;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::security::WebhookVerifier;

const MISSING_FIELDS: &str = "Missing required fields: job_id, status";

#[derive(Clone)]
pub struct WebhookService {
    store: Arc<dyn JobStore>,
    verifier: WebhookVerifier,
}

impl WebhookService {
    pub fn new(store: Arc<dyn JobStore>, verifier: WebhookVerifier) -> Self {
        Self { store, verifier }
    }

    /// Authenticate and apply a worker callback.
    ///
    /// Order matters: signature, then parse, then existence, then transition
    /// validation. Nothing is read from or written to the store for a callback
    /// that fails the signature check.
    pub async fn ingest(&self, signature: Option<&str>, body: &[u8]) -> ApiResult<Job> {
        let result = self.process(signature, body).await;

        let outcome = match &result {
            Ok(_) => "applied",
            Err(e) => e.code(),
        };
        metrics::record_webhook(outcome);

        result
    }

    async fn process(&self, signature: Option<&str>, body: &[u8]) -> ApiResult<Job> {
        if let Err(e) = self.verifier.verify(body, signature) {
            warn!(error = %e, "Rejected webhook");
            return Err(ApiError::webhook_invalid(e.to_string()));
        }

        let payload: WebhookPayload =
            serde_json::from_slice(body).map_err(|_| ApiError::invalid_url(MISSING_FIELDS))?;
        if payload.job_id.trim().is_empty() || payload.status.trim().is_empty() {
            return Err(ApiError::invalid_url(MISSING_FIELDS));
        }

        let job_id = payload.job_id();
        if self.store.get(&job_id).await?.is_none() {
            warn!(job_id = %job_id, "Webhook for unknown job");
            return Err(ApiError::not_found("Job not found"));
        }

        let transition = payload.transition()?;
        let job = self.store.apply_transition(&job_id, transition).await?;

        info!(job_id = %job.id, status = %job.status, "Job updated from webhook");
        Ok(job)
    }
}
