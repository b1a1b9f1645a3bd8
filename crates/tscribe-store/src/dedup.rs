//! Dedup resolver.
//!
//! Looks up a live job for a (canonical URL, model size) key before intake
//! creates a new one. A lookup failure is never fatal: it is logged and
//! treated as a miss so submission can proceed.

use tracing::{debug, warn};

use tscribe_models::{CanonicalUrl, Job, ModelSize};

use crate::repo::JobStore;

/// Outcome of a dedup lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum DedupOutcome {
    /// A pending, processing or completed job already covers this key.
    Recovered(Job),
    /// Nothing to reuse (or the lookup failed).
    Miss,
}

/// Find the most recent non-failed job for `video_url` and `model_size`.
///
/// Matching is exact on the canonical string. Errors fail open to [`DedupOutcome::Miss`].
pub async fn resolve_existing(
    store: &dyn JobStore,
    video_url: &CanonicalUrl,
    model_size: ModelSize,
) -> DedupOutcome {
    match store.find_active(video_url, model_size).await {
        Ok(Some(job)) => {
            debug!(job_id = %job.id, status = %job.status, "Dedup hit");
            DedupOutcome::Recovered(job)
        }
        Ok(None) => DedupOutcome::Miss,
        Err(e) => {
            warn!(
                video_url = %video_url,
                model_size = %model_size,
                error = %e,
                "Dedup lookup failed, proceeding with new job"
            );
            DedupOutcome::Miss
        }
    }
}
