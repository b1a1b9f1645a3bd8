//! Job intake: normalize, dedup, create, then trigger the worker.

use std::sync::Arc;

use tracing::{error, info};

use tscribe_dispatch::{DispatchRequest, Dispatcher};
use tscribe_models::{CanonicalUrl, Job, Language, ModelSize};
use tscribe_store::{resolve_existing, CreateOutcome, DedupOutcome, JobStore, NewJob};

use crate::error::ApiResult;
use crate::metrics;

/// What a submission resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// A new job was created and dispatched.
    Created(Job),
    /// An existing live job covers this video and model.
    Recovered(Job),
}

impl SubmitOutcome {
    pub fn job(&self) -> &Job {
        match self {
            SubmitOutcome::Created(job) | SubmitOutcome::Recovered(job) => job,
        }
    }
}

#[derive(Clone)]
pub struct IntakeService {
    store: Arc<dyn JobStore>,
    dispatcher: Arc<dyn Dispatcher>,
    webhook_url: String,
}

impl IntakeService {
    pub fn new(
        store: Arc<dyn JobStore>,
        dispatcher: Arc<dyn Dispatcher>,
        webhook_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            webhook_url: webhook_url.into(),
        }
    }

    /// Submit a video for transcription.
    ///
    /// Returns the existing job when one is live for the same canonical URL
    /// and model; otherwise creates a pending job and fires the worker trigger
    /// without waiting for it.
    pub async fn submit(
        &self,
        video_url: &str,
        model_size: ModelSize,
        language: Language,
    ) -> ApiResult<SubmitOutcome> {
        let url = CanonicalUrl::parse(video_url)?;

        if let DedupOutcome::Recovered(job) =
            resolve_existing(self.store.as_ref(), &url, model_size).await
        {
            info!(job_id = %job.id, video_url = %url, "Job recovered from cache");
            metrics::record_job_recovered(model_size.as_str());
            return Ok(SubmitOutcome::Recovered(job));
        }

        let outcome = self
            .store
            .create(NewJob {
                video_url: url,
                model_size,
                language,
            })
            .await?;

        match outcome {
            CreateOutcome::Created(job) => {
                metrics::record_job_created(model_size.as_str());
                self.spawn_dispatch(&job);
                Ok(SubmitOutcome::Created(job))
            }
            CreateOutcome::Existing(job) => {
                metrics::record_job_recovered(model_size.as_str());
                Ok(SubmitOutcome::Recovered(job))
            }
        }
    }

    /// Fire the worker trigger in the background. Failures are logged and counted only.
    fn spawn_dispatch(&self, job: &Job) {
        let request = DispatchRequest::for_job(job, self.webhook_url.clone());
        let dispatcher = Arc::clone(&self.dispatcher);

        tokio::spawn(async move {
            if let Err(e) = dispatcher.dispatch(&request).await {
                error!(
                    job_id = %request.client_payload.job_id,
                    error = %e,
                    "Failed to trigger transcription worker"
                );
                metrics::record_dispatch_failure();
            }
        });
    }
}
