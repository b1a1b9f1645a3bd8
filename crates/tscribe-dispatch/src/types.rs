//! Wire types for the repository-dispatch call.

use serde::{Deserialize, Serialize};

use tscribe_models::{Job, JobId, Language, ModelSize};

/// Event name the worker workflow listens for.
pub const EVENT_TYPE: &str = "transcription_job";

/// Body POSTed to `/repos/{repo}/dispatches`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub event_type: String,
    pub client_payload: ClientPayload,
}

/// Everything the worker needs to process the job and call back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientPayload {
    pub job_id: JobId,
    pub video_url: String,
    pub model_size: ModelSize,
    pub language: Language,
    pub webhook_url: String,
}

impl DispatchRequest {
    /// Build the trigger for a freshly created job.
    pub fn for_job(job: &Job, webhook_url: impl Into<String>) -> Self {
        Self {
            event_type: EVENT_TYPE.to_string(),
            client_payload: ClientPayload {
                job_id: job.id.clone(),
                video_url: job.video_url.clone(),
                model_size: job.model_size,
                language: job.language.clone(),
                webhook_url: webhook_url.into(),
            },
        }
    }
}
