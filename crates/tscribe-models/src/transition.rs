//! Job lifecycle transitions.
//!
//! `pending -> processing (optional) -> completed | failed`. Callbacks only
//! ever request a terminal state; `processing` is never written through
//! them. Nothing leaves a terminal state, and result/error fields are
//! written exactly once on the transition into their terminal state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::{now_seconds, Job, JobStatus};

/// Errors raised when a requested transition is not valid for a job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The payload is incomplete or the job cannot accept it in its current state.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// The target status is not one a callback may request.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
}

impl TransitionError {
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }

    pub fn invalid_status(msg: impl Into<String>) -> Self {
        Self::InvalidStatus(msg.into())
    }
}

pub type TransitionResult<T> = Result<T, TransitionError>;

/// Output references reported by the worker on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedResult {
    pub transcript_url: String,
    pub audio_url: String,
    pub srt_url: Option<String>,
    pub txt_url: Option<String>,
    pub video_title: Option<String>,
    pub video_duration: Option<f64>,
    pub processing_time: Option<f64>,
}

/// Failure report from the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    pub error_code: String,
    pub error_message: String,
    pub error_details: Option<serde_json::Value>,
}

/// A requested move into a terminal state, with its status-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Completed(CompletedResult),
    Failed(FailureReport),
}

impl Job {
    /// Validate `transition` against the current state and apply it in place.
    ///
    /// On error the job is left untouched.
    pub fn apply_transition(&mut self, transition: Transition) -> TransitionResult<()> {
        if self.status.is_terminal() {
            return Err(TransitionError::invalid_payload(format!(
                "job {} is already {}",
                self.id, self.status
            )));
        }

        match transition {
            Transition::Completed(result) => {
                if self.has_result() {
                    return Err(TransitionError::invalid_payload(format!(
                        "job {} already has results",
                        self.id
                    )));
                }
                if result.transcript_url.trim().is_empty() || result.audio_url.trim().is_empty() {
                    return Err(TransitionError::invalid_payload(
                        "completed callback requires transcript_url and audio_url",
                    ));
                }
                self.status = JobStatus::Completed;
                self.transcript_url = Some(result.transcript_url);
                self.audio_url = Some(result.audio_url);
                self.srt_url = result.srt_url;
                self.txt_url = result.txt_url;
                self.video_title = result.video_title;
                self.video_duration = result.video_duration;
                self.processing_time = result.processing_time;
            }
            Transition::Failed(report) => {
                if self.has_error() {
                    return Err(TransitionError::invalid_payload(format!(
                        "job {} already has an error recorded",
                        self.id
                    )));
                }
                if report.error_code.trim().is_empty() || report.error_message.trim().is_empty() {
                    return Err(TransitionError::invalid_payload(
                        "failed callback requires error_code and error_message",
                    ));
                }
                self.status = JobStatus::Failed;
                self.error_code = Some(report.error_code);
                self.error_message = Some(report.error_message);
                self.error_details = report.error_details;
            }
        }

        self.updated_at = now_seconds();
        Ok(())
    }
}
