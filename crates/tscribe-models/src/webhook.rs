//! Worker callback payload.

use serde::{Deserialize, Serialize};

use crate::job::JobId;
use crate::transition::{CompletedResult, FailureReport, Transition, TransitionError, TransitionResult};

/// Body of a completion/failure callback, as sent by the transcription worker.
///
/// Status-specific fields are all optional at this level; [`WebhookPayload::transition`]
/// checks that the ones the requested status needs are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub job_id: String,

    pub status: String,

    #[serde(default, alias = "transcript_ref")]
    pub transcript_url: Option<String>,

    #[serde(default, alias = "audio_ref")]
    pub audio_url: Option<String>,

    #[serde(default, alias = "subtitle_ref")]
    pub srt_url: Option<String>,

    #[serde(default, alias = "text_ref")]
    pub txt_url: Option<String>,

    #[serde(default)]
    pub video_title: Option<String>,

    #[serde(default)]
    pub video_duration: Option<f64>,

    #[serde(default)]
    pub processing_time: Option<f64>,

    #[serde(default)]
    pub error_code: Option<String>,

    #[serde(default)]
    pub error_message: Option<String>,

    #[serde(default)]
    pub error_details: Option<serde_json::Value>,
}

impl WebhookPayload {
    pub fn job_id(&self) -> JobId {
        JobId::from_string(self.job_id.trim())
    }

    /// Build the transition this callback requests.
    pub fn transition(&self) -> TransitionResult<Transition> {
        match self.status.as_str() {
            "completed" => {
                let (transcript_url, audio_url) =
                    match (non_empty(&self.transcript_url), non_empty(&self.audio_url)) {
                        (Some(t), Some(a)) => (t, a),
                        _ => {
                            return Err(TransitionError::invalid_payload(
                                "completed callback requires transcript_url and audio_url",
                            ))
                        }
                    };
                Ok(Transition::Completed(CompletedResult {
                    transcript_url,
                    audio_url,
                    srt_url: non_empty(&self.srt_url),
                    txt_url: non_empty(&self.txt_url),
                    video_title: self.video_title.clone(),
                    video_duration: self.video_duration,
                    processing_time: self.processing_time,
                }))
            }
            "failed" => {
                let (error_code, error_message) =
                    match (non_empty(&self.error_code), non_empty(&self.error_message)) {
                        (Some(c), Some(m)) => (c, m),
                        _ => {
                            return Err(TransitionError::invalid_payload(
                                "failed callback requires error_code and error_message",
                            ))
                        }
                    };
                Ok(Transition::Failed(FailureReport {
                    error_code,
                    error_message,
                    error_details: self.error_details.clone().map(structured_details),
                }))
            }
            other => Err(TransitionError::invalid_status(format!(
                "'{}' is not a valid callback status. Must be \"completed\" or \"failed\"",
                other
            ))),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Keep structured details as-is; a string holding a JSON object or array is
/// decoded, any other string stays opaque.
pub fn structured_details(details: serde_json::Value) -> serde_json::Value {
    match details {
        serde_json::Value::String(raw) => match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(parsed @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => parsed,
            _ => serde_json::Value::String(raw),
        },
        other => other,
    }
}
