//! Transcription job record and its configuration enums.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error returned when a stored or submitted enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID (UUID v4, OS-backed CSPRNG).
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string without validation.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Parse a caller-supplied ID, accepting only the UUID format we issue.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim())
            .ok()
            .map(|u| Self(u.hyphenated().to_string()))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, waiting for the worker
    #[default]
    Pending,
    /// Worker reported it has started
    Processing,
    /// Transcript is available
    Completed,
    /// Worker reported a failure
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more transitions allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(ParseEnumError::new("status", other)),
        }
    }
}

/// Whisper model size requested for the transcription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ModelSize {
    #[serde(rename = "tiny")]
    Tiny,
    #[serde(rename = "base")]
    Base,
    #[serde(rename = "small")]
    Small,
    #[default]
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "large-v3")]
    LargeV3,
}

impl ModelSize {
    pub const ALL: [ModelSize; 5] = [
        ModelSize::Tiny,
        ModelSize::Base,
        ModelSize::Small,
        ModelSize::Medium,
        ModelSize::LargeV3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::LargeV3 => "large-v3",
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModelSize {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("model_size", s))
    }
}

/// Longest language tag accepted from callers.
pub const MAX_LANGUAGE_LEN: usize = 35;

/// Spoken language hint passed through to the worker.
///
/// Any short tag made of ASCII letters and `-` is accepted (`en`, `pt`,
/// `en-US`); `auto` lets the model detect the language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

impl Language {
    pub const AUTO: &'static str = "auto";

    pub fn auto() -> Self {
        Self(Self::AUTO.to_string())
    }

    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        let tag = s.trim();
        let valid = !tag.is_empty()
            && tag.len() <= MAX_LANGUAGE_LEN
            && tag.chars().all(|c| c.is_ascii_alphabetic() || c == '-');
        if valid {
            Ok(Self(tag.to_string()))
        } else {
            Err(ParseEnumError::new("language", s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::auto()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Language {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Language {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.0
    }
}

/// A transcription job as stored and as returned by the status endpoint.
///
/// Timestamps serialize as Unix seconds. Result fields are only present on
/// completed jobs and error fields only on failed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,

    /// Canonical video URL (always normalized)
    pub video_url: String,

    pub model_size: ModelSize,

    pub language: Language,

    pub status: JobStatus,

    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srt_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txt_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,

    /// Source video length in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_duration: Option<f64>,

    /// Worker wall-clock time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Structured worker diagnostics, or the raw string when it was not JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<serde_json::Value>,
}

impl Job {
    /// Create a new pending job.
    pub fn new(video_url: impl Into<String>, model_size: ModelSize, language: Language) -> Self {
        let now = now_seconds();
        Self {
            id: JobId::new(),
            video_url: video_url.into(),
            model_size,
            language,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            transcript_url: None,
            audio_url: None,
            srt_url: None,
            txt_url: None,
            video_title: None,
            video_duration: None,
            processing_time: None,
            error_code: None,
            error_message: None,
            error_details: None,
        }
    }

    /// True if any completion field has been written.
    pub fn has_result(&self) -> bool {
        self.transcript_url.is_some()
            || self.audio_url.is_some()
            || self.srt_url.is_some()
            || self.txt_url.is_some()
            || self.video_title.is_some()
            || self.video_duration.is_some()
            || self.processing_time.is_some()
    }

    /// True if any failure field has been written.
    pub fn has_error(&self) -> bool {
        self.error_code.is_some() || self.error_message.is_some() || self.error_details.is_some()
    }
}

/// Current time truncated to whole seconds, the resolution jobs are stored at.
pub fn now_seconds() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now)
}
