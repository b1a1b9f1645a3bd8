//! Shared data models for the tscribe job service.
//!
//! This crate provides Serde-serializable types for:
//! - Transcription jobs, their status and configuration
//! - Canonical video URLs
//! - Job lifecycle transitions driven by worker callbacks

pub mod job;
pub mod transition;
pub mod url;
pub mod webhook;

// Re-export common types
pub use job::{now_seconds, Job, JobId, JobStatus, Language, ModelSize, ParseEnumError};
pub use transition::{CompletedResult, FailureReport, Transition, TransitionError, TransitionResult};
pub use url::{normalize_video_url, CanonicalUrl, UrlError, UrlResult};
pub use webhook::{structured_details, WebhookPayload};
