//! Job submission, status and history handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tscribe_models::{Job, JobId, JobStatus, Language, ModelSize};
use tscribe_store::PageRequest;

use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::services::SubmitOutcome;
use crate::state::AppState;

// ============================================================================
// Types
// ============================================================================

/// Body of `POST /api/submit`. Enum fields are kept as strings so that bad
/// values produce our own error envelope instead of a deserializer rejection.
#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub model_size: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitJobData {
    pub job_id: JobId,
    pub status: JobStatus,
    pub created_at: i64,
}

impl From<&Job> for SubmitJobData {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            created_at: job.created_at.timestamp(),
        }
    }
}

/// Query of `GET /api/history`. Unparseable values fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub offset: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryData {
    pub jobs: Vec<Job>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/submit
///
/// Returns:
/// - 201: New job created (worker trigger fired in the background)
/// - 200: Existing job for the same video and model
/// - 400: Invalid URL, model size or language
/// - 500: Job could not be stored
pub async fn submit_job(
    State(state): State<AppState>,
    body: Result<Json<SubmitJobRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<SubmitJobData>>)> {
    let Json(request) = body
        .map_err(|e| ApiError::invalid_url(format!("Invalid request body: {}", e.body_text())))?;

    let video_url = request
        .video_url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::invalid_url("video_url is required"))?;

    let model_size = match request.model_size.as_deref() {
        None => ModelSize::default(),
        Some(raw) => raw.parse::<ModelSize>().map_err(|_| {
            let valid: Vec<&str> = ModelSize::ALL.iter().map(|m| m.as_str()).collect();
            ApiError::invalid_url(format!(
                "Invalid model_size. Must be one of: {}",
                valid.join(", ")
            ))
        })?,
    };

    let language = match request.language.as_deref() {
        None => Language::default(),
        Some(raw) => raw
            .parse::<Language>()
            .map_err(|_| {
                ApiError::invalid_url(
                    "Invalid language. Use \"auto\" or a language tag such as en or pt-BR",
                )
            })?,
    };

    let outcome = state.intake.submit(video_url, model_size, language).await?;

    let response = match &outcome {
        SubmitOutcome::Created(job) => (
            StatusCode::CREATED,
            Json(ApiResponse::ok(SubmitJobData::from(job))),
        ),
        SubmitOutcome::Recovered(job) => (
            StatusCode::OK,
            Json(
                ApiResponse::ok(SubmitJobData::from(job)).with_message("Job recovered from cache"),
            ),
        ),
    };

    Ok(response)
}

/// GET /api/status/:id
///
/// Returns:
/// - 200: Full job record
/// - 400: ID is not a job ID
/// - 404: No such job
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Job>>> {
    let job_id = JobId::parse(&id).ok_or_else(|| ApiError::invalid_url("Invalid job ID format"))?;

    let job = state
        .store
        .get(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    debug!(job_id = %job.id, status = %job.status, "Status lookup");
    Ok(Json(ApiResponse::ok(job)))
}

/// GET /api/history?limit=&offset=
///
/// Newest first. `limit` defaults to 20 and is clamped to 1..=100.
pub async fn get_job_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<ApiResponse<HistoryData>>> {
    let page = PageRequest::new(
        query.limit.as_deref().and_then(|s| s.trim().parse().ok()),
        query.offset.as_deref().and_then(|s| s.trim().parse().ok()),
    );

    let page = state.store.list(page).await?;

    Ok(Json(ApiResponse::ok(HistoryData {
        jobs: page.jobs,
        total: page.total,
        limit: page.limit,
        offset: page.offset,
    })))
}
