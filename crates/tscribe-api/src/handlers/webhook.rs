//! Worker callback handler.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::security::SIGNATURE_HEADER;
use crate::state::AppState;

/// POST /api/webhook
///
/// The raw body is handed to the service untouched; it is only parsed after
/// the signature has been verified.
///
/// Returns:
/// - 200: Job updated
/// - 400: Malformed body, missing fields, or a transition the job cannot take
/// - 401: Missing or invalid signature
/// - 404: No such job
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ApiResponse<()>>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    state.webhooks.ingest(signature, &body).await?;

    Ok(Json(ApiResponse::message_only("Job updated successfully")))
}
