use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domains::apps::{AppNameProvider, StaticNameProvider};
use crate::kernel::jobs::Job;
use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct SubmitJobRequest {
    /// Names to process instead of the installed-app listing.
    #[serde(default)]
    pub apps: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// Start a job. Returns immediately with its id.
///
/// An empty body processes the host's installed apps; `{"apps": [...]}`
/// processes the given names.
pub async fn submit_job_handler(
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SubmitJobResponse>), ApiError> {
    let request: SubmitJobRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SubmitJobRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))?
    };

    let provider: Arc<dyn AppNameProvider> = match request.apps {
        Some(apps) => Arc::new(StaticNameProvider::new(apps)),
        None => state.default_provider.clone(),
    };

    let job_id = state.jobs.submit(provider);
    Ok((StatusCode::ACCEPTED, Json(SubmitJobResponse { job_id })))
}

pub async fn list_jobs_handler(Extension(state): Extension<AppState>) -> Json<Vec<Job>> {
    Json(state.jobs.list())
}

pub async fn job_status_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let id = parse_job_id(&id)?;
    Ok(Json(state.jobs.status(id)?))
}

/// Download a completed job's archive.
pub async fn job_result_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_job_id(&id)?;
    let archive = state.jobs.fetch_result(id).await?;

    let disposition = format!("attachment; filename=\"{}\"", archive.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archive.bytes,
    )
        .into_response())
}

pub async fn discard_job_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = parse_job_id(&id)?;
    state.jobs.discard(id).await?;
    Ok(Json(StatusResponse { status: "ok" }))
}

/// Malformed ids cannot name a job, so they are reported as not found.
fn parse_job_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(format!("job {} not found", raw)))
}

