//! Job creation, queries, control and export.

use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use awbtrack::{results_to_csv, ControlAction, Job, JobId, PacingInterval, TrackingResult};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedJob {
    pub job_id: JobId,
}

#[derive(Debug, Deserialize)]
pub struct ControlRequest {
    pub action: ControlAction,
}

/// POST /api/jobs
///
/// Multipart form with a `file` part and an optional `pacing_ms` part.
/// Responds as soon as the job exists; processing continues in the
/// background.
pub async fn create_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<CreatedJob>> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut pacing_ms: Option<u64> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                upload = Some((filename, data.to_vec()));
            }
            Some("pacing_ms") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                let ms = text.trim().parse().map_err(|_| {
                    AppError::BadRequest(format!(
                        "pacing_ms must be a whole number of milliseconds, got '{}'",
                        text.trim()
                    ))
                })?;
                pacing_ms = Some(ms);
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("Missing 'file' part".to_string()))?;
    let pacing = PacingInterval::from_request(pacing_ms, state.config.engine.default_pacing());

    let job_id = state.engine.create_job(&filename, bytes, pacing).await?;
    tracing::info!(job_id, filename = %filename, %pacing, "Job submitted");
    Ok(Json(CreatedJob { job_id }))
}

/// GET /api/jobs
pub async fn list_jobs(State(state): State<AppState>) -> AppResult<Json<Vec<Job>>> {
    Ok(Json(state.engine.list_jobs().await?))
}

/// GET /api/jobs/{id}
pub async fn get_job(State(state): State<AppState>, Path(id): Path<JobId>) -> AppResult<Json<Job>> {
    Ok(Json(state.engine.get_job(id).await?))
}

/// GET /api/jobs/{id}/results
pub async fn list_results(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> AppResult<Json<Vec<TrackingResult>>> {
    Ok(Json(state.engine.results(id).await?))
}

/// GET /api/jobs/{id}/export
pub async fn export_results(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let results = state.engine.results(id).await?;
    let body = results_to_csv(&results)?;
    let disposition = format!("attachment; filename=\"job-{}-results.csv\"", id);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// POST /api/jobs/{id}/control
///
/// 404 for an unknown job, 409 when the action does not apply to the job's
/// current status.
pub async fn control_job(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
    Json(request): Json<ControlRequest>,
) -> AppResult<Json<Job>> {
    let job = state.engine.control(id, request.action).await?;
    Ok(Json(job))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/jobs", get(list_jobs).post(create_job))
        .route("/api/jobs/{id}", get(get_job))
        .route("/api/jobs/{id}/results", get(list_results))
        .route("/api/jobs/{id}/export", get(export_results))
        .route("/api/jobs/{id}/control", post(control_job))
}
