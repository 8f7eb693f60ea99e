use crate::{error::ApiError, state::AppState};
use axum::{
    extract::{Path, State},
    Json,
};
use jobs::JobStatus;
use serde::Serialize;
use types::OptimizationResult;
use utoipa::ToSchema;

fn not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("job {id} not found"))
}

#[utoipa::path(
        get,
        path = "/v1/jobs/{id}",
        params(("id" = String, Path, description = "Job ID")),
        responses(
            (status = 200, description = "Job status", body = JobStatus),
            (status = 404, description = "Unknown job")
        )
    )]
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobStatus>, ApiError> {
    state.jobs.get(&id).map(Json).ok_or_else(|| not_found(&id))
}

#[utoipa::path(
        get,
        path = "/v1/jobs/{id}/result",
        params(("id" = String, Path, description = "Job ID")),
        responses(
            (status = 200, description = "Generation result", body = OptimizationResult),
            (status = 404, description = "Unknown job"),
            (status = 409, description = "Job has no result (yet)")
        )
    )]
pub async fn result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OptimizationResult>, ApiError> {
    match state.jobs.get(&id) {
        Some(JobStatus::Done { result }) => Ok(Json(result)),
        Some(JobStatus::Failed { message }) => {
            Err(ApiError::Conflict(format!("job {id} failed: {message}")))
        }
        Some(_) => Err(ApiError::Conflict(format!("job {id} has no result"))),
        None => Err(not_found(&id)),
    }
}

#[derive(Serialize, ToSchema)]
pub struct Cancelled {
    pub cancelled: bool,
}

#[utoipa::path(
        post,
        path = "/v1/jobs/{id}/cancel",
        params(("id" = String, Path, description = "Job ID")),
        responses(
            (status = 200, description = "Whether a running job was signalled", body = Cancelled),
            (status = 404, description = "Unknown job")
        )
    )]
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Cancelled>, ApiError> {
    let cancelled = state.jobs.cancel(&id).ok_or_else(|| not_found(&id))?;
    Ok(Json(Cancelled { cancelled }))
}
