use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

use super::ApiResponse;
use crate::{
    error::{AppError, AppResult},
    repository::JobListing,
    state::AppState,
};

pub fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_jobs))
        .routes(routes!(job_by_id))
}

/// All visible jobs, newest first
#[debug_handler]
#[utoipa::path(
    get,
    tag = "jobs",
    path = "/",
    responses((status = OK, body = ApiResponse<Vec<JobListing>>)),
    security(("bearer_auth" = []))
)]
pub async fn list_jobs(State(state): State<AppState>) -> AppResult<Json<ApiResponse<Vec<JobListing>>>> {
    Ok(ApiResponse::ok(state.repository.list_visible_jobs().await?))
}

/// A single job with its company
#[debug_handler]
#[utoipa::path(
    get,
    tag = "jobs",
    path = "/{id}",
    params(("id" = String, Path, description = "Job id")),
    responses(
        (status = OK, body = ApiResponse<JobListing>),
        (status = NOT_FOUND, description = "Unknown job"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn job_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<JobListing>>> {
    // a malformed id can never match, so it reads as not found
    let Ok(id) = id.parse::<Uuid>() else {
        return Err(AppError::not_found("Job not found"));
    };
    let job = state
        .repository
        .find_job(id)
        .await?
        .ok_or_else(|| AppError::not_found("Job not found"))?;
    Ok(ApiResponse::ok(job))
}
