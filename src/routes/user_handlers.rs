use axum::{
    Json, debug_handler,
    extract::{Multipart, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

use super::{ApiResponse, extract::AppJson, form::UploadForm};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    media::MediaKind,
    repository::{ApplicationView, JobApplication, NewApplication, User},
    state::AppState,
};

pub fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(user_data))
        .routes(routes!(apply_for_job))
        .routes(routes!(user_applications))
        .routes(routes!(update_resume))
}

async fn synced_user(state: &AppState, user: &AuthUser) -> AppResult<User> {
    state
        .repository
        .find_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

#[derive(ToSchema, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    #[serde(alias = "job_id")]
    pub job_id: Uuid,
}

/// The caller's synced profile
#[debug_handler]
#[utoipa::path(
    get,
    tag = "users",
    path = "/user",
    responses(
        (status = OK, body = ApiResponse<User>),
        (status = NOT_FOUND, description = "User not synced yet"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn user_data(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    Ok(ApiResponse::ok(synced_user(&state, &user).await?))
}

/// Apply to a visible job
#[debug_handler]
#[utoipa::path(
    post,
    tag = "users",
    path = "/apply",
    request_body = ApplyRequest,
    responses(
        (status = CREATED, body = ApiResponse<JobApplication>),
        (status = NOT_FOUND, description = "Unknown user or job"),
        (status = CONFLICT, description = "Already applied"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn apply_for_job(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(request): AppJson<ApplyRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<JobApplication>>)> {
    let applicant = synced_user(&state, &user).await?;
    let listing = state
        .repository
        .find_job(request.job_id)
        .await?
        .filter(|listing| listing.job.visible)
        .ok_or_else(|| AppError::not_found("Job not found"))?;

    let application = state
        .repository
        .insert_application(NewApplication {
            user_id: applicant.id,
            company_id: listing.job.company_id,
            job_id: listing.job.id,
        })
        .await?
        .ok_or_else(|| AppError::Conflict("Already applied".to_string()))?;

    info!(application_id = %application.id, job_id = %application.job_id, "Application submitted");
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Applied successfully", application),
    ))
}

/// The caller's applications, newest first
#[debug_handler]
#[utoipa::path(
    get,
    tag = "users",
    path = "/applications",
    responses((status = OK, body = ApiResponse<Vec<ApplicationView>>)),
    security(("bearer_auth" = []))
)]
pub async fn user_applications(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<ApplicationView>>>> {
    Ok(ApiResponse::ok(
        state.repository.list_user_applications(&user.user_id).await?,
    ))
}

/// Upload a resume and attach it to the caller's profile
///
/// Multipart field: `resume`.
#[debug_handler]
#[utoipa::path(
    post,
    tag = "users",
    path = "/update-resume",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = OK, body = ApiResponse<User>),
        (status = BAD_REQUEST, description = "Missing resume file"),
        (status = NOT_FOUND, description = "User not synced yet"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_resume(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<User>>> {
    let mut form = UploadForm::read(multipart).await?;
    let resume = form.take_file("resume")?;
    synced_user(&state, &user).await?;

    let stored = state.media.upload(resume.into_upload(MediaKind::Raw)).await?;
    let updated = state
        .repository
        .set_user_resume(&user.user_id, &stored.url)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    info!(user_id = %updated.id, "Resume updated");
    Ok(ApiResponse::with_message("Resume updated", updated))
}
