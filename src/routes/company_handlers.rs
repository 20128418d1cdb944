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
    repository::{
        ApplicantView, ApplicationStatus, Company, CompanyJob, Job, NewCompany, NewJob,
    },
    state::AppState,
};

pub fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(register_company))
        .routes(routes!(company_data))
        .routes(routes!(post_job))
        .routes(routes!(list_company_jobs))
        .routes(routes!(company_applicants))
        .routes(routes!(change_application_status))
        .routes(routes!(change_job_visibility))
}

async fn owned_company(state: &AppState, user: &AuthUser) -> AppResult<Company> {
    state
        .repository
        .find_company_by_owner(&user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("No company registered for this account"))
}

/// Request body for posting a job
#[derive(ToSchema, Deserialize)]
pub struct PostJobRequest {
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: String,
    pub level: String,
    pub salary: i64,
}

impl PostJobRequest {
    fn into_new_job(self, company_id: Uuid) -> AppResult<NewJob> {
        let required = [
            ("title", &self.title),
            ("description", &self.description),
            ("location", &self.location),
            ("category", &self.category),
            ("level", &self.level),
        ];
        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(AppError::bad_request(format!("Missing field: {name}")));
        }
        if self.salary < 0 {
            return Err(AppError::bad_request("Salary must not be negative"));
        }
        Ok(NewJob {
            company_id,
            title: self.title.trim().to_string(),
            description: self.description,
            location: self.location.trim().to_string(),
            category: self.category.trim().to_string(),
            level: self.level.trim().to_string(),
            salary: self.salary,
        })
    }
}

#[derive(ToSchema, Deserialize)]
pub struct ChangeStatusRequest {
    /// Application id
    pub id: Uuid,
    pub status: ApplicationStatus,
}

#[derive(ToSchema, Deserialize)]
pub struct ChangeVisibilityRequest {
    /// Job id
    pub id: Uuid,
}

/// Register the caller's company
///
/// Multipart fields: `name`, `email` and an `image` file for the logo.
#[debug_handler]
#[utoipa::path(
    post,
    tag = "company",
    path = "/register",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = CREATED, body = ApiResponse<Company>),
        (status = BAD_REQUEST, description = "Missing field or file"),
        (status = CONFLICT, description = "A company is already registered"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn register_company(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<Company>>)> {
    let mut form = UploadForm::read(multipart).await?;
    let name = form.text("name")?;
    let email = form.text("email")?;
    let image = form.take_file("image")?;
    if !image.content_type.starts_with("image/") {
        return Err(AppError::bad_request("Company image must be an image"));
    }

    // check before uploading so a refused registration leaves no orphan image
    if state
        .repository
        .find_company_by_owner(&user.user_id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Company already registered".to_string()));
    }

    let stored = state.media.upload(image.into_upload(MediaKind::Image)).await?;
    let company = state
        .repository
        .insert_company(NewCompany {
            owner_id: user.user_id,
            name,
            email,
            image: stored.url,
        })
        .await?
        .ok_or_else(|| AppError::Conflict("Company already registered".to_string()))?;

    info!(company_id = %company.id, "Company registered");
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Company registered", company),
    ))
}

/// The caller's company
#[debug_handler]
#[utoipa::path(
    get,
    tag = "company",
    path = "/",
    responses(
        (status = OK, body = ApiResponse<Company>),
        (status = NOT_FOUND, description = "No company registered"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn company_data(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Company>>> {
    Ok(ApiResponse::ok(owned_company(&state, &user).await?))
}

/// Post a new, visible job for the caller's company
#[debug_handler]
#[utoipa::path(
    post,
    tag = "company",
    path = "/post-job",
    request_body = PostJobRequest,
    responses(
        (status = CREATED, body = ApiResponse<Job>),
        (status = BAD_REQUEST, description = "Invalid job"),
        (status = NOT_FOUND, description = "No company registered"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn post_job(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(request): AppJson<PostJobRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Job>>)> {
    let company = owned_company(&state, &user).await?;
    let job = state
        .repository
        .insert_job(request.into_new_job(company.id)?)
        .await?;
    info!(job_id = %job.id, company_id = %company.id, "Job posted");
    Ok((StatusCode::CREATED, ApiResponse::with_message("Job added", job)))
}

/// Jobs of the caller's company with their applicant counts
#[debug_handler]
#[utoipa::path(
    get,
    tag = "company",
    path = "/list-jobs",
    responses(
        (status = OK, body = ApiResponse<Vec<CompanyJob>>),
        (status = NOT_FOUND, description = "No company registered"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_company_jobs(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<CompanyJob>>>> {
    let company = owned_company(&state, &user).await?;
    Ok(ApiResponse::ok(
        state.repository.list_company_jobs(company.id).await?,
    ))
}

/// Applications received for the caller's company jobs
#[debug_handler]
#[utoipa::path(
    get,
    tag = "company",
    path = "/applicants",
    responses(
        (status = OK, body = ApiResponse<Vec<ApplicantView>>),
        (status = NOT_FOUND, description = "No company registered"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn company_applicants(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<ApplicantView>>>> {
    let company = owned_company(&state, &user).await?;
    Ok(ApiResponse::ok(
        state.repository.list_company_applications(company.id).await?,
    ))
}

/// Accept or reject an application to one of the caller's jobs
#[debug_handler]
#[utoipa::path(
    post,
    tag = "company",
    path = "/change-status",
    request_body = ChangeStatusRequest,
    responses(
        (status = OK, body = ApiResponse<ApplicationStatus>),
        (status = NOT_FOUND, description = "Unknown application"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_application_status(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(request): AppJson<ChangeStatusRequest>,
) -> AppResult<Json<ApiResponse<ApplicationStatus>>> {
    let company = owned_company(&state, &user).await?;
    let updated = state
        .repository
        .set_application_status(company.id, request.id, request.status)
        .await?;
    if !updated {
        return Err(AppError::not_found("Application not found"));
    }
    Ok(ApiResponse::with_message("Status changed", request.status))
}

/// Show or hide one of the caller's jobs
#[debug_handler]
#[utoipa::path(
    post,
    tag = "company",
    path = "/change-visibility",
    request_body = ChangeVisibilityRequest,
    responses(
        (status = OK, body = ApiResponse<Job>),
        (status = NOT_FOUND, description = "Unknown job"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_job_visibility(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(request): AppJson<ChangeVisibilityRequest>,
) -> AppResult<Json<ApiResponse<Job>>> {
    let company = owned_company(&state, &user).await?;
    let job = state
        .repository
        .toggle_job_visibility(company.id, request.id)
        .await?
        .ok_or_else(|| AppError::not_found("Job not found"))?;
    Ok(ApiResponse::ok(job))
}
