use crate::{
    error::{AppError, AppResult},
    state::AppState,
};
use axum::{Json, debug_handler, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize)]
pub struct Health {
    pub ok: bool,
}

/// Liveness; independent of every external dependency
#[debug_handler]
#[utoipa::path(
    get,
    tag = "health",
    path = "/",
    responses((status = OK, body = String, content_type = "text/plain"))
)]
pub async fn root() -> &'static str {
    "API working"
}

/// /_health
#[debug_handler]
#[utoipa::path(get, tag = "health", path = "/_health", responses((status = OK, body = Health)))]
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        ok: state.repository.health_check().await,
    })
}

/// Always fails, to check that errors reach Sentry
#[debug_handler]
#[utoipa::path(
    get,
    tag = "health",
    path = "/debug-sentry",
    responses((status = INTERNAL_SERVER_ERROR, description = "Always"))
)]
pub async fn debug_sentry() -> AppResult<()> {
    Err(AppError::InternalError(anyhow::anyhow!(
        "My first Sentry error!"
    )))
}
