use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application-level errors for HTTP handlers
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[source] anyhow::Error),
}

/// Attached to the response of an internal error so the telemetry stage can
/// report the underlying cause, which the client never sees.
#[derive(Debug, Clone)]
pub struct ErrorReport(pub String);

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self {
            AppError::InternalError(err) => {
                let report = format!("{err:?}");
                tracing::debug!("Handler error: {report}");
                let mut response = (
                    status,
                    Json(json!({
                        "success": false,
                        "message": "Internal server error",
                    })),
                )
                    .into_response();
                response.extensions_mut().insert(ErrorReport(report));
                response
            }
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => {
                tracing::debug!(%status, "Request rejected: {msg}");
                (
                    status,
                    Json(json!({
                        "success": false,
                        "message": msg,
                    })),
                )
                    .into_response()
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalError(err)
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
