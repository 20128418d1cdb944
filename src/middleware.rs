//! The request pipeline as an ordered list of stages.
//!
//! Stages are listed outermost first. Each stage sees the request before
//! every stage after it and sees the response after them. Authentication
//! therefore runs before any route, and telemetry capture, being first,
//! observes the outcome of every other stage.
use std::{any::Any, time::Duration};

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use sentry::integrations::tower::{NewSentryLayer, SentryHttpLayer};
use serde_json::json;
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer,
    timeout::RequestBodyTimeoutLayer, trace::TraceLayer,
};

use crate::{auth::attach_identity, error::ErrorReport, state::AppState};

/// Log target of failures already sent to Sentry explicitly; the tracing
/// bridge skips it.
pub const CAPTURED_TARGET: &str = "jobboard::telemetry";

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
const BODY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Per-request Sentry hub, panic recovery and reporting of 5xx responses
    TelemetryCapture,
    /// Request spans
    Tracing,
    /// Cross-origin requests from the web frontend
    Cors,
    Compression,
    /// Size and time limits for request bodies parsed by the handlers
    BodyLimits,
    /// Verifies session tokens and attaches the identity to the request
    Authentication,
}

pub const PIPELINE: [Stage; 6] = [
    Stage::TelemetryCapture,
    Stage::Tracing,
    Stage::Cors,
    Stage::Compression,
    Stage::BodyLimits,
    Stage::Authentication,
];

pub fn apply_pipeline(router: Router, state: &AppState) -> Router {
    // Router::layer wraps everything added so far, so apply innermost first
    PIPELINE
        .iter()
        .rev()
        .fold(router, |router, stage| apply_stage(router, *stage, state))
}

fn apply_stage(router: Router, stage: Stage, state: &AppState) -> Router {
    match stage {
        Stage::TelemetryCapture => router
            .layer(CatchPanicLayer::custom(
                panic_response as fn(Box<dyn Any + Send + 'static>) -> Response,
            ))
            .layer(middleware::from_fn(capture_errors))
            .layer(SentryHttpLayer::new().enable_transaction())
            .layer(NewSentryLayer::<Request>::new_from_top()),
        Stage::Tracing => router.layer(TraceLayer::new_for_http()),
        Stage::Cors => router.layer(CorsLayer::permissive()),
        Stage::Compression => router.layer(CompressionLayer::new()),
        Stage::BodyLimits => router
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .layer(RequestBodyTimeoutLayer::new(BODY_TIMEOUT)),
        Stage::Authentication => {
            router.layer(middleware::from_fn_with_state(state.clone(), attach_identity))
        }
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else {
        "unknown panic"
    };

    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(json!({
            "success": false,
            "message": "Internal server error",
        })),
    )
        .into_response();
    response
        .extensions_mut()
        .insert(ErrorReport(format!("handler panicked: {details}")));
    response
}

/// Reports every server error to Sentry with the request it answered.
async fn capture_errors(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let status = response.status();
    if status.is_server_error() {
        let cause = response
            .extensions()
            .get::<ErrorReport>()
            .map(|report| report.0.clone())
            .unwrap_or_else(|| format!("{status} response"));

        tracing::error!(
            target: CAPTURED_TARGET,
            %method,
            %path,
            status = status.as_u16(),
            "Request failed: {cause}"
        );
        sentry::with_scope(
            |scope| {
                scope.set_tag("http.method", method.as_str());
                scope.set_tag("http.path", &path);
                scope.set_tag("http.status_code", status.as_u16());
            },
            || sentry::capture_message(&cause, sentry::Level::Error),
        );
    }
    response
}
