use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::errors::ErrorKind;

use crate::{error::AppError, state::AppState};

/// Cookie the identity provider's frontend SDK stores the session token in
const SESSION_COOKIE: &str = "__session";

/// The verified identity behind a request
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: String,
    pub session_id: Option<String>,
}

/// Outcome of the authentication stage, attached to every request
#[derive(Debug, Clone)]
pub enum Authentication {
    Anonymous,
    Authenticated(AuthUser),
    Rejected(&'static str),
}

/// Extract JWT token from Authorization header
fn extract_token_from_header(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ").map(str::trim)
}

fn extract_token_from_cookies(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            (name == SESSION_COOKIE).then_some(value)
        })
}

fn extract_token(headers: &HeaderMap) -> Result<Option<&str>, &'static str> {
    match headers.get(header::AUTHORIZATION) {
        Some(value) => {
            let value = value.to_str().map_err(|_| "Invalid authorization header")?;
            extract_token_from_header(value)
                .filter(|t| !t.is_empty())
                .map(Some)
                .ok_or("Invalid authorization format, expected: Bearer <token>")
        }
        None => Ok(extract_token_from_cookies(headers).filter(|t| !t.is_empty())),
    }
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Authentication {
    let token = match extract_token(headers) {
        Ok(Some(token)) => token,
        Ok(None) => return Authentication::Anonymous,
        Err(msg) => return Authentication::Rejected(msg),
    };

    match state.sessions.verify(token) {
        Ok(claims) => Authentication::Authenticated(AuthUser {
            user_id: claims.sub,
            session_id: claims.sid,
        }),
        Err(err) => Authentication::Rejected(match err.kind() {
            ErrorKind::ExpiredSignature => "Token expired",
            ErrorKind::ImmatureSignature => "Token not yet valid",
            ErrorKind::InvalidSignature => "Invalid signature",
            ErrorKind::InvalidIssuer => "Invalid token issuer",
            _ => "Invalid token",
        }),
    }
}

/// Verifies the session token when one is present and records the outcome.
/// Never rejects on its own; public routes stay reachable.
pub async fn attach_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let authentication = authenticate(&state, request.headers());
    if let Authentication::Rejected(reason) = &authentication {
        tracing::debug!(reason, "Session token rejected");
    }
    request.extensions_mut().insert(authentication);
    next.run(request).await
}

/// Guard for protected route groups: only requests carrying a verified
/// identity reach the handlers.
pub async fn require_auth(mut request: Request, next: Next) -> Response {
    let user = match request.extensions().get::<Authentication>() {
        Some(Authentication::Authenticated(user)) => user.clone(),
        Some(Authentication::Rejected(reason)) => {
            return AppError::Unauthorized((*reason).to_string()).into_response();
        }
        _ => return AppError::Unauthorized("Not authenticated".to_string()).into_response(),
    };
    // the request's own hub, installed by the telemetry stage
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user.user_id.clone()),
            ..Default::default()
        }));
        if let Some(session_id) = &user.session_id {
            scope.set_tag("session_id", session_id);
        }
    });
    request.extensions_mut().insert(user);
    next.run(request).await
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))
    }
}
