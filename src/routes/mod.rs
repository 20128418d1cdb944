mod company_handlers;
mod extract;
mod form;
mod job_handlers;
mod misc_handlers;
mod user_handlers;
mod webhook_handlers;

use crate::{auth::require_auth, middleware::apply_pipeline, state::AppState};
use axum::{
    Json, Router,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::{OpenApi, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_scalar::{Scalar, Servable};

#[derive(OpenApi)]
#[openapi(
    tags(
        (name = "health", description = "Liveness and health endpoints"),
        (name = "webhooks", description = "Identity provider event ingestion"),
        (name = "company", description = "Company registration, job posting and applicant review"),
        (name = "jobs", description = "Job listings"),
        (name = "users", description = "Applicant profile and applications"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Session token issued by the identity provider"))
                        .build(),
                ),
            );
        }
    }
}

/// Response envelope shared by the domain routes
#[derive(ToSchema, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data: Some(data),
        })
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        })
    }
}

/// An authenticated route group mounted under a fixed prefix
pub struct RouteGroup {
    pub prefix: &'static str,
    pub build: fn() -> OpenApiRouter<AppState>,
}

pub const ROUTE_GROUPS: &[RouteGroup] = &[
    RouteGroup {
        prefix: "/api/company",
        build: company_handlers::router,
    },
    RouteGroup {
        prefix: "/api/jobs",
        build: job_handlers::router,
    },
    RouteGroup {
        prefix: "/api/users",
        build: user_handlers::router,
    },
];

/// Paths served outside the route groups
pub const RESERVED_PATHS: &[&str] = &[
    "/",
    "/_health",
    "/webhooks",
    "/debug-sentry",
    "/api/openapi.json",
    "/api/scalar",
];

#[derive(Debug, Error, PartialEq)]
pub enum RouteTableError {
    #[error("route prefix {0:?} must start with '/', have no trailing '/' and no parameters")]
    InvalidPrefix(&'static str),
    #[error("route prefix {0:?} collides with {1:?}")]
    Collision(&'static str, &'static str),
}

fn is_nested_under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
}

fn overlaps(a: &str, b: &str) -> bool {
    a == b || is_nested_under(a, b) || is_nested_under(b, a)
}

/// Rejects malformed prefixes and any prefix that equals or nests inside
/// another prefix or a reserved path.
pub fn validate_route_table(
    groups: &[RouteGroup],
    reserved: &[&'static str],
) -> Result<(), RouteTableError> {
    for (i, group) in groups.iter().enumerate() {
        let prefix = group.prefix;
        if !prefix.starts_with('/')
            || prefix.len() < 2
            || prefix.ends_with('/')
            || prefix.contains(['{', '}', '*'])
        {
            return Err(RouteTableError::InvalidPrefix(prefix));
        }
        if let Some(&path) = reserved.iter().find(|path| overlaps(prefix, path)) {
            return Err(RouteTableError::Collision(prefix, path));
        }
        if let Some(other) = groups[..i].iter().find(|other| overlaps(prefix, other.prefix)) {
            return Err(RouteTableError::Collision(prefix, other.prefix));
        }
    }
    Ok(())
}

fn in_route_group(path: &str) -> bool {
    ROUTE_GROUPS
        .iter()
        .any(|group| path == group.prefix || is_nested_under(path, group.prefix))
}

/// Every path under a group prefix needs an identity, matched route or not.
async fn guard_route_groups(request: Request, next: Next) -> Response {
    if in_route_group(request.uri().path()) {
        return require_auth(request, next).await;
    }
    next.run(request).await
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RouterOptions {
    pub enable_debug_routes: bool,
}

pub fn build_router(state: AppState, options: RouterOptions) -> Result<Router, RouteTableError> {
    validate_route_table(ROUTE_GROUPS, RESERVED_PATHS)?;

    let mut api_routes = OpenApiRouter::with_openapi(ApiDoc::openapi())
        // Public endpoints (no auth required)
        .routes(routes!(misc_handlers::root))
        .routes(routes!(misc_handlers::health))
        .routes(routes!(webhook_handlers::clerk_webhooks));

    if options.enable_debug_routes {
        api_routes = api_routes.routes(routes!(misc_handlers::debug_sentry));
    }

    for group in ROUTE_GROUPS {
        api_routes = api_routes.nest(group.prefix, (group.build)());
    }

    let (router, openapi) = api_routes.split_for_parts();
    let full_router = router
        .merge(Scalar::with_url("/api/scalar", openapi.clone()))
        .route("/api/openapi.json", get(|| async move { Json(openapi) }))
        .with_state(state.clone())
        .layer(middleware::from_fn(guard_route_groups));

    Ok(apply_pipeline(full_router, &state))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> OpenApiRouter<AppState> {
        OpenApiRouter::new()
    }

    #[test]
    fn test_shipped_table_is_valid() {
        assert_eq!(validate_route_table(ROUTE_GROUPS, RESERVED_PATHS), Ok(()));
    }

    #[test]
    fn test_duplicate_prefix() {
        let groups = [
            RouteGroup { prefix: "/api/jobs", build: empty },
            RouteGroup { prefix: "/api/jobs", build: empty },
        ];
        assert_eq!(
            validate_route_table(&groups, RESERVED_PATHS),
            Err(RouteTableError::Collision("/api/jobs", "/api/jobs"))
        );
    }

    #[test]
    fn test_nested_prefix() {
        let groups = [
            RouteGroup { prefix: "/api", build: empty },
            RouteGroup { prefix: "/api/jobs", build: empty },
        ];
        assert_eq!(
            validate_route_table(&groups, &["/"]),
            Err(RouteTableError::Collision("/api/jobs", "/api"))
        );
    }

    #[test]
    fn test_sibling_prefixes_sharing_text() {
        let groups = [
            RouteGroup { prefix: "/api/job", build: empty },
            RouteGroup { prefix: "/api/jobs", build: empty },
        ];
        assert_eq!(validate_route_table(&groups, &[]), Ok(()));
    }

    #[test]
    fn test_reserved_path_collision() {
        let groups = [RouteGroup { prefix: "/api", build: empty }];
        assert_eq!(
            validate_route_table(&groups, RESERVED_PATHS),
            Err(RouteTableError::Collision("/api", "/api/openapi.json"))
        );
    }

    #[test]
    fn test_group_membership() {
        assert!(in_route_group("/api/company"));
        assert!(in_route_group("/api/company/does-not-exist"));
        assert!(in_route_group("/api/jobs/123"));
        assert!(!in_route_group("/api/jobsearch"));
        assert!(!in_route_group("/webhooks"));
        assert!(!in_route_group("/api/openapi.json"));
    }

    #[test]
    fn test_malformed_prefixes() {
        for prefix in ["api/jobs", "/", "/api/jobs/", "/api/{id}"] {
            let groups = [RouteGroup { prefix, build: empty }];
            assert_eq!(
                validate_route_table(&groups, &[]),
                Err(RouteTableError::InvalidPrefix(prefix))
            );
        }
    }
}
