use axum::{Json, debug_handler, extract::State, http::HeaderMap};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

use crate::{
    clerk::WebhookEvent,
    error::{AppError, AppResult},
    middleware::CAPTURED_TARGET,
    state::AppState,
};

#[derive(ToSchema, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub success: bool,
    /// Set when the event kind is not acted upon
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignored: bool,
}

/// Receive signed user lifecycle events from Clerk
///
/// The body is verified against the `svix-*` headers before it is parsed.
/// Unsupported event kinds are acknowledged without any write.
#[debug_handler]
#[utoipa::path(
    post,
    tag = "webhooks",
    path = "/webhooks",
    request_body(content = String, description = "Raw event delivery", content_type = "application/json"),
    params(
        ("svix-id" = String, Header, description = "Message id"),
        ("svix-timestamp" = String, Header, description = "Unix timestamp of the delivery"),
        ("svix-signature" = String, Header, description = "Space separated v1 signatures"),
    ),
    responses(
        (status = OK, body = WebhookResponse),
        (status = BAD_REQUEST, description = "Invalid signature or malformed payload"),
    )
)]
pub async fn clerk_webhooks(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookResponse>> {
    state.webhooks.verify(&headers, &body).map_err(|err| {
        warn!(%err, "Rejected webhook delivery");
        AppError::bad_request(format!("Webhook verification failed: {err}"))
    })?;

    let event = WebhookEvent::parse(&body).map_err(|err| {
        warn!(%err, "Rejected webhook payload");
        AppError::bad_request(err.to_string())
    })?;

    debug!(kind = event.kind(), "Webhook event verified");
    match event {
        WebhookEvent::UserCreated(profile) => {
            state.repository.upsert_user(&profile).await?;
            info!(user_id = %profile.id, "User created");
        }
        WebhookEvent::UserUpdated(profile) => {
            if state.repository.update_user(&profile).await? {
                info!(user_id = %profile.id, "User updated");
            } else {
                // provider and local store disagree; acknowledged so the
                // provider does not redeliver, but reported
                error!(
                    target: CAPTURED_TARGET,
                    user_id = %profile.id,
                    "Received user.updated for an unknown user"
                );
                sentry::with_scope(
                    |scope| {
                        scope.set_tag("webhook.kind", "user.updated");
                        scope.set_tag("user_id", &profile.id);
                    },
                    || {
                        sentry::capture_message(
                            "Received user.updated for an unknown user",
                            sentry::Level::Error,
                        )
                    },
                );
            }
        }
        WebhookEvent::UserDeleted { id } => {
            let existed = state.repository.delete_user(&id).await?;
            info!(user_id = %id, existed, "User deleted");
        }
        WebhookEvent::Unsupported { kind } => {
            debug!(%kind, "Ignoring webhook event");
            return Ok(Json(WebhookResponse {
                success: true,
                ignored: true,
            }));
        }
    }

    Ok(Json(WebhookResponse {
        success: true,
        ignored: false,
    }))
}
