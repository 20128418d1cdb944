#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use anyhow::{Result, bail};
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use jobboard::{
    clerk::{SessionVerifier, WebhookVerifier},
    config::AuthConfig,
    media::{MediaStorage, MediaUpload, StoredMedia},
    repository::MemoryRepository,
    routes::{RouterOptions, build_router},
    state::AppState,
};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";
const PRIVATE_KEY: &str = include_str!("../fixtures/session_private_key.pem");
const PUBLIC_KEY: &str = include_str!("../fixtures/session_public_key.pem");
const BOUNDARY: &str = "jobboard-test-boundary";

/// Media store that keeps uploads in memory, or fails every upload.
#[derive(Default)]
pub struct FakeMedia {
    pub uploads: Mutex<Vec<MediaUpload>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl MediaStorage for FakeMedia {
    async fn upload(&self, upload: MediaUpload) -> Result<StoredMedia> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("media provider unavailable");
        }
        let public_id = format!("{}/{}", upload.kind.resource_type(), upload.file_name);
        let stored = StoredMedia {
            url: format!("https://media.test/{public_id}"),
            public_id,
        };
        self.uploads.lock().unwrap().push(upload);
        Ok(stored)
    }
}

pub struct TestApp {
    pub router: Router,
    pub repository: Arc<MemoryRepository>,
    pub media: Arc<FakeMedia>,
    pub webhooks: WebhookVerifier,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_options(RouterOptions {
            enable_debug_routes: true,
        })
    }

    pub fn with_options(options: RouterOptions) -> Self {
        let repository = Arc::new(MemoryRepository::new());
        let media = Arc::new(FakeMedia::default());
        let sessions = SessionVerifier::from_config(&AuthConfig {
            public_key: Some(PUBLIC_KEY.to_string()),
            issuer: None,
            algorithm: Algorithm::RS256,
        })
        .unwrap();
        let state = AppState::new(
            repository.clone(),
            media.clone(),
            sessions,
            WebhookVerifier::new(WEBHOOK_SECRET).unwrap(),
        );
        Self {
            router: build_router(state, options).unwrap(),
            repository,
            media,
            webhooks: WebhookVerifier::new(WEBHOOK_SECRET).unwrap(),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Delivers a webhook event signed with the configured secret.
    pub async fn deliver(&self, msg_id: &str, event: &Value) -> Response {
        let payload = serde_json::to_vec(event).unwrap();
        let timestamp = chrono::Utc::now().timestamp();
        let signature = self.webhooks.sign(msg_id, timestamp, &payload).unwrap();
        let request = Request::post("/webhooks")
            .header(header::CONTENT_TYPE, "application/json")
            .header("svix-id", msg_id)
            .header("svix-timestamp", timestamp.to_string())
            .header("svix-signature", signature)
            .body(Body::from(payload))
            .unwrap();
        self.send(request).await
    }

    /// Creates a user through the webhook, as the identity provider would.
    pub async fn sync_user(&self, id: &str, email: &str) {
        let response = self
            .deliver(&format!("msg_{id}"), &user_event("user.created", id, email))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

pub fn user_event(kind: &str, id: &str, email: &str) -> Value {
    json!({
        "type": kind,
        "data": {
            "id": id,
            "email_addresses": [{ "id": "idn_1", "email_address": email }],
            "primary_email_address_id": "idn_1",
            "first_name": "Test",
            "last_name": "User",
            "image_url": format!("https://img.test/{id}.png"),
        }
    })
}

/// A session token for `user_id`, valid for one hour.
pub fn session_token(user_id: &str) -> String {
    let claims = json!({
        "sub": user_id,
        "sid": format!("sess_{user_id}"),
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).unwrap();
    encode(&Header::new(Algorithm::RS256), &claims, &key).unwrap()
}

pub fn get(uri: &str, user_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(user_id) = user_id {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", session_token(user_id)));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, user_id: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", session_token(user_id)))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    /// field name, file name, content type, contents
    File(&'a str, &'a str, &'a str, &'a [u8]),
}

pub fn post_multipart(uri: &str, user_id: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File(name, file_name, content_type, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", session_token(user_id)))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
