mod common;

use axum::http::StatusCode;
use std::sync::atomic::Ordering;

use common::{Part, TestApp, body_json, get, post_multipart, user_event};
use serde_json::json;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    // single thread, so the test hub installed by sentry stays current
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

#[test]
fn test_debug_route_reports_to_sentry() {
    let events = sentry::test::with_captured_events(|| {
        block_on(async {
            let app = TestApp::new();
            let response = app.send(get("/debug-sentry", None)).await;
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(
                body_json(response).await,
                json!({ "success": false, "message": "Internal server error" })
            );
        });
    });

    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert!(
        event
            .message
            .as_deref()
            .is_some_and(|m| m.contains("My first Sentry error!"))
    );
    assert_eq!(event.tags.get("http.status_code").map(String::as_str), Some("500"));
    assert_eq!(event.tags.get("http.path").map(String::as_str), Some("/debug-sentry"));
}

#[test]
fn test_client_errors_are_not_reported() {
    let events = sentry::test::with_captured_events(|| {
        block_on(async {
            let app = TestApp::new();
            let response = app.send(get("/api/jobs", None)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            let response = app.send(get("/", None)).await;
            assert_eq!(response.status(), StatusCode::OK);
        });
    });
    assert!(events.is_empty());
}

#[test]
fn test_update_of_unknown_user_is_reported() {
    let events = sentry::test::with_captured_events(|| {
        block_on(async {
            let app = TestApp::new();
            let response = app
                .deliver("msg_1", &user_event("user.updated", "ghost", "g@b.com"))
                .await;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(app.repository.users().await.is_empty());
        });
    });

    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.level, sentry::Level::Error);
    assert!(event.message.as_deref().is_some_and(|m| m.contains("unknown user")));
    assert_eq!(event.tags.get("user_id").map(String::as_str), Some("ghost"));
}

#[test]
fn test_server_errors_carry_the_caller() {
    let events = sentry::test::with_captured_events(|| {
        block_on(async {
            let app = TestApp::new();
            app.media.fail.store(true, Ordering::SeqCst);
            let response = app
                .send(post_multipart(
                    "/api/company/register",
                    "owner",
                    &[
                        Part::Text("name", "Acme"),
                        Part::Text("email", "jobs@acme.test"),
                        Part::File("image", "logo.png", "image/png", b"png"),
                    ],
                ))
                .await;
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        });
    });

    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(
        event.user.as_ref().and_then(|user| user.id.as_deref()),
        Some("owner")
    );
    assert_eq!(event.tags.get("session_id").map(String::as_str), Some("sess_owner"));
}
