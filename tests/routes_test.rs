// ABOUTME: Route-level integration tests exercising the full axum router in-process
// ABOUTME: Drives handlers with tower oneshot; scripted provider stands in for Gemini
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use common::ScriptedProvider;
use palaver::server::{ChatServer, ServerResources};
use tempfile::TempDir;
use tower::ServiceExt;

fn test_router(provider: Arc<ScriptedProvider>) -> (Router, Arc<ServerResources>, TempDir) {
    let (resources, upload_dir) = common::create_test_resources(provider);
    let router = ChatServer::new(resources.clone()).router();
    (router, resources, upload_dir)
}

/// Session cookie pair from a response, ready for a `Cookie` request header
fn session_cookie(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response should set a session cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_owned()
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Sign up a user and return the authenticated session cookie
async fn signup(router: &Router, username: &str, password: &str) -> String {
    let body = serde_urlencoded::to_string([("username", username), ("password", password)])
        .unwrap();
    let response = router
        .clone()
        .oneshot(
            Request::post("/signup")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    session_cookie(&response)
}

fn json_post(uri: &str, cookie: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, cookie)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Minimal multipart body with a single `file` field
fn multipart_upload(cookie: &str, filename: Option<&str>, content: &[u8]) -> Request<Body> {
    let boundary = "palaver-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    match filename {
        Some(name) => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n\r\n")
                .as_bytes(),
        ),
        None => body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"other\"\r\n\r\n",
        ),
    }
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::post("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (router, _resources, _dir) = test_router(Arc::new(ScriptedProvider::always("ok")));

    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["provider"], "scripted");
    assert_eq!(body["llm_reachable"], true);
}

#[tokio::test]
async fn test_mutating_routes_refuse_anonymous_sessions() {
    let (router, _resources, dir) = test_router(Arc::new(ScriptedProvider::always("ok")));

    let response = router
        .clone()
        .oneshot(Request::get("/reset").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Unauthorized");

    let response = router
        .clone()
        .oneshot(Request::post("/toggle-theme").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .clone()
        .oneshot(json_post(
            "/toggle-voice",
            "",
            serde_json::json!({"setting": "voiceInput"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .oneshot(multipart_upload("", Some("a.txt"), b"data"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The refused upload must not have persisted anything.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_index_redirects_anonymous_to_auth() {
    let (router, _resources, _dir) = test_router(Arc::new(ScriptedProvider::always("ok")));

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/auth");
    // Anonymous requests still get a session minted.
    assert!(response.headers().contains_key(header::SET_COOKIE));
}

#[tokio::test]
async fn test_send_requires_authentication() {
    let (router, _resources, _dir) = test_router(Arc::new(ScriptedProvider::always("ok")));

    let response = router
        .oneshot(json_post("/send", "", serde_json::json!({"message": "hi"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_signup_then_chat_flow() {
    let (router, _resources, _dir) =
        test_router(Arc::new(ScriptedProvider::always("Hello, alice")));

    let cookie = signup(&router, "alice", "hunter2").await;

    // The chat page now renders for the authenticated session.
    let response = router
        .clone()
        .oneshot(
            Request::get("/")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("alice"));

    let response = router
        .clone()
        .oneshot(json_post(
            "/send",
            &cookie,
            serde_json::json!({"message": "hi"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["response"], "Hello, alice");

    // The turn is visible on the next page load.
    let response = router
        .oneshot(
            Request::get("/")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(body_text(response).await.contains("Hello, alice"));
}

#[tokio::test]
async fn test_duplicate_signup_rerenders_form() {
    let (router, _resources, _dir) = test_router(Arc::new(ScriptedProvider::always("ok")));

    signup(&router, "alice", "hunter2").await;

    let body = serde_urlencoded::to_string([("username", "alice"), ("password", "other")])
        .unwrap();
    let response = router
        .oneshot(
            Request::post("/signup")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("User already exists"));
}

#[tokio::test]
async fn test_login_rejects_bad_password() {
    let (router, _resources, _dir) = test_router(Arc::new(ScriptedProvider::always("ok")));

    signup(&router, "alice", "hunter2").await;

    let body = serde_urlencoded::to_string([("username", "alice"), ("password", "wrong")])
        .unwrap();
    let response = router
        .oneshot(
            Request::post("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Invalid credentials"));
}

#[tokio::test]
async fn test_reset_clears_conversation() {
    let (router, _resources, _dir) = test_router(Arc::new(ScriptedProvider::always("ack")));

    let cookie = signup(&router, "alice", "hunter2").await;

    router
        .clone()
        .oneshot(json_post(
            "/send",
            &cookie,
            serde_json::json!({"message": "hi"}),
        ))
        .await
        .unwrap();

    let response = router
        .clone()
        .oneshot(
            Request::get("/reset")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Chat reset.");

    let response = router
        .oneshot(
            Request::get("/")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(!body_text(response).await.contains("ack"));
}

#[tokio::test]
async fn test_upload_txt_adds_context_to_next_turn() {
    let provider = Arc::new(ScriptedProvider::always("Paris"));
    let (router, _resources, _dir) = test_router(provider.clone());

    let cookie = signup(&router, "alice", "hunter2").await;

    let response = router
        .clone()
        .oneshot(multipart_upload(
            &cookie,
            Some("notes.txt"),
            b"Paris is the capital of France.",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "File uploaded and context added.");

    router
        .oneshot(json_post(
            "/send",
            &cookie,
            serde_json::json!({"message": "What is the capital?"}),
        ))
        .await
        .unwrap();

    let requests = provider.recorded_requests();
    assert_eq!(
        requests[0].messages[0].content,
        "Paris is the capital of France.\nUser: What is the capital?"
    );
}

#[tokio::test]
async fn test_upload_validation_errors() {
    let (router, _resources, _dir) = test_router(Arc::new(ScriptedProvider::always("ok")));
    let cookie = signup(&router, "alice", "hunter2").await;

    // Wrong extension.
    let response = router
        .clone()
        .oneshot(multipart_upload(&cookie, Some("notes.exe"), b"MZ"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "UNSUPPORTED_TYPE");

    // Missing file field entirely.
    let response = router
        .oneshot(multipart_upload(&cookie, None, b"ignored"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "NO_FILE");
}

#[tokio::test]
async fn test_toggle_theme_alternates() {
    let (router, _resources, _dir) = test_router(Arc::new(ScriptedProvider::always("ok")));
    let cookie = signup(&router, "alice", "hunter2").await;

    let response = router
        .clone()
        .oneshot(
            Request::post("/toggle-theme")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(response).await["theme"], "dark");

    let response = router
        .oneshot(
            Request::post("/toggle-theme")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(response).await["theme"], "light");
}

#[tokio::test]
async fn test_toggle_voice_contract() {
    let (router, _resources, _dir) = test_router(Arc::new(ScriptedProvider::always("ok")));
    let cookie = signup(&router, "alice", "hunter2").await;

    // Defaults to true, so the first toggle turns it off.
    let response = router
        .clone()
        .oneshot(json_post(
            "/toggle-voice",
            &cookie,
            serde_json::json!({"setting": "voiceInput"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["voiceInput"], false);

    let response = router
        .oneshot(json_post(
            "/toggle-voice",
            &cookie,
            serde_json::json!({"setting": "volume"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_drops_session() {
    let (router, resources, _dir) = test_router(Arc::new(ScriptedProvider::always("ok")));
    let cookie = signup(&router, "alice", "hunter2").await;
    assert_eq!(resources.sessions.len(), 1);

    let response = router
        .clone()
        .oneshot(
            Request::get("/logout")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(resources.sessions.is_empty());

    // The old cookie now resolves to a fresh anonymous session.
    let response = router
        .oneshot(
            Request::get("/")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/auth");
}

#[tokio::test]
async fn test_tampered_cookie_treated_as_anonymous() {
    let (router, _resources, _dir) = test_router(Arc::new(ScriptedProvider::always("ok")));
    let cookie = signup(&router, "alice", "hunter2").await;

    let tampered = format!("{cookie}x");
    let response = router
        .oneshot(
            Request::get("/")
                .header(header::COOKIE, tampered)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    // A replacement cookie is minted for the invalid one.
    assert!(response.headers().contains_key(header::SET_COOKIE));
}
