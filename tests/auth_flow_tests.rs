//! End-to-end authentication flows: register, login, token resolution,
//! tampering, and the disabled-account path.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use stash::config::Config;
use tower::ServiceExt;

const ADMIN_USERNAME: &str = "admin";
const ADMIN_PASSWORD: &str = "password";

async fn spawn_app() -> Router {
    let db_path = std::env::temp_dir().join(format!("stash-flow-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    let state = stash::api::create_app_state_from_config(config)
        .await
        .expect("failed to create app state");

    stash::api::router(state)
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let request = if let Some(body) = body {
        builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

async fn register(app: &Router, username: &str, email: &str, password: &str) -> serde_json::Value {
    let (status, body) = send_json(
        app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(serde_json::json!({
            "username": username, "email": email, "password": password
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    body["data"].clone()
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send_json(
        app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(serde_json::json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["data"]["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn register_login_and_resolve_identity() {
    let app = spawn_app().await;

    let created = register(&app, "alice", "a@x.com", "secret123").await;
    let user_id = created["id"].as_str().unwrap().to_string();

    // The public representation never carries the password or its hash
    assert!(created.get("password").is_none());
    assert!(created.get("password_hash").is_none());
    assert_eq!(created["username"], "alice");
    assert_eq!(created["is_active"], true);

    let token = login(&app, "alice", "secret123").await;

    // Bearer token resolves back to the same credential record
    let (status, body) = send_json(&app, "GET", "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], user_id.as_str());
    assert_eq!(body["data"]["username"], "alice");

    // A corrupted token is rejected outright
    let corrupted = format!("{token}-corrupted");
    let (status, _) = send_json(&app, "GET", "/api/v1/auth/me", Some(&corrupted), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // So is a token with one byte of its payload flipped
    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    let mut payload = parts[1].clone().into_bytes();
    payload[0] = if payload[0] == b'A' { b'B' } else { b'A' };
    parts[1] = String::from_utf8(payload).unwrap();
    let tampered = parts.join(".");

    let (status, _) = send_json(&app, "GET", "/api/v1/auth/me", Some(&tampered), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn disabled_account_gets_a_distinct_rejection() {
    let app = spawn_app().await;

    let created = register(&app, "bob", "bob@x.com", "secret123").await;
    let user_id = created["id"].as_str().unwrap().to_string();

    // Token issued while the account was still active
    let bob_token = login(&app, "bob", "secret123").await;

    // Admin flips is_active off
    let admin_token = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/users/{user_id}"),
        Some(&admin_token),
        Some(serde_json::json!({ "is_active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Login with still-correct credentials: 403, not the generic 401
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(serde_json::json!({ "username": "bob", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("disabled"));

    // The still-valid token hits the same distinct rejection on resolution
    let (status, body) = send_json(&app, "GET", "/api/v1/auth/me", Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("disabled"));

    // Re-enabling restores both paths
    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/users/{user_id}"),
        Some(&admin_token),
        Some(serde_json::json!({ "is_active": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(&app, "GET", "/api/v1/auth/me", Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deleted_account_fails_identity_resolution() {
    let app = spawn_app().await;

    let created = register(&app, "carol", "carol@x.com", "secret123").await;
    let user_id = created["id"].as_str().unwrap().to_string();
    let carol_token = login(&app, "carol", "secret123").await;

    let admin_token = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let (status, _) = send_json(
        &app,
        "DELETE",
        &format!("/api/v1/users/{user_id}"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The token itself is still signed and unexpired, but the subject is gone
    let (status, _) = send_json(&app, "GET", "/api/v1/auth/me", Some(&carol_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_change_takes_effect_on_next_login() {
    let app = spawn_app().await;

    let created = register(&app, "dave", "dave@x.com", "secret123").await;
    let user_id = created["id"].as_str().unwrap().to_string();
    let token = login(&app, "dave", "secret123").await;

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/users/{user_id}"),
        Some(&token),
        Some(serde_json::json!({ "password": "newsecret456" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(serde_json::json!({ "username": "dave", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let new_token = login(&app, "dave", "newsecret456").await;
    let (status, _) = send_json(&app, "GET", "/api/v1/auth/me", Some(&new_token), None).await;
    assert_eq!(status, StatusCode::OK);
}
