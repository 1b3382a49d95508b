//! End-to-end tests for the HTTP API against the in-memory store.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use passvault_core::MasterKey;
use passvault_server::routes::build_router;
use passvault_server::state::AppState;
use passvault_storage::MemoryStore;
use serde_json::{Value, json};
use tower::ServiceExt;

const USER_HEADER: &str = "x-passvault-user";

fn app() -> Router {
    let key = MasterKey::from_bytes(b"0123456789abcdef").unwrap();
    let state = AppState::new(Arc::new(MemoryStore::new()), &key).unwrap();
    build_router(Arc::new(state))
}

fn json_request(method: &str, uri: &str, user: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_HEADER, user)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str, user: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_HEADER, user)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, req).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

async fn get(app: &Router, uri: &str, user: &str) -> (StatusCode, Value) {
    send_json(app, empty_request("GET", uri, user)).await
}

async fn post(app: &Router, uri: &str, user: &str, body: &Value) -> (StatusCode, Value) {
    send_json(app, json_request("POST", uri, user, body)).await
}

async fn put(app: &Router, uri: &str, user: &str, body: &Value) -> (StatusCode, Value) {
    send_json(app, json_request("PUT", uri, user, body)).await
}

async fn delete(app: &Router, uri: &str, user: &str) -> StatusCode {
    let (status, _) = send(app, empty_request("DELETE", uri, user)).await;
    status
}

async fn create(app: &Router, user: &str, title: &str, password: &str) -> Value {
    let body = json!({
        "title": title,
        "username": "test@gmail.com",
        "password": password,
        "metadata": { "url": "https://mail.google.com" },
    });
    let (status, created) = post(app, "/api/secrets", user, &body).await;
    assert_eq!(status, StatusCode::CREATED);
    created
}

#[tokio::test]
async fn health_needs_no_identity() {
    let app = app();
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn api_requires_identity_header() {
    let app = app();
    let req = Request::builder()
        .uri("/api/secrets")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = get(&app, "/api/secrets", "   ").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_list_get_update_delete() {
    let app = app();
    let created = create(&app, "user-1", "Gmail", "supersecretpassword").await;
    assert_eq!(created["version"], 1);
    assert!(created.get("password").is_none());
    let id = created["id"].as_str().unwrap();

    let (status, listed) = get(&app, "/api/secrets", "user-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert!(!listed.to_string().contains("supersecretpassword"));

    let uri = format!("/api/secrets/{id}");
    let (status, revealed) = get(&app, &uri, "user-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revealed["password"], "supersecretpassword");
    assert_eq!(revealed["metadata"]["url"], "https://mail.google.com");

    let rename = json!({ "title": "Work Gmail" });
    let (status, updated) = put(&app, &uri, "user-1", &rename).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["version"], 2);
    assert_eq!(updated["title"], "Work Gmail");

    let (_, revealed) = get(&app, &uri, "user-1").await;
    assert_eq!(revealed["password"], "supersecretpassword");

    let status = delete(&app, &uri, "user-1").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let status = delete(&app, &uri, "user-1").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = get(&app, &uri, "user-1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn foreign_secret_is_indistinguishable_from_missing() {
    let app = app();
    let created = create(&app, "user-1", "Gmail", "hunter2").await;
    let id = created["id"].as_str().unwrap();
    let uri = format!("/api/secrets/{id}");

    let (status, foreign) = get(&app, &uri, "user-2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let missing_id = uuid::Uuid::new_v4();
    let missing_uri = format!("/api/secrets/{missing_id}");
    let (status, mut missing) = get(&app, &missing_uri, "user-2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Same shape, only the echoed id differs.
    let message = missing["message"]
        .as_str()
        .unwrap()
        .replace(&missing_id.to_string(), id);
    missing["message"] = Value::String(message);
    assert_eq!(foreign, missing);

    let (status, _) = put(&app, &uri, "user-2", &json!({ "title": "x" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let status = delete(&app, &uri, "user-2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, revealed) = get(&app, &uri, "user-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revealed["title"], "Gmail");
}

#[tokio::test]
async fn stale_expected_version_is_conflict() {
    let app = app();
    let created = create(&app, "user-1", "Gmail", "hunter2").await;
    let uri = format!("/api/secrets/{}", created["id"].as_str().unwrap());

    let first = json!({ "title": "a", "expected_version": 1 });
    let (status, _) = put(&app, &uri, "user-1", &first).await;
    assert_eq!(status, StatusCode::OK);

    let second = json!({ "title": "b", "expected_version": 1 });
    let (status, body) = put(&app, &uri, "user-1", &second).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn empty_title_is_bad_request() {
    let app = app();
    let (status, body) = post(&app, "/api/secrets", "user-1", &json!({ "title": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn backup_export_then_import() {
    let app = app();
    let created = create(&app, "user-1", "Gmail", "hunter2").await;

    let resp = app
        .clone()
        .oneshot(empty_request("GET", "/api/backup/export", "user-1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "application/octet-stream"
    );
    let disposition = &resp.headers()[header::CONTENT_DISPOSITION];
    assert!(disposition.to_str().unwrap().contains("secrets_backup.enc"));
    let blob = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert!(!blob.windows(7).any(|w| w == b"hunter2"));

    let req = Request::builder()
        .method("POST")
        .uri("/api/backup/import")
        .header(USER_HEADER, "user-1")
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(blob))
        .unwrap();
    let (status, report) = send_json(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let updated = Value::Array(vec![created["id"].clone()]);
    assert_eq!(report["updated"], updated);
    assert_eq!(report["created"], json!([]));

    let (_, listed) = get(&app, "/api/secrets", "user-1").await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["version"], 2);
}

#[tokio::test]
async fn garbage_backup_is_bad_request() {
    let app = app();
    let req = Request::builder()
        .method("POST")
        .uri("/api/backup/import")
        .header(USER_HEADER, "user-1")
        .body(Body::from(&b"definitely not a backup"[..]))
        .unwrap();
    let (status, body) = send_json(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn oversized_backup_is_rejected() {
    let key = MasterKey::from_bytes(b"0123456789abcdef").unwrap();
    let state = AppState::new(Arc::new(MemoryStore::new()), &key)
        .unwrap()
        .with_max_backup_bytes(16);
    let app = build_router(Arc::new(state));

    let req = Request::builder()
        .method("POST")
        .uri("/api/backup/import")
        .header(USER_HEADER, "user-1")
        .body(Body::from(vec![0u8; 64]))
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn generate_password_honours_options() {
    let app = app();
    let options = json!({ "length": 24, "include_numbers": true });
    let (status, body) = post(&app, "/api/passwords/generate", "user-1", &options).await;
    assert_eq!(status, StatusCode::OK);
    let password = body["password"].as_str().unwrap();
    assert_eq!(password.len(), 24);
    assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));

    let too_long = json!({ "length": 10_000 });
    let (status, _) = post(&app, "/api/passwords/generate", "user-1", &too_long).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
