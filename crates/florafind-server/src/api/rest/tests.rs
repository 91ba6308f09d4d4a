use super::{create_router, AppState, IdentifyLimits};
use crate::auth::{JwtAlgorithm, MemoryMailer, TokenKind};
use crate::config::AuthConfig;
use crate::identify::{IdentifyError, ImageUpload, PlantIdentifier};
use crate::secret::SecretString;
use crate::storage::{InMemoryStorage, UserStorage};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

const PASSWORD: &str = "Test1234!";
const BOUNDARY: &str = "florafind-test-boundary";
const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

enum StubOutcome {
    Found(Value),
    NotFound,
    Down,
}

struct StubIdentifier {
    outcome: StubOutcome,
    calls: AtomicUsize,
}

#[async_trait]
impl PlantIdentifier for StubIdentifier {
    async fn identify(&self, images: Vec<ImageUpload>) -> Result<Value, IdentifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(!images.is_empty());
        match &self.outcome {
            StubOutcome::Found(value) => Ok(value.clone()),
            StubOutcome::NotFound => Err(IdentifyError::NotFound),
            StubOutcome::Down => Err(IdentifyError::Upstream("connection refused".into())),
        }
    }
}

struct TestApp {
    app: Router,
    storage: Arc<InMemoryStorage>,
    mailer: Arc<MemoryMailer>,
    identifier: Arc<StubIdentifier>,
}

fn auth_config() -> AuthConfig {
    AuthConfig {
        secret_key: SecretString::new("test-secret-key"),
        algorithm: JwtAlgorithm::HS256,
        access_token_expire_minutes: 30,
        refresh_token_expire_days: 7,
        password_reset_token_expire_minutes: 15,
        password_history_size: 5,
        frontend_url: "http://localhost:8000".into(),
        sender_email: "no-reply@florafind.app".into(),
    }
}

fn test_app_with(outcome: StubOutcome) -> TestApp {
    let storage = Arc::new(InMemoryStorage::new());
    let mailer = Arc::new(MemoryMailer::new());
    let identifier = Arc::new(StubIdentifier {
        outcome,
        calls: AtomicUsize::new(0),
    });
    let state = AppState::new(
        storage.clone(),
        auth_config(),
        mailer.clone(),
        identifier.clone(),
        IdentifyLimits {
            max_images: 2,
            max_image_size: 1024,
        },
    );

    TestApp {
        app: create_router(state),
        storage,
        mailer,
        identifier,
    }
}

fn test_app() -> TestApp {
    test_app_with(StubOutcome::Found(json!({"results": []})))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn register(app: &Router, username: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "email": format!("{username}@example.com"),
            "username": username,
            "password": PASSWORD,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/auth/token",
        None,
        Some(json!({"email": format!("{username}@example.com"), "password": password})),
    )
    .await
}

async fn access_token(app: &Router, username: &str) -> String {
    register(app, username).await;
    let (status, body) = login(app, username, PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

async fn create_garden(app: &Router, token: &str, name: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/gardens",
        Some(token),
        Some(json!({"name": name, "description": "Sunny corner"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

async fn add_plant(app: &Router, token: &str, garden_id: &str, alias: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        &format!("/gardens/{garden_id}/plants"),
        Some(token),
        Some(json!({
            "alias": alias,
            "scientific_name_without_author": "Monstera deliciosa",
            "genus": "Monstera",
            "family": "Araceae",
            "common_names": ["Swiss cheese plant"],
        })),
    )
    .await
}

fn multipart_body(parts: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (index, (name, content_type, data)) in parts.iter().enumerate() {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"leaf{index}.jpg\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn identify(app: &Router, token: &str, parts: &[(&str, &str, &[u8])]) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/identify")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();

    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_root_and_health() {
    let t = test_app();

    let (status, body) = send(&t.app, "GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to FloraFind API");

    let (status, body) = send(&t.app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_register_returns_profile_and_sends_welcome() {
    let t = test_app();
    let body = register(&t.app, "alice").await;

    assert_eq!(body["username"], "alice");
    assert_eq!(body["is_active"], true);
    assert!(body.get("password_hash").is_none());

    let sent = t.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "alice@example.com");
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_weak_passwords() {
    let t = test_app();
    register(&t.app, "alice").await;

    let (status, body) = send(
        &t.app,
        "POST",
        "/auth/register",
        None,
        Some(json!({"email": "alice@example.com", "username": "other", "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "User already exists");

    let (status, body) = send(
        &t.app,
        "POST",
        "/auth/register",
        None,
        Some(json!({"email": "bob@example.com", "username": "bob", "password": "weak"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_login_with_bad_credentials_is_unauthorized() {
    let t = test_app();
    register(&t.app, "alice").await;

    let request = Request::builder()
        .method("POST")
        .uri("/auth/token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"email": "alice@example.com", "password": "Wrong1234"}).to_string(),
        ))
        .unwrap();
    let resp = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");

    let (status, body) = login(&t.app, "alice", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
}

#[tokio::test]
async fn test_me_requires_access_token() {
    let t = test_app();
    register(&t.app, "alice").await;
    let (_, tokens) = login(&t.app, "alice", PASSWORD).await;

    let (status, _) = send(&t.app, "GET", "/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let refresh = tokens["refresh_token"].as_str().unwrap();
    let (status, _) = send(&t.app, "GET", "/auth/me", Some(refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let access = tokens["access_token"].as_str().unwrap();
    let (status, body) = send(&t.app, "GET", "/auth/me", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@example.com");
}

#[tokio::test]
async fn test_refresh_requires_refresh_token() {
    let t = test_app();
    register(&t.app, "alice").await;
    let (_, tokens) = login(&t.app, "alice", PASSWORD).await;

    let uri = format!(
        "/auth/refresh?refresh_token={}",
        tokens["refresh_token"].as_str().unwrap()
    );
    let (status, body) = send(&t.app, "POST", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());

    let uri = format!(
        "/auth/refresh?refresh_token={}",
        tokens["access_token"].as_str().unwrap()
    );
    let (status, _) = send(&t.app, "POST", &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let t = test_app();
    register(&t.app, "alice").await;

    let (status, unknown) = send(
        &t.app,
        "POST",
        "/auth/password-reset-request",
        None,
        Some(json!({"email": "nobody@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(t.mailer.sent().len(), 1);

    let (status, known) = send(
        &t.app,
        "POST",
        "/auth/password-reset-request",
        None,
        Some(json!({"email": "alice@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unknown["message"], known["message"]);

    let sent = t.mailer.sent();
    let mail = sent.last().unwrap();
    assert!(mail
        .html_body
        .contains("http://localhost:8000/auth/password-reset?token="));
    let token = mail
        .html_body
        .split("token=")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .unwrap()
        .to_string();

    let (status, _) = send(
        &t.app,
        "POST",
        "/auth/password-reset",
        None,
        Some(json!({"token": token, "new_password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        "POST",
        "/auth/password-reset",
        None,
        Some(json!({"token": token, "new_password": "Fresh5678"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = login(&t.app, "alice", "Fresh5678").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = login(&t.app, "alice", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_reset_rejects_access_tokens() {
    let t = test_app();
    let access = access_token(&t.app, "alice").await;

    let (status, _) = send(
        &t.app,
        "POST",
        "/auth/password-reset",
        None,
        Some(json!({"token": access, "new_password": "Fresh5678"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_password_reset_form_escapes_token() {
    let t = test_app();
    let request = Request::builder()
        .uri("/auth/password-reset?token=%3Cscript%3E")
        .body(Body::empty())
        .unwrap();
    let resp = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("value=\"<script>\""));
}

#[tokio::test]
async fn test_update_me_password_change_rules() {
    let t = test_app();
    let token = access_token(&t.app, "alice").await;

    let (status, _) = send(
        &t.app,
        "PUT",
        "/auth/me",
        Some(&token),
        Some(json!({"current_password": "Wrong1234", "new_password": "Fresh5678"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        "PUT",
        "/auth/me",
        Some(&token),
        Some(json!({"current_password": PASSWORD, "new_password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &t.app,
        "PUT",
        "/auth/me",
        Some(&token),
        Some(json!({
            "full_name": "Alice Liddell",
            "current_password": PASSWORD,
            "new_password": "Fresh5678",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Alice Liddell");

    let (status, _) = login(&t.app, "alice", "Fresh5678").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_me_rejects_taken_username() {
    let t = test_app();
    register(&t.app, "bob").await;
    let token = access_token(&t.app, "alice").await;

    let (status, body) = send(
        &t.app,
        "PUT",
        "/auth/me",
        Some(&token),
        Some(json!({"username": "bob"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_garden_lifecycle() {
    let t = test_app();
    let token = access_token(&t.app, "alice").await;

    let garden = create_garden(&t.app, &token, "  Balcony  ").await;
    assert_eq!(garden["name"], "Balcony");
    assert_eq!(garden["plants"], json!([]));
    let garden_id = garden["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &t.app,
        "POST",
        "/gardens",
        Some(&token),
        Some(json!({"name": "Balcony"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "A garden with this name already exists");

    let (status, body) = send(
        &t.app,
        "PUT",
        &format!("/gardens/{garden_id}"),
        Some(&token),
        Some(json!({"name": "  ", "description": "Shady now"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["garden"]["name"], "Balcony");
    assert_eq!(body["garden"]["description"], "Shady now");

    let (status, body) = send(&t.app, "GET", "/gardens", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, body) = send(
        &t.app,
        "DELETE",
        &format!("/gardens/{garden_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Garden 'Balcony' deleted successfully");

    let (status, _) = send(
        &t.app,
        "GET",
        &format!("/gardens/{garden_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_gardens_are_private_to_their_owner() {
    let t = test_app();
    let alice = access_token(&t.app, "alice").await;
    let bob = access_token(&t.app, "bob").await;

    let garden = create_garden(&t.app, &alice, "Balcony").await;
    let garden_id = garden["id"].as_str().unwrap();

    let (status, _) = send(&t.app, "GET", &format!("/gardens/{garden_id}"), Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &t.app,
        "DELETE",
        &format!("/gardens/{garden_id}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&t.app, "GET", "/gardens/not-a-uuid", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_garden_plants() {
    let t = test_app();
    let token = access_token(&t.app, "alice").await;
    let garden = create_garden(&t.app, &token, "Balcony").await;
    let garden_id = garden["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &t.app,
        "GET",
        &format!("/gardens/{garden_id}/plants"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert_eq!(body["garden_name"], "Balcony");
    assert!(body["message"].is_string());

    let (status, plant) = add_plant(&t.app, &token, &garden_id, "Monty").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(plant["genus"], "Monstera");

    let (status, body) = add_plant(&t.app, &token, &garden_id, " Monty ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "A plant with this alias already exists");

    let (status, body) = send(
        &t.app,
        "GET",
        &format!("/gardens/{garden_id}/plants?skip=0&limit=10"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert!(body.get("message").is_none());

    let (status, body) = send(&t.app, "GET", &format!("/gardens/{garden_id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plant_count"], 1);

    let plant_id = plant["id"].as_str().unwrap().to_string();
    let (status, body) = send(
        &t.app,
        "PUT",
        &format!("/gardens/plants/{plant_id}"),
        Some(&token),
        Some(json!({"alias": "Monstera Max"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plant"]["alias"], "Monstera Max");

    let (status, body) = send(&t.app, "GET", &format!("/plants/{plant_id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["garden_name"], "Balcony");

    let (status, body) = send(&t.app, "GET", "/plants", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, _) = send(
        &t.app,
        "DELETE",
        &format!("/gardens/plants/{plant_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&t.app, "GET", "/plants", Some(&token), None).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_plant_notes() {
    let t = test_app();
    let token = access_token(&t.app, "alice").await;
    let garden = create_garden(&t.app, &token, "Balcony").await;
    let garden_id = garden["id"].as_str().unwrap().to_string();
    let (_, plant) = add_plant(&t.app, &token, &garden_id, "Monty").await;
    let plant_id = plant["id"].as_str().unwrap().to_string();
    let notes_uri = format!("/plants/{plant_id}/notes");

    let (status, body) = send(
        &t.app,
        "POST",
        &notes_uri,
        Some(&token),
        Some(json!({"text": "   ", "observation_date": "2024-05-01T10:00:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Note text must not be empty");

    let (status, _) = send(
        &t.app,
        "POST",
        &notes_uri,
        Some(&token),
        Some(json!({"text": "ok", "observation_date": "2024-05-01T10:00:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, older) = send(
        &t.app,
        "POST",
        &notes_uri,
        Some(&token),
        Some(json!({"text": "  First leaf  ", "observation_date": "2024-05-01T10:00:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(older["text"], "First leaf");

    send(
        &t.app,
        "POST",
        &notes_uri,
        Some(&token),
        Some(json!({"text": "Repotted", "color": "#00ff00", "observation_date": "2024-06-01T10:00:00Z"})),
    )
    .await;

    let (status, notes) = send(&t.app, "GET", &notes_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(notes[0]["text"], "Repotted");
    assert_eq!(notes[1]["text"], "First leaf");

    let note_id = older["id"].as_str().unwrap();
    let (status, body) = send(
        &t.app,
        "PUT",
        &format!("/plants/notes/{note_id}"),
        Some(&token),
        Some(json!({"text": "First two leaves"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "First two leaves");

    let bob = access_token(&t.app, "bob").await;
    let (status, _) = send(&t.app, "GET", &notes_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &t.app,
        "POST",
        &format!("/plants/{}/notes", uuid::Uuid::new_v4()),
        Some(&token),
        Some(json!({"text": "Lost plant", "observation_date": "2024-05-01T10:00:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_note_for_unknown_or_foreign_plant_is_not_found_before_text_checks() {
    let t = test_app();
    let token = access_token(&t.app, "alice").await;
    let garden = create_garden(&t.app, &token, "Balcony").await;
    let garden_id = garden["id"].as_str().unwrap().to_string();
    let (_, plant) = add_plant(&t.app, &token, &garden_id, "Monty").await;
    let plant_id = plant["id"].as_str().unwrap().to_string();
    let bob = access_token(&t.app, "bob").await;

    let blank = json!({"text": "", "observation_date": "2024-05-01T10:00:00Z"});
    for (uri, token) in [
        (format!("/plants/{}/notes", uuid::Uuid::new_v4()), &token),
        (format!("/plants/{plant_id}/notes"), &bob),
    ] {
        let (status, body) = send(&t.app, "POST", &uri, Some(token), Some(blank.clone())).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}: {body}");
    }
}

async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    content_type: &str,
    body: &'static str,
) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let resp = app
        .clone()
        .oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (
        status,
        content_type,
        serde_json::from_slice(&bytes).unwrap_or(Value::Null),
    )
}

fn assert_error_body(content_type: Option<String>, body: &Value, code: &str) {
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body["code"], code, "{body}");
    assert!(body["detail"].as_str().is_some_and(|d| !d.is_empty()), "{body}");
}

#[tokio::test]
async fn test_rejected_requests_use_json_error_body() {
    let t = test_app();

    let (status, content_type, body) = send_raw(
        &t.app,
        "POST",
        "/auth/register",
        None,
        "application/json",
        r#"{"email":"a@example.com"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_error_body(content_type, &body, "VALIDATION_ERROR");
    assert!(body["detail"].as_str().unwrap().contains("username"));

    let (status, content_type, body) = send_raw(
        &t.app,
        "POST",
        "/auth/token",
        None,
        "application/json",
        "{not json",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_body(content_type, &body, "BAD_REQUEST");

    let (status, content_type, body) =
        send_raw(&t.app, "GET", "/posts?skip=abc", None, "application/json", "").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_error_body(content_type, &body, "VALIDATION_ERROR");

    let token = access_token(&t.app, "alice").await;
    let (status, content_type, body) = send_raw(
        &t.app,
        "POST",
        "/identify",
        Some(&token),
        "application/json",
        "{}",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_body(content_type, &body, "BAD_REQUEST");
    assert_eq!(t.identifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_posts() {
    let t = test_app();
    let alice = access_token(&t.app, "alice").await;
    let bob = access_token(&t.app, "bob").await;

    let (status, _) = send(
        &t.app,
        "POST",
        "/posts",
        None,
        Some(json!({"title": "Hello", "content": "Unauthenticated post"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &t.app,
        "POST",
        "/posts",
        Some(&alice),
        Some(json!({"title": "Hi", "content": "Too short title here"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, post) = send(
        &t.app,
        "POST",
        "/posts",
        Some(&alice),
        Some(json!({"title": "My ferns", "content": "They love the bathroom humidity."})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post["published"], true);
    let post_uri = format!("/posts/{}", post["id"].as_str().unwrap());

    let (status, body) = send(&t.app, "GET", &post_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "My ferns");

    let (status, _) = send(
        &t.app,
        "PUT",
        &post_uri,
        Some(&bob),
        Some(json!({"title": "Hijacked"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &t.app,
        "PUT",
        &post_uri,
        Some(&alice),
        Some(json!({"published": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["published"], false);
    assert_eq!(body["title"], "My ferns");

    let (status, list) = send(&t.app, "GET", "/posts?limit=10", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = send(&t.app, "DELETE", &post_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&t.app, "DELETE", &post_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&t.app, "GET", &post_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_identify_passes_result_through() {
    let expected = json!({"language": "es", "results": [{"score": 0.91}]});
    let t = test_app_with(StubOutcome::Found(expected.clone()));
    let token = access_token(&t.app, "alice").await;

    let (status, body) = identify(&t.app, &token, &[("images", "image/jpeg", JPEG)]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, expected);
    assert_eq!(t.identifier.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_identify_rejects_bad_uploads() {
    let t = test_app();
    let token = access_token(&t.app, "alice").await;

    let (status, _) = identify(&t.app, &token, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = identify(
        &t.app,
        &token,
        &[("images", "image/jpeg", JPEG), ("images", "image/gif", JPEG)],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("image 2"));

    let (status, _) = identify(
        &t.app,
        &token,
        &[
            ("images", "image/jpeg", JPEG),
            ("images", "image/jpeg", JPEG),
            ("images", "image/jpeg", JPEG),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let big = [JPEG, &[0u8; 2048][..]].concat();
    let (status, _) = identify(&t.app, &token, &[("images", "image/jpeg", big.as_slice())]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = identify(&t.app, &token, &[("images", "image/png", &b"plain text"[..])]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(t.identifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_identify_not_found_and_upstream_failure() {
    let t = test_app_with(StubOutcome::NotFound);
    let token = access_token(&t.app, "alice").await;
    let (status, body) = identify(&t.app, &token, &[("images", "image/jpeg", JPEG)]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "The requested plant could not be found.");
    assert_eq!(body["results"], json!([]));

    let t = test_app_with(StubOutcome::Down);
    let token = access_token(&t.app, "alice").await;
    let (status, body) = identify(&t.app, &token, &[("images", "image/jpeg", JPEG)]).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "BAD_GATEWAY");
}

#[tokio::test]
async fn test_identify_forbidden_for_inactive_user() {
    let t = test_app();
    let token = access_token(&t.app, "alice").await;

    let mut user = t
        .storage
        .get_user_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    user.is_active = false;
    t.storage.update_user(user).await.unwrap();

    let (status, _) = identify(&t.app, &token, &[("images", "image/jpeg", JPEG)]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_token_for_deleted_subject_is_unauthorized() {
    let t = test_app();
    let state_tokens = crate::auth::TokenService::new(&auth_config());
    let token = state_tokens.issue("ghost", TokenKind::Access).unwrap();

    let (status, body) = send(&t.app, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}
