//! End-to-end API tests driving the router through tower's `oneshot`.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

use tally_server::config::ServerConfig;
use tally_server::{AppState, router};

/// Build an app backed by a fresh in-memory database.
///
/// One connection with recycling disabled, so the in-memory database lives
/// as long as the pool.
async fn test_app() -> (Router, AppState, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(":memory:")
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let config = ServerConfig {
        database_url: SecretString::from("sqlite::memory:"),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        token_secret: SecretString::from("kX9#mP2$vL8@qR4!wN6^zT0&bG5*dJ3%"),
        token_ttl_minutes: 30,
        sentry_dsn: None,
        sentry_environment: None,
    };

    let state = AppState::new(config, pool.clone());
    (router(state.clone()), state, pool)
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed_json_request(method: &str, uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Register an account and return its bearer token and user id.
async fn register_and_login(app: &Router, username: &str, email: &str) -> (String, String) {
    let (status, _) = send(
        app,
        json_request(
            "POST",
            "/users/register",
            &json!({ "username": username, "email": email, "password": "s3cret-passphrase" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/users/login",
            &json!({ "username": username, "password": "s3cret-passphrase" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    (
        body["access_token"].as_str().unwrap().to_owned(),
        body["user_id"].as_str().unwrap().to_owned(),
    )
}

#[tokio::test]
async fn register_returns_created_account() {
    let (app, _, _pool) = test_app().await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/users/register",
            &json!({ "username": "alice", "email": "alice@example.com", "password": "s3cret-passphrase" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
    assert!(body["last_login"].is_null());
    // The digest must never appear in any response
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn register_conflicts_on_taken_username_and_email() {
    let (app, _, _pool) = test_app().await;
    register_and_login(&app, "bob", "bob@example.com").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/users/register",
            &json!({ "username": "bob", "email": "fresh@example.com", "password": "s3cret-passphrase" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "username already exists");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/users/register",
            &json!({ "username": "fresh", "email": "bob@example.com", "password": "s3cret-passphrase" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "email already exists");
}

#[tokio::test]
async fn login_failures_share_status_and_message() {
    let (app, _, _pool) = test_app().await;
    register_and_login(&app, "carol", "carol@example.com").await;

    let (unknown_status, unknown_body) = send(
        &app,
        json_request(
            "POST",
            "/users/login",
            &json!({ "username": "nobody", "password": "s3cret-passphrase" }),
        ),
    )
    .await;
    let (wrong_status, wrong_body) = send(
        &app,
        json_request(
            "POST",
            "/users/login",
            &json!({ "username": "carol", "password": "wrong-passphrase" }),
        ),
    )
    .await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_body, wrong_body);
}

#[tokio::test]
async fn me_requires_valid_token() {
    let (app, state, _pool) = test_app().await;

    let (status, _) = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/users/me")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (token, user_id) = register_and_login(&app, "dave", "dave@example.com").await;
    let (status, body) = send(&app, authed_request("GET", "/users/me", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user_id.as_str());
    assert_eq!(body["username"], "dave");
    // Login stamped the timestamp
    assert!(body["last_login"].is_string());

    // A token signed for a past expiry is dead on arrival
    let expired = state
        .tokens()
        .issue(
            user_id.parse::<uuid::Uuid>().unwrap().into(),
            Some(chrono::Duration::seconds(-60)),
        )
        .unwrap();
    let (status, _) = send(&app, authed_request("GET", "/users/me", &expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_updates_are_partial() {
    let (app, _, _pool) = test_app().await;
    let (token, _) = register_and_login(&app, "erin", "erin@example.com").await;

    let (status, body) = send(
        &app,
        authed_json_request(
            "PUT",
            "/users/me",
            &token,
            &json!({ "full_name": "Erin Example" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Erin Example");
    // Untouched fields keep their values
    assert_eq!(body["username"], "erin");
    assert_eq!(body["email"], "erin@example.com");

    let (status, body) = send(
        &app,
        authed_json_request("PUT", "/users/me", &token, &json!({ "bio": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "hello");
    assert_eq!(body["full_name"], "Erin Example");
}

#[tokio::test]
async fn change_password_rotates_credentials() {
    let (app, _, _pool) = test_app().await;
    let (token, _) = register_and_login(&app, "frank", "frank@example.com").await;

    let (status, _) = send(
        &app,
        authed_json_request(
            "POST",
            "/users/change-password",
            &token,
            &json!({ "current_password": "not-the-password", "new_password": "replacement-pass" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        authed_json_request(
            "POST",
            "/users/change-password",
            &token,
            &json!({ "current_password": "s3cret-passphrase", "new_password": "replacement-pass" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    // Old password is dead, new one works
    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/users/login",
            &json!({ "username": "frank", "password": "s3cret-passphrase" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/users/login",
            &json!({ "username": "frank", "password": "replacement-pass" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn create_calculation_computes_result() {
    let (app, _, _pool) = test_app().await;
    let (token, user_id) = register_and_login(&app, "grace", "grace@example.com").await;

    let (status, body) = send(
        &app,
        authed_json_request(
            "POST",
            "/calculations",
            &token,
            &json!({ "a": 10.0, "b": 5.0, "type": "Add" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result"], 15.0);
    assert_eq!(body["type"], "Add");
    assert_eq!(body["user_id"], user_id.as_str());
}

#[tokio::test]
async fn invalid_calculation_is_rejected_and_not_persisted() {
    let (app, _, _pool) = test_app().await;
    let (token, _) = register_and_login(&app, "heidi", "heidi@example.com").await;

    let (status, _) = send(
        &app,
        authed_json_request(
            "POST",
            "/calculations",
            &token,
            &json!({ "a": 1.0, "b": 0.0, "type": "Divide" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        authed_json_request(
            "POST",
            "/calculations",
            &token,
            &json!({ "a": 7.0, "b": 0.0, "type": "Modulo" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, authed_request("GET", "/calculations", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn update_recomputes_result_and_failed_update_changes_nothing() {
    let (app, _, _pool) = test_app().await;
    let (token, _) = register_and_login(&app, "ivan", "ivan@example.com").await;

    let (_, created) = send(
        &app,
        authed_json_request(
            "POST",
            "/calculations",
            &token,
            &json!({ "a": 10.0, "b": 5.0, "type": "Add" }),
        ),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    // Patch a and the operation; b carries over from the stored record
    let (status, body) = send(
        &app,
        authed_json_request(
            "PUT",
            &format!("/calculations/{id}"),
            &token,
            &json!({ "a": 50.0, "type": "Multiply" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["b"], 5.0);
    assert_eq!(body["result"], 250.0);

    // A patch producing an undefined result leaves the record untouched
    let (status, _) = send(
        &app,
        authed_json_request(
            "PATCH",
            &format!("/calculations/{id}"),
            &token,
            &json!({ "b": 0.0, "type": "Divide" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        authed_request("GET", &format!("/calculations/{id}"), &token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "Multiply");
    assert_eq!(body["result"], 250.0);
}

#[tokio::test]
async fn foreign_records_read_as_missing() {
    let (app, _, _pool) = test_app().await;
    let (owner_token, _) = register_and_login(&app, "judy", "judy@example.com").await;
    let (intruder_token, _) = register_and_login(&app, "mallory", "mallory@example.com").await;

    let (_, created) = send(
        &app,
        authed_json_request(
            "POST",
            "/calculations",
            &owner_token,
            &json!({ "a": 2.0, "b": 8.0, "type": "Power" }),
        ),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    // Someone else's record and a nonexistent one must be identical
    let (foreign_status, foreign_body) = send(
        &app,
        authed_request("GET", &format!("/calculations/{id}"), &intruder_token),
    )
    .await;
    let (absent_status, absent_body) = send(
        &app,
        authed_request(
            "GET",
            &format!("/calculations/{}", uuid::Uuid::new_v4()),
            &intruder_token,
        ),
    )
    .await;
    assert_eq!(foreign_status, StatusCode::NOT_FOUND);
    assert_eq!(absent_status, StatusCode::NOT_FOUND);
    assert_eq!(foreign_body, absent_body);

    // Delete and update are filtered the same way
    let (status, _) = send(
        &app,
        authed_request("DELETE", &format!("/calculations/{id}"), &intruder_token),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        authed_request("GET", &format!("/calculations/{id}"), &owner_token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn summary_aggregates_own_records() {
    let (app, _, _pool) = test_app().await;
    let (token, _) = register_and_login(&app, "oscar", "oscar@example.com").await;

    for (a, b, op) in [
        (1.0, 1.0, "Add"),
        (2.0, 2.0, "Add"),
        (3.0, 3.0, "Multiply"),
    ] {
        let (status, _) = send(
            &app,
            authed_json_request(
                "POST",
                "/calculations",
                &token,
                &json!({ "a": a, "b": b, "type": op }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, authed_request("GET", "/calculations/summary", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["operations_breakdown"]["Add"], 2);
    assert_eq!(body["operations_breakdown"]["Multiply"], 1);
    assert_eq!(body["most_used_operation"], "Add");
    assert_eq!(body["last_result"], 9.0);
    // (2 + 4 + 9) / 3
    assert_eq!(body["average_result"], 5.0);
}

#[tokio::test]
async fn summary_of_empty_account() {
    let (app, _, _pool) = test_app().await;
    let (token, _) = register_and_login(&app, "peggy", "peggy@example.com").await;

    let (status, body) = send(&app, authed_request("GET", "/calculations/summary", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert!(body["average_result"].is_null());
    assert!(body["last_result"].is_null());
    assert!(body["most_used_operation"].is_null());
}

#[tokio::test]
async fn pagination_is_newest_first() {
    let (app, _, _pool) = test_app().await;
    let (token, _) = register_and_login(&app, "trent", "trent@example.com").await;

    for a in 0..5 {
        send(
            &app,
            authed_json_request(
                "POST",
                "/calculations",
                &token,
                &json!({ "a": f64::from(a), "b": 1.0, "type": "Add" }),
            ),
        )
        .await;
    }

    let (status, body) = send(
        &app,
        authed_request("GET", "/calculations?skip=1&limit=2", &token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let page = body.as_array().unwrap();
    assert_eq!(page.len(), 2);
    // Newest first: skipping one lands on the second most recent
    assert_eq!(page[0]["a"], 3.0);
    assert_eq!(page[1]["a"], 2.0);
}

#[tokio::test]
async fn deleting_an_account_cascades_to_its_records() {
    let (app, _, pool) = test_app().await;
    let (token, user_id) = register_and_login(&app, "victor", "victor@example.com").await;

    send(
        &app,
        authed_json_request(
            "POST",
            "/calculations",
            &token,
            &json!({ "a": 4.0, "b": 2.0, "type": "Subtract" }),
        ),
    )
    .await;

    let (status, _) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/users/{user_id}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The account is gone, its token is dead, and its records went with it
    let (status, _) = send(
        &app,
        Request::builder()
            .method("GET")
            .uri(format!("/users/{user_id}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, authed_request("GET", "/users/me", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM calculations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn user_listing_pages_in_insertion_order() {
    let (app, _, _pool) = test_app().await;
    register_and_login(&app, "user1", "user1@example.com").await;
    register_and_login(&app, "user2", "user2@example.com").await;
    register_and_login(&app, "user3", "user3@example.com").await;

    let (status, body) = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/users?skip=1&limit=1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let page = body.as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["username"], "user2");
}

#[tokio::test]
async fn health_endpoints_respond() {
    let (app, _, _pool) = test_app().await;

    let (status, _) = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/health/ready")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_update_edits_any_account() {
    let (app, _, _pool) = test_app().await;
    let (_, user_id) = register_and_login(&app, "walter", "walter@example.com").await;

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/users/{user_id}"),
            &json!({ "bio": "set by admin" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "set by admin");
    assert_eq!(body["username"], "walter");

    let (status, _) = send(
        &app,
        json_request(
            "PUT",
            &format!("/users/{}", uuid::Uuid::new_v4()),
            &json!({ "bio": "nobody home" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
