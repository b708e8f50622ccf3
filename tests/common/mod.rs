// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use betty_api::config::Config;
use betty_api::db::{FirestoreDb, MemoryStore, Store};
use betty_api::routes::create_router;
use betty_api::services::FirebaseTokenVerifier;
use betty_api::time_utils::{Clock, FixedClock};
use betty_api::AppState;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde_json::json;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub const TEST_SECRET: &[u8] = b"firebase-test-secret-32-bytes!!!";
pub const TEST_KID: &str = "test-kid";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("betty-test")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Everything a test needs to drive the app and poke at its state.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub clock: Arc<FixedClock>,
}

/// Create a test app backed by the in-memory store.
///
/// The clock starts at the current wall time so freshly minted tokens are
/// valid; tests may move it forward afterwards.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_store(Arc::new(MemoryStore::new()))
}

/// Create a test app on top of an arbitrary store.
#[allow(dead_code)]
pub fn create_test_app_with_store(db: Arc<dyn Store>) -> TestApp {
    let config = Config::test_default();
    let verifier = FirebaseTokenVerifier::new_with_static_key(
        &config,
        TEST_KID,
        Algorithm::HS256,
        DecodingKey::from_secret(TEST_SECRET),
    )
    .expect("static key verifier");

    let clock = Arc::new(FixedClock::new(Utc::now()));
    let state = Arc::new(AppState::new(
        config,
        db,
        Arc::new(verifier),
        clock.clone() as Arc<dyn Clock>,
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        clock,
    }
}

#[allow(dead_code)]
fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Mint a Firebase-style ID token for `uid`, signed with the test key.
#[allow(dead_code)]
pub fn id_token(uid: &str, email: &str) -> String {
    let now = now_secs();
    id_token_with_claims(json!({
        "iss": "https://securetoken.google.com/betty-test",
        "aud": "betty-test",
        "sub": uid,
        "iat": now,
        "auth_time": now,
        "exp": now + 3600,
        "email": email,
        "email_verified": true,
        "given_name": "Test",
        "family_name": "User",
    }))
}

/// Sign arbitrary claims with the test key.
#[allow(dead_code)]
pub fn id_token_with_claims(claims: serde_json::Value) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(TEST_KID.to_string());
    encode(&header, &claims, &EncodingKey::from_secret(TEST_SECRET)).unwrap()
}

/// Build a request with a bearer token and optional JSON body.
#[allow(dead_code)]
pub fn authed_request(
    method: &str,
    uri: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Sign a user in once and flag them as admin directly in the store.
#[allow(dead_code)]
pub async fn make_admin(app: &TestApp, uid: &str, email: &str) -> String {
    use betty_api::db::UserStore;
    use tower::ServiceExt;

    let token = id_token(uid, email);
    let response = app
        .router
        .clone()
        .oneshot(authed_request("GET", "/api/me", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let mut user = app.state.db.get_user(uid).await.unwrap().unwrap();
    user.is_admin = true;
    app.state.db.save_user(&user).await.unwrap();
    token
}
