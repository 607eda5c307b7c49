// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use carbon_tracker::config::Config;
use carbon_tracker::db::FirestoreDb;
use carbon_tracker::middleware::auth::create_jwt;
use carbon_tracker::routes::create_router;
use carbon_tracker::services::{FallbackPool, InsightsService};
use carbon_tracker::AppState;
use std::sync::Arc;

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
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Unique user ID for test isolation.
#[allow(dead_code)]
pub fn unique_user_id() -> String {
    format!("test-user-{}", uuid::Uuid::new_v4())
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let db = test_db_offline();
    let fallback = FallbackPool::builtin().expect("built-in fallback insights should load");
    let insights = InsightsService::offline(fallback);

    let state = Arc::new(AppState::new(config, db, insights));
    (create_router(state.clone()), state)
}

/// Session token for `user_id` signed with the test key.
#[allow(dead_code)]
pub fn test_token(user_id: &str) -> String {
    create_jwt(user_id, &Config::test_default().jwt_signing_key).expect("JWT should encode")
}

/// Authenticated request with an optional JSON body.
#[allow(dead_code)]
pub fn authed_request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", test_token("user-1")));

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}
