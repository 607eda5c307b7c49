// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod account;
pub mod calculations;
pub mod dashboard;
pub mod factors;
pub mod goals;
pub mod insights;
pub mod reports;

use crate::error::AppError;
use crate::middleware::{rate_limit, require_auth};
use crate::time_utils::parse_rfc3339;
use crate::AppState;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
    pub ai_provider: bool,
}

/// Health check response
async fn health_check(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
        ai_provider: state.insights.provider_configured(),
    })
}

async fn not_found() -> AppError {
    AppError::NotFound("No such endpoint".to_string())
}

/// Parse an optional RFC3339 query parameter.
pub(crate) fn parse_datetime_param(
    name: &str,
    raw: Option<&str>,
) -> Result<Option<DateTime<Utc>>, AppError> {
    raw.map(|value| {
        parse_rfc3339(value).ok_or_else(|| {
            AppError::Validation(format!(
                "Invalid '{}' parameter: must be RFC3339 datetime",
                name
            ))
        })
    })
    .transpose()
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .expose_headers([header::RETRY_AFTER, header::CONTENT_DISPOSITION]);

    // Public routes (no auth required)
    let public_routes = Router::new().route("/health", get(health_check));

    // Protected routes: rate limited first, then authenticated
    let protected_routes = Router::new()
        .merge(factors::routes())
        .merge(calculations::routes())
        .merge(dashboard::routes())
        .merge(goals::routes())
        .merge(insights::routes())
        .merge(reports::routes())
        .merge(account::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_param() {
        assert_eq!(parse_datetime_param("after", None).unwrap(), None);
        assert!(parse_datetime_param("after", Some("2026-01-01T00:00:00Z"))
            .unwrap()
            .is_some());
        assert!(matches!(
            parse_datetime_param("after", Some("2026-01-01")),
            Err(AppError::Validation(_))
        ));
    }
}
