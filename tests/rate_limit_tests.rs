// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-client rate limiting on /api routes.

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use carbon_tracker::config::Config;
use std::net::SocketAddr;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app_with_config, test_token};

const PROXY: &str = "10.0.0.1";

fn limited_config(max_requests: u32) -> Config {
    Config {
        rate_limit_max_requests: max_requests,
        rate_limit_window_secs: 60,
        ..Config::test_default()
    }
}

fn behind_proxy(max_requests: u32) -> Config {
    Config {
        trusted_proxies: vec![PROXY.parse().unwrap()],
        ..limited_config(max_requests)
    }
}

/// Authenticated request arriving from socket peer `peer_ip`.
fn request_via(peer_ip: &str, forwarded_for: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .uri("/api/factors")
        .header(header::AUTHORIZATION, format!("Bearer {}", test_token("user-1")));
    if let Some(forwarded_for) = forwarded_for {
        builder = builder.header("x-forwarded-for", forwarded_for);
    }

    let mut request = builder.body(Body::empty()).unwrap();
    let peer: SocketAddr = format!("{peer_ip}:40000").parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));
    request
}

fn request_from(ip: &str) -> Request<Body> {
    request_via(ip, None)
}

#[tokio::test]
async fn test_limit_exceeded_returns_429() {
    let (app, _) = create_test_app_with_config(limited_config(3));

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(request_from("203.0.113.5"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(request_from("203.0.113.5"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = response
        .headers()
        .get(header::RETRY_AFTER)
        .expect("Retry-After header")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));

    let body = body_json(response).await;
    assert_eq!(body["error"], "rate_limited");
}

#[tokio::test]
async fn test_clients_are_limited_independently() {
    let (app, state) = create_test_app_with_config(limited_config(1));

    let first = app.clone().oneshot(request_from("203.0.113.5")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let other = app.clone().oneshot(request_from("198.51.100.9")).await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);

    let repeat = app.clone().oneshot(request_from("203.0.113.5")).await.unwrap();
    assert_eq!(repeat.status(), StatusCode::TOO_MANY_REQUESTS);

    assert_eq!(state.rate_limiter.tracked_keys(), 2);
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_reset_limit() {
    let (app, state) = create_test_app_with_config(limited_config(2));

    let mut succeeded = 0;
    for i in 0..10 {
        let forwarded = format!("10.9.9.{i}");
        let response = app
            .clone()
            .oneshot(request_via("203.0.113.5", Some(&forwarded)))
            .await
            .unwrap();
        if response.status() == StatusCode::OK {
            succeeded += 1;
        } else {
            assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        }
    }

    assert_eq!(succeeded, 2);
    assert_eq!(state.rate_limiter.tracked_keys(), 1);
}

#[tokio::test]
async fn test_trusted_proxy_limits_forwarded_clients() {
    let (app, state) = create_test_app_with_config(behind_proxy(1));

    // A forged left-most hop doesn't change the key the proxy appended
    let first = app
        .clone()
        .oneshot(request_via(PROXY, Some("203.0.113.5")))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let forged = app
        .clone()
        .oneshot(request_via(PROXY, Some("1.1.1.1, 203.0.113.5")))
        .await
        .unwrap();
    assert_eq!(forged.status(), StatusCode::TOO_MANY_REQUESTS);

    let other = app
        .clone()
        .oneshot(request_via(PROXY, Some("198.51.100.9")))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::OK);

    assert_eq!(state.rate_limiter.tracked_keys(), 2);
}

#[tokio::test]
async fn test_unauthenticated_requests_count() {
    let (app, _) = create_test_app_with_config(limited_config(1));

    let mut anonymous = Request::builder()
        .uri("/api/factors")
        .body(Body::empty())
        .unwrap();
    anonymous
        .extensions_mut()
        .insert(ConnectInfo("203.0.113.5:40000".parse::<SocketAddr>().unwrap()));
    let response = app.clone().oneshot(anonymous).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.clone().oneshot(request_from("203.0.113.5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_health_not_limited() {
    let (app, _) = create_test_app_with_config(limited_config(1));

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
