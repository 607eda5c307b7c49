// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-client rate limiting middleware.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Key used when no client address can be determined.
const UNKNOWN_CLIENT: &str = "unknown";

/// Reject requests once the client's window is exhausted.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer, &state.config.trusted_proxies);

    if let Err(exceeded) = state.rate_limiter.check(&key) {
        // Round up so clients never retry early
        let retry_after_secs = exceeded.retry_after.as_secs()
            + u64::from(exceeded.retry_after.subsec_nanos() > 0);
        tracing::warn!(client = %key, retry_after_secs, "Rate limit exceeded");
        return Err(AppError::RateLimited {
            retry_after_secs: retry_after_secs.max(1),
        });
    }

    Ok(next.run(request).await)
}

/// Identify the caller.
///
/// Forwarding headers are only believed when the socket peer is one of
/// `trusted_proxies`. Then the right-most `X-Forwarded-For` hop that is
/// not itself a trusted proxy wins; everything left of it is client
/// supplied. Otherwise the key is the socket peer.
pub fn client_key(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trusted_proxies: &[IpAddr],
) -> String {
    let Some(peer_ip) = peer.map(|addr| addr.ip()) else {
        return UNKNOWN_CLIENT.to_string();
    };
    if !trusted_proxies.contains(&peer_ip) {
        return peer_ip.to_string();
    }

    let forwarded = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(','))
        .map(str::trim)
        .filter_map(|hop| hop.parse::<IpAddr>().ok())
        .filter(|ip| !trusted_proxies.contains(ip))
        .last();

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.trim().parse::<IpAddr>().ok())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(peer_ip)
        .to_string()
}
