// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Carbon-Tracker API Server
//!
//! Converts logged business activity into tCO2e and serves dashboards,
//! goals, AI insights and reports.

use carbon_tracker::{
    config::Config,
    db::FirestoreDb,
    services::{FallbackPool, InsightsService},
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired reports and stale in-memory entries are cleaned up.
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Carbon-Tracker API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Load fallback insights
    let fallback = match &config.fallback_insights_path {
        Some(path) => {
            tracing::info!(path = %path, "Loading fallback insights");
            FallbackPool::load_from_file(path)?
        }
        None => FallbackPool::builtin()?,
    };
    tracing::info!(count = fallback.len(), "Fallback insights loaded");

    let insights = InsightsService::new(
        config.ai_api_url.clone(),
        config.ai_api_key.clone(),
        fallback,
    )?;
    if !insights.provider_configured() {
        tracing::warn!("AI_API_URL not set, insights will use fallback content only");
    }

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db, insights));

    tokio::spawn(run_maintenance(state.clone()));

    // Build router
    let app = carbon_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Periodic cleanup. Firestore's TTL policy deletes expired reports
/// eventually; this removes them promptly.
async fn run_maintenance(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(MAINTENANCE_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        match state.db.delete_expired_reports(chrono::Utc::now()).await {
            Ok(count) => tracing::debug!(count, "Expired report sweep complete"),
            Err(e) => tracing::warn!(error = %e, "Expired report sweep failed"),
        }

        let windows = state.rate_limiter.prune();
        let summaries = state.summary_cache.purge_expired();
        tracing::debug!(windows, summaries, "Pruned in-memory state");
    }
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("carbon_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
