// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard aggregates.

use crate::db::{CalculationFilter, MAX_QUERY_RECORDS};
use crate::error::{AppError, Result};
use crate::extract::ApiQuery;
use crate::middleware::auth::AuthUser;
use crate::models::{round_display, DashboardSummary, TrendBucket, TrendPoint};
use crate::routes::goals::load_goals;
use crate::services::aggregator;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_TREND_DAYS: i64 = 30;
const MAX_TREND_DAYS: i64 = 366;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/dashboard/summary", get(get_summary))
        .route("/api/dashboard/trend", get(get_trend))
}

/// Summary for `user_id`, served from the per-user cache while fresh.
///
/// Returns the summary and whether it came from the cache.
pub(crate) async fn load_summary(
    state: &AppState,
    user_id: &str,
) -> Result<(DashboardSummary, bool)> {
    if let Some(summary) = state.summary_cache.get(user_id) {
        return Ok((summary, true));
    }

    let (records, goals) = tokio::try_join!(
        state.db.all_calculations(user_id),
        load_goals(state, user_id),
    )?;

    let summary = aggregator::dashboard_summary(&records, &goals, Utc::now());
    tracing::debug!(
        user_id,
        calculations = records.len(),
        goals = goals.len(),
        "Computed dashboard summary"
    );

    state.summary_cache.insert(user_id, summary.clone());
    Ok((summary, false))
}

#[derive(Serialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub summary: DashboardSummary,
    pub total_emissions_display: f64,
    pub current_period_emissions_display: f64,
    pub cached: bool,
}

async fn get_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SummaryResponse>> {
    let (summary, cached) = load_summary(&state, &user.user_id).await?;

    Ok(Json(SummaryResponse {
        total_emissions_display: round_display(summary.total_emissions, 3),
        current_period_emissions_display: round_display(summary.current_period_emissions, 3),
        summary,
        cached,
    }))
}

#[derive(Deserialize)]
struct TrendQuery {
    bucket: Option<String>,
    days: Option<i64>,
}

#[derive(Serialize)]
pub struct TrendResponse {
    pub bucket: TrendBucket,
    pub days: i64,
    pub points: Vec<TrendPoint>,
}

/// Emissions per day/week/month over a trailing window.
async fn get_trend(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<TrendQuery>,
) -> Result<Json<TrendResponse>> {
    let bucket = params
        .bucket
        .as_deref()
        .map(str::parse::<TrendBucket>)
        .transpose()?
        .unwrap_or(TrendBucket::Day);

    let days = params.days.unwrap_or(DEFAULT_TREND_DAYS);
    if !(1..=MAX_TREND_DAYS).contains(&days) {
        return Err(AppError::Validation(format!(
            "days must be between 1 and {}",
            MAX_TREND_DAYS
        )));
    }

    let now = Utc::now();
    let window_start = now - Duration::days(days);
    let filter = CalculationFilter {
        activity_type: None,
        after: Some(window_start),
        before: None,
    };
    let records = state
        .db
        .list_calculations(&user.user_id, &filter, MAX_QUERY_RECORDS)
        .await?;

    Ok(Json(TrendResponse {
        bucket,
        days,
        points: aggregator::trend(&records, bucket, window_start, now),
    }))
}
