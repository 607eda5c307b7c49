// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! AI commentary on a user's emissions.

use crate::error::{AppError, Result};
use crate::extract::ApiQuery;
use crate::middleware::auth::AuthUser;
use crate::models::{AiAnalysis, AnalysisSource, EmissionsSummary};
use crate::routes::dashboard::load_summary;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_HISTORY_LIMIT: u32 = 20;
const MAX_HISTORY_LIMIT: u32 = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/insights", get(list_insights).post(generate_insights))
}

#[derive(Deserialize)]
struct GenerateQuery {
    /// Fail with 502 instead of falling back when the provider is unavailable
    #[serde(default)]
    require_provider: bool,
}

/// Generate commentary for the current summary and append it to history.
async fn generate_insights(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<GenerateQuery>,
) -> Result<(StatusCode, Json<AiAnalysis>)> {
    let (summary, _) = load_summary(&state, &user.user_id).await?;
    let summary = EmissionsSummary::from(&summary);

    let (content, source) = if params.require_provider {
        (
            state.insights.generate_analysis(&summary).await?,
            AnalysisSource::Provider,
        )
    } else {
        state.insights.analyze(&summary).await
    };

    let analysis = AiAnalysis::new(
        &user.user_id,
        content,
        source,
        &format_utc_rfc3339(chrono::Utc::now()),
    );
    state.db.add_analysis(&analysis).await?;

    tracing::info!(
        user_id = %user.user_id,
        analysis_id = %analysis.id,
        source = ?analysis.source,
        "AI analysis stored"
    );

    Ok((StatusCode::CREATED, Json(analysis)))
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<u32>,
}

#[derive(Serialize)]
pub struct InsightsHistoryResponse {
    pub analyses: Vec<AiAnalysis>,
}

/// Analysis history, newest first.
async fn list_insights(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<HistoryQuery>,
) -> Result<Json<InsightsHistoryResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_HISTORY_LIMIT
        )));
    }

    let analyses = state.db.list_analyses(&user.user_id, limit).await?;
    Ok(Json(InsightsHistoryResponse { analyses }))
}
