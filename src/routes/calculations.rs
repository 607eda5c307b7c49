// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Emissions calculations: preview, create, list, edit, delete.

use crate::db::{CalculationFilter, MAX_QUERY_RECORDS};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::auth::AuthUser;
use crate::models::{round_display, ActivityType, Calculation, CalculationInputs};
use crate::routes::parse_datetime_param;
use crate::services::calculator;
use crate::time_utils::{format_utc_rfc3339, parse_rfc3339};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const DEFAULT_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 100;
const DISPLAY_PLACES: u32 = 3;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/calculations/preview", post(preview_calculation))
        .route(
            "/api/calculations",
            post(create_calculation).get(list_calculations),
        )
        .route(
            "/api/calculations/{id}",
            get(get_calculation)
                .put(update_calculation)
                .delete(delete_calculation),
        )
}

// ─── Responses ───────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PreviewResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub activity_type: ActivityType,
    /// tCO2e, full precision
    pub emissions: f64,
    pub emissions_display: f64,
}

/// Stored calculation plus its display value.
#[derive(Serialize)]
pub struct CalculationResponse {
    #[serde(flatten)]
    pub calculation: Calculation,
    pub emissions_display: f64,
}

impl From<Calculation> for CalculationResponse {
    fn from(calculation: Calculation) -> Self {
        let emissions_display = round_display(calculation.emissions, DISPLAY_PLACES);
        Self {
            calculation,
            emissions_display,
        }
    }
}

#[derive(Serialize)]
pub struct CalculationListResponse {
    pub calculations: Vec<CalculationResponse>,
    pub next_cursor: Option<String>,
}

// ─── Handlers ────────────────────────────────────────────────

/// Compute emissions without storing anything.
async fn preview_calculation(
    ApiJson(inputs): ApiJson<CalculationInputs>,
) -> Result<Json<PreviewResponse>> {
    let emissions = calculator::calculate(&inputs)?;
    Ok(Json(PreviewResponse {
        activity_type: inputs.activity_type(),
        emissions,
        emissions_display: round_display(emissions, DISPLAY_PLACES),
    }))
}

async fn create_calculation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(inputs): ApiJson<CalculationInputs>,
) -> Result<(StatusCode, Json<CalculationResponse>)> {
    let emissions = calculator::calculate(&inputs)?;
    let now = format_utc_rfc3339(Utc::now());
    let calculation = Calculation::new(&user.user_id, inputs, emissions, &now);

    state.db.set_calculation(&calculation).await?;
    tracing::info!(
        user_id = %user.user_id,
        calculation_id = %calculation.id,
        activity_type = %calculation.activity_type,
        emissions,
        "Calculation stored"
    );

    Ok((StatusCode::CREATED, Json(calculation.into())))
}

#[derive(Deserialize)]
struct ListQuery {
    /// Filter by activity type
    #[serde(rename = "type")]
    activity_type: Option<String>,
    /// Inclusive lower bound (RFC3339)
    after: Option<String>,
    /// Exclusive upper bound (RFC3339)
    before: Option<String>,
    limit: Option<u32>,
    /// Opaque token from a previous page
    cursor: Option<String>,
}

fn encode_cursor(created_at: &str) -> String {
    URL_SAFE_NO_PAD.encode(created_at)
}

fn decode_cursor(raw: &str) -> Result<DateTime<Utc>> {
    let invalid_cursor = || AppError::Validation("Invalid 'cursor' parameter".to_string());

    let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid_cursor())?;
    let decoded_str = std::str::from_utf8(&decoded).map_err(|_| invalid_cursor())?;
    parse_rfc3339(decoded_str).ok_or_else(invalid_cursor)
}

/// List the user's calculations, newest first.
async fn list_calculations(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<ListQuery>,
) -> Result<Json<CalculationListResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }

    let activity_type = params
        .activity_type
        .as_deref()
        .map(str::parse::<ActivityType>)
        .transpose()?;
    let after = parse_datetime_param("after", params.after.as_deref())?;
    let before = parse_datetime_param("before", params.before.as_deref())?;
    let cursor = params.cursor.as_deref().map(decode_cursor).transpose()?;

    // The cursor narrows the upper bound to just past the previous page
    let before = match (before, cursor) {
        (Some(b), Some(c)) => Some(b.min(c)),
        (b, c) => b.or(c),
    };

    tracing::debug!(
        user_id = %user.user_id,
        activity_type = ?activity_type,
        after = ?after,
        before = ?before,
        limit,
        "Listing calculations"
    );

    let filter = CalculationFilter {
        activity_type,
        after,
        before,
    };

    // Fetch one extra item to determine if another page is available.
    let fetch_limit = (limit + 1).min(MAX_QUERY_RECORDS);
    let mut calculations = state
        .db
        .list_calculations(&user.user_id, &filter, fetch_limit)
        .await?;

    let has_more = calculations.len() > limit as usize;
    if has_more {
        calculations.truncate(limit as usize);
    }
    let next_cursor = if has_more {
        calculations.last().map(|c| encode_cursor(&c.created_at))
    } else {
        None
    };

    Ok(Json(CalculationListResponse {
        calculations: calculations.into_iter().map(Into::into).collect(),
        next_cursor,
    }))
}

async fn get_calculation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<CalculationResponse>> {
    let calculation = state
        .db
        .get_calculation(&user.user_id, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Calculation {} not found", id)))?;

    Ok(Json(calculation.into()))
}

/// Explicit edit: replace the inputs and recompute emissions.
async fn update_calculation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(inputs): ApiJson<CalculationInputs>,
) -> Result<Json<CalculationResponse>> {
    let emissions = calculator::calculate(&inputs)?;

    let mut calculation = state
        .db
        .get_calculation(&user.user_id, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Calculation {} not found", id)))?;

    let previous = calculation.emissions;
    calculation.apply_edit(inputs, emissions, &format_utc_rfc3339(Utc::now()));
    state.db.set_calculation(&calculation).await?;

    tracing::info!(
        user_id = %user.user_id,
        calculation_id = %id,
        previous,
        emissions,
        "Calculation edited"
    );

    Ok(Json(calculation.into()))
}

async fn delete_calculation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if !state.db.delete_calculation(&user.user_id, &id).await? {
        return Err(AppError::NotFound(format!("Calculation {} not found", id)));
    }

    tracing::info!(user_id = %user.user_id, calculation_id = %id, "Calculation deleted");
    Ok(StatusCode::NO_CONTENT)
}
