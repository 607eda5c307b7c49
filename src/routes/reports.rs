// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Frozen emissions reports and their PDF rendering.

use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::auth::AuthUser;
use crate::models::{round_display, AiInsightsSnapshot, CalculationInputs, DataSnapshot, Report};
use crate::services::pdf::render_report_pdf;
use crate::services::{AiInsightsChoice, ReportRequest, ReportSource};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_LIST_LIMIT: u32 = 20;
const MAX_LIST_LIMIT: u32 = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reports", get(list_reports).post(create_report))
        .route("/api/reports/{id}", get(get_report).delete(delete_report))
        .route("/api/reports/{id}/pdf", get(get_report_pdf))
}

// ─── Responses ───────────────────────────────────────────────

#[derive(Serialize)]
pub struct ReportResponse {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub data_snapshot: DataSnapshot,
    pub total_emissions_display: f64,
    pub ai_insights_snapshot: Option<AiInsightsSnapshot>,
    pub created_at: String,
    pub expires_at: String,
}

impl From<Report> for ReportResponse {
    fn from(report: Report) -> Self {
        Self {
            total_emissions_display: round_display(report.data_snapshot.total_emissions, 3),
            id: report.id,
            title: report.title,
            summary: report.summary,
            data_snapshot: report.data_snapshot,
            ai_insights_snapshot: report.ai_insights_snapshot,
            created_at: report.created_at,
            expires_at: format_utc_rfc3339(report.expires_at),
        }
    }
}

/// List entry without the frozen calculations.
#[derive(Serialize)]
pub struct ReportListItem {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub total_emissions: f64,
    pub calculation_count: usize,
    pub has_ai_insights: bool,
    pub created_at: String,
    pub expires_at: String,
}

#[derive(Serialize)]
pub struct ReportListResponse {
    pub reports: Vec<ReportListItem>,
}

// ─── Create ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub title: Option<String>,
    pub summary: Option<String>,
    /// Report on this one calculation instead of recent history
    pub calculation: Option<CalculationInputs>,
    /// How many recent calculations to include
    pub limit: Option<u32>,
    /// Use this commentary instead of the latest stored analysis
    pub ai_insights: Option<AiInsightsSnapshot>,
    #[serde(default = "default_include_ai")]
    pub include_ai_insights: bool,
}

fn default_include_ai() -> bool {
    true
}

impl TryFrom<CreateReportRequest> for ReportRequest {
    type Error = AppError;

    fn try_from(request: CreateReportRequest) -> Result<Self> {
        let source = match (request.calculation, request.limit) {
            (Some(_), Some(_)) => {
                return Err(AppError::Validation(
                    "'calculation' and 'limit' are mutually exclusive".to_string(),
                ))
            }
            (Some(inputs), None) => ReportSource::Calculation(inputs),
            (None, limit) => ReportSource::Recent { limit },
        };

        let ai_insights = match (request.ai_insights, request.include_ai_insights) {
            (Some(snapshot), true) => AiInsightsChoice::Override(snapshot),
            (Some(_), false) => {
                return Err(AppError::Validation(
                    "'ai_insights' cannot be supplied when include_ai_insights is false"
                        .to_string(),
                ))
            }
            (None, true) => AiInsightsChoice::Latest,
            (None, false) => AiInsightsChoice::Omit,
        };

        Ok(ReportRequest {
            title: request.title,
            summary: request.summary,
            source,
            ai_insights,
        })
    }
}

async fn create_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(request): ApiJson<CreateReportRequest>,
) -> Result<(StatusCode, Json<ReportResponse>)> {
    let request = ReportRequest::try_from(request)?;
    let report = state.reports.generate(&user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(report.into())))
}

// ─── Read / Delete ───────────────────────────────────────────

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<u32>,
}

async fn list_reports(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<ListQuery>,
) -> Result<Json<ReportListResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if !(1..=MAX_LIST_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_LIST_LIMIT
        )));
    }

    let reports = state.db.list_reports(&user.user_id, limit).await?;
    let reports = reports
        .into_iter()
        .map(|r| ReportListItem {
            total_emissions: r.data_snapshot.total_emissions,
            calculation_count: r.data_snapshot.recent_calcs.len(),
            has_ai_insights: r.ai_insights_snapshot.is_some(),
            expires_at: format_utc_rfc3339(r.expires_at),
            id: r.id,
            title: r.title,
            summary: r.summary,
            created_at: r.created_at,
        })
        .collect();

    Ok(Json(ReportListResponse { reports }))
}

async fn find_report(state: &AppState, user_id: &str, id: &str) -> Result<Report> {
    state
        .db
        .get_report(user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))
}

async fn get_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>> {
    let report = find_report(&state, &user.user_id, &id).await?;
    Ok(Json(report.into()))
}

async fn delete_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if !state.db.delete_report(&user.user_id, &id).await? {
        return Err(AppError::NotFound(format!("Report {} not found", id)));
    }

    tracing::info!(user_id = %user.user_id, report_id = %id, "Report deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Download the report as a PDF.
async fn get_report_pdf(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let report = find_report(&state, &user.user_id, &id).await?;

    // Rendering is CPU-bound
    let bytes = tokio::task::spawn_blocking(move || render_report_pdf(&report))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("PDF task failed: {}", e)))??;

    tracing::debug!(user_id = %user.user_id, report_id = %id, bytes = bytes.len(), "Rendered report PDF");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"carbon-report-{}.pdf\"", id),
            ),
        ],
        bytes,
    ))
}
