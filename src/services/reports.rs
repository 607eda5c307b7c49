// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Report generation.
//!
//! A report freezes a user's recent calculations (or one ad-hoc
//! calculation) together with the latest AI commentary. Once stored, the
//! snapshot never changes, even if the underlying calculations do.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{AiInsightsSnapshot, Calculation, CalculationInputs, DataSnapshot, Report};
use crate::services::{aggregator, calculator};
use crate::time_utils::format_utc_rfc3339;

/// Largest number of recent calculations a report may include.
pub const MAX_RECENT_LIMIT: u32 = 100;

/// Where the report's calculations come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportSource {
    /// One ad-hoc calculation. It is computed but not stored as a calculation.
    Calculation(CalculationInputs),
    /// The user's last `limit` calculations (`None` uses the configured default).
    Recent { limit: Option<u32> },
}

/// What to put in the report's AI section.
#[derive(Debug, Clone, PartialEq)]
pub enum AiInsightsChoice {
    /// Copy the most recent stored analysis, if any
    Latest,
    Override(AiInsightsSnapshot),
    Omit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub source: ReportSource,
    pub ai_insights: AiInsightsChoice,
}

/// Freeze `records` into a snapshot. The total always equals the sum of
/// the included records.
pub fn build_snapshot(records: Vec<Calculation>) -> DataSnapshot {
    let by_type: BTreeMap<String, f64> = aggregator::category_breakdown(&records)
        .into_iter()
        .map(|(activity_type, total)| (activity_type.as_str().to_string(), total))
        .collect();

    DataSnapshot {
        total_emissions: aggregator::total_emissions(&records),
        by_type,
        recent_calcs: records,
    }
}

pub fn default_title(now: DateTime<Utc>) -> String {
    format!("Emissions report {}", now.format("%Y-%m-%d"))
}

/// One-paragraph description of a snapshot.
pub fn default_summary(snapshot: &DataSnapshot) -> String {
    let count = snapshot.recent_calcs.len();
    if count == 0 {
        return "No calculations recorded yet.".to_string();
    }

    let largest = aggregator::dominant_category(&aggregator::category_breakdown(
        &snapshot.recent_calcs,
    ));
    let plural = if count == 1 { "" } else { "s" };
    match largest {
        Some(activity_type) => format!(
            "{} calculation{} totalling {:.3} tCO2e. Largest source: {}.",
            count,
            plural,
            snapshot.total_emissions,
            activity_type.label()
        ),
        None => format!(
            "{} calculation{} totalling {:.3} tCO2e.",
            count, plural, snapshot.total_emissions
        ),
    }
}

/// Build the report document. Blank titles and summaries are generated.
pub fn assemble_report(
    user_id: &str,
    title: Option<String>,
    summary: Option<String>,
    snapshot: DataSnapshot,
    ai_insights: Option<AiInsightsSnapshot>,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Report {
    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| default_title(now));
    let summary = summary
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default_summary(&snapshot));

    Report {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        title,
        summary,
        data_snapshot: snapshot,
        ai_insights_snapshot: ai_insights,
        created_at: format_utc_rfc3339(now),
        expires_at: now + ttl,
    }
}

/// Builds and persists reports.
#[derive(Clone)]
pub struct ReportBuilder {
    db: FirestoreDb,
    ttl: Duration,
    default_recent: u32,
}

impl ReportBuilder {
    pub fn new(db: FirestoreDb, ttl: Duration, default_recent: u32) -> Self {
        Self {
            db,
            ttl,
            default_recent: default_recent.clamp(1, MAX_RECENT_LIMIT),
        }
    }

    /// Generate and store a report for `user_id`.
    pub async fn generate(&self, user_id: &str, request: ReportRequest) -> Result<Report, AppError> {
        let now = Utc::now();

        let records = match request.source {
            ReportSource::Calculation(inputs) => {
                let emissions = calculator::calculate(&inputs)?;
                vec![Calculation::new(
                    user_id,
                    inputs,
                    emissions,
                    &format_utc_rfc3339(now),
                )]
            }
            ReportSource::Recent { limit } => {
                let limit = limit.unwrap_or(self.default_recent);
                if !(1..=MAX_RECENT_LIMIT).contains(&limit) {
                    return Err(AppError::Validation(format!(
                        "limit must be between 1 and {}",
                        MAX_RECENT_LIMIT
                    )));
                }
                self.db
                    .list_calculations(user_id, &Default::default(), limit)
                    .await?
            }
        };

        let ai_insights = match request.ai_insights {
            AiInsightsChoice::Override(snapshot) => Some(snapshot),
            AiInsightsChoice::Omit => None,
            AiInsightsChoice::Latest => match self.db.latest_analysis(user_id).await {
                Ok(latest) => latest.as_ref().map(AiInsightsSnapshot::from),
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "Could not load latest analysis for report");
                    None
                }
            },
        };

        let report = assemble_report(
            user_id,
            request.title,
            request.summary,
            build_snapshot(records),
            ai_insights,
            now,
            self.ttl,
        );

        self.db.set_report(&report).await?;
        tracing::info!(
            user_id,
            report_id = %report.id,
            calculations = report.data_snapshot.recent_calcs.len(),
            "Report generated"
        );

        Ok(report)
    }
}
