//! Dashboard aggregates derived from a user's calculation history.
//!
//! Nothing here is persisted: summaries are recomputed on read and fronted
//! by a short-lived per-user cache.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::models::calculation::UnknownVariant;
use crate::models::{ActivityType, Calculation};

/// Granularity of a trend series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendBucket {
    Day,
    Week,
    Month,
}

impl FromStr for TrendBucket {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(TrendBucket::Day),
            "week" => Ok(TrendBucket::Week),
            "month" => Ok(TrendBucket::Month),
            other => Err(UnknownVariant {
                kind: "trend bucket",
                value: other.to_string(),
            }),
        }
    }
}

/// One bucket of a trend series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Bucket start date ("YYYY-MM-DD")
    pub period: String,
    pub emissions: f64,
    pub count: u32,
}

/// Everything the dashboard renders, computed in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    // ─── Totals ──────────────────────────────────────────────────
    pub total_emissions: f64,
    pub total_calculations: u32,
    /// Trailing 30 days
    pub current_period_emissions: f64,
    /// The 30 days before the current period
    pub previous_period_emissions: f64,
    pub reduction_percentage: f64,

    // ─── Breakdown ───────────────────────────────────────────────
    pub by_type: BTreeMap<ActivityType, f64>,
    pub dominant_category: Option<ActivityType>,

    // ─── Time Series ─────────────────────────────────────────────
    pub daily_trend: Vec<TrendPoint>,

    // ─── Goals ───────────────────────────────────────────────────
    pub active_goals: u32,
    pub completed_goals: u32,
    pub sustainability_score: f64,

    pub recent_calculations: Vec<Calculation>,
    /// RFC3339 time the summary was computed
    pub generated_at: String,
}

/// Compact figures handed to the AI commentary provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionsSummary {
    pub total_emissions: f64,
    pub calculation_count: u32,
    pub by_type: BTreeMap<ActivityType, f64>,
    pub dominant_category: Option<ActivityType>,
    pub reduction_percentage: f64,
}

impl From<&DashboardSummary> for EmissionsSummary {
    fn from(summary: &DashboardSummary) -> Self {
        Self {
            total_emissions: summary.total_emissions,
            calculation_count: summary.total_calculations,
            by_type: summary.by_type.clone(),
            dominant_category: summary.dominant_category,
            reduction_percentage: summary.reduction_percentage,
        }
    }
}
