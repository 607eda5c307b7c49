// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Frozen report snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{AiAnalysis, Calculation};

/// Point-in-time copy of aggregated data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSnapshot {
    /// Sum of `recent_calcs[].emissions` (tCO2e)
    pub total_emissions: f64,
    /// Keyed by activity type name
    #[serde(default)]
    pub by_type: BTreeMap<String, f64>,
    #[serde(default)]
    pub recent_calcs: Vec<Calculation>,
}

/// Copy of an analysis taken when the report was generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiInsightsSnapshot {
    pub summary: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
    #[serde(default)]
    pub innovative_idea: String,
    /// When the source analysis was created (RFC3339), if known
    #[serde(default)]
    pub generated_at: Option<String>,
}

impl From<&AiAnalysis> for AiInsightsSnapshot {
    fn from(analysis: &AiAnalysis) -> Self {
        Self {
            summary: analysis.summary.clone(),
            recommendations: analysis.recommendations.clone(),
            risk_flags: analysis.risk_flags.clone(),
            innovative_idea: analysis.innovative_idea.clone(),
            generated_at: Some(analysis.created_at.clone()),
        }
    }
}

/// Report document stored in Firestore.
///
/// `expires_at` is a native timestamp so a Firestore TTL policy can purge it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub summary: String,
    pub data_snapshot: DataSnapshot,
    #[serde(default)]
    pub ai_insights_snapshot: Option<AiInsightsSnapshot>,
    pub created_at: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub expires_at: DateTime<Utc>,
}

impl Report {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
