//! AI commentary history.

use serde::{Deserialize, Serialize};

/// Where an analysis came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Provider,
    Fallback,
}

/// Commentary body, as returned by the provider or the fallback pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContent {
    pub summary: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
    #[serde(default)]
    pub innovative_idea: String,
}

/// Stored analysis record. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub id: String,
    pub user_id: String,
    pub summary: String,
    pub recommendations: Vec<String>,
    pub risk_flags: Vec<String>,
    pub innovative_idea: String,
    pub source: AnalysisSource,
    pub created_at: String,
}

impl AiAnalysis {
    pub fn new(user_id: &str, content: AnalysisContent, source: AnalysisSource, now: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            summary: content.summary,
            recommendations: content.recommendations,
            risk_flags: content.risk_flags,
            innovative_idea: content.innovative_idea,
            source,
            created_at: now.to_string(),
        }
    }
}
