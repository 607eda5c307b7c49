// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! AI commentary provider client with a static fallback pool.
//!
//! The provider is a single JSON endpoint. When it is not configured, times
//! out, or returns something unusable, commentary comes from a canned pool
//! keyed by the dominant emissions category.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{ActivityType, AnalysisContent, AnalysisSource, EmissionsSummary};

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(20);
const BUILTIN_POOL: &str = include_str!("../../data/fallback_insights.json");
const TOTAL_PLACEHOLDER: &str = "{total}";

// ─── Fallback Pool ───────────────────────────────────────────

#[derive(Deserialize)]
struct PoolFile {
    #[serde(default)]
    electricity: Vec<AnalysisContent>,
    #[serde(default)]
    vehicle: Vec<AnalysisContent>,
    #[serde(default)]
    shipping: Vec<AnalysisContent>,
    #[serde(default)]
    supply_chain: Vec<AnalysisContent>,
    general: Vec<AnalysisContent>,
}

/// Hand-authored commentary, keyed by dominant category.
#[derive(Debug, Clone)]
pub struct FallbackPool {
    by_category: HashMap<ActivityType, Vec<AnalysisContent>>,
    general: Vec<AnalysisContent>,
}

impl FallbackPool {
    /// The pool compiled into the binary.
    pub fn builtin() -> Result<Self, FallbackError> {
        Self::load_from_json(BUILTIN_POOL)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, FallbackError> {
        let json =
            fs::read_to_string(path.as_ref()).map_err(|e| FallbackError::Io(e.to_string()))?;
        Self::load_from_json(&json)
    }

    pub fn load_from_json(json: &str) -> Result<Self, FallbackError> {
        let file: PoolFile =
            serde_json::from_str(json).map_err(|e| FallbackError::Parse(e.to_string()))?;

        if file.general.is_empty() {
            return Err(FallbackError::NoGeneralEntries);
        }

        let by_category = HashMap::from([
            (ActivityType::Electricity, file.electricity),
            (ActivityType::Vehicle, file.vehicle),
            (ActivityType::Shipping, file.shipping),
            (ActivityType::SupplyChain, file.supply_chain),
        ]);

        let pool = Self {
            by_category,
            general: file.general,
        };
        tracing::info!(entries = pool.len(), "Loaded fallback insights");
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.general.len() + self.by_category.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pick an entry for `summary`. `seed` selects among equally valid entries.
    pub fn pick(&self, summary: &EmissionsSummary, seed: u64) -> AnalysisContent {
        let entries = summary
            .dominant_category
            .and_then(|c| self.by_category.get(&c))
            .filter(|entries| !entries.is_empty())
            .unwrap_or(&self.general);

        let mut content = entries[(seed % entries.len() as u64) as usize].clone();
        content.summary = content.summary.replace(
            TOTAL_PLACEHOLDER,
            &format!("{:.3}", summary.total_emissions),
        );
        content
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FallbackError {
    #[error("Failed to read fallback insights: {0}")]
    Io(String),

    #[error("Failed to parse fallback insights: {0}")]
    Parse(String),

    #[error("Fallback insights must contain at least one general entry")]
    NoGeneralEntries,
}

// ─── Provider Client ─────────────────────────────────────────

#[derive(Serialize)]
struct ProviderRequest<'a> {
    summary: &'a EmissionsSummary,
}

/// Commentary service used by the insights routes.
#[derive(Clone)]
pub struct InsightsService {
    http: reqwest::Client,
    endpoint: Option<String>,
    api_key: Option<String>,
    fallback: Arc<FallbackPool>,
}

impl InsightsService {
    /// Create a service. With no `endpoint`, every request uses the fallback pool.
    pub fn new(
        endpoint: Option<String>,
        api_key: Option<String>,
        fallback: FallbackPool,
    ) -> Result<Self, InsightsError> {
        let http = reqwest::Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .map_err(|e| InsightsError::Request(e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            api_key,
            fallback: Arc::new(fallback),
        })
    }

    /// Service without a provider, for tests and local development.
    pub fn offline(fallback: FallbackPool) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: None,
            api_key: None,
            fallback: Arc::new(fallback),
        }
    }

    pub fn provider_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Call the provider. No fallback is applied here.
    pub async fn generate_analysis(
        &self,
        summary: &EmissionsSummary,
    ) -> Result<AnalysisContent, InsightsError> {
        let endpoint = self.endpoint.as_deref().ok_or(InsightsError::NotConfigured)?;

        let mut request = self.http.post(endpoint).json(&ProviderRequest { summary });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| InsightsError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InsightsError::Status(status.as_u16(), body));
        }

        let content: AnalysisContent = response
            .json()
            .await
            .map_err(|e| InsightsError::InvalidResponse(e.to_string()))?;

        if content.summary.trim().is_empty() {
            return Err(InsightsError::InvalidResponse(
                "empty summary".to_string(),
            ));
        }
        Ok(content)
    }

    /// Fallback commentary for `summary`.
    pub fn fallback_for(&self, summary: &EmissionsSummary, seed: u64) -> AnalysisContent {
        self.fallback.pick(summary, seed)
    }

    /// Provider commentary, degrading to the fallback pool on any failure.
    pub async fn analyze(&self, summary: &EmissionsSummary) -> (AnalysisContent, AnalysisSource) {
        match self.generate_analysis(summary).await {
            Ok(content) => (content, AnalysisSource::Provider),
            Err(InsightsError::NotConfigured) => {
                tracing::debug!("AI provider not configured, using fallback insights");
                (self.fallback_for(summary, fallback_seed()), AnalysisSource::Fallback)
            }
            Err(e) => {
                tracing::warn!(error = %e, "AI provider failed, using fallback insights");
                (self.fallback_for(summary, fallback_seed()), AnalysisSource::Fallback)
            }
        }
    }
}

fn fallback_seed() -> u64 {
    chrono::Utc::now().timestamp_subsec_nanos() as u64
}

/// Errors from the AI commentary provider.
#[derive(Debug, thiserror::Error)]
pub enum InsightsError {
    #[error("AI provider not configured")]
    NotConfigured,

    #[error("AI provider request failed: {0}")]
    Request(String),

    #[error("AI provider returned HTTP {0}: {1}")]
    Status(u16, String),

    #[error("AI provider returned an invalid response: {0}")]
    InvalidResponse(String),
}
