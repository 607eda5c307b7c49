// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Carbon-Tracker: Emissions tracking backend
//!
//! This crate provides the backend API for converting business activity
//! (electricity, vehicles, shipping, supply chain) into tCO2e, aggregating
//! it into dashboard metrics, tracking reduction goals, and producing
//! frozen reports with AI commentary.

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use models::DashboardSummary;
use services::{InsightsService, RateLimiter, ReportBuilder, TtlCache};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub insights: InsightsService,
    pub reports: ReportBuilder,
    /// Per-user dashboard summaries
    pub summary_cache: TtlCache<DashboardSummary>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Wire up the derived services from `config`.
    pub fn new(config: Config, db: FirestoreDb, insights: InsightsService) -> Self {
        let reports = ReportBuilder::new(db.clone(), config.report_ttl(), config.report_recent_limit);
        let summary_cache = TtlCache::new(config.summary_cache_ttl());
        let rate_limiter =
            RateLimiter::new(config.rate_limit_max_requests, config.rate_limit_window());

        Self {
            config,
            db,
            insights,
            reports,
            summary_cache,
            rate_limiter,
        }
    }
}
