// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod aggregator;
pub mod cache;
pub mod calculator;
pub mod insights;
pub mod pdf;
pub mod rate_limit;
pub mod reports;

pub use cache::TtlCache;
pub use insights::{FallbackPool, InsightsService};
pub use rate_limit::RateLimiter;
pub use reports::{AiInsightsChoice, ReportBuilder, ReportRequest, ReportSource};
