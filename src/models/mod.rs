// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod analysis;
pub mod calculation;
pub mod goal;
pub mod report;
pub mod summary;

pub use analysis::{AiAnalysis, AnalysisContent, AnalysisSource};
pub use calculation::{ActivityType, Calculation, CalculationInputs};
pub use goal::{Goal, GoalCategory, GoalStatus, TargetType};
pub use report::{AiInsightsSnapshot, DataSnapshot, Report};
pub use summary::{DashboardSummary, EmissionsSummary, TrendBucket, TrendPoint};

/// Clamp a percentage to [0, 100] for display. NaN maps to 0.
pub fn clamp_percentage(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// Round a tCO2e figure for display. Storage keeps full precision.
pub fn round_display(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
