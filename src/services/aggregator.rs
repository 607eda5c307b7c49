// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-side aggregation over a user's calculation history.
//!
//! All functions are pure and accept empty input, returning zeroed or
//! empty results. Source records are never mutated.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;

use crate::models::{
    ActivityType, Calculation, DashboardSummary, Goal, GoalStatus, TrendBucket, TrendPoint,
};
use crate::time_utils::{format_utc_rfc3339, parse_rfc3339};

/// Length of the current and previous comparison windows.
pub const PERIOD_DAYS: i64 = 30;
/// Recent calculations shown on the dashboard.
const DASHBOARD_RECENT: usize = 5;

const SCORE_BASE: f64 = 50.0;
const SCORE_MAX_REDUCTION_SWING: f64 = 30.0;
const SCORE_PER_COMPLETED_GOAL: f64 = 5.0;

fn created_at(record: &Calculation) -> Option<DateTime<Utc>> {
    parse_rfc3339(&record.created_at)
}

pub fn total_emissions(records: &[Calculation]) -> f64 {
    records.iter().map(|r| r.emissions).sum()
}

/// Sum of emissions created in `[start, end)`.
pub fn emissions_in_window(records: &[Calculation], start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    records
        .iter()
        .filter(|r| created_at(r).is_some_and(|t| t >= start && t < end))
        .map(|r| r.emissions)
        .sum()
}

/// Emissions summed per activity type. Types with no records are absent.
pub fn category_breakdown(records: &[Calculation]) -> BTreeMap<ActivityType, f64> {
    let mut breakdown = BTreeMap::new();
    for record in records {
        *breakdown.entry(record.activity_type).or_insert(0.0) += record.emissions;
    }
    breakdown
}

/// Category with the largest share, if any record exists.
pub fn dominant_category(breakdown: &BTreeMap<ActivityType, f64>) -> Option<ActivityType> {
    breakdown
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(category, _)| *category)
}

/// First day of the bucket containing `date`. Weeks start on Monday.
fn bucket_start(date: NaiveDate, bucket: TrendBucket) -> NaiveDate {
    match bucket {
        TrendBucket::Day => date,
        TrendBucket::Week => {
            date - Duration::days(date.weekday().num_days_from_monday() as i64)
        }
        TrendBucket::Month => date.with_day(1).unwrap_or(date),
    }
}

fn next_bucket(start: NaiveDate, bucket: TrendBucket) -> NaiveDate {
    match bucket {
        TrendBucket::Day => start + Duration::days(1),
        TrendBucket::Week => start + Duration::days(7),
        TrendBucket::Month => {
            let (year, month) = if start.month() == 12 {
                (start.year() + 1, 1)
            } else {
                (start.year(), start.month() + 1)
            };
            NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(start + Duration::days(31))
        }
    }
}

/// Sum emissions per bucket for records created in `[window_start, now]`.
///
/// The series is chronological and covers every bucket in the window,
/// including empty ones.
pub fn trend(
    records: &[Calculation],
    bucket: TrendBucket,
    window_start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<TrendPoint> {
    if window_start > now {
        return Vec::new();
    }

    let mut sums: BTreeMap<NaiveDate, (f64, u32)> = BTreeMap::new();
    let last = bucket_start(now.date_naive(), bucket);
    let mut cursor = bucket_start(window_start.date_naive(), bucket);
    while cursor <= last {
        sums.insert(cursor, (0.0, 0));
        cursor = next_bucket(cursor, bucket);
    }

    for record in records {
        let Some(t) = created_at(record) else {
            continue;
        };
        if t < window_start || t > now {
            continue;
        }
        let entry = sums
            .entry(bucket_start(t.date_naive(), bucket))
            .or_insert((0.0, 0));
        entry.0 += record.emissions;
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|(period, (emissions, count))| TrendPoint {
            period: period.format("%Y-%m-%d").to_string(),
            emissions,
            count,
        })
        .collect()
}

/// Percent reduction from `previous` to `current`; 0 when there is no baseline.
pub fn reduction_percentage(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        (previous - current) / previous * 100.0
    } else {
        0.0
    }
}

/// Composite 0-100 score from reduction trend and completed goals.
pub fn sustainability_score(reduction_pct: f64, completed_goals: u32) -> f64 {
    let swing = reduction_pct.abs().min(SCORE_MAX_REDUCTION_SWING);
    let mut score = SCORE_BASE;
    if reduction_pct > 0.0 {
        score += swing;
    } else {
        score -= swing;
    }
    score += SCORE_PER_COMPLETED_GOAL * completed_goals as f64;
    score.clamp(0.0, 100.0)
}

/// Newest-first copy of at most `limit` records.
pub fn most_recent(records: &[Calculation], limit: usize) -> Vec<Calculation> {
    let mut sorted: Vec<&Calculation> = records.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted.into_iter().take(limit).cloned().collect()
}

/// Build the full dashboard payload.
pub fn dashboard_summary(
    records: &[Calculation],
    goals: &[Goal],
    now: DateTime<Utc>,
) -> DashboardSummary {
    let period = Duration::days(PERIOD_DAYS);
    let current_start = now - period;
    let previous_start = current_start - period;

    // Include records stamped exactly at `now`
    let window_end = now + Duration::milliseconds(1);
    let current = emissions_in_window(records, current_start, window_end);
    let previous = emissions_in_window(records, previous_start, current_start);
    let reduction = reduction_percentage(current, previous);

    let by_type = category_breakdown(records);
    let dominant = dominant_category(&by_type);

    let completed_goals = goals
        .iter()
        .filter(|g| g.status == GoalStatus::Completed)
        .count() as u32;
    let active_goals = goals
        .iter()
        .filter(|g| g.status == GoalStatus::Active)
        .count() as u32;

    DashboardSummary {
        total_emissions: total_emissions(records),
        total_calculations: records.len() as u32,
        current_period_emissions: current,
        previous_period_emissions: previous,
        reduction_percentage: reduction,
        by_type,
        dominant_category: dominant,
        daily_trend: trend(records, TrendBucket::Day, current_start, now),
        active_goals,
        completed_goals,
        sustainability_score: sustainability_score(reduction, completed_goals),
        recent_calculations: most_recent(records, DASHBOARD_RECENT),
        generated_at: format_utc_rfc3339(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::calculation::{ElectricityInputs, ElectricitySource};
    use crate::models::CalculationInputs;
    use chrono::TimeZone;

    fn record(activity_type: ActivityType, emissions: f64, created_at: &str) -> Calculation {
        Calculation {
            id: format!("calc-{}", created_at),
            user_id: "user-1".to_string(),
            activity_type,
            inputs: CalculationInputs::Electricity(ElectricityInputs {
                kwh: 0.0,
                source: ElectricitySource::Grid,
            }),
            emissions,
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_inputs_are_zeroed() {
        assert_eq!(total_emissions(&[]), 0.0);
        assert!(category_breakdown(&[]).is_empty());
        assert_eq!(emissions_in_window(&[], now() - Duration::days(1), now()), 0.0);

        let summary = dashboard_summary(&[], &[], now());
        assert_eq!(summary.total_emissions, 0.0);
        assert_eq!(summary.total_calculations, 0);
        assert_eq!(summary.reduction_percentage, 0.0);
        assert_eq!(summary.dominant_category, None);
        assert_eq!(summary.sustainability_score, 50.0);
        assert!(summary.recent_calculations.is_empty());
        assert!(summary.daily_trend.iter().all(|p| p.emissions == 0.0));
    }

    #[test]
    fn test_breakdown_and_total() {
        let records = vec![
            record(ActivityType::Electricity, 1.5, "2026-03-01T00:00:00.000Z"),
            record(ActivityType::Vehicle, 2.0, "2026-03-02T00:00:00.000Z"),
            record(ActivityType::Electricity, 0.5, "2026-03-03T00:00:00.000Z"),
        ];

        let breakdown = category_breakdown(&records);
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[&ActivityType::Electricity], 2.0);
        assert_eq!(breakdown[&ActivityType::Vehicle], 2.0);
        assert_eq!(total_emissions(&records), 4.0);
    }

    #[test]
    fn test_window_is_half_open() {
        let records = vec![
            record(ActivityType::Shipping, 1.0, "2026-03-01T00:00:00.000Z"),
            record(ActivityType::Shipping, 2.0, "2026-03-10T00:00:00.000Z"),
        ];
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();

        assert_eq!(emissions_in_window(&records, start, end), 1.0);
    }

    #[test]
    fn test_daily_trend_is_chronological_and_zero_filled() {
        let records = vec![
            record(ActivityType::Vehicle, 3.0, "2026-03-14T08:00:00.000Z"),
            record(ActivityType::Vehicle, 1.0, "2026-03-12T08:00:00.000Z"),
            record(ActivityType::Vehicle, 2.0, "2026-03-12T18:00:00.000Z"),
            // Outside the window
            record(ActivityType::Vehicle, 9.0, "2026-01-01T00:00:00.000Z"),
        ];
        let points = trend(&records, TrendBucket::Day, now() - Duration::days(4), now());

        let periods: Vec<&str> = points.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(
            periods,
            vec![
                "2026-03-11",
                "2026-03-12",
                "2026-03-13",
                "2026-03-14",
                "2026-03-15"
            ]
        );
        assert_eq!(points[1].emissions, 3.0);
        assert_eq!(points[1].count, 2);
        assert_eq!(points[2].emissions, 0.0);
        assert_eq!(points[3].emissions, 3.0);
    }

    #[test]
    fn test_monthly_trend_crosses_year() {
        let records = vec![
            record(ActivityType::Electricity, 1.0, "2025-12-20T00:00:00.000Z"),
            record(ActivityType::Electricity, 2.0, "2026-02-02T00:00:00.000Z"),
        ];
        let start = Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap();
        let points = trend(&records, TrendBucket::Month, start, now());

        let periods: Vec<&str> = points.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(
            periods,
            vec!["2025-12-01", "2026-01-01", "2026-02-01", "2026-03-01"]
        );
        assert_eq!(points[0].emissions, 1.0);
        assert_eq!(points[2].emissions, 2.0);
    }

    #[test]
    fn test_weekly_buckets_start_on_monday() {
        // 2026-03-15 is a Sunday
        let records = vec![record(
            ActivityType::Electricity,
            1.0,
            "2026-03-15T09:00:00.000Z",
        )];
        let points = trend(&records, TrendBucket::Week, now() - Duration::days(1), now());
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].period, "2026-03-09");
    }

    #[test]
    fn test_reduction_percentage() {
        assert_eq!(reduction_percentage(75.0, 100.0), 25.0);
        assert_eq!(reduction_percentage(150.0, 100.0), -50.0);
        assert_eq!(reduction_percentage(42.0, 0.0), 0.0);
        assert_eq!(reduction_percentage(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_sustainability_score() {
        assert_eq!(sustainability_score(10.0, 2), 70.0);
        assert_eq!(sustainability_score(80.0, 0), 80.0);
        assert_eq!(sustainability_score(-12.0, 0), 38.0);
        assert_eq!(sustainability_score(-90.0, 0), 20.0);
        assert_eq!(sustainability_score(30.0, 10), 100.0);
        assert_eq!(sustainability_score(0.0, 0), 50.0);
    }

    #[test]
    fn test_dashboard_summary_periods() {
        let records = vec![
            // Current window
            record(ActivityType::Electricity, 3.0, "2026-03-10T00:00:00.000Z"),
            // Previous window
            record(ActivityType::Vehicle, 4.0, "2026-02-01T00:00:00.000Z"),
        ];
        let summary = dashboard_summary(&records, &[], now());

        assert_eq!(summary.current_period_emissions, 3.0);
        assert_eq!(summary.previous_period_emissions, 4.0);
        assert!((summary.reduction_percentage - 25.0).abs() < 1e-9);
        assert_eq!(summary.dominant_category, Some(ActivityType::Vehicle));
        assert_eq!(summary.recent_calculations[0].emissions, 3.0);
        assert_eq!(summary.daily_trend.len(), 31);
    }
}
