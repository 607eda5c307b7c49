// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reduction goals and their status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::clamp_percentage;
use crate::time_utils::parse_deadline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalCategory {
    Overall,
    Electricity,
    Vehicle,
    Shipping,
    SupplyChain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    /// Target is a percent reduction relative to `baseline`
    Percentage,
    /// Target is compared directly against `current`
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Completed,
    Overdue,
    Cancelled,
}

impl GoalStatus {
    /// Automatic transitions only ever leave `Active`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, GoalStatus::Active)
    }
}

/// Goal document stored in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub category: GoalCategory,
    pub target: f64,
    pub target_type: TargetType,
    #[serde(default)]
    pub baseline: Option<f64>,
    pub current: f64,
    /// RFC3339 UTC
    pub deadline: String,
    pub status: GoalStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl Goal {
    /// Value compared against `target` to decide completion.
    ///
    /// Percentage goals with a positive baseline measure the achieved
    /// reduction; everything else compares `current` directly.
    pub fn achieved_value(&self) -> f64 {
        match (self.target_type, self.baseline) {
            (TargetType::Percentage, Some(baseline)) if baseline > 0.0 => {
                (baseline - self.current) / baseline * 100.0
            }
            _ => self.current,
        }
    }

    pub fn is_target_met(&self) -> bool {
        self.achieved_value() >= self.target
    }

    /// Display progress in [0, 100]. Stored values are never clamped.
    pub fn progress_percentage(&self) -> f64 {
        let raw = match (self.target_type, self.baseline) {
            (TargetType::Percentage, Some(baseline)) if baseline > 0.0 => {
                (baseline - self.current) / baseline * 100.0
            }
            _ if self.target > 0.0 => self.current / self.target * 100.0,
            _ => 0.0,
        };
        clamp_percentage(raw)
    }

    /// Status the goal should have at `now`, applying automatic transitions.
    pub fn evaluate_status(&self, now: DateTime<Utc>) -> GoalStatus {
        if self.status.is_terminal() {
            return self.status;
        }
        if self.is_target_met() {
            return GoalStatus::Completed;
        }
        match parse_deadline(&self.deadline) {
            Some(deadline) if now > deadline => GoalStatus::Overdue,
            _ => GoalStatus::Active,
        }
    }

    /// Apply automatic transitions. Returns `true` if the status changed.
    pub fn refresh_status(&mut self, now: DateTime<Utc>, now_str: &str) -> bool {
        let next = self.evaluate_status(now);
        if next == self.status {
            return false;
        }
        tracing::debug!(
            goal_id = %self.id,
            from = ?self.status,
            to = ?next,
            "Goal status transition"
        );
        self.status = next;
        self.updated_at = now_str.to_string();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn goal(target_type: TargetType, target: f64, baseline: Option<f64>, current: f64) -> Goal {
        Goal {
            id: "g1".to_string(),
            user_id: "user-1".to_string(),
            title: "Cut emissions".to_string(),
            category: GoalCategory::Overall,
            target,
            target_type,
            baseline,
            current,
            deadline: "2026-12-31T23:59:59Z".to_string(),
            status: GoalStatus::Active,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_percentage_progress_from_baseline() {
        let g = goal(TargetType::Percentage, 40.0, Some(1000.0), 750.0);
        assert!((g.progress_percentage() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_absolute_progress_is_clamped_for_display() {
        let g = goal(TargetType::Absolute, 100.0, None, 250.0);
        assert_eq!(g.progress_percentage(), 100.0);
        // Internal values stay untouched
        assert_eq!(g.current, 250.0);

        let g = goal(TargetType::Percentage, 10.0, Some(100.0), 180.0);
        assert_eq!(g.progress_percentage(), 0.0);
    }

    #[test]
    fn test_zero_target_progress() {
        let g = goal(TargetType::Absolute, 0.0, None, 5.0);
        assert_eq!(g.progress_percentage(), 0.0);
    }

    #[test]
    fn test_active_to_completed() {
        let mut g = goal(TargetType::Percentage, 20.0, Some(1000.0), 750.0);
        assert!(g.refresh_status(at(2026, 6, 1), "now"));
        assert_eq!(g.status, GoalStatus::Completed);
        assert_eq!(g.updated_at, "now");
    }

    #[test]
    fn test_active_to_overdue_after_deadline() {
        let mut g = goal(TargetType::Percentage, 50.0, Some(1000.0), 750.0);
        assert!(!g.refresh_status(at(2026, 6, 1), "now"));
        assert_eq!(g.status, GoalStatus::Active);

        assert!(g.refresh_status(at(2027, 1, 2), "later"));
        assert_eq!(g.status, GoalStatus::Overdue);
    }

    #[test]
    fn test_completion_wins_over_deadline() {
        let g = goal(TargetType::Absolute, 10.0, None, 12.0);
        assert_eq!(g.evaluate_status(at(2027, 1, 2)), GoalStatus::Completed);
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        for status in [
            GoalStatus::Completed,
            GoalStatus::Overdue,
            GoalStatus::Cancelled,
        ] {
            let mut g = goal(TargetType::Absolute, 10.0, None, 0.0);
            g.status = status;
            assert!(!g.refresh_status(at(2027, 6, 1), "now"));
            assert_eq!(g.status, status);
        }
    }
}
