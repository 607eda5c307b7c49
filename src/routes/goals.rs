// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reduction goals.

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::models::{Goal, GoalCategory, GoalStatus, TargetType};
use crate::time_utils::{format_utc_rfc3339, parse_deadline};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/goals", get(list_goals).post(create_goal))
        .route("/api/goals/{id}", put(update_goal).delete(delete_goal))
}

/// Load the user's goals with automatic status transitions applied.
///
/// Goals whose status changed are written back.
pub(crate) async fn load_goals(state: &AppState, user_id: &str) -> Result<Vec<Goal>> {
    let mut goals = state.db.list_goals(user_id).await?;

    let now = Utc::now();
    let now_str = format_utc_rfc3339(now);
    let changed: Vec<Goal> = goals
        .iter_mut()
        .filter_map(|goal| goal.refresh_status(now, &now_str).then(|| goal.clone()))
        .collect();

    if !changed.is_empty() {
        state.db.batch_set_goals(&changed).await?;
        tracing::info!(user_id, count = changed.len(), "Goal statuses updated");
    }

    Ok(goals)
}

/// Goal plus its display progress.
#[derive(Serialize)]
pub struct GoalResponse {
    #[serde(flatten)]
    pub goal: Goal,
    /// Clamped to [0, 100]
    pub progress_percentage: f64,
}

impl From<Goal> for GoalResponse {
    fn from(goal: Goal) -> Self {
        let progress_percentage = goal.progress_percentage();
        Self {
            goal,
            progress_percentage,
        }
    }
}

fn normalize_deadline(raw: &str) -> Result<String> {
    parse_deadline(raw.trim())
        .map(format_utc_rfc3339)
        .ok_or_else(|| {
            AppError::Validation(
                "deadline must be an RFC3339 timestamp or YYYY-MM-DD date".to_string(),
            )
        })
}

fn check_percentage_target(target_type: TargetType, target: f64) -> Result<()> {
    if target_type == TargetType::Percentage && target > 100.0 {
        return Err(AppError::Validation(
            "percentage targets must not exceed 100".to_string(),
        ));
    }
    Ok(())
}

// ─── Create ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGoalRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub category: GoalCategory,
    #[validate(range(min = 0.0))]
    pub target: f64,
    pub target_type: TargetType,
    #[validate(range(min = 0.0))]
    pub baseline: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub current: f64,
    pub deadline: String,
}

async fn create_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(request): ApiJson<CreateGoalRequest>,
) -> Result<(StatusCode, Json<GoalResponse>)> {
    request.validate()?;
    check_percentage_target(request.target_type, request.target)?;
    let deadline = normalize_deadline(&request.deadline)?;

    let now = Utc::now();
    let now_str = format_utc_rfc3339(now);
    let mut goal = Goal {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.user_id.clone(),
        title: request.title.trim().to_string(),
        category: request.category,
        target: request.target,
        target_type: request.target_type,
        baseline: request.baseline,
        current: request.current,
        deadline,
        status: GoalStatus::Active,
        created_at: now_str.clone(),
        updated_at: now_str.clone(),
    };
    goal.refresh_status(now, &now_str);

    state.db.set_goal(&goal).await?;
    tracing::info!(user_id = %user.user_id, goal_id = %goal.id, "Goal created");

    Ok((StatusCode::CREATED, Json(goal.into())))
}

// ─── List ────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct GoalListResponse {
    pub goals: Vec<GoalResponse>,
}

async fn list_goals(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<GoalListResponse>> {
    let goals = load_goals(&state, &user.user_id).await?;
    Ok(Json(GoalListResponse {
        goals: goals.into_iter().map(Into::into).collect(),
    }))
}

// ─── Update ──────────────────────────────────────────────────

/// Manual edit. Any field may be changed, including status.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateGoalRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub category: Option<GoalCategory>,
    #[validate(range(min = 0.0))]
    pub target: Option<f64>,
    pub target_type: Option<TargetType>,
    #[validate(range(min = 0.0))]
    pub baseline: Option<f64>,
    #[validate(range(min = 0.0))]
    pub current: Option<f64>,
    pub deadline: Option<String>,
    pub status: Option<GoalStatus>,
}

async fn update_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateGoalRequest>,
) -> Result<Json<GoalResponse>> {
    request.validate()?;
    let deadline = request.deadline.as_deref().map(normalize_deadline).transpose()?;

    let mut goal = state
        .db
        .get_goal(&user.user_id, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Goal {} not found", id)))?;

    if let Some(title) = request.title {
        goal.title = title.trim().to_string();
    }
    if let Some(category) = request.category {
        goal.category = category;
    }
    if let Some(target) = request.target {
        goal.target = target;
    }
    if let Some(target_type) = request.target_type {
        goal.target_type = target_type;
    }
    if request.baseline.is_some() {
        goal.baseline = request.baseline;
    }
    if let Some(current) = request.current {
        goal.current = current;
    }
    if let Some(deadline) = deadline {
        goal.deadline = deadline;
    }
    check_percentage_target(goal.target_type, goal.target)?;

    let now = Utc::now();
    let now_str = format_utc_rfc3339(now);
    goal.updated_at = now_str.clone();
    match request.status {
        Some(status) => goal.status = status,
        None => {
            goal.refresh_status(now, &now_str);
        }
    }

    state.db.set_goal(&goal).await?;
    tracing::info!(user_id = %user.user_id, goal_id = %id, status = ?goal.status, "Goal updated");

    Ok(Json(goal.into()))
}

async fn delete_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if !state.db.delete_goal(&user.user_id, &id).await? {
        return Err(AppError::NotFound(format!("Goal {} not found", id)));
    }

    tracing::info!(user_id = %user.user_id, goal_id = %id, "Goal deleted");
    Ok(StatusCode::NO_CONTENT)
}
