// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account-level operations.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::AppState;
use axum::{extract::State, routing::delete, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/account", delete(delete_account))
}

/// Response for account deletion.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteAccountResponse {
    pub success: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub deleted_documents: usize,
}

/// Delete every calculation, goal, report and analysis the user owns.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DeleteAccountResponse>> {
    tracing::info!(user_id = %user.user_id, "User-initiated account deletion");

    let deleted_documents = state.db.delete_user_data(&user.user_id).await?;
    state.summary_cache.remove(&user.user_id);

    Ok(Json(DeleteAccountResponse {
        success: true,
        deleted_documents,
    }))
}
