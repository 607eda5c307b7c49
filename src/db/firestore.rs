// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Every document carries a `user_id` and every read is scoped by it.
//! Provides high-level operations for:
//! - Calculations (per-activity emissions records)
//! - Goals (reduction targets)
//! - Reports (frozen snapshots with a TTL)
//! - AI analyses (append-only commentary history)

use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::db::{collections, MAX_QUERY_RECORDS};
use crate::error::AppError;
use crate::models::{AiAnalysis, ActivityType, Calculation, Goal, Report};
use crate::services::aggregator;
use crate::time_utils::format_utc_rfc3339;

/// Just enough of any stored document to delete it.
#[derive(Debug, Deserialize)]
struct OwnedDoc {
    id: String,
}

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Optional filters for calculation queries.
#[derive(Debug, Clone, Default)]
pub struct CalculationFilter {
    pub activity_type: Option<ActivityType>,
    /// Inclusive lower bound on `created_at`
    pub after: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`
    pub before: Option<DateTime<Utc>>,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Calculation Operations ──────────────────────────────────

    /// Create or overwrite a calculation document.
    pub async fn set_calculation(&self, calculation: &Calculation) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CALCULATIONS)
            .document_id(&calculation.id)
            .object(calculation)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a calculation owned by `user_id`.
    ///
    /// Returns `None` both when it doesn't exist and when another user owns it.
    pub async fn get_calculation(
        &self,
        user_id: &str,
        calculation_id: &str,
    ) -> Result<Option<Calculation>, AppError> {
        let calculation: Option<Calculation> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CALCULATIONS)
            .obj()
            .one(calculation_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(calculation.filter(|c| c.user_id == user_id))
    }

    /// List a user's calculations, newest first.
    pub async fn list_calculations(
        &self,
        user_id: &str,
        filter: &CalculationFilter,
        limit: u32,
    ) -> Result<Vec<Calculation>, AppError> {
        let user_id = user_id.to_string();
        let activity_type = filter.activity_type.map(|t| t.as_str().to_string());
        let after = filter.after.map(format_utc_rfc3339);
        let before = filter.before.map(format_utc_rfc3339);

        self.get_client()?
            .fluent()
            .select()
            .from(collections::CALCULATIONS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    activity_type
                        .clone()
                        .and_then(|t| q.field("activity_type").eq(t)),
                    after
                        .clone()
                        .and_then(|a| q.field("created_at").greater_than_or_equal(a)),
                    before
                        .clone()
                        .and_then(|b| q.field("created_at").less_than(b)),
                ])
            })
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit.min(MAX_QUERY_RECORDS))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// The user's full history (capped at `MAX_QUERY_RECORDS`), newest first.
    pub async fn all_calculations(&self, user_id: &str) -> Result<Vec<Calculation>, AppError> {
        self.list_calculations(user_id, &CalculationFilter::default(), MAX_QUERY_RECORDS)
            .await
    }

    /// Group-and-sum emissions by activity type over an optional date range.
    pub async fn emissions_by_type(
        &self,
        user_id: &str,
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
    ) -> Result<BTreeMap<ActivityType, f64>, AppError> {
        let filter = CalculationFilter {
            activity_type: None,
            after,
            before,
        };
        let records = self
            .list_calculations(user_id, &filter, MAX_QUERY_RECORDS)
            .await?;
        Ok(aggregator::category_breakdown(&records))
    }

    /// Delete a calculation owned by `user_id`. Returns `false` if not found.
    pub async fn delete_calculation(
        &self,
        user_id: &str,
        calculation_id: &str,
    ) -> Result<bool, AppError> {
        if self.get_calculation(user_id, calculation_id).await?.is_none() {
            return Ok(false);
        }

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::CALCULATIONS)
            .document_id(calculation_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(true)
    }

    // ─── Goal Operations ─────────────────────────────────────────

    /// Create or update a goal.
    pub async fn set_goal(&self, goal: &Goal) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::GOALS)
            .document_id(&goal.id)
            .object(goal)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Store several goals.
    ///
    /// Uses concurrent writes with a limit to avoid overloading Firestore.
    pub async fn batch_set_goals(&self, goals: &[Goal]) -> Result<(), AppError> {
        stream::iter(goals.to_vec())
            .map(|goal| async move { self.set_goal(&goal).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(())
    }

    pub async fn get_goal(&self, user_id: &str, goal_id: &str) -> Result<Option<Goal>, AppError> {
        let goal: Option<Goal> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::GOALS)
            .obj()
            .one(goal_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(goal.filter(|g| g.user_id == user_id))
    }

    /// All goals for a user, soonest deadline first.
    pub async fn list_goals(&self, user_id: &str) -> Result<Vec<Goal>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::GOALS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .order_by([("deadline", firestore::FirestoreQueryDirection::Ascending)])
            .limit(MAX_QUERY_RECORDS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a goal owned by `user_id`. Returns `false` if not found.
    pub async fn delete_goal(&self, user_id: &str, goal_id: &str) -> Result<bool, AppError> {
        if self.get_goal(user_id, goal_id).await?.is_none() {
            return Ok(false);
        }

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::GOALS)
            .document_id(goal_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(true)
    }

    // ─── Report Operations ───────────────────────────────────────

    pub async fn set_report(&self, report: &Report) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::REPORTS)
            .document_id(&report.id)
            .object(report)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a live (unexpired) report owned by `user_id`.
    ///
    /// The TTL policy deletes expired reports lazily, so expiry is also
    /// enforced on read.
    pub async fn get_report(
        &self,
        user_id: &str,
        report_id: &str,
    ) -> Result<Option<Report>, AppError> {
        let report: Option<Report> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::REPORTS)
            .obj()
            .one(report_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let now = Utc::now();
        Ok(report.filter(|r| r.user_id == user_id && !r.is_expired(now)))
    }

    /// Live reports for a user, newest first.
    pub async fn list_reports(&self, user_id: &str, limit: u32) -> Result<Vec<Report>, AppError> {
        let user_id = user_id.to_string();
        let reports: Vec<Report> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::REPORTS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit.min(MAX_QUERY_RECORDS))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let now = Utc::now();
        Ok(reports.into_iter().filter(|r| !r.is_expired(now)).collect())
    }

    /// Delete a report owned by `user_id`. Returns `false` if not found.
    pub async fn delete_report(&self, user_id: &str, report_id: &str) -> Result<bool, AppError> {
        if self.get_report(user_id, report_id).await?.is_none() {
            return Ok(false);
        }

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::REPORTS)
            .document_id(report_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(true)
    }

    /// Delete every report whose `expires_at` has passed (all users).
    ///
    /// Returns the number of reports deleted.
    pub async fn delete_expired_reports(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let expired: Vec<Report> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::REPORTS)
            .filter(move |q| {
                q.for_all([q
                    .field("expires_at")
                    .less_than_or_equal(firestore::FirestoreTimestamp(now))])
            })
            .limit(MAX_QUERY_RECORDS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let count = expired.len();
        self.batch_delete(&expired, collections::REPORTS, |r: &Report| r.id.clone())
            .await?;

        if count > 0 {
            tracing::info!(count, "Deleted expired reports");
        }
        Ok(count)
    }

    // ─── AI Analysis Operations ──────────────────────────────────

    /// Append an analysis to the user's history.
    pub async fn add_analysis(&self, analysis: &AiAnalysis) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::AI_ANALYSES)
            .document_id(&analysis.id)
            .object(analysis)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Analysis history, newest first.
    pub async fn list_analyses(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<AiAnalysis>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::AI_ANALYSES)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit.min(MAX_QUERY_RECORDS))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn latest_analysis(&self, user_id: &str) -> Result<Option<AiAnalysis>, AppError> {
        Ok(self.list_analyses(user_id, 1).await?.into_iter().next())
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }

    // ─── User Data Deletion ────────────────────────────────────────

    /// Delete ALL data for a user across every collection.
    ///
    /// Returns the number of documents deleted.
    pub async fn delete_user_data(&self, user_id: &str) -> Result<usize, AppError> {
        self.delete_user_data_paged(user_id, MAX_QUERY_RECORDS).await
    }

    /// Like [`Self::delete_user_data`], reading `page_size` documents per query.
    pub async fn delete_user_data_paged(
        &self,
        user_id: &str,
        page_size: u32,
    ) -> Result<usize, AppError> {
        let mut deleted_count = 0;

        // Reports include expired ones still awaiting TTL deletion
        for collection in [
            collections::CALCULATIONS,
            collections::GOALS,
            collections::REPORTS,
            collections::AI_ANALYSES,
        ] {
            let count = self.delete_owned(collection, user_id, page_size).await?;
            deleted_count += count;
            tracing::debug!(user_id, collection, count, "Deleted user documents");
        }

        tracing::info!(user_id, deleted_count, "User data deletion complete");

        Ok(deleted_count)
    }

    /// Delete every document in `collection` owned by `user_id`, one page
    /// at a time until a query comes back empty.
    async fn delete_owned(
        &self,
        collection: &str,
        user_id: &str,
        page_size: u32,
    ) -> Result<usize, AppError> {
        let page_size = page_size.clamp(1, MAX_QUERY_RECORDS);
        let mut count = 0;

        loop {
            let owner = user_id.to_string();
            let page: Vec<OwnedDoc> = self
                .get_client()?
                .fluent()
                .select()
                .from(collection)
                .filter(move |q| q.for_all([q.field("user_id").eq(owner.clone())]))
                .limit(page_size)
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            if page.is_empty() {
                return Ok(count);
            }

            self.batch_delete(&page, collection, |d: &OwnedDoc| d.id.clone())
                .await?;
            count += page.len();
        }
    }
}
