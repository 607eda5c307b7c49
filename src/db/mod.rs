//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{CalculationFilter, FirestoreDb};

/// Collection names as constants.
pub mod collections {
    pub const CALCULATIONS: &str = "calculations";
    pub const GOALS: &str = "goals";
    /// Frozen report snapshots (TTL policy on `expires_at`)
    pub const REPORTS: &str = "reports";
    pub const AI_ANALYSES: &str = "ai_analyses";
}

/// Upper bound on records returned by a single query.
pub const MAX_QUERY_RECORDS: u32 = 1000;
