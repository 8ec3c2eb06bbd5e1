//! Database models for simulations.

use crate::types::{SimulationId, UserId};
use chrono::{DateTime, Utc};

/// Default values applied when a simulation is constructed.
///
/// One constant set, applied at construction time, so read paths never have
/// to re-derive fallbacks field by field.
#[derive(Debug, Clone, Copy)]
pub struct SimulationDefaults {
    pub kind: &'static str,
    pub status: &'static str,
    pub progress: i64,
    pub participants: i64,
    pub duration_days: i64,
}

pub const SIMULATION_DEFAULTS: SimulationDefaults = SimulationDefaults {
    kind: "phishing",
    status: "running",
    progress: 0,
    participants: 0,
    duration_days: 7,
};

/// Placeholder rendered for timestamps that were never recorded.
pub const TIMESTAMP_PLACEHOLDER: &str = "—";

/// Database request for creating a new simulation
#[derive(Debug, Clone)]
pub struct SimulationCreateDBRequest {
    pub name: String,
    pub kind: String,
    pub created_by: UserId,
}

/// Database response for a simulation.
///
/// `status`, `progress` and `participants` are already default-substituted;
/// the timestamps stay optional because rows written outside the create
/// path may never have recorded them.
#[derive(Debug, Clone)]
pub struct SimulationDBResponse {
    pub id: SimulationId,
    pub name: String,
    pub kind: String,
    pub status: String,
    pub progress: i64,
    pub participants: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub estimated_end: Option<DateTime<Utc>>,
}
