//! API request/response models for simulations.

use crate::db::models::simulations::{SimulationDBResponse, TIMESTAMP_PLACEHOLDER};
use crate::types::SimulationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Creation payload. `name` defaults to empty so a missing key reaches the
/// handler's emptiness validation; `type` is optional and falls back to the
/// construction defaults.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SimulationCreate {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Wire view of a simulation. Optional storage fields arrive already
/// default-substituted; timestamps render as a placeholder when absent so
/// clients never have to special-case nulls.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SimulationView {
    pub id: SimulationId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub progress: i64,
    pub participants: i64,
    #[serde(rename = "startedAt")]
    pub started_at: String,
    #[serde(rename = "estimatedEnd")]
    pub estimated_end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SimulationListResponse {
    pub simulations: Vec<SimulationView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SimulationCreateResponse {
    pub ok: bool,
    pub simulation: SimulationView,
}

fn render_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339()).unwrap_or_else(|| TIMESTAMP_PLACEHOLDER.to_string())
}

impl From<SimulationDBResponse> for SimulationView {
    fn from(db: SimulationDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            kind: db.kind,
            status: db.status,
            progress: db.progress,
            participants: db.participants,
            started_at: render_timestamp(db.started_at),
            estimated_end: render_timestamp(db.estimated_end),
        }
    }
}
