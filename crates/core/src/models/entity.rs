use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Cadence, EntityHealth};

/// Scheduling view of one cadence of a monitored entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadenceSummary {
    pub cadence: Cadence,
    pub period_seconds: u64,
    pub next_fire_at: Option<DateTime<Utc>>,
}

/// A registered entity with its merged health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub entity_id: String,
    pub registered_at: DateTime<Utc>,
    pub health: EntityHealth,
    pub cadences: Vec<CadenceSummary>,
}
