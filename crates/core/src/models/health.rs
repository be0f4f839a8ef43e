use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Monitoring status of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    Active,
    /// Fetches keep failing; the entity stays registered.
    Degraded,
    /// Terminal. Only reached through removal.
    Removed,
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityStatus::Active => "active",
            EntityStatus::Degraded => "degraded",
            EntityStatus::Removed => "removed",
        };
        f.write_str(s)
    }
}

/// Health report returned by `GetHealth`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityHealth {
    pub entity_id: String,
    pub status: EntityStatus,
    pub consecutive_failures: u32,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub store_write_failures: u64,
}

impl EntityHealth {
    pub fn active(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            status: EntityStatus::Active,
            consecutive_failures: 0,
            last_success_at: None,
            last_error: None,
            store_write_failures: 0,
        }
    }

    pub fn removed(entity_id: impl Into<String>) -> Self {
        Self {
            status: EntityStatus::Removed,
            ..Self::active(entity_id)
        }
    }
}
