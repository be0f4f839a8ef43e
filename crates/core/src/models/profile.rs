use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Slow-changing channel identity data refreshed by the profile cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub entity_id: String,
    pub channel_id: String,
    pub channel_name: String,
    pub description: String,
    pub subscriber_count: u64,
    pub view_count: u64,
    pub video_count: u64,
    pub fetched_at: DateTime<Utc>,
}
