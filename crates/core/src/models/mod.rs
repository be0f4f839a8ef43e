//! Domain models shared between the engine, the stores and the API.

pub mod aggregate;
pub mod cadence;
pub mod entity;
pub mod health;
pub mod profile;
pub mod sample;

pub use aggregate::{AggregateRecord, PeriodType};
pub use cadence::Cadence;
pub use entity::{CadenceSummary, EntitySummary};
pub use health::{EntityHealth, EntityStatus};
pub use profile::Profile;
pub use sample::{EngagementMetrics, Sample, Snapshot, TimeRange};
