//! Collection engine: per-entity cadence tasks, rollup aggregation and
//! failure handling behind the [`MonitorEngine`] facade.

pub mod aggregator;
pub mod cadence;
pub mod engine;
pub mod failure_policy;
pub mod registry;
pub mod scheduler;
pub mod state;
pub mod window;

pub use aggregator::Aggregator;
pub use engine::{AddEntityOutcome, MonitorEngine};
pub use failure_policy::{BackoffConfig, CadenceHealth, FailurePolicy, TickOutcome};
pub use registry::{AddOutcome, EntityRegistry};
pub use window::SampleWindow;
