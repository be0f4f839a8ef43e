pub mod clock;
pub mod errors;
pub mod models;
pub mod traits;

pub use clock::EngineClock;
pub use errors::{MonitorError, MonitorResult};
pub use models::*;
pub use traits::{MetricsFetcher, ProfileStore, SampleStore};
