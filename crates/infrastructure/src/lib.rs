pub mod database;
pub mod memory_store;
pub mod observability;
pub mod youtube;

pub use database::{DatabaseManager, SqliteMetricsStore};
pub use memory_store::{InMemoryProfileStore, InMemorySampleStore};
pub use observability::{MetricsCollector, StructuredLogger};
pub use youtube::YouTubeFetcher;
