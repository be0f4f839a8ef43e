//! Collaborator interfaces injected into the engine.

pub mod fetcher;
pub mod store;

pub use fetcher::MetricsFetcher;
pub use store::{ProfileStore, SampleStore};
