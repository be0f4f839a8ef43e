//! # Stream Monitor Testing Utils
//!
//! Shared testing utilities for the stream monitor workspace: scriptable
//! collaborator mocks, test data builders and timing helpers.
//!
//! ## Usage
//!
//! ```toml
//! [dev-dependencies]
//! monitor-testing-utils = { path = "../testing-utils" }
//! ```
//!
//! ```rust,ignore
//! use monitor_testing_utils::{FetchBehavior, MockMetricsFetcher, MockSampleStore};
//!
//! let fetcher = MockMetricsFetcher::new();
//! fetcher.set_default("broken", FetchBehavior::Transient);
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
