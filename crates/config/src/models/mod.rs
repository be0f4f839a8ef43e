pub mod api_observability;
pub mod app_config;
pub mod engine;
pub mod storage;
pub mod youtube;

pub use api_observability::*;
pub use app_config::*;
pub use engine::*;
pub use storage::*;
pub use youtube::*;
