pub mod client;
pub mod types;

pub use client::{is_valid_video_id, YouTubeFetcher};
