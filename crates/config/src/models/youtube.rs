use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    /// Data API key. Checked for presence when the service starts, not here,
    /// so configs without credentials still load for tooling.
    pub api_key: String,
    pub base_url: String,
    pub request_timeout_seconds: u64,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

impl YouTubeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl ConfigValidator for YouTubeConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_url(&self.base_url, "youtube.base_url")?;
        ValidationUtils::validate_timeout_seconds(
            self.request_timeout_seconds,
            "youtube.request_timeout_seconds",
        )?;
        Ok(())
    }
}
