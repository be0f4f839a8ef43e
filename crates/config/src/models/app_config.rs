use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    api_observability::{ApiConfig, ObservabilityConfig},
    engine::EngineConfig,
    storage::StorageConfig,
    youtube::YouTubeConfig,
};
use crate::validation::ConfigValidator;

pub const ENV_PREFIX: &str = "STREAM_MONITOR";

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["config/stream-monitor.toml", "stream-monitor.toml"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub storage: StorageConfig,
    pub youtube: YouTubeConfig,
    pub api: ApiConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Loads the TOML file (explicit path, else the first default path that
    /// exists) overlaid with `STREAM_MONITOR_<SECTION>__<KEY>` variables.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("config file does not exist: {}", path));
            }
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("failed to parse TOML config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config as TOML")
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        self.engine.validate()?;
        self.storage.validate()?;
        self.youtube.validate()?;
        self.api.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LogFormat, StorageBackend};
    use std::io::Write;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.engine.raw_period_seconds, 30);
        assert_eq!(config.engine.max_retries, 3);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.api.bind_address, "0.0.0.0:8080");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_app_config_from_partial_toml() {
        let toml_str = r#"
[engine]
raw_period_seconds = 15
rollup_period_seconds = 60
fetch_timeout_seconds = 5
window_retention_seconds = 600

[storage]
backend = "memory"

[observability]
log_format = "json"
"#;

        let config = AppConfig::from_toml(toml_str).expect("Failed to parse TOML");
        assert_eq!(config.engine.raw_period_seconds, 15);
        assert_eq!(config.engine.rollup_period_seconds, 60);
        assert_eq!(config.engine.profile_period_seconds, 86_400);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.youtube.base_url, "https://www.googleapis.com/youtube/v3");
    }

    #[test]
    fn test_app_config_from_toml_rejects_invalid_engine() {
        let toml_str = r#"
[engine]
rollup_period_seconds = 600
window_retention_seconds = 300
"#;
        assert!(AppConfig::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_app_config_toml_roundtrip() {
        let config = AppConfig::default();
        let serialized = config.to_toml().expect("Failed to serialize");
        let parsed = AppConfig::from_toml(&serialized).expect("Failed to parse");
        assert_eq!(parsed.engine.backoff_cap_ms, config.engine.backoff_cap_ms);
        assert_eq!(parsed.storage.database_url, config.storage.database_url);
    }

    #[test]
    fn test_app_config_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("Failed to create temp file");
        writeln!(file, "[engine]\nmax_entities = 7\n\n[api]\nbind_address = \"127.0.0.1:9100\"")
            .expect("Failed to write config");

        let path = file.path().to_str().expect("utf-8 path");
        let config = AppConfig::load(Some(path)).expect("Failed to load config");
        assert_eq!(config.engine.max_entities, 7);
        assert_eq!(config.api.bind_address, "127.0.0.1:9100");
    }

    #[test]
    fn test_app_config_load_missing_file() {
        assert!(AppConfig::load(Some("/nonexistent/stream-monitor.toml")).is_err());
    }
}
