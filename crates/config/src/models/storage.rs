use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};
use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            database_url: "sqlite://stream-monitor.db".to_string(),
            max_connections: 5,
        }
    }
}

impl ConfigValidator for StorageConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        if self.backend == StorageBackend::Sqlite {
            ValidationUtils::validate_not_empty(&self.database_url, "storage.database_url")?;
            if !self.database_url.starts_with("sqlite:") {
                return Err(ConfigError::Validation(
                    "storage.database_url must start with sqlite:".to_string(),
                ));
            }
            ValidationUtils::validate_count(
                self.max_connections as usize,
                "storage.max_connections",
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_validation() {
        let config = StorageConfig::default();
        assert!(config.validate().is_ok());

        let mut invalid = config.clone();
        invalid.database_url = "postgres://localhost/db".to_string();
        assert!(invalid.validate().is_err());

        let memory = StorageConfig {
            backend: StorageBackend::Memory,
            database_url: String::new(),
            max_connections: 0,
        };
        assert!(memory.validate().is_ok());
    }
}
