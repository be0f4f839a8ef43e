use std::time::Duration;

use thiserror::Error;

/// Error taxonomy shared by every crate in the monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("transient fetch failure for {entity_id}: {message}")]
    TransientFetch { entity_id: String, message: String },

    #[error("permanent fetch failure for {entity_id}: {message}")]
    PermanentFetch { entity_id: String, message: String },

    #[error("fetch for {entity_id} timed out after {timeout:?}")]
    FetchTimeout { entity_id: String, timeout: Duration },

    #[error("store write failed: {0}")]
    StoreWrite(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("entity not found: {entity_id}")]
    EntityNotFound { entity_id: String },

    #[error("invalid entity id {entity_id:?}: {reason}")]
    InvalidEntityId { entity_id: String, reason: String },

    #[error("monitored entity limit of {limit} reached")]
    CapacityExceeded { limit: usize },

    #[error("monitor engine is shut down")]
    EngineStopped,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type MonitorResult<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    pub fn transient<I: Into<String>, M: Into<String>>(entity_id: I, message: M) -> Self {
        Self::TransientFetch {
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }

    pub fn permanent<I: Into<String>, M: Into<String>>(entity_id: I, message: M) -> Self {
        Self::PermanentFetch {
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }

    pub fn entity_not_found<I: Into<String>>(entity_id: I) -> Self {
        Self::EntityNotFound {
            entity_id: entity_id.into(),
        }
    }

    pub fn invalid_entity_id<I: Into<String>, R: Into<String>>(entity_id: I, reason: R) -> Self {
        Self::InvalidEntityId {
            entity_id: entity_id.into(),
            reason: reason.into(),
        }
    }

    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn store_write<S: Into<String>>(msg: S) -> Self {
        Self::StoreWrite(msg.into())
    }

    /// Failures the retry policy is allowed to retry within a tick.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MonitorError::TransientFetch { .. } | MonitorError::FetchTimeout { .. }
        )
    }

    /// The upstream reports the entity no longer exists.
    pub fn is_permanent(&self) -> bool {
        matches!(self, MonitorError::PermanentFetch { .. })
    }

    /// Errors that must abort startup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MonitorError::Configuration(_))
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for MonitorError {
    fn from(err: anyhow::Error) -> Self {
        MonitorError::Internal(err.to_string())
    }
}
