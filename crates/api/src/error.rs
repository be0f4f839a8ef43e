use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use monitor_core::MonitorError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Monitor(#[from] MonitorError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("resource not found")]
    NotFound,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::Monitor(MonitorError::EntityNotFound { .. }) => {
                (StatusCode::NOT_FOUND, "ENTITY_NOT_FOUND")
            }
            ApiError::Monitor(MonitorError::InvalidEntityId { .. }) => {
                (StatusCode::BAD_REQUEST, "INVALID_ENTITY_ID")
            }
            ApiError::Monitor(MonitorError::CapacityExceeded { .. }) => {
                (StatusCode::CONFLICT, "CAPACITY_EXCEEDED")
            }
            ApiError::Monitor(MonitorError::EngineStopped) => {
                (StatusCode::SERVICE_UNAVAILABLE, "ENGINE_STOPPED")
            }
            ApiError::Monitor(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "type": error_type,
                "code": status.as_u16(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_errors_map_to_status() {
        let cases = vec![
            (MonitorError::entity_not_found("a"), StatusCode::NOT_FOUND),
            (
                MonitorError::invalid_entity_id("", "must not be empty"),
                StatusCode::BAD_REQUEST,
            ),
            (
                MonitorError::CapacityExceeded { limit: 50 },
                StatusCode::CONFLICT,
            ),
            (MonitorError::EngineStopped, StatusCode::SERVICE_UNAVAILABLE),
            (
                MonitorError::store_write("disk full"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            let response = ApiError::from(error).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_bad_request() {
        let response = ApiError::BadRequest("from must precede to".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
