use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, TimeDelta, Utc};
use monitor_core::models::{PeriodType, TimeRange};
use monitor_core::MonitorError;
use monitor_engine::AddEntityOutcome;
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    response::{created, no_content, success, ApiResponse},
    routes::AppState,
};

/// Default lookback of range queries without `from`.
const DEFAULT_LOOKBACK_HOURS: i64 = 1;

#[derive(Debug, Deserialize)]
pub struct CreateEntityRequest {
    pub entity_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PeriodTypeQuery {
    pub period_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub period_type: Option<String>,
}

impl RangeQuery {
    fn time_range(&self) -> ApiResult<TimeRange> {
        let to = self.to.unwrap_or_else(Utc::now);
        let from = self
            .from
            .unwrap_or(to - TimeDelta::hours(DEFAULT_LOOKBACK_HOURS));
        if from >= to {
            return Err(ApiError::BadRequest(
                "`from` must be earlier than `to`".to_string(),
            ));
        }
        Ok(TimeRange::new(from, to))
    }
}

pub async fn list_entities(State(state): State<AppState>) -> impl IntoResponse {
    success(state.engine.list_entities().await)
}

/// 201 for a new registration, 200 if the id was already monitored.
pub async fn create_entity(
    State(state): State<AppState>,
    Json(request): Json<CreateEntityRequest>,
) -> ApiResult<Response> {
    let outcome = state.engine.add_entity(&request.entity_id).await?;
    Ok(match outcome {
        AddEntityOutcome::Created(summary) => created(summary).into_response(),
        AddEntityOutcome::AlreadyExists(summary) => ApiResponse::success_with_message(
            summary,
            "entity already monitored".to_string(),
        )
        .into_response(),
    })
}

pub async fn get_entity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(success(state.engine.get_entity(&id).await?))
}

pub async fn delete_entity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if state.engine.remove_entity(&id).await {
        Ok(no_content())
    } else {
        Err(MonitorError::entity_not_found(id).into())
    }
}

pub async fn get_entity_health(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(success(state.engine.get_health(&id).await?))
}

/// Latest aggregate; `period_type` defaults to the engine's rollup label.
pub async fn get_latest_aggregate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PeriodTypeQuery>,
) -> ApiResult<impl IntoResponse> {
    let period_type = query
        .period_type
        .map(PeriodType::new)
        .unwrap_or_else(|| state.engine.rollup_period_type().clone());
    let record = state
        .engine
        .get_latest_aggregate(&id, &period_type)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(success(record))
}

pub async fn list_aggregates(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<impl IntoResponse> {
    let range = query.time_range()?;
    let period_type = query
        .period_type
        .map(PeriodType::new)
        .unwrap_or_else(|| state.engine.rollup_period_type().clone());
    let records = state
        .engine
        .query_aggregates(&id, &period_type, range)
        .await?;
    Ok(success(records))
}

pub async fn list_samples(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<impl IntoResponse> {
    let range = query.time_range()?;
    Ok(success(state.engine.query_samples(&id, range).await?))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let profile = state
        .engine
        .get_profile(&id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(success(profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_defaults_to_last_hour() {
        let to = Utc::now();
        let query = RangeQuery {
            from: None,
            to: Some(to),
            period_type: None,
        };
        let range = query.time_range().unwrap();
        assert_eq!(range.end, to);
        assert_eq!(range.start, to - TimeDelta::hours(1));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let now = Utc::now();
        let query = RangeQuery {
            from: Some(now),
            to: Some(now - TimeDelta::minutes(5)),
            period_type: None,
        };
        assert!(matches!(query.time_range(), Err(ApiError::BadRequest(_))));
    }
}
