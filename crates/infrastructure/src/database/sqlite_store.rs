use async_trait::async_trait;
use chrono::{DateTime, Utc};
use monitor_core::models::{
    AggregateRecord, EngagementMetrics, PeriodType, Profile, Sample, TimeRange,
};
use monitor_core::traits::{ProfileStore, SampleStore};
use monitor_core::{MonitorError, MonitorResult};
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument};

/// SQLite-backed sample, aggregate and profile store.
///
/// Timestamps are stored as INTEGER milliseconds since the epoch; unsigned
/// counters are stored as INTEGER and saturate at `i64::MAX`.
#[derive(Debug, Clone)]
pub struct SqliteMetricsStore {
    pool: SqlitePool,
}

fn to_db(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_db(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: i64) -> MonitorResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| MonitorError::Serialization(format!("timestamp out of range: {ms}")))
}

impl SqliteMetricsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_sample(row: &sqlx::sqlite::SqliteRow) -> MonitorResult<Sample> {
        Ok(Sample {
            entity_id: row.try_get("entity_id")?,
            timestamp: from_millis(row.try_get("timestamp_ms")?)?,
            viewer_count: from_db(row.try_get("viewer_count")?),
            engagement: EngagementMetrics {
                like_count: from_db(row.try_get("like_count")?),
                comment_count: from_db(row.try_get("comment_count")?),
                chat_message_count: from_db(row.try_get("chat_message_count")?),
                subscriber_count: from_db(row.try_get("subscriber_count")?),
            },
        })
    }

    fn row_to_aggregate(row: &sqlx::sqlite::SqliteRow) -> MonitorResult<AggregateRecord> {
        let period_type: String = row.try_get("period_type")?;
        Ok(AggregateRecord {
            entity_id: row.try_get("entity_id")?,
            period_start: from_millis(row.try_get("period_start_ms")?)?,
            period_end: from_millis(row.try_get("period_end_ms")?)?,
            average_viewers: row.try_get("average_viewers")?,
            peak_viewers: from_db(row.try_get("peak_viewers")?),
            sample_count: from_db(row.try_get("sample_count")?),
            duration_seconds: from_db(row.try_get("duration_seconds")?),
            period_type: PeriodType::new(period_type),
        })
    }

    fn row_to_profile(row: &sqlx::sqlite::SqliteRow) -> MonitorResult<Profile> {
        Ok(Profile {
            entity_id: row.try_get("entity_id")?,
            channel_id: row.try_get("channel_id")?,
            channel_name: row.try_get("channel_name")?,
            description: row.try_get("description")?,
            subscriber_count: from_db(row.try_get("subscriber_count")?),
            view_count: from_db(row.try_get("view_count")?),
            video_count: from_db(row.try_get("video_count")?),
            fetched_at: from_millis(row.try_get("fetched_at_ms")?)?,
        })
    }
}

#[async_trait]
impl SampleStore for SqliteMetricsStore {
    #[instrument(skip(self, sample), fields(entity_id = %sample.entity_id))]
    async fn append_sample(&self, sample: &Sample) -> MonitorResult<()> {
        sqlx::query(
            r#"
            INSERT INTO samples (entity_id, timestamp_ms, viewer_count, like_count, comment_count, chat_message_count, subscriber_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&sample.entity_id)
        .bind(to_millis(sample.timestamp))
        .bind(to_db(sample.viewer_count))
        .bind(to_db(sample.engagement.like_count))
        .bind(to_db(sample.engagement.comment_count))
        .bind(to_db(sample.engagement.chat_message_count))
        .bind(to_db(sample.engagement.subscriber_count))
        .execute(&self.pool)
        .await
        .map_err(|e| MonitorError::store_write(format!("insert sample: {e}")))?;

        debug!("sample stored");
        Ok(())
    }

    #[instrument(skip(self, record), fields(entity_id = %record.entity_id, period_type = %record.period_type))]
    async fn append_aggregate(&self, record: &AggregateRecord) -> MonitorResult<()> {
        sqlx::query(
            r#"
            INSERT INTO aggregates (entity_id, period_type, period_start_ms, period_end_ms, average_viewers, peak_viewers, sample_count, duration_seconds)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&record.entity_id)
        .bind(record.period_type.as_str())
        .bind(to_millis(record.period_start))
        .bind(to_millis(record.period_end))
        .bind(record.average_viewers)
        .bind(to_db(record.peak_viewers))
        .bind(to_db(record.sample_count))
        .bind(to_db(record.duration_seconds))
        .execute(&self.pool)
        .await
        .map_err(|e| MonitorError::store_write(format!("insert aggregate: {e}")))?;

        debug!("aggregate stored");
        Ok(())
    }

    async fn query_samples(&self, entity_id: &str, range: TimeRange) -> MonitorResult<Vec<Sample>> {
        let rows = sqlx::query(
            r#"
            SELECT entity_id, timestamp_ms, viewer_count, like_count, comment_count, chat_message_count, subscriber_count
            FROM samples
            WHERE entity_id = $1 AND timestamp_ms >= $2 AND timestamp_ms < $3
            ORDER BY timestamp_ms ASC
            "#,
        )
        .bind(entity_id)
        .bind(to_millis(range.start))
        .bind(to_millis(range.end))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_sample).collect()
    }

    async fn query_aggregates(
        &self,
        entity_id: &str,
        period_type: &PeriodType,
        range: TimeRange,
    ) -> MonitorResult<Vec<AggregateRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT entity_id, period_type, period_start_ms, period_end_ms, average_viewers, peak_viewers, sample_count, duration_seconds
            FROM aggregates
            WHERE entity_id = $1 AND period_type = $2 AND period_end_ms >= $3 AND period_end_ms < $4
            ORDER BY period_end_ms ASC
            "#,
        )
        .bind(entity_id)
        .bind(period_type.as_str())
        .bind(to_millis(range.start))
        .bind(to_millis(range.end))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_aggregate).collect()
    }
}

#[async_trait]
impl ProfileStore for SqliteMetricsStore {
    #[instrument(skip(self, profile), fields(entity_id = %profile.entity_id))]
    async fn upsert_profile(&self, profile: &Profile) -> MonitorResult<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (entity_id, channel_id, channel_name, description, subscriber_count, view_count, video_count, fetched_at_ms)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT(entity_id) DO UPDATE SET
                channel_id = excluded.channel_id,
                channel_name = excluded.channel_name,
                description = excluded.description,
                subscriber_count = excluded.subscriber_count,
                view_count = excluded.view_count,
                video_count = excluded.video_count,
                fetched_at_ms = excluded.fetched_at_ms
            "#,
        )
        .bind(&profile.entity_id)
        .bind(&profile.channel_id)
        .bind(&profile.channel_name)
        .bind(&profile.description)
        .bind(to_db(profile.subscriber_count))
        .bind(to_db(profile.view_count))
        .bind(to_db(profile.video_count))
        .bind(to_millis(profile.fetched_at))
        .execute(&self.pool)
        .await
        .map_err(|e| MonitorError::store_write(format!("upsert profile: {e}")))?;

        debug!("profile upserted");
        Ok(())
    }

    async fn get_profile(&self, entity_id: &str) -> MonitorResult<Option<Profile>> {
        let row = sqlx::query(
            r#"
            SELECT entity_id, channel_id, channel_name, description, subscriber_count, view_count, video_count, fetched_at_ms
            FROM profiles WHERE entity_id = $1
            "#,
        )
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_profile).transpose()
    }
}
