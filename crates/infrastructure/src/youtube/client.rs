use async_trait::async_trait;
use chrono::Utc;
use monitor_config::YouTubeConfig;
use monitor_core::models::{Profile, Snapshot};
use monitor_core::traits::MetricsFetcher;
use monitor_core::{MonitorError, MonitorResult};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::types::{
    parse_count, ChannelItem, ChatMessageItem, ListResponse, VideoItem,
};

const VIDEO_ID_LEN: usize = 11;

/// YouTube video ids are 11 characters of `[A-Za-z0-9_-]`.
pub fn is_valid_video_id(id: &str) -> bool {
    id.len() == VIDEO_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Live video fields extracted from a `videos.list` response.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveVideo {
    pub channel_id: String,
    pub viewer_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub active_live_chat_id: Option<String>,
}

/// Maps a non-success HTTP status to the fetch error taxonomy.
pub fn classify_status(entity_id: &str, status: StatusCode, body: &str) -> MonitorError {
    let message = format!("youtube api returned {status}: {}", truncate(body, 200));
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => MonitorError::permanent(entity_id, message),
        _ => MonitorError::transient(entity_id, message),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub fn parse_live_video(entity_id: &str, response: ListResponse<VideoItem>) -> MonitorResult<LiveVideo> {
    let video = response
        .items
        .into_iter()
        .next()
        .ok_or_else(|| MonitorError::permanent(entity_id, "video not found"))?;

    let details = video.live_streaming_details.unwrap_or_default();
    if details.actual_end_time.is_some() {
        return Err(MonitorError::permanent(entity_id, "broadcast has ended"));
    }

    let channel_id = video
        .snippet
        .map(|s| s.channel_id)
        .ok_or_else(|| MonitorError::transient(entity_id, "video snippet missing"))?;
    let statistics = video.statistics.unwrap_or_default();

    Ok(LiveVideo {
        channel_id,
        viewer_count: parse_count(details.concurrent_viewers.as_ref()),
        like_count: parse_count(statistics.like_count.as_ref()),
        comment_count: parse_count(statistics.comment_count.as_ref()),
        active_live_chat_id: details.active_live_chat_id,
    })
}

pub fn parse_profile(
    entity_id: &str,
    response: ListResponse<ChannelItem>,
) -> MonitorResult<Profile> {
    let channel = response
        .items
        .into_iter()
        .next()
        .ok_or_else(|| MonitorError::permanent(entity_id, "channel not found"))?;
    let snippet = channel.snippet.unwrap_or_default();
    let statistics = channel.statistics.unwrap_or_default();

    Ok(Profile {
        entity_id: entity_id.to_string(),
        channel_id: channel.id,
        channel_name: snippet.title,
        description: snippet.description,
        subscriber_count: parse_count(statistics.subscriber_count.as_ref()),
        view_count: parse_count(statistics.view_count.as_ref()),
        video_count: parse_count(statistics.video_count.as_ref()),
        fetched_at: Utc::now(),
    })
}

/// [`MetricsFetcher`] backed by the YouTube Data API v3.
#[derive(Debug, Clone)]
pub struct YouTubeFetcher {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl YouTubeFetcher {
    pub fn new(config: &YouTubeConfig) -> MonitorResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(MonitorError::config_error("youtube.api_key is required"));
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| MonitorError::config_error(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        entity_id: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> MonitorResult<T> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| MonitorError::transient(entity_id, format!("request to {path} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(entity_id, status, &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| MonitorError::transient(entity_id, format!("malformed {path} response: {e}")))
    }

    async fn fetch_video(&self, entity_id: &str, part: &str) -> MonitorResult<ListResponse<VideoItem>> {
        self.get_json(entity_id, "videos", &[("part", part), ("id", entity_id)])
            .await
    }

    async fn fetch_channel(
        &self,
        entity_id: &str,
        channel_id: &str,
        part: &str,
    ) -> MonitorResult<ListResponse<ChannelItem>> {
        self.get_json(entity_id, "channels", &[("part", part), ("id", channel_id)])
            .await
    }

    /// Total messages reported for the active chat. Chat lookups are best
    /// effort: failures are logged and count as zero.
    async fn chat_message_count(&self, entity_id: &str, live_chat_id: &str) -> u64 {
        let result: MonitorResult<ListResponse<ChatMessageItem>> = self
            .get_json(
                entity_id,
                "liveChat/messages",
                &[("liveChatId", live_chat_id), ("part", "snippet"), ("maxResults", "1")],
            )
            .await;
        match result {
            Ok(response) => response.page_info.map_or(0, |p| p.total_results),
            Err(e) => {
                warn!(entity_id, error = %e, "live chat lookup failed");
                0
            }
        }
    }
}

#[async_trait]
impl MetricsFetcher for YouTubeFetcher {
    #[instrument(skip(self))]
    async fn fetch_live(&self, entity_id: &str) -> MonitorResult<Snapshot> {
        let response = self
            .fetch_video(entity_id, "snippet,statistics,liveStreamingDetails")
            .await?;
        let video = parse_live_video(entity_id, response)?;

        let chat_message_count = match video.active_live_chat_id.as_deref() {
            Some(chat_id) => self.chat_message_count(entity_id, chat_id).await,
            None => 0,
        };

        let channel = self
            .fetch_channel(entity_id, &video.channel_id, "statistics")
            .await?;
        let subscriber_count = channel
            .items
            .first()
            .and_then(|c| c.statistics.as_ref())
            .map_or(0, |s| parse_count(s.subscriber_count.as_ref()));

        debug!(viewers = video.viewer_count, "live snapshot fetched");
        Ok(Snapshot {
            viewer_count: video.viewer_count,
            like_count: video.like_count,
            comment_count: video.comment_count,
            chat_message_count,
            subscriber_count,
            as_of_time: Utc::now(),
        })
    }

    #[instrument(skip(self))]
    async fn fetch_profile(&self, entity_id: &str) -> MonitorResult<Profile> {
        let response = self.fetch_video(entity_id, "snippet").await?;
        let channel_id = response
            .items
            .into_iter()
            .next()
            .and_then(|v| v.snippet)
            .map(|s| s.channel_id)
            .ok_or_else(|| MonitorError::permanent(entity_id, "video not found"))?;

        let channel = self
            .fetch_channel(entity_id, &channel_id, "snippet,statistics")
            .await?;
        parse_profile(entity_id, channel)
    }

    fn validate_entity_id(&self, entity_id: &str) -> MonitorResult<()> {
        if is_valid_video_id(entity_id) {
            Ok(())
        } else {
            Err(MonitorError::invalid_entity_id(
                entity_id,
                "expected an 11 character YouTube video id",
            ))
        }
    }
}
