//! Video- and stream-service source clients.
//!
//! Both clients reduce platform payloads to [`SourceRecord`] values; the
//! ingestor never sees raw API shapes. Fetches run one page at a time with
//! a 30-second limit per page.

use std::time::Duration as StdDuration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use ashbot_core::retry::RetryPolicy;

use crate::error::{CatalogError, Result};
use crate::http::send_with_retry;

const PAGE_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Playlists with fewer items than this are skipped (one-off videos, not
/// playthroughs).
const MIN_PLAYLIST_ITEMS: u32 = 2;

/// Playlist-title markers that identify non-game playlists.
const SKIP_MARKERS: &[&str] = &[
    "shorts", "clips", "highlights", "music", "podcast", "trailer", "announcement",
];

/// One unit of ingestion work.
#[derive(Debug, Clone)]
pub enum SourceRecord {
    Playlist(PlaylistRecord),
    Stream(StreamRecord),
}

/// A video-service playlist (one playthrough).
#[derive(Debug, Clone, Default)]
pub struct PlaylistRecord {
    pub playlist_id: String,
    pub title: String,
    pub item_count: u32,
    pub item_durations_minutes: Vec<u32>,
    pub item_view_counts: Vec<u64>,
    pub url: String,
}

/// A stream-service archive entry.
#[derive(Debug, Clone, Default)]
pub struct StreamRecord {
    pub title: String,
    pub duration_minutes: u32,
    pub view_count: u64,
    /// Platform-native game name, when the platform classified the stream.
    /// Presence short-circuits extraction with confidence 1.0.
    pub game_name: Option<String>,
    pub url: Option<String>,
}

/// Whether a playlist should enter ingestion at all.
pub fn playlist_is_ingestible(title: &str, item_count: u32) -> bool {
    if item_count < MIN_PLAYLIST_ITEMS {
        return false;
    }
    let lower = title.to_lowercase();
    !SKIP_MARKERS.iter().any(|m| lower.contains(m))
}

/// Parse an ISO-8601 video duration (`PT1H23M45S`) to whole minutes.
pub fn parse_iso8601_minutes(duration: &str) -> u32 {
    static PART: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)([HMS])").unwrap());
    let mut seconds: u64 = 0;
    for cap in PART.captures_iter(duration) {
        let amount: u64 = cap[1].parse().unwrap_or(0);
        match &cap[2] {
            "H" => seconds += amount * 3_600,
            "M" => seconds += amount * 60,
            "S" => seconds += amount,
            _ => {}
        }
    }
    (seconds / 60) as u32
}

/// Parse a stream-service duration (`1h2m3s`) to whole minutes.
pub fn parse_stream_minutes(duration: &str) -> u32 {
    static PART: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)([hms])").unwrap());
    let mut seconds: u64 = 0;
    for cap in PART.captures_iter(duration) {
        let amount: u64 = cap[1].parse().unwrap_or(0);
        match &cap[2] {
            "h" => seconds += amount * 3_600,
            "m" => seconds += amount * 60,
            "s" => seconds += amount,
            _ => {}
        }
    }
    (seconds / 60) as u32
}

/// Stream titles sometimes cover two games back to back; each segment is a
/// separate extraction candidate.
pub fn split_multi_game_title(title: &str) -> Vec<String> {
    static THEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+(?:and\s+)?then\s+").unwrap());
    THEN.split(title)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Video-service client (playlist-first).
pub struct YouTubeSource {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl YouTubeSource {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(PAGE_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key,
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            retry: RetryPolicy::media_source(),
        }
    }

    /// Fetch the channel's game playlists as records, skip rules applied.
    pub async fn fetch_playlists(&self, channel_id: &str) -> Result<Vec<SourceRecord>> {
        let url = format!("{}/playlists", self.base_url);
        let resp = send_with_retry(&self.retry, || {
            self.client
                .get(&url)
                .query(&[
                    ("part", "snippet,contentDetails"),
                    ("channelId", channel_id),
                    ("maxResults", "50"),
                    ("key", self.api_key.as_str()),
                ])
                .send()
        })
        .await?;
        let playlists: PlaylistListResponse = check_json(resp).await?;

        let mut records = Vec::new();
        for item in playlists.items {
            let title = item.snippet.title;
            let count = item.content_details.item_count;
            if !playlist_is_ingestible(&title, count) {
                debug!(%title, count, "playlist skipped");
                continue;
            }

            let (durations, views) = self.fetch_playlist_items(&item.id).await?;
            records.push(SourceRecord::Playlist(PlaylistRecord {
                url: format!("https://www.youtube.com/playlist?list={}", item.id),
                playlist_id: item.id,
                title,
                item_count: count,
                item_durations_minutes: durations,
                item_view_counts: views,
            }));
        }
        info!(count = records.len(), "video-service playlists fetched");
        Ok(records)
    }

    /// Per-item durations and view counts for one playlist (first page).
    async fn fetch_playlist_items(&self, playlist_id: &str) -> Result<(Vec<u32>, Vec<u64>)> {
        let url = format!("{}/playlistItems", self.base_url);
        let resp = send_with_retry(&self.retry, || {
            self.client
                .get(&url)
                .query(&[
                    ("part", "contentDetails"),
                    ("playlistId", playlist_id),
                    ("maxResults", "50"),
                    ("key", self.api_key.as_str()),
                ])
                .send()
        })
        .await?;
        let items: PlaylistItemsResponse = check_json(resp).await?;

        let video_ids: Vec<String> = items
            .items
            .into_iter()
            .map(|i| i.content_details.video_id)
            .collect();
        if video_ids.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let url = format!("{}/videos", self.base_url);
        let ids = video_ids.join(",");
        let resp = send_with_retry(&self.retry, || {
            self.client
                .get(&url)
                .query(&[
                    ("part", "contentDetails,statistics"),
                    ("id", ids.as_str()),
                    ("key", self.api_key.as_str()),
                ])
                .send()
        })
        .await?;
        let videos: VideosResponse = check_json(resp).await?;

        let mut durations = Vec::new();
        let mut views = Vec::new();
        for v in videos.items {
            durations.push(parse_iso8601_minutes(&v.content_details.duration));
            views.push(v.statistics.view_count.parse().unwrap_or(0));
        }
        Ok((durations, views))
    }
}

/// Stream-service client (archive VODs).
pub struct TwitchSource {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    base_url: String,
    retry: RetryPolicy,
}

impl TwitchSource {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(PAGE_TIMEOUT)
                .build()
                .unwrap_or_default(),
            client_id,
            client_secret,
            base_url: "https://api.twitch.tv/helix".to_string(),
            retry: RetryPolicy::media_source(),
        }
    }

    async fn access_token(&self) -> Result<String> {
        let resp = send_with_retry(&self.retry, || {
            self.client
                .post("https://id.twitch.tv/oauth2/token")
                .query(&[
                    ("client_id", self.client_id.as_str()),
                    ("client_secret", self.client_secret.as_str()),
                    ("grant_type", "client_credentials"),
                ])
                .send()
        })
        .await?;
        let token: TokenResponse = check_json(resp).await?;
        Ok(token.access_token)
    }

    /// Fetch the user's archive VODs as stream records.
    pub async fn fetch_archives(&self, username: &str) -> Result<Vec<SourceRecord>> {
        let token = self.access_token().await?;

        let resp = send_with_retry(&self.retry, || {
            self.client
                .get(format!("{}/users", self.base_url))
                .query(&[("login", username)])
                .header("Client-ID", &self.client_id)
                .bearer_auth(&token)
                .send()
        })
        .await?;
        let users: HelixResponse<HelixUser> = check_json(resp).await?;
        let Some(user) = users.data.into_iter().next() else {
            warn!(username, "stream-service user not found");
            return Ok(Vec::new());
        };

        let resp = send_with_retry(&self.retry, || {
            self.client
                .get(format!("{}/videos", self.base_url))
                .query(&[
                    ("user_id", user.id.as_str()),
                    ("type", "archive"),
                    ("first", "100"),
                ])
                .header("Client-ID", &self.client_id)
                .bearer_auth(&token)
                .send()
        })
        .await?;
        let videos: HelixResponse<HelixVideo> = check_json(resp).await?;

        let records = videos
            .data
            .into_iter()
            .map(|v| {
                SourceRecord::Stream(StreamRecord {
                    title: v.title,
                    duration_minutes: parse_stream_minutes(&v.duration),
                    view_count: v.view_count,
                    game_name: None,
                    url: Some(v.url),
                })
            })
            .collect::<Vec<_>>();
        info!(count = records.len(), "stream-service archives fetched");
        Ok(records)
    }
}

async fn check_json<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status().as_u16();
    if !resp.status().is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(CatalogError::Api {
            status,
            message: text,
        });
    }
    resp.json::<T>()
        .await
        .map_err(|e| CatalogError::Parse(e.to_string()))
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct PlaylistListResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Deserialize)]
struct PlaylistItem {
    id: String,
    snippet: PlaylistSnippet,
    #[serde(rename = "contentDetails")]
    content_details: PlaylistContentDetails,
}

#[derive(Deserialize)]
struct PlaylistSnippet {
    title: String,
}

#[derive(Deserialize)]
struct PlaylistContentDetails {
    #[serde(rename = "itemCount", default)]
    item_count: u32,
}

#[derive(Deserialize)]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistVideoItem>,
}

#[derive(Deserialize)]
struct PlaylistVideoItem {
    #[serde(rename = "contentDetails")]
    content_details: PlaylistVideoContentDetails,
}

#[derive(Deserialize)]
struct PlaylistVideoContentDetails {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[derive(Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
struct VideoItem {
    #[serde(rename = "contentDetails")]
    content_details: VideoContentDetails,
    #[serde(default)]
    statistics: VideoStatistics,
}

#[derive(Deserialize)]
struct VideoContentDetails {
    #[serde(default)]
    duration: String,
}

#[derive(Deserialize, Default)]
struct VideoStatistics {
    #[serde(rename = "viewCount", default)]
    view_count: String,
}

#[derive(Deserialize)]
struct HelixResponse<T> {
    #[serde(default)]
    data: Vec<T>,
}

#[derive(Deserialize, Default)]
struct HelixUser {
    id: String,
}

#[derive(Deserialize, Default)]
struct HelixVideo {
    title: String,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    view_count: u64,
    #[serde(default)]
    url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso8601_durations() {
        assert_eq!(parse_iso8601_minutes("PT1H23M45S"), 83);
        assert_eq!(parse_iso8601_minutes("PT45M"), 45);
        assert_eq!(parse_iso8601_minutes("PT59S"), 0);
        assert_eq!(parse_iso8601_minutes("PT2H"), 120);
        assert_eq!(parse_iso8601_minutes("garbage"), 0);
    }

    #[test]
    fn stream_durations() {
        assert_eq!(parse_stream_minutes("1h2m3s"), 62);
        assert_eq!(parse_stream_minutes("45m"), 45);
        assert_eq!(parse_stream_minutes("30s"), 0);
    }

    #[test]
    fn playlist_skip_rules() {
        assert!(playlist_is_ingestible("Dark Souls [COMPLETED]", 24));
        assert!(!playlist_is_ingestible("Channel Shorts", 50));
        assert!(!playlist_is_ingestible("Best Clips 2024", 12));
        assert!(!playlist_is_ingestible("Elden Ring", 1));
    }

    #[test]
    fn multi_game_titles_split() {
        assert_eq!(
            split_multi_game_title("Portal 2 then Half-Life: Alyx"),
            vec!["Portal 2".to_string(), "Half-Life: Alyx".to_string()]
        );
        assert_eq!(
            split_multi_game_title("Subnautica and then some Dredge"),
            vec!["Subnautica".to_string(), "some Dredge".to_string()]
        );
        assert_eq!(split_multi_game_title("Just one game"), vec!["Just one game".to_string()]);
    }
}
