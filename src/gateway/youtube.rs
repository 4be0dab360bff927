// ABOUTME: YouTube Data API v3 client implementing the course gateway
// ABOUTME: Flattens nested search/playlist/video payloads into domain types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Learnhub Contributors

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::errors::{AppError, AppResult};
use crate::gateway::{CourseGateway, PlaylistItem, RemotePlaylist, VideoStatistics};

const SERVICE: &str = "YouTube API";
const PAGE_SIZE: &str = "25";

/// YouTube API client configuration.
#[derive(Debug, Clone)]
pub struct YoutubeConfig {
    /// API key (from the Google Cloud console).
    pub api_key: String,
    /// Base URL (default: <https://www.googleapis.com/youtube/v3>).
    pub base_url: String,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://www.googleapis.com/youtube/v3".to_owned(),
        }
    }
}

/// YouTube Data API v3 client.
pub struct YoutubeGateway {
    config: YoutubeConfig,
    http_client: Client,
}

impl YoutubeGateway {
    /// Create a new client.
    #[must_use]
    pub fn new(config: YoutubeConfig) -> Self {
        Self {
            config,
            http_client: Client::new(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> AppResult<T> {
        let url = format!("{}/{endpoint}", self.config.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(params)
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|e| AppError::external_service(SERVICE, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::external_service(
                SERVICE,
                format!("{endpoint} request failed with HTTP {status}"),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::external_service(SERVICE, format!("JSON parse error: {e}")))
    }
}

#[async_trait]
impl CourseGateway for YoutubeGateway {
    async fn search_playlists(&self, query: &str) -> AppResult<Vec<RemotePlaylist>> {
        let response: SearchListResponse = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("type", "playlist"),
                    ("maxResults", PAGE_SIZE),
                    ("q", query),
                ],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|item| {
                let id = item.id.playlist_id?;
                Some(flatten(id, item.snippet))
            })
            .collect())
    }

    async fn channel_playlists(&self, channel_id: &str) -> AppResult<Vec<RemotePlaylist>> {
        let response: PlaylistListResponse = self
            .get_json(
                "playlists",
                &[
                    ("part", "snippet"),
                    ("channelId", channel_id),
                    ("maxResults", PAGE_SIZE),
                ],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .map(|item| flatten(item.id, item.snippet))
            .collect())
    }

    async fn playlist_items(&self, playlist_id: &str) -> AppResult<Vec<PlaylistItem>> {
        let response: ItemListResponse = self
            .get_json(
                "playlistItems",
                &[
                    ("part", "contentDetails"),
                    ("playlistId", playlist_id),
                    ("maxResults", "5"),
                ],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|item| item.content_details.and_then(|d| d.video_id))
            .map(|video_id| PlaylistItem { video_id })
            .collect())
    }

    async fn video_statistics(&self, video_id: &str) -> AppResult<Option<VideoStatistics>> {
        let response: VideoListResponse = self
            .get_json("videos", &[("part", "statistics"), ("id", video_id)])
            .await?;

        Ok(response
            .items
            .into_iter()
            .next()
            .and_then(|item| item.statistics))
    }
}

fn flatten(id: String, snippet: Option<Snippet>) -> RemotePlaylist {
    let snippet = snippet.unwrap_or_default();
    let published_at = snippet.published_at();
    let thumbnail_url = snippet.thumbnail_url();
    RemotePlaylist {
        id,
        title: snippet.title,
        description: snippet.description,
        channel_title: snippet.channel_title,
        published_at,
        thumbnail_url,
    }
}

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    id: SearchResultId,
    snippet: Option<Snippet>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResultId {
    #[serde(rename = "playlistId")]
    playlist_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistListResponse {
    #[serde(default)]
    items: Vec<PlaylistResult>,
}

#[derive(Debug, Deserialize)]
struct PlaylistResult {
    id: String,
    snippet: Option<Snippet>,
}

#[derive(Debug, Default, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
    // The search endpoint reports `publishTime`, the playlists endpoint
    // `publishedAt`; either may be present.
    #[serde(rename = "publishedAt")]
    published: Option<String>,
    #[serde(rename = "publishTime")]
    publish_time: Option<String>,
    thumbnails: Option<Thumbnails>,
}

impl Snippet {
    fn published_at(&self) -> String {
        self.publish_time
            .clone()
            .or_else(|| self.published.clone())
            .unwrap_or_default()
    }

    fn thumbnail_url(&self) -> String {
        let Some(thumbnails) = &self.thumbnails else {
            return String::new();
        };
        thumbnails
            .high
            .as_ref()
            .or(thumbnails.medium.as_ref())
            .or(thumbnails.fallback.as_ref())
            .map(|thumb| thumb.url.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    #[serde(rename = "default")]
    fallback: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct ItemListResponse {
    #[serde(default)]
    items: Vec<ItemResult>,
}

#[derive(Debug, Deserialize)]
struct ItemResult {
    #[serde(rename = "contentDetails")]
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoResult>,
}

#[derive(Debug, Deserialize)]
struct VideoResult {
    statistics: Option<VideoStatistics>,
}
