// ABOUTME: Remote metadata gateway boundary: trait and domain-facing payload types
// ABOUTME: Every call is fallible and async; the synchronizer never retries implicitly
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Learnhub Contributors

//! Boundary contract for the remote course-metadata source.
//!
//! The synchronizer only depends on the [`CourseGateway`] trait; the concrete
//! [`youtube::YoutubeGateway`] client lives behind it. Gateway failures are a
//! normal condition (network, quota, malformed payloads) and are converted to
//! empty or fallback results at the synchronizer boundary - they never reach
//! the UI as raw transport errors.

/// YouTube Data API v3 client.
pub mod youtube;

pub use youtube::{YoutubeConfig, YoutubeGateway};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use crate::errors::AppResult;

/// One remote playlist, flattened from the platform's nested response shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePlaylist {
    /// Platform playlist id (becomes the cached course id).
    pub id: String,
    /// Playlist title.
    pub title: String,
    /// Playlist description.
    pub description: String,
    /// Publishing channel's display name.
    pub channel_title: String,
    /// Publication timestamp (RFC 3339).
    pub published_at: String,
    /// Best available thumbnail URL.
    pub thumbnail_url: String,
}

/// One entry of a playlist; only the video id is needed (the rating proxy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistItem {
    /// Platform video id.
    pub video_id: String,
}

/// Engagement statistics of one video.
///
/// The platform reports counts as numbers or strings depending on endpoint
/// version; both are accepted and carried as strings so the rating estimator
/// owns the defensive parse. Unparseable fields deserialize to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VideoStatistics {
    /// Total view count, if reported.
    #[serde(rename = "viewCount", default, deserialize_with = "count_field")]
    pub view_count: Option<String>,
    /// Total like count, if reported.
    #[serde(rename = "likeCount", default, deserialize_with = "count_field")]
    pub like_count: Option<String>,
}

fn count_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCount {
        Number(f64),
        Text(String),
    }

    Ok(Option::<RawCount>::deserialize(deserializer)?.map(|raw| match raw {
        RawCount::Number(n) => n.to_string(),
        RawCount::Text(s) => s,
    }))
}

/// Remote course-metadata source.
///
/// Implementations must not retry or cache on their own; the calling layers
/// decide how failures degrade.
#[async_trait]
pub trait CourseGateway: Send + Sync {
    /// Search playlists by free-text query.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails or the payload is malformed.
    async fn search_playlists(&self, query: &str) -> AppResult<Vec<RemotePlaylist>>;

    /// List a channel's playlists (the trending feed source).
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails or the payload is malformed.
    async fn channel_playlists(&self, channel_id: &str) -> AppResult<Vec<RemotePlaylist>>;

    /// List the entries of one playlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails or the payload is malformed.
    async fn playlist_items(&self, playlist_id: &str) -> AppResult<Vec<PlaylistItem>>;

    /// Engagement statistics for one video, if the platform has any.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails or the payload is malformed.
    async fn video_statistics(&self, video_id: &str) -> AppResult<Option<VideoStatistics>>;
}
