// ABOUTME: Shared test utilities: scratch databases, stub gateway, sample payloads
// ABOUTME: The stub gateway counts calls and can be toggled into failure modes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Learnhub Contributors
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]
#![allow(dead_code)]

//! Shared test utilities for `learnhub` integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use learnhub::database::Database;
use learnhub::errors::{AppError, AppResult};
use learnhub::gateway::{CourseGateway, PlaylistItem, RemotePlaylist, VideoStatistics};
use learnhub::sync::CourseSynchronizer;
use learnhub::userstore::MemoryUserStore;

/// Open a file-backed scratch database. The `TempDir` must be kept alive for
/// the duration of the test.
pub async fn test_db() -> (Database, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let url = format!("sqlite:{}/courses.db", dir.path().display());
    let db = Database::new(&url).await.expect("Failed to open test database");
    (db, dir)
}

/// A remote playlist payload with plausible defaults.
pub fn playlist(id: &str, title: &str, published_at: &str) -> RemotePlaylist {
    RemotePlaylist {
        id: id.to_owned(),
        title: title.to_owned(),
        description: format!("{title} - description"),
        channel_title: "Learn Channel".to_owned(),
        published_at: published_at.to_owned(),
        thumbnail_url: format!("https://img.example/{id}.jpg"),
    }
}

/// Stub gateway with per-query canned results, call counters and failure
/// toggles. Playlists without configured statistics rate as `None`.
#[derive(Default)]
pub struct StubGateway {
    search_results: Mutex<HashMap<String, Vec<RemotePlaylist>>>,
    channel_results: Mutex<HashMap<String, Vec<RemotePlaylist>>>,
    playlist_videos: Mutex<HashMap<String, Vec<PlaylistItem>>>,
    video_stats: Mutex<HashMap<String, VideoStatistics>>,
    search_calls: AtomicUsize,
    channel_calls: AtomicUsize,
    pub fail_search: AtomicBool,
    pub fail_channel: AtomicBool,
    search_delay: Mutex<Option<Duration>>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_search(&self, query: &str, results: Vec<RemotePlaylist>) {
        self.search_results
            .lock()
            .unwrap()
            .insert(query.to_owned(), results);
    }

    pub fn set_channel(&self, channel_id: &str, results: Vec<RemotePlaylist>) {
        self.channel_results
            .lock()
            .unwrap()
            .insert(channel_id.to_owned(), results);
    }

    /// Wire a playlist to a single video with the given raw counts.
    pub fn set_stats(&self, playlist_id: &str, video_id: &str, views: &str, likes: &str) {
        self.playlist_videos.lock().unwrap().insert(
            playlist_id.to_owned(),
            vec![PlaylistItem {
                video_id: video_id.to_owned(),
            }],
        );
        self.video_stats.lock().unwrap().insert(
            video_id.to_owned(),
            VideoStatistics {
                view_count: Some(views.to_owned()),
                like_count: Some(likes.to_owned()),
            },
        );
    }

    /// Delay every search response (used to hold a reconciliation in flight).
    pub fn set_search_delay(&self, delay: Duration) {
        *self.search_delay.lock().unwrap() = Some(delay);
    }

    pub fn search_call_count(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn channel_call_count(&self) -> usize {
        self.channel_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CourseGateway for StubGateway {
    async fn search_playlists(&self, query: &str) -> AppResult<Vec<RemotePlaylist>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.search_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(AppError::external_service("stub", "search unavailable"));
        }
        Ok(self
            .search_results
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }

    async fn channel_playlists(&self, channel_id: &str) -> AppResult<Vec<RemotePlaylist>> {
        self.channel_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_channel.load(Ordering::SeqCst) {
            return Err(AppError::external_service("stub", "channel unavailable"));
        }
        Ok(self
            .channel_results
            .lock()
            .unwrap()
            .get(channel_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn playlist_items(&self, playlist_id: &str) -> AppResult<Vec<PlaylistItem>> {
        Ok(self
            .playlist_videos
            .lock()
            .unwrap()
            .get(playlist_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn video_statistics(&self, video_id: &str) -> AppResult<Option<VideoStatistics>> {
        Ok(self.video_stats.lock().unwrap().get(video_id).cloned())
    }
}

/// A cache row with plausible defaults and all flags off.
pub fn course(id: &str, user_id: &str, category: &str, trending: bool, published_at: &str) -> learnhub::models::Course {
    learnhub::models::Course {
        id: id.to_owned(),
        user_id: user_id.to_owned(),
        title: format!("{id} title"),
        description: format!("{id} description"),
        channel_title: "Learn Channel".to_owned(),
        published_at: published_at.to_owned(),
        image_url: format!("https://img.example/{id}.jpg"),
        rating: None,
        is_trending: trending,
        category: category.to_owned(),
        is_favorite: false,
        is_watch_later: false,
        is_done: false,
        cached_at: chrono::Utc::now(),
    }
}

/// Synchronizer over a stub gateway and an in-memory user store.
pub fn build_sync(gateway: Arc<StubGateway>, db: &Database) -> Arc<CourseSynchronizer> {
    Arc::new(CourseSynchronizer::new(
        gateway,
        db.courses(),
        Arc::new(MemoryUserStore::new()),
    ))
}

/// Synchronizer wired to a caller-provided user store.
pub fn build_sync_with_store(
    gateway: Arc<StubGateway>,
    db: &Database,
    store: Arc<MemoryUserStore>,
) -> Arc<CourseSynchronizer> {
    Arc::new(CourseSynchronizer::new(gateway, db.courses(), store))
}
