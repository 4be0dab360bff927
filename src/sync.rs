// ABOUTME: Course synchronizer: remote fetch, rating, flag-preserving merge, cache replace
// ABOUTME: Reconciles the cache against the remote profile's relationship-id lists
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Learnhub Contributors

//! Orchestration of the fetch → rate → merge → replace cycle.
//!
//! Two rules govern every ingestion path:
//!
//! 1. Existing relationship flags are read **before** the clear-and-replace
//!    step and carried forward into the replacement rows. A fresh fetch may
//!    change anything descriptive about a course, never what the user did
//!    with it.
//! 2. Gateway failures degrade (empty or fallback results); storage failures
//!    propagate. Raw transport errors never cross this boundary.
//!
//! Known race: a flag toggle landing between a refresh's read-existing step
//! and its write-new step is overwritten with the flag value captured before
//! the toggle. Tolerated by design; a fix would need per-row optimistic
//! versioning.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::database::CourseManager;
use crate::errors::AppResult;
use crate::gateway::{CourseGateway, RemotePlaylist};
use crate::models::{Course, CourseFlag, CATEGORY_SEARCH, CATEGORY_SYNCED};
use crate::rating;
use crate::userstore::UserStore;

/// Course synchronizer / repository.
///
/// The only writer of ingestion data into the course cache. User identity is
/// threaded explicitly through every call; nothing here reads ambient state.
pub struct CourseSynchronizer {
    gateway: Arc<dyn CourseGateway>,
    courses: CourseManager,
    user_store: Arc<dyn UserStore>,
    reconciling: DashMap<String, ()>,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    /// A pass for this user was already in flight; nothing was done.
    pub skipped: bool,
    /// Cached rows whose flags were overwritten from the remote lists.
    pub updated: usize,
    /// Rows newly materialized from the remote platform.
    pub materialized: usize,
    /// Ids that could not be reconciled (fetch failed or found nothing).
    pub failed: Vec<String>,
}

impl ReconcileSummary {
    /// Human-readable outcome for the UI's sync banner.
    #[must_use]
    pub fn message(&self) -> String {
        if self.skipped {
            "Sync already in progress".to_owned()
        } else if self.failed.is_empty() {
            "Updated successfully".to_owned()
        } else {
            format!("Update failed for {} course(s)", self.failed.len())
        }
    }
}

/// Result of a flag toggle.
#[derive(Debug, Clone)]
pub struct ToggleOutcome {
    /// Point reload of the affected row after the local write.
    pub course: Option<Course>,
    /// Whether the remote profile mirror succeeded. The local write stands
    /// either way.
    pub remote_synced: bool,
}

/// Cancels the profile-subscription reconcile loop when dropped.
pub struct ProfileSyncHandle {
    task: JoinHandle<()>,
}

impl Drop for ProfileSyncHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

enum ReconcileOutcome {
    Updated,
    Materialized,
    Missing,
}

impl CourseSynchronizer {
    /// Create a synchronizer over its three collaborators.
    pub fn new(
        gateway: Arc<dyn CourseGateway>,
        courses: CourseManager,
        user_store: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            gateway,
            courses,
            user_store,
            reconciling: DashMap::new(),
        }
    }

    /// The cache manager this synchronizer writes through.
    #[must_use]
    pub fn courses(&self) -> &CourseManager {
        &self.courses
    }

    /// Refresh the trending feed for one channel.
    ///
    /// Gateway failure (or an empty feed) returns an empty result and leaves
    /// the cache untouched - the caller keeps showing stale cached data.
    ///
    /// # Errors
    ///
    /// Returns an error only on a local storage fault.
    pub async fn fetch_trending(&self, channel_id: &str, user_id: &str) -> AppResult<Vec<Course>> {
        let fetched = match self.gateway.channel_playlists(channel_id).await {
            Ok(items) => items,
            Err(e) => {
                warn!(channel_id, "trending fetch failed: {e}");
                return Ok(Vec::new());
            }
        };
        if fetched.is_empty() {
            debug!(channel_id, "trending feed empty, keeping cached rows");
            return Ok(Vec::new());
        }

        let rated = self.rate_all(fetched).await;

        // Read existing flags strictly before the clear-and-replace step.
        let existing = index_by_id(self.courses.list_by_trending(user_id, true).await?);
        let rows = build_rows(user_id, channel_id, true, rated, &existing);

        self.courses.clear_category(channel_id, user_id, true).await?;
        self.courses.upsert_many(&rows).await?;

        info!(channel_id, count = rows.len(), "trending feed refreshed");
        Ok(rows)
    }

    /// Search the platform and replace `category_key`'s cached rows with the
    /// results.
    ///
    /// Gateway failure falls back to whatever is already cached for the
    /// category or, failing that, any non-trending rows for the user - a
    /// degraded-but-non-empty result is preferred over an empty one.
    ///
    /// # Errors
    ///
    /// Returns an error only on a local storage fault.
    pub async fn search_and_save(
        &self,
        query: &str,
        category_key: &str,
        user_id: &str,
    ) -> AppResult<Vec<Course>> {
        let fetched = match self.gateway.search_playlists(query).await {
            Ok(items) => items,
            Err(e) => {
                warn!(query, category_key, "search failed, serving cached rows: {e}");
                let cached = self
                    .courses
                    .list_by_category(category_key, user_id, false)
                    .await?;
                if !cached.is_empty() {
                    return Ok(cached);
                }
                return self.courses.list_by_trending(user_id, false).await;
            }
        };

        let rated = self.rate_all(fetched).await;

        let existing = index_by_id(self.courses.list_by_trending(user_id, false).await?);
        let rows = build_rows(user_id, category_key, false, rated, &existing);

        self.courses
            .clear_category(category_key, user_id, false)
            .await?;
        self.courses.upsert_many(&rows).await?;

        info!(query, category_key, count = rows.len(), "search results saved");
        Ok(rows)
    }

    /// Direct search: fetch and rate without contending with saved category
    /// state.
    ///
    /// Results are written ephemerally so detail lookups by id resolve: rows
    /// not yet cached land under the `"search"` category; rows that already
    /// exist keep their category, trending flag and relationship flags and
    /// only have their descriptive fields refreshed. No category is cleared.
    ///
    /// # Errors
    ///
    /// Returns an error only on a local storage fault.
    pub async fn search_direct(&self, query: &str, user_id: &str) -> AppResult<Vec<Course>> {
        let fetched = match self.gateway.search_playlists(query).await {
            Ok(items) => items,
            Err(e) => {
                warn!(query, "direct search failed: {e}");
                return Ok(Vec::new());
            }
        };

        let rated = self.rate_all(fetched).await;

        let ids: Vec<String> = rated.iter().map(|(playlist, _)| playlist.id.clone()).collect();
        let existing = index_by_id(self.courses.get_by_ids(&ids, user_id).await?);

        let now = Utc::now();
        let rows: Vec<Course> = rated
            .into_iter()
            .map(|(playlist, rating)| match existing.get(&playlist.id) {
                Some(prev) => {
                    let mut row = prev.clone();
                    row.title = playlist.title;
                    row.description = playlist.description;
                    row.channel_title = playlist.channel_title;
                    row.published_at = playlist.published_at;
                    row.image_url = playlist.thumbnail_url;
                    row.rating = rating;
                    row.cached_at = now;
                    row
                }
                None => new_row(user_id, CATEGORY_SEARCH, false, playlist, rating, now),
            })
            .collect();

        self.courses.upsert_many(&rows).await?;
        Ok(rows)
    }

    /// Fold the remote profile's relationship-id lists into the local cache.
    ///
    /// The remote lists are ground truth here: this is the one path where
    /// flags are overwritten in bulk, intentionally. Ids absent from the
    /// cache are materialized under the `"synced_courses"` category so a
    /// course flagged on another device becomes locally visible. Per-id
    /// failures are isolated and reported in the summary.
    ///
    /// Re-entrant calls for the same user are rejected while a pass is in
    /// flight (`skipped = true`): the subscription that triggers this fires
    /// on every remote mutation, including our own writes.
    ///
    /// # Errors
    ///
    /// Never fails as a whole; per-id storage and fetch faults land in
    /// [`ReconcileSummary::failed`].
    pub async fn reconcile(
        &self,
        user_id: &str,
        fav_ids: &[String],
        watch_ids: &[String],
        done_ids: &[String],
    ) -> AppResult<ReconcileSummary> {
        if self
            .reconciling
            .insert(user_id.to_owned(), ())
            .is_some()
        {
            debug!(user_id, "reconciliation already in flight, skipping");
            return Ok(ReconcileSummary {
                skipped: true,
                ..ReconcileSummary::default()
            });
        }
        let _latch = ReconcileLatch {
            map: &self.reconciling,
            user_id,
        };

        let mut summary = ReconcileSummary::default();
        let mut seen = HashSet::new();
        let union: Vec<&String> = fav_ids
            .iter()
            .chain(watch_ids)
            .chain(done_ids)
            .filter(|id| seen.insert(id.as_str()))
            .collect();

        for id in union {
            match self
                .reconcile_one(user_id, id, fav_ids, watch_ids, done_ids)
                .await
            {
                Ok(ReconcileOutcome::Updated) => summary.updated += 1,
                Ok(ReconcileOutcome::Materialized) => summary.materialized += 1,
                Ok(ReconcileOutcome::Missing) => {
                    warn!(user_id, %id, "course not found on platform during sync");
                    summary.failed.push(id.clone());
                }
                Err(e) => {
                    warn!(user_id, %id, "course sync failed: {e}");
                    summary.failed.push(id.clone());
                }
            }
        }

        info!(
            user_id,
            updated = summary.updated,
            materialized = summary.materialized,
            failed = summary.failed.len(),
            "reconciliation complete"
        );
        Ok(summary)
    }

    async fn reconcile_one(
        &self,
        user_id: &str,
        id: &str,
        fav_ids: &[String],
        watch_ids: &[String],
        done_ids: &[String],
    ) -> AppResult<ReconcileOutcome> {
        let cached = self.courses.get_by_id(id, user_id).await?;
        let materialized = cached.is_none();
        if materialized {
            self.materialize(id, user_id).await?;
        }

        match self.courses.get_by_id(id, user_id).await? {
            Some(mut row) => {
                row.is_favorite = fav_ids.iter().any(|fav| fav == id);
                row.is_watch_later = watch_ids.iter().any(|watch| watch == id);
                row.is_done = done_ids.iter().any(|done| done == id);
                row.cached_at = Utc::now();
                self.courses.upsert_many(std::slice::from_ref(&row)).await?;
                Ok(if materialized {
                    ReconcileOutcome::Materialized
                } else {
                    ReconcileOutcome::Updated
                })
            }
            None => Ok(ReconcileOutcome::Missing),
        }
    }

    /// Fetch one id's metadata and cache it under the synced category.
    /// Plain upsert, no category clear: successive materializations within a
    /// pass must not delete each other's rows.
    async fn materialize(&self, id: &str, user_id: &str) -> AppResult<()> {
        let fetched = self.gateway.search_playlists(id).await.map_err(|e| {
            debug!(id, "materialization fetch failed");
            e
        })?;
        if fetched.is_empty() {
            return Ok(());
        }

        let rated = self.rate_all(fetched).await;
        let ids: Vec<String> = rated.iter().map(|(playlist, _)| playlist.id.clone()).collect();
        let existing = index_by_id(self.courses.get_by_ids(&ids, user_id).await?);
        let rows = build_rows(user_id, CATEGORY_SYNCED, false, rated, &existing);
        self.courses.upsert_many(&rows).await
    }

    /// Toggle one relationship flag.
    ///
    /// The local write is applied first and unconditionally; mirroring into
    /// the remote profile is best-effort (failure is reported through
    /// [`ToggleOutcome::remote_synced`], never rolled back). Returns the
    /// point reload of the row so a bound detail view sees the new value.
    ///
    /// # Errors
    ///
    /// Returns an error only on a local storage fault.
    pub async fn toggle_flag(
        &self,
        id: &str,
        user_id: &str,
        flag: CourseFlag,
        value: bool,
    ) -> AppResult<ToggleOutcome> {
        self.courses.set_flag(id, user_id, flag, value).await?;

        let mirror = if value {
            self.user_store.array_union(user_id, flag, id).await
        } else {
            self.user_store.array_remove(user_id, flag, id).await
        };
        let remote_synced = match mirror {
            Ok(()) => true,
            Err(e) => {
                warn!(user_id, id, %flag, "remote flag mirror failed: {e}");
                false
            }
        };

        let course = self.courses.get_by_id(id, user_id).await?;
        Ok(ToggleOutcome {
            course,
            remote_synced,
        })
    }

    /// Subscribe to the user's remote profile and reconcile on every
    /// delivered snapshot. Dropping the handle cancels the loop.
    pub fn watch_profile(self: &Arc<Self>, user_id: &str) -> ProfileSyncHandle {
        let sync = Arc::clone(self);
        let user_id = user_id.to_owned();
        let task = tokio::spawn(async move {
            let mut events = match sync.user_store.subscribe(&user_id).await {
                Ok(events) => events,
                Err(e) => {
                    warn!(%user_id, "profile subscription failed: {e}");
                    return;
                }
            };
            while let Some(profile) = events.recv().await {
                match sync
                    .reconcile(
                        &user_id,
                        &profile.favorites,
                        &profile.watchlist,
                        &profile.done_courses,
                    )
                    .await
                {
                    Ok(summary) if summary.skipped => {}
                    Ok(summary) => debug!(%user_id, "{}", summary.message()),
                    Err(e) => warn!(%user_id, "profile reconciliation failed: {e}"),
                }
            }
        });
        ProfileSyncHandle { task }
    }

    /// Rate every fetched playlist, sequentially, via its first video's
    /// engagement statistics. Any per-playlist gateway failure degrades to
    /// an absent rating.
    async fn rate_all(&self, fetched: Vec<RemotePlaylist>) -> Vec<(RemotePlaylist, Option<f32>)> {
        let mut rated = Vec::with_capacity(fetched.len());
        for playlist in fetched {
            let rating = self.rate_playlist(&playlist.id).await;
            rated.push((playlist, rating));
        }
        rated
    }

    async fn rate_playlist(&self, playlist_id: &str) -> Option<f32> {
        let items = match self.gateway.playlist_items(playlist_id).await {
            Ok(items) => items,
            Err(e) => {
                debug!(playlist_id, "playlist items lookup failed: {e}");
                return None;
            }
        };
        let first = items.first()?;
        let stats = match self.gateway.video_statistics(&first.video_id).await {
            Ok(stats) => stats?,
            Err(e) => {
                debug!(playlist_id, "video statistics lookup failed: {e}");
                return None;
            }
        };
        rating::estimate_from_counts(stats.view_count.as_deref(), stats.like_count.as_deref())
    }
}

struct ReconcileLatch<'a> {
    map: &'a DashMap<String, ()>,
    user_id: &'a str,
}

impl Drop for ReconcileLatch<'_> {
    fn drop(&mut self) {
        self.map.remove(self.user_id);
    }
}

fn index_by_id(rows: Vec<Course>) -> HashMap<String, Course> {
    rows.into_iter().map(|row| (row.id.clone(), row)).collect()
}

fn build_rows(
    user_id: &str,
    category: &str,
    trending: bool,
    rated: Vec<(RemotePlaylist, Option<f32>)>,
    existing: &HashMap<String, Course>,
) -> Vec<Course> {
    let now = Utc::now();
    rated
        .into_iter()
        .map(|(playlist, rating)| {
            let prev = existing.get(&playlist.id);
            let mut row = new_row(user_id, category, trending, playlist, rating, now);
            if let Some(prev) = prev {
                row.is_favorite = prev.is_favorite;
                row.is_watch_later = prev.is_watch_later;
                row.is_done = prev.is_done;
            }
            row
        })
        .collect()
}

fn new_row(
    user_id: &str,
    category: &str,
    trending: bool,
    playlist: RemotePlaylist,
    rating: Option<f32>,
    now: chrono::DateTime<Utc>,
) -> Course {
    Course {
        id: playlist.id,
        user_id: user_id.to_owned(),
        title: playlist.title,
        description: playlist.description,
        channel_title: playlist.channel_title,
        published_at: playlist.published_at,
        image_url: playlist.thumbnail_url,
        rating,
        is_trending: trending,
        category: category.to_owned(),
        is_favorite: false,
        is_watch_later: false,
        is_done: false,
        cached_at: now,
    }
}
