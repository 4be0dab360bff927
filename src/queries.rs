// ABOUTME: Reactive query layer: de-duplicated queries with per-family loading/error signals
// ABOUTME: Loaded-query sets short-circuit redundant remote fetches; refresh variants bypass them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Learnhub Contributors

//! View-state coordination between the UI and the synchronizer.
//!
//! Three independent query families (trending / search / general) each expose
//! a loading flag and an error slot; an error in one family never blocks or
//! clears another. Queries already satisfied are answered from cache without
//! touching the gateway; explicit refresh calls always re-fetch.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;
use tracing::debug;

use crate::database::{CourseDetailWatch, CourseListWatch, CourseManager};
use crate::errors::AppResult;
use crate::models::{Course, CATEGORY_HOME};
use crate::sync::CourseSynchronizer;

/// Map a free-text query to its cache partition key.
///
/// Deterministic and order-sensitive: the first matching topic substring
/// wins. Exact `courses`/`home` queries map to the general key; anything
/// unrecognized becomes the whitespace-collapsed, underscored raw query.
#[must_use]
pub fn detect_category_key_from_query(query: &str) -> String {
    let q = query.trim().to_lowercase();
    if q.contains("program") {
        return "programming".to_owned();
    }
    if q.contains("engineer") {
        return "engineering".to_owned();
    }
    if q.contains("medical") || q.contains("medicine") {
        return "medical".to_owned();
    }
    if q.contains("marketing") {
        return "marketing".to_owned();
    }
    if q.contains("language") {
        return "language".to_owned();
    }
    if q.contains("human") || q.contains("development") {
        return "human_dev".to_owned();
    }
    if q == "courses" || q == "home" {
        return CATEGORY_HOME.to_owned();
    }
    q.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Loading flag and error slot of one query family.
///
/// Protocol, identical on every path: loading flips to `true` before the
/// remote call; on completion the error slot is set (or cleared) and loading
/// flips back to `false`, regardless of outcome.
pub struct QuerySignals {
    loading: watch::Sender<bool>,
    error: watch::Sender<Option<String>>,
}

impl QuerySignals {
    fn new() -> Self {
        Self {
            loading: watch::channel(false).0,
            error: watch::channel(None).0,
        }
    }

    /// Observe the loading flag.
    #[must_use]
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// Observe the error slot.
    #[must_use]
    pub fn error(&self) -> watch::Receiver<Option<String>> {
        self.error.subscribe()
    }

    /// Current loading state.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Current error message, if any.
    #[must_use]
    pub fn current_error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    fn begin(&self) {
        self.loading.send_replace(true);
    }

    fn finish(&self, error: Option<String>) {
        self.error.send_replace(error);
        self.loading.send_replace(false);
    }

    fn reset(&self) {
        self.loading.send_replace(false);
        self.error.send_replace(None);
    }
}

type UserKey = (String, String);

/// Reactive query coordinator.
///
/// Holds the in-memory de-dup state (loaded search queries, loaded trending
/// ids, per-category feeds). All of it is explicit and dropped by
/// [`CourseQueryService::reset`] on user switch or logout - nothing rides on
/// implicit object lifetime.
pub struct CourseQueryService {
    sync: Arc<CourseSynchronizer>,
    courses: CourseManager,
    loaded_searches: DashMap<UserKey, ()>,
    loaded_trending: DashMap<UserKey, ()>,
    category_feeds: DashMap<UserKey, Arc<watch::Sender<Vec<Course>>>>,
    direct_results: watch::Sender<Vec<Course>>,
    trending_signals: QuerySignals,
    search_signals: QuerySignals,
    general_signals: QuerySignals,
}

impl CourseQueryService {
    /// Create a coordinator over the synchronizer and cache.
    #[must_use]
    pub fn new(sync: Arc<CourseSynchronizer>, courses: CourseManager) -> Self {
        Self {
            sync,
            courses,
            loaded_searches: DashMap::new(),
            loaded_trending: DashMap::new(),
            category_feeds: DashMap::new(),
            direct_results: watch::channel(Vec::new()).0,
            trending_signals: QuerySignals::new(),
            search_signals: QuerySignals::new(),
            general_signals: QuerySignals::new(),
        }
    }

    /// Signals of the trending query family.
    #[must_use]
    pub fn trending_signals(&self) -> &QuerySignals {
        &self.trending_signals
    }

    /// Signals of the direct-search query family.
    #[must_use]
    pub fn search_signals(&self) -> &QuerySignals {
        &self.search_signals
    }

    /// Signals of the general (categorized search) query family.
    #[must_use]
    pub fn general_signals(&self) -> &QuerySignals {
        &self.general_signals
    }

    /// Observable rows of one general category (the channel categorized
    /// searches publish into).
    #[must_use]
    pub fn category_feed(&self, category: &str, user_id: &str) -> watch::Receiver<Vec<Course>> {
        self.feed_sender(category, user_id).subscribe()
    }

    /// Observable rows of the direct-search results.
    #[must_use]
    pub fn direct_results(&self) -> watch::Receiver<Vec<Course>> {
        self.direct_results.subscribe()
    }

    /// Observable trending rows for a category, served by the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial storage read fails.
    pub async fn trending_feed(&self, category: &str, user_id: &str) -> AppResult<CourseListWatch> {
        self.courses.watch_by_category(category, user_id, true).await
    }

    /// Observable point query over one course.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial storage read fails.
    pub async fn course_detail(&self, id: &str, user_id: &str) -> AppResult<CourseDetailWatch> {
        self.courses.watch_course(id, user_id).await
    }

    /// Categorized search. A query string already loaded this session is
    /// served from cache without a gateway call; otherwise the result set
    /// replaces the detected category and is published to its feed.
    pub async fn search_courses(&self, query: &str, user_id: &str) {
        let q = query.trim();
        if q.is_empty() {
            return;
        }
        let category_key = detect_category_key_from_query(q);

        if self
            .loaded_searches
            .contains_key(&(user_id.to_owned(), q.to_owned()))
        {
            debug!(query = q, "search already loaded, serving cached rows");
            match self
                .courses
                .list_by_category(&category_key, user_id, false)
                .await
            {
                Ok(rows) => {
                    if !rows.is_empty() {
                        self.feed_sender(&category_key, user_id).send_replace(rows);
                    }
                }
                Err(e) => self.general_signals.finish(Some(e.to_string())),
            }
            return;
        }

        self.general_signals.begin();
        match self.sync.search_and_save(q, &category_key, user_id).await {
            Ok(rows) => {
                self.feed_sender(&category_key, user_id).send_replace(rows);
                self.loaded_searches
                    .insert((user_id.to_owned(), q.to_owned()), ());
                self.general_signals.finish(None);
            }
            Err(e) => self.general_signals.finish(Some(e.to_string())),
        }
    }

    /// Drop the loaded mark for `query` and search again unconditionally.
    pub async fn refresh_search(&self, query: &str, user_id: &str) {
        let q = query.trim();
        self.loaded_searches
            .remove(&(user_id.to_owned(), q.to_owned()));
        self.search_courses(q, user_id).await;
    }

    /// Refresh the trending feed for a category unless it was already loaded
    /// this session (the cache watch keeps serving in that case).
    pub async fn trending_courses(&self, category: &str, user_id: &str) {
        let id = category.trim();
        if id.is_empty()
            || self
                .loaded_trending
                .contains_key(&(user_id.to_owned(), id.to_owned()))
        {
            return;
        }

        self.trending_signals.begin();
        match self.sync.fetch_trending(id, user_id).await {
            Ok(rows) => {
                // An empty result means the fetch failed or the feed is dry;
                // leave the mark unset so the next query retries.
                if !rows.is_empty() {
                    self.loaded_trending
                        .insert((user_id.to_owned(), id.to_owned()), ());
                }
                self.trending_signals.finish(None);
            }
            Err(e) => self.trending_signals.finish(Some(e.to_string())),
        }
    }

    /// Drop the loaded mark for `category` and fetch again unconditionally.
    pub async fn refresh_trending(&self, category: &str, user_id: &str) {
        let id = category.trim();
        self.loaded_trending
            .remove(&(user_id.to_owned(), id.to_owned()));
        self.trending_courses(id, user_id).await;
    }

    /// Direct search, published to [`CourseQueryService::direct_results`].
    pub async fn search_courses_direct(&self, query: &str, user_id: &str) {
        self.search_signals.begin();
        match self.sync.search_direct(query, user_id).await {
            Ok(rows) => {
                self.direct_results.send_replace(rows);
                self.search_signals.finish(None);
            }
            Err(e) => self.search_signals.finish(Some(e.to_string())),
        }
    }

    /// Drop every piece of in-memory query state (user switch / logout).
    ///
    /// Existing feed receivers are emptied before being orphaned so a stale
    /// screen does not keep showing the departing user's rows.
    pub fn reset(&self) {
        self.loaded_searches.clear();
        self.loaded_trending.clear();
        for entry in self.category_feeds.iter() {
            entry.value().send_replace(Vec::new());
        }
        self.category_feeds.clear();
        self.direct_results.send_replace(Vec::new());
        self.trending_signals.reset();
        self.search_signals.reset();
        self.general_signals.reset();
    }

    fn feed_sender(&self, category: &str, user_id: &str) -> Arc<watch::Sender<Vec<Course>>> {
        self.category_feeds
            .entry((user_id.to_owned(), category.to_owned()))
            .or_insert_with(|| Arc::new(watch::channel(Vec::new()).0))
            .clone()
    }
}
