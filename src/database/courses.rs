// ABOUTME: Course cache operations: keyed storage, category replacement, flag updates
// ABOUTME: Observable queries push fresh snapshots after every mutation touching their key
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Learnhub Contributors

use std::future::Future;
use std::sync::Arc;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::database::broker::{ChangeBroker, ListenerId, QueryKey};
use crate::errors::{AppError, AppResult};
use crate::models::{Course, CourseFlag};

const UPSERT_SQL: &str = r"
    INSERT OR REPLACE INTO courses (
        id, user_id, title, description, channel_title, published_at,
        image_url, rating, is_trending, category,
        is_favorite, is_watch_later, is_done, cached_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";

const SELECT_COLUMNS: &str = r"
    id, user_id, title, description, channel_title, published_at,
    image_url, rating, is_trending, category,
    is_favorite, is_watch_later, is_done, cached_at
";

/// Course cache operations manager.
///
/// All mutation of the local cache goes through this type; each operation is
/// internally atomic and reports the query keys it touched to the shared
/// [`ChangeBroker`] after its write commits.
#[derive(Clone)]
pub struct CourseManager {
    pool: SqlitePool,
    broker: Arc<ChangeBroker>,
}

impl CourseManager {
    /// Create a manager over a shared pool and broker.
    #[must_use]
    pub fn new(pool: SqlitePool, broker: Arc<ChangeBroker>) -> Self {
        Self { pool, broker }
    }

    /// The broker mutations are reported to.
    #[must_use]
    pub fn broker(&self) -> &Arc<ChangeBroker> {
        &self.broker
    }

    /// Insert or fully replace rows by `(id, user_id)`.
    ///
    /// Whole-row replace: merging fresh metadata with existing flag state is
    /// the synchronizer's responsibility, not the cache's.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub async fn upsert_many(&self, rows: &[Course]) -> AppResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        for row in rows {
            sqlx::query(UPSERT_SQL)
                .bind(&row.id)
                .bind(&row.user_id)
                .bind(&row.title)
                .bind(&row.description)
                .bind(&row.channel_title)
                .bind(&row.published_at)
                .bind(&row.image_url)
                .bind(row.rating)
                .bind(row.is_trending)
                .bind(&row.category)
                .bind(row.is_favorite)
                .bind(row.is_watch_later)
                .bind(row.is_done)
                .bind(row.cached_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::database(format!("Failed to upsert course: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit upsert: {e}")))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(QueryKey::Category {
                user_id: row.user_id.clone(),
                category: row.category.clone(),
                trending: row.is_trending,
            });
            keys.push(QueryKey::Course {
                user_id: row.user_id.clone(),
                id: row.id.clone(),
            });
        }
        // A replaced row may have entered or left any flag query.
        let mut users: Vec<&str> = rows.iter().map(|r| r.user_id.as_str()).collect();
        users.sort_unstable();
        users.dedup();
        for user_id in users {
            for flag in CourseFlag::ALL {
                keys.push(QueryKey::Flag {
                    user_id: user_id.to_owned(),
                    flag,
                });
            }
        }
        self.broker.notify(keys);
        Ok(())
    }

    /// Point lookup by `(id, user_id)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub async fn get_by_id(&self, id: &str, user_id: &str) -> AppResult<Option<Course>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM courses WHERE id = ? AND user_id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        row.as_ref().map(course_from_row).transpose()
    }

    /// Batch point lookup. Ids not present in the cache are silently omitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub async fn get_by_ids(&self, ids: &[String], user_id: &str) -> AppResult<Vec<Course>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM courses \
             WHERE user_id = ? AND id IN ({placeholders}) \
             ORDER BY published_at DESC"
        );
        let mut query = sqlx::query(&sql).bind(user_id);
        for id in ids {
            query = query.bind(id);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        rows.iter().map(course_from_row).collect()
    }

    /// Snapshot of one `(category, trending)` partition, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub async fn list_by_category(
        &self,
        category: &str,
        user_id: &str,
        trending: bool,
    ) -> AppResult<Vec<Course>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM courses \
             WHERE user_id = ? AND category = ? AND is_trending = ? \
             ORDER BY published_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(category)
            .bind(trending)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        rows.iter().map(course_from_row).collect()
    }

    /// Snapshot of every row with the given trending flag, newest first.
    /// Used by the synchronizer to index existing flag state before a
    /// replacement write.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub async fn list_by_trending(&self, user_id: &str, trending: bool) -> AppResult<Vec<Course>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM courses \
             WHERE user_id = ? AND is_trending = ? \
             ORDER BY published_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(trending)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        rows.iter().map(course_from_row).collect()
    }

    /// Snapshot of every row carrying `flag`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub async fn list_by_flag(&self, flag: CourseFlag, user_id: &str) -> AppResult<Vec<Course>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM courses \
             WHERE user_id = ? AND {} = 1 \
             ORDER BY published_at DESC",
            flag.column()
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        rows.iter().map(course_from_row).collect()
    }

    /// Delete every row of one `(category, trending)` partition.
    ///
    /// Called immediately before [`CourseManager::upsert_many`] in a refresh
    /// cycle to realize replace-on-refresh semantics.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub async fn clear_category(
        &self,
        category: &str,
        user_id: &str,
        trending: bool,
    ) -> AppResult<()> {
        let id_rows =
            sqlx::query("SELECT id FROM courses WHERE user_id = ? AND category = ? AND is_trending = ?")
                .bind(user_id)
                .bind(category)
                .bind(trending)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;
        let removed: Vec<String> = id_rows
            .iter()
            .map(|row| {
                row.try_get("id")
                    .map_err(|e| AppError::database(format!("Failed to get id: {e}")))
            })
            .collect::<AppResult<_>>()?;

        sqlx::query("DELETE FROM courses WHERE user_id = ? AND category = ? AND is_trending = ?")
            .bind(user_id)
            .bind(category)
            .bind(trending)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Database operation failed: {e}")))?;

        if removed.is_empty() {
            return Ok(());
        }

        let mut keys = vec![QueryKey::Category {
            user_id: user_id.to_owned(),
            category: category.to_owned(),
            trending,
        }];
        for id in removed {
            keys.push(QueryKey::Course {
                user_id: user_id.to_owned(),
                id,
            });
        }
        for flag in CourseFlag::ALL {
            keys.push(QueryKey::Flag {
                user_id: user_id.to_owned(),
                flag,
            });
        }
        self.broker.notify(keys);
        Ok(())
    }

    /// Single-column point update of one relationship flag.
    ///
    /// Touches nothing else on the row. A miss (no such row) is a silent
    /// no-op, matching batch-lookup semantics.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub async fn set_flag(
        &self,
        id: &str,
        user_id: &str,
        flag: CourseFlag,
        value: bool,
    ) -> AppResult<()> {
        let sql = format!(
            "UPDATE courses SET {} = ? WHERE id = ? AND user_id = ?",
            flag.column()
        );
        let result = sqlx::query(&sql)
            .bind(value)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Database operation failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Ok(());
        }

        let partition = sqlx::query_as::<_, (String, bool)>(
            "SELECT category, is_trending FROM courses WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        let mut keys = vec![
            QueryKey::Course {
                user_id: user_id.to_owned(),
                id: id.to_owned(),
            },
            QueryKey::Flag {
                user_id: user_id.to_owned(),
                flag,
            },
        ];
        if let Some((category, trending)) = partition {
            // Rows shown in a category feed carry their flags too.
            keys.push(QueryKey::Category {
                user_id: user_id.to_owned(),
                category,
                trending,
            });
        }
        self.broker.notify(keys);
        Ok(())
    }

    /// Drop every cached row of one user (logout / account switch).
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub async fn clear_all_for_user(&self, user_id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM courses WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Database operation failed: {e}")))?;

        self.broker.notify_user(user_id);
        Ok(())
    }

    /// Observable query over one `(category, trending)` partition.
    ///
    /// The returned watch holds the current snapshot immediately and receives
    /// a fresh one after every mutation touching the partition. Dropping it
    /// unsubscribes and cancels the refresher task.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial storage read fails.
    pub async fn watch_by_category(
        &self,
        category: &str,
        user_id: &str,
        trending: bool,
    ) -> AppResult<CourseListWatch> {
        let key = QueryKey::Category {
            user_id: user_id.to_owned(),
            category: category.to_owned(),
            trending,
        };
        let manager = self.clone();
        let category = category.to_owned();
        let user_id = user_id.to_owned();
        self.spawn_watch(key, move || {
            let manager = manager.clone();
            let category = category.clone();
            let user_id = user_id.clone();
            async move { manager.list_by_category(&category, &user_id, trending).await }
        })
        .await
    }

    /// Observable query over one relationship flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial storage read fails.
    pub async fn watch_by_flag(&self, flag: CourseFlag, user_id: &str) -> AppResult<CourseListWatch> {
        let key = QueryKey::Flag {
            user_id: user_id.to_owned(),
            flag,
        };
        let manager = self.clone();
        let user_id = user_id.to_owned();
        self.spawn_watch(key, move || {
            let manager = manager.clone();
            let user_id = user_id.clone();
            async move { manager.list_by_flag(flag, &user_id).await }
        })
        .await
    }

    /// Observable point query over a single course row.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial storage read fails.
    pub async fn watch_course(&self, id: &str, user_id: &str) -> AppResult<CourseDetailWatch> {
        let key = QueryKey::Course {
            user_id: user_id.to_owned(),
            id: id.to_owned(),
        };
        let manager = self.clone();
        let id = id.to_owned();
        let user_id = user_id.to_owned();
        self.spawn_watch(key, move || {
            let manager = manager.clone();
            let id = id.clone();
            let user_id = user_id.clone();
            async move { manager.get_by_id(&id, &user_id).await }
        })
        .await
    }

    async fn spawn_watch<T, Q, Fut>(&self, key: QueryKey, query: Q) -> AppResult<Watch<T>>
    where
        T: Clone + Send + Sync + 'static,
        Q: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let initial = query().await?;
        let (tx, rx) = watch::channel(initial);
        let (trigger_tx, mut trigger_rx) = mpsc::unbounded_channel::<()>();
        let listener = self.broker.subscribe(key.clone(), move || {
            let _ = trigger_tx.send(());
        });

        let refresher = tokio::spawn(async move {
            while trigger_rx.recv().await.is_some() {
                // Coalesce bursts of notifications into one re-read.
                while trigger_rx.try_recv().is_ok() {}
                match query().await {
                    Ok(snapshot) => {
                        if tx.send(snapshot).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("observable query refresh failed: {e}"),
                }
            }
        });

        Ok(Watch {
            receiver: rx,
            _guard: WatchGuard {
                broker: Arc::clone(&self.broker),
                key,
                listener,
                refresher,
            },
        })
    }
}

/// Handle to an observable cache query.
///
/// Holds the latest published snapshot; dropping the handle detaches the
/// subscription and aborts the background refresher (a result that arrives
/// for a dead observer is simply discarded).
pub struct Watch<T> {
    receiver: watch::Receiver<T>,
    _guard: WatchGuard,
}

/// Observable list query result.
pub type CourseListWatch = Watch<Vec<Course>>;

/// Observable point query result.
pub type CourseDetailWatch = Watch<Option<Course>>;

impl<T: Clone> Watch<T> {
    /// The most recently published snapshot.
    #[must_use]
    pub fn current(&self) -> T {
        self.receiver.borrow().clone()
    }

    /// Wait until a snapshot newer than the last seen one is published.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresher task is gone.
    pub async fn changed(&mut self) -> AppResult<()> {
        self.receiver
            .changed()
            .await
            .map_err(|_| AppError::internal("observable query closed"))
    }

    /// A bare receiver for callers that outlive this handle's borrow.
    #[must_use]
    pub fn receiver(&self) -> watch::Receiver<T> {
        self.receiver.clone()
    }
}

struct WatchGuard {
    broker: Arc<ChangeBroker>,
    key: QueryKey,
    listener: ListenerId,
    refresher: JoinHandle<()>,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.broker.unsubscribe(&self.key, self.listener);
        self.refresher.abort();
    }
}

fn course_from_row(row: &SqliteRow) -> AppResult<Course> {
    Ok(Course {
        id: row
            .try_get("id")
            .map_err(|e| AppError::database(format!("Failed to get id: {e}")))?,
        user_id: row
            .try_get("user_id")
            .map_err(|e| AppError::database(format!("Failed to get user_id: {e}")))?,
        title: row
            .try_get("title")
            .map_err(|e| AppError::database(format!("Failed to get title: {e}")))?,
        description: row
            .try_get("description")
            .map_err(|e| AppError::database(format!("Failed to get description: {e}")))?,
        channel_title: row
            .try_get("channel_title")
            .map_err(|e| AppError::database(format!("Failed to get channel_title: {e}")))?,
        published_at: row
            .try_get("published_at")
            .map_err(|e| AppError::database(format!("Failed to get published_at: {e}")))?,
        image_url: row
            .try_get("image_url")
            .map_err(|e| AppError::database(format!("Failed to get image_url: {e}")))?,
        rating: row
            .try_get("rating")
            .map_err(|e| AppError::database(format!("Failed to get rating: {e}")))?,
        is_trending: row
            .try_get("is_trending")
            .map_err(|e| AppError::database(format!("Failed to get is_trending: {e}")))?,
        category: row
            .try_get("category")
            .map_err(|e| AppError::database(format!("Failed to get category: {e}")))?,
        is_favorite: row
            .try_get("is_favorite")
            .map_err(|e| AppError::database(format!("Failed to get is_favorite: {e}")))?,
        is_watch_later: row
            .try_get("is_watch_later")
            .map_err(|e| AppError::database(format!("Failed to get is_watch_later: {e}")))?,
        is_done: row
            .try_get("is_done")
            .map_err(|e| AppError::database(format!("Failed to get is_done: {e}")))?,
        cached_at: row
            .try_get("cached_at")
            .map_err(|e| AppError::database(format!("Failed to get cached_at: {e}")))?,
    })
}
