// ABOUTME: Local course cache: SQLite connection management and migrations
// ABOUTME: Hands out per-entity managers over a shared pool and change broker
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Learnhub Contributors

/// Query-key change broker feeding observable queries.
pub mod broker;
/// Course cache operations and observable queries.
pub mod courses;

pub use broker::{ChangeBroker, ListenerId, QueryKey};
pub use courses::{CourseDetailWatch, CourseListWatch, CourseManager, Watch};

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;

use crate::errors::{AppError, AppResult};

/// Local cache database handle.
///
/// Owns the connection pool and the change broker shared by every manager.
/// The cache is the single source of truth the UI observes; all durable
/// course state lives here.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    broker: Arc<ChangeBroker>,
}

impl Database {
    /// Open (creating if needed) the cache database and run migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the database URL is invalid or the connection fails
    /// - the migration process fails
    pub async fn new(database_url: &str) -> AppResult<Self> {
        // Ensure SQLite creates the database file if it doesn't exist
        let connection_options = if database_url.starts_with("sqlite:") {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };

        let pool = SqlitePool::connect(&connection_options)
            .await
            .map_err(|e| AppError::database(format!("Failed to connect to database: {e}")))?;

        let db = Self {
            pool,
            broker: Arc::new(ChangeBroker::new()),
        };

        db.migrate().await?;
        Ok(db)
    }

    /// Run all pending migrations embedded at compile time from
    /// `./migrations`.
    ///
    /// # Errors
    ///
    /// Returns an error if any migration fails.
    pub async fn migrate(&self) -> AppResult<()> {
        info!("Running database migrations...");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Migration failed: {e}")))?;

        info!("Database migrations completed");
        Ok(())
    }

    /// Get a reference to the pool for advanced operations.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the course cache manager.
    #[must_use]
    pub fn courses(&self) -> CourseManager {
        CourseManager::new(self.pool.clone(), Arc::clone(&self.broker))
    }
}
