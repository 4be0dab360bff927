// ABOUTME: Main library entry point for the Learnhub course engine
// ABOUTME: Per-user course cache, remote metadata sync, and reactive queries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Learnhub Contributors

//! # Learnhub course engine
//!
//! Synchronization and caching core of a learning-course aggregator: course
//! metadata fetched from a video platform is merged into a per-user local
//! cache without ever clobbering the user's relationship flags (favorite /
//! watch-later / done), and the cache is reconciled against the remote
//! per-user profile so flags set on another device become visible locally.
//!
//! ## Architecture
//!
//! - **`database`**: SQLite-backed course cache - the single source of truth
//!   the UI observes, with push-based observable queries.
//! - **`gateway`**: boundary trait over the remote metadata source plus the
//!   YouTube Data API client.
//! - **`rating`**: pure estimator mapping view/like counts to a bounded
//!   display score.
//! - **`sync`**: the synchronizer orchestrating fetch → rate →
//!   merge-preserving-flags → cache-replace, plus reconciliation.
//! - **`queries`**: reactive query layer with per-family loading/error
//!   signals and loaded-query de-duplication.
//! - **`userstore`**: boundary trait over the remote per-user profile store.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use learnhub::config::AppConfig;
//! use learnhub::database::Database;
//! use learnhub::errors::AppResult;
//! use learnhub::gateway::YoutubeGateway;
//! use learnhub::sync::CourseSynchronizer;
//! use learnhub::userstore::MemoryUserStore;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = AppConfig::from_env()?;
//!     let db = Database::new(&config.database_url).await?;
//!     let gateway = Arc::new(YoutubeGateway::new(config.youtube));
//!     let store = Arc::new(MemoryUserStore::new());
//!     let sync = CourseSynchronizer::new(gateway, db.courses(), store);
//!
//!     let rows = sync.fetch_trending("UC_channel", "user-1").await?;
//!     println!("cached {} trending courses", rows.len());
//!     Ok(())
//! }
//! ```

/// Environment-only application configuration.
pub mod config;

/// Local course cache: SQLite storage, change broker, observable queries.
pub mod database;

/// Crate-wide error type and result alias.
pub mod errors;

/// Remote metadata gateway boundary and YouTube client.
pub mod gateway;

/// Core data model: courses, flags, user profiles.
pub mod models;

/// Reactive query layer with per-family loading/error state.
pub mod queries;

/// Pure rating estimation from engagement statistics.
pub mod rating;

/// Course synchronizer: fetch, merge, replace, reconcile.
pub mod sync;

/// Remote user-profile store boundary.
pub mod userstore;

pub use errors::{AppError, AppResult};
