// ABOUTME: Environment-only application configuration
// ABOUTME: Reads database URL and metadata-gateway settings from env vars
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Learnhub Contributors

use std::env;

use crate::errors::{AppError, AppResult};
use crate::gateway::YoutubeConfig;

/// Env var naming the SQLite database URL.
pub const ENV_DATABASE_URL: &str = "LEARNHUB_DATABASE_URL";
/// Env var holding the YouTube API key.
pub const ENV_YOUTUBE_API_KEY: &str = "LEARNHUB_YOUTUBE_API_KEY";
/// Env var overriding the YouTube API base URL (tests, proxies).
pub const ENV_YOUTUBE_API_BASE: &str = "LEARNHUB_YOUTUBE_API_BASE";

const DEFAULT_DATABASE_URL: &str = "sqlite:learnhub.db";

/// Application configuration, loaded from the environment only.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database URL for the local course cache.
    pub database_url: String,
    /// Metadata gateway settings.
    pub youtube: YoutubeConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if [`ENV_YOUTUBE_API_KEY`] is unset - there is no
    /// usable default for an API credential.
    pub fn from_env() -> AppResult<Self> {
        let database_url =
            env::var(ENV_DATABASE_URL).unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned());

        let api_key = env::var(ENV_YOUTUBE_API_KEY)
            .map_err(|_| AppError::config(format!("{ENV_YOUTUBE_API_KEY} must be set")))?;
        let base_url =
            env::var(ENV_YOUTUBE_API_BASE).unwrap_or_else(|_| YoutubeConfig::default().base_url);

        Ok(Self {
            database_url,
            youtube: YoutubeConfig { api_key, base_url },
        })
    }
}
