// ABOUTME: Tests for environment-only configuration loading
// ABOUTME: Serialized: each test mutates process-wide environment variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Learnhub Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::env;

use learnhub::config::{AppConfig, ENV_DATABASE_URL, ENV_YOUTUBE_API_BASE, ENV_YOUTUBE_API_KEY};
use serial_test::serial;

fn clear_env() {
    env::remove_var(ENV_DATABASE_URL);
    env::remove_var(ENV_YOUTUBE_API_KEY);
    env::remove_var(ENV_YOUTUBE_API_BASE);
}

#[test]
#[serial]
fn test_defaults_apply_when_only_the_key_is_set() {
    clear_env();
    env::set_var(ENV_YOUTUBE_API_KEY, "test-key");

    let config = AppConfig::from_env().unwrap();
    assert_eq!(config.database_url, "sqlite:learnhub.db");
    assert_eq!(config.youtube.api_key, "test-key");
    assert!(config.youtube.base_url.starts_with("https://"));
}

#[test]
#[serial]
fn test_missing_api_key_is_an_error() {
    clear_env();
    assert!(AppConfig::from_env().is_err());
}

#[test]
#[serial]
fn test_overrides_are_honored() {
    clear_env();
    env::set_var(ENV_YOUTUBE_API_KEY, "test-key");
    env::set_var(ENV_DATABASE_URL, "sqlite:/tmp/other.db");
    env::set_var(ENV_YOUTUBE_API_BASE, "http://localhost:9999/yt");

    let config = AppConfig::from_env().unwrap();
    assert_eq!(config.database_url, "sqlite:/tmp/other.db");
    assert_eq!(config.youtube.base_url, "http://localhost:9999/yt");

    clear_env();
}
