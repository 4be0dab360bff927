// ABOUTME: One-shot sync CLI: refresh a trending feed, run a search, or reconcile flags
// ABOUTME: Development and operations utility over the learnhub library
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Learnhub Contributors

//! `learnhub-sync` - drive one synchronizer operation from the command line.
//!
//! Configuration comes from the environment (`LEARNHUB_DATABASE_URL`,
//! `LEARNHUB_YOUTUBE_API_KEY`, `LEARNHUB_YOUTUBE_API_BASE`); results are
//! printed as JSON.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use learnhub::config::AppConfig;
use learnhub::database::Database;
use learnhub::gateway::YoutubeGateway;
use learnhub::queries::detect_category_key_from_query;
use learnhub::sync::CourseSynchronizer;
use learnhub::userstore::MemoryUserStore;

#[derive(Parser)]
#[command(name = "learnhub-sync", about = "Run one learnhub sync operation")]
struct Cli {
    /// User the operation is scoped to. A throwaway id is generated when
    /// omitted (useful for smoke tests against a scratch database).
    #[arg(long)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh the trending feed of one channel.
    Trending {
        /// Channel id the feed is sourced from.
        #[arg(long)]
        channel: String,
    },
    /// Search the platform and save the results under the detected category.
    Search {
        /// Free-text search query.
        #[arg(long)]
        query: String,
    },
    /// Reconcile cached flags against explicit relationship-id lists.
    Reconcile {
        /// Favorited course ids.
        #[arg(long)]
        favorites: Vec<String>,
        /// Watch-later course ids.
        #[arg(long)]
        watchlist: Vec<String>,
        /// Completed course ids.
        #[arg(long)]
        done: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let db = Database::new(&config.database_url).await?;
    let gateway = Arc::new(YoutubeGateway::new(config.youtube));
    let store = Arc::new(MemoryUserStore::new());
    let sync = CourseSynchronizer::new(gateway, db.courses(), store);

    let user_id = cli.user.unwrap_or_else(|| Uuid::new_v4().to_string());

    match cli.command {
        Command::Trending { channel } => {
            let rows = sync.fetch_trending(&channel, &user_id).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Command::Search { query } => {
            let category_key = detect_category_key_from_query(&query);
            let rows = sync.search_and_save(&query, &category_key, &user_id).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Command::Reconcile {
            favorites,
            watchlist,
            done,
        } => {
            let summary = sync.reconcile(&user_id, &favorites, &watchlist, &done).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
