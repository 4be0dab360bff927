// ABOUTME: Core data model: cached course rows, relationship flags, user profile document
// ABOUTME: A course row is scoped per (id, user_id); flags are only mutated by explicit operations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Learnhub Contributors

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category key for rows written by a direct search. These rows exist only so
/// detail lookups by id resolve; they are never part of a saved category.
pub const CATEGORY_SEARCH: &str = "search";

/// Category key for rows materialized by reconciliation: courses flagged on
/// another device that were not yet cached locally.
pub const CATEGORY_SYNCED: &str = "synced_courses";

/// General category key the `courses`/`home` queries map to.
pub const CATEGORY_HOME: &str = "home";

/// One cached course: a remote playlist's metadata plus the owning user's
/// relationship flags.
///
/// The unique key is `(id, user_id)` - the same platform playlist may be
/// cached for several users without collision. Descriptive fields are
/// overwritten by every fresh fetch; the three flags are only ever changed by
/// [`crate::sync::CourseSynchronizer::toggle_flag`] and reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Source platform playlist identifier (globally stable).
    pub id: String,
    /// Owning user. Threaded explicitly through every call; never read from
    /// ambient state.
    pub user_id: String,
    /// Course title.
    pub title: String,
    /// Course description.
    pub description: String,
    /// Publishing channel's display name.
    pub channel_title: String,
    /// Publication timestamp as reported by the platform (RFC 3339).
    pub published_at: String,
    /// Thumbnail URL.
    pub image_url: String,
    /// Estimated display rating in `[0, 5]`; `None` when the underlying
    /// engagement statistics were unavailable at ingestion time.
    pub rating: Option<f32>,
    /// Whether the row came from the fixed trending feed rather than search.
    pub is_trending: bool,
    /// Cache partition key: a topic key, a search-derived key,
    /// [`CATEGORY_SEARCH`] or [`CATEGORY_SYNCED`].
    pub category: String,
    /// User marked the course as favorite.
    pub is_favorite: bool,
    /// User queued the course for later.
    pub is_watch_later: bool,
    /// User completed the course.
    pub is_done: bool,
    /// When this row was last written by an ingestion path. Diagnostic only.
    pub cached_at: DateTime<Utc>,
}

impl Course {
    /// Read one relationship flag.
    #[must_use]
    pub fn flag(&self, flag: CourseFlag) -> bool {
        match flag {
            CourseFlag::Favorite => self.is_favorite,
            CourseFlag::WatchLater => self.is_watch_later,
            CourseFlag::Done => self.is_done,
        }
    }

    /// Write one relationship flag.
    pub fn set_flag(&mut self, flag: CourseFlag, value: bool) {
        match flag {
            CourseFlag::Favorite => self.is_favorite = value,
            CourseFlag::WatchLater => self.is_watch_later = value,
            CourseFlag::Done => self.is_done = value,
        }
    }
}

/// The three per-user relationship flags a course row carries.
///
/// Each flag maps to one column of the `courses` table and one id list of the
/// remote user profile document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CourseFlag {
    /// `is_favorite` column / `favorites` profile list.
    Favorite,
    /// `is_watch_later` column / `watchlist` profile list.
    WatchLater,
    /// `is_done` column / `done_courses` profile list.
    Done,
}

impl CourseFlag {
    /// All flags, in profile-document order.
    pub const ALL: [Self; 3] = [Self::Favorite, Self::WatchLater, Self::Done];

    /// Column name in the `courses` table.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Favorite => "is_favorite",
            Self::WatchLater => "is_watch_later",
            Self::Done => "is_done",
        }
    }
}

impl fmt::Display for CourseFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Favorite => "favorite",
            Self::WatchLater => "watch_later",
            Self::Done => "done",
        })
    }
}

/// Remote per-user profile document.
///
/// The three id lists are ground truth for reconciliation: flag state folded
/// into the local cache whenever the remote document changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Contact phone.
    #[serde(default)]
    pub phone: String,
    /// Avatar URL.
    #[serde(default)]
    pub image_url: String,
    /// Ids of favorited courses.
    #[serde(default)]
    pub favorites: Vec<String>,
    /// Ids of watch-later courses.
    #[serde(default)]
    pub watchlist: Vec<String>,
    /// Ids of completed courses.
    #[serde(default)]
    pub done_courses: Vec<String>,
}

impl UserProfile {
    /// The id list backing `flag`.
    #[must_use]
    pub fn list(&self, flag: CourseFlag) -> &[String] {
        match flag {
            CourseFlag::Favorite => &self.favorites,
            CourseFlag::WatchLater => &self.watchlist,
            CourseFlag::Done => &self.done_courses,
        }
    }

    /// Mutable access to the id list backing `flag`.
    pub fn list_mut(&mut self, flag: CourseFlag) -> &mut Vec<String> {
        match flag {
            CourseFlag::Favorite => &mut self.favorites,
            CourseFlag::WatchLater => &mut self.watchlist,
            CourseFlag::Done => &mut self.done_courses,
        }
    }
}
