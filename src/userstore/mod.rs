// ABOUTME: Remote user-profile store boundary: get/update, array ops, change subscription
// ABOUTME: The three relationship-id lists are the reconciliation routine's ground truth
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Learnhub Contributors

//! Boundary contract for the remote per-user profile store.
//!
//! The store holds one document per user: contact fields plus three
//! relationship-id lists (`favorites`, `watchlist`, `done_courses`). Its
//! change subscription delivers the full current document on every remote
//! mutation - including mutations made by this same client - and feeds the
//! synchronizer's reconciliation loop.

/// In-process implementation used by tests and the CLI.
pub mod memory;

pub use memory::MemoryUserStore;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::AppResult;
use crate::models::{CourseFlag, UserProfile};

/// Stream of full profile snapshots, one per remote mutation.
pub type ProfileEvents = mpsc::UnboundedReceiver<UserProfile>;

/// Scalar profile fields settable through [`UserStore::update`].
///
/// `None` fields are left untouched (field-level update semantics).
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New contact email.
    pub email: Option<String>,
    /// New contact phone.
    pub phone: Option<String>,
    /// New avatar URL.
    pub image_url: Option<String>,
}

/// Remote per-user profile store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch the user's document, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    async fn get(&self, user_id: &str) -> AppResult<Option<UserProfile>>;

    /// Field-level update of the scalar profile fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    async fn update(&self, user_id: &str, update: ProfileUpdate) -> AppResult<()>;

    /// Add `course_id` to the list backing `flag`, if not already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    async fn array_union(&self, user_id: &str, flag: CourseFlag, course_id: &str) -> AppResult<()>;

    /// Remove `course_id` from the list backing `flag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    async fn array_remove(&self, user_id: &str, flag: CourseFlag, course_id: &str) -> AppResult<()>;

    /// Subscribe to document changes.
    ///
    /// The current document is delivered immediately, then the full document
    /// again after every mutation. Dropping the receiver ends the
    /// subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be established.
    async fn subscribe(&self, user_id: &str) -> AppResult<ProfileEvents>;
}
