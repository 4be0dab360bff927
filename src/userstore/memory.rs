// ABOUTME: In-process user-profile store backed by a concurrent map
// ABOUTME: Mirrors the remote contract including self-echoing change subscriptions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Learnhub Contributors

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::errors::AppResult;
use crate::models::{CourseFlag, UserProfile};
use crate::userstore::{ProfileEvents, ProfileUpdate, UserStore};

/// In-process [`UserStore`] implementation.
///
/// Faithful to the remote contract: every mutation re-delivers the full
/// current document to all subscribers of that user, including the mutating
/// client's own subscription. Dead subscribers are pruned on delivery.
#[derive(Default)]
pub struct MemoryUserStore {
    profiles: DashMap<String, UserProfile>,
    subscribers: DashMap<String, Vec<mpsc::UnboundedSender<UserProfile>>>,
}

impl MemoryUserStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a user's whole document (simulates a foreign-device write:
    /// subscribers are notified like for any other mutation).
    pub fn put_profile(&self, user_id: &str, profile: UserProfile) {
        self.profiles.insert(user_id.to_owned(), profile.clone());
        self.deliver(user_id, &profile);
    }

    fn deliver(&self, user_id: &str, profile: &UserProfile) {
        if let Some(mut senders) = self.subscribers.get_mut(user_id) {
            senders.retain(|sender| sender.send(profile.clone()).is_ok());
        }
    }

    fn mutate(&self, user_id: &str, apply: impl FnOnce(&mut UserProfile)) {
        let mut entry = self.profiles.entry(user_id.to_owned()).or_default();
        apply(entry.value_mut());
        let snapshot = entry.value().clone();
        drop(entry);
        self.deliver(user_id, &snapshot);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        Ok(self.profiles.get(user_id).map(|entry| entry.value().clone()))
    }

    async fn update(&self, user_id: &str, update: ProfileUpdate) -> AppResult<()> {
        self.mutate(user_id, |profile| {
            if let Some(name) = update.name {
                profile.name = name;
            }
            if let Some(email) = update.email {
                profile.email = email;
            }
            if let Some(phone) = update.phone {
                profile.phone = phone;
            }
            if let Some(image_url) = update.image_url {
                profile.image_url = image_url;
            }
        });
        Ok(())
    }

    async fn array_union(&self, user_id: &str, flag: CourseFlag, course_id: &str) -> AppResult<()> {
        self.mutate(user_id, |profile| {
            let list = profile.list_mut(flag);
            if !list.iter().any(|id| id == course_id) {
                list.push(course_id.to_owned());
            }
        });
        Ok(())
    }

    async fn array_remove(&self, user_id: &str, flag: CourseFlag, course_id: &str) -> AppResult<()> {
        self.mutate(user_id, |profile| {
            profile.list_mut(flag).retain(|id| id != course_id);
        });
        Ok(())
    }

    async fn subscribe(&self, user_id: &str) -> AppResult<ProfileEvents> {
        let (tx, rx) = mpsc::unbounded_channel();
        let current = self
            .profiles
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        // Initial snapshot mirrors the remote store's listener semantics.
        let _ = tx.send(current);
        self.subscribers
            .entry(user_id.to_owned())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}
