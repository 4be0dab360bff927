// ABOUTME: Query-key change broker: maps cache query keys to subscriber callbacks
// ABOUTME: Callbacks fire synchronously after each committed mutation touching a key
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Learnhub Contributors

//! Publish-subscribe channel between cache mutations and observable queries.
//!
//! Every mutating operation of [`crate::database::CourseManager`] computes the
//! set of query keys whose result rows it touched and calls
//! [`ChangeBroker::notify`] after its write commits. Subscribers are plain
//! callbacks; the listener list is snapshotted before invocation so a callback
//! may subscribe or unsubscribe without deadlocking.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::models::CourseFlag;

/// Identity of one observable cache query.
///
/// A mutation is reported against every key whose predicate matches a row the
/// mutation wrote or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// Rows of one `(category, trending)` partition for a user.
    Category {
        /// Owning user.
        user_id: String,
        /// Cache partition key.
        category: String,
        /// Trending or search-sourced partition.
        trending: bool,
    },
    /// Rows carrying one relationship flag for a user.
    Flag {
        /// Owning user.
        user_id: String,
        /// Which flag.
        flag: CourseFlag,
    },
    /// A single course row.
    Course {
        /// Owning user.
        user_id: String,
        /// Course id.
        id: String,
    },
}

impl QueryKey {
    /// The user the key is scoped to.
    #[must_use]
    pub fn user_id(&self) -> &str {
        match self {
            Self::Category { user_id, .. }
            | Self::Flag { user_id, .. }
            | Self::Course { user_id, .. } => user_id,
        }
    }
}

/// Listener handle returned by [`ChangeBroker::subscribe`].
pub type ListenerId = u64;

type ListenerFn = dyn Fn() + Send + Sync;

/// Broker mapping query keys to subscriber callbacks.
///
/// Listener state lives in a [`DashMap`]; no lock is held while callbacks
/// run. Callbacks receive no payload - an observable query re-reads its rows
/// when poked, so it always publishes post-commit state.
#[derive(Default)]
pub struct ChangeBroker {
    listeners: DashMap<QueryKey, Vec<(ListenerId, Arc<ListenerFn>)>>,
    next_id: AtomicU64,
}

impl ChangeBroker {
    /// Create an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `key` and return its listener id.
    pub fn subscribe(
        &self,
        key: QueryKey,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .entry(key)
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove the listener identified by `(key, id)`.
    ///
    /// Safe to call after the listener is already gone.
    pub fn unsubscribe(&self, key: &QueryKey, id: ListenerId) {
        if let Some(mut entry) = self.listeners.get_mut(key) {
            entry.retain(|(listener_id, _)| *listener_id != id);
        }
        self.listeners.remove_if(key, |_, callbacks| callbacks.is_empty());
    }

    /// Report a committed mutation against `keys`.
    ///
    /// Duplicate keys are collapsed; each affected listener fires once per
    /// call. Callbacks run after the map guards are released.
    pub fn notify(&self, keys: impl IntoIterator<Item = QueryKey>) {
        let mut seen = HashSet::new();
        let mut callbacks: Vec<Arc<ListenerFn>> = Vec::new();
        for key in keys {
            if !seen.insert(key.clone()) {
                continue;
            }
            if let Some(entry) = self.listeners.get(&key) {
                callbacks.extend(entry.iter().map(|(_, cb)| Arc::clone(cb)));
            }
        }
        for callback in callbacks {
            callback();
        }
    }

    /// Report a mutation that touched every row of one user (logout wipe).
    pub fn notify_user(&self, user_id: &str) {
        let callbacks: Vec<Arc<ListenerFn>> = self
            .listeners
            .iter()
            .filter(|entry| entry.key().user_id() == user_id)
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .map(|(_, cb)| Arc::clone(cb))
                    .collect::<Vec<_>>()
            })
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    /// Number of live listeners across all keys.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.iter().map(|entry| entry.value().len()).sum()
    }
}
