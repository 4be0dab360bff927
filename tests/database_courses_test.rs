// ABOUTME: Integration tests for the course cache manager
// ABOUTME: Covers keyed storage, category clearing, flag updates, and observable queries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Learnhub Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::time::Duration;

use learnhub::database::Database;
use learnhub::models::CourseFlag;
use tokio::time::timeout;

use common::{course, test_db};

const USER: &str = "user-1";

#[tokio::test]
async fn test_upsert_and_point_lookup() {
    let (db, _dir) = test_db().await;
    let courses = db.courses();

    let row = course("c1", USER, "programming", false, "2024-03-01T00:00:00Z");
    courses.upsert_many(std::slice::from_ref(&row)).await.unwrap();

    let cached = courses.get_by_id("c1", USER).await.unwrap().unwrap();
    assert_eq!(cached.id, row.id);
    assert_eq!(cached.title, row.title);
    assert_eq!(cached.description, row.description);
    assert_eq!(cached.published_at, row.published_at);
    assert_eq!(cached.category, row.category);
    assert_eq!(cached.rating, row.rating);
    assert!(!cached.is_trending);

    assert!(courses.get_by_id("missing", USER).await.unwrap().is_none());
    assert!(courses.get_by_id("c1", "other-user").await.unwrap().is_none());
}

#[tokio::test]
async fn test_upsert_replaces_whole_row_by_key() {
    let (db, _dir) = test_db().await;
    let courses = db.courses();

    let mut row = course("c1", USER, "programming", false, "2024-03-01T00:00:00Z");
    courses.upsert_many(std::slice::from_ref(&row)).await.unwrap();

    row.title = "updated title".to_owned();
    row.rating = Some(3.5);
    courses.upsert_many(std::slice::from_ref(&row)).await.unwrap();

    let cached = courses.get_by_id("c1", USER).await.unwrap().unwrap();
    assert_eq!(cached.title, "updated title");
    assert_eq!(cached.rating, Some(3.5));

    let all = courses.list_by_category("programming", USER, false).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_same_id_is_scoped_per_user() {
    let (db, _dir) = test_db().await;
    let courses = db.courses();

    courses
        .upsert_many(&[
            course("c1", "alice", "programming", false, "2024-03-01T00:00:00Z"),
            course("c1", "bob", "programming", false, "2024-03-01T00:00:00Z"),
        ])
        .await
        .unwrap();

    courses.set_flag("c1", "alice", CourseFlag::Favorite, true).await.unwrap();

    let alice = courses.get_by_id("c1", "alice").await.unwrap().unwrap();
    let bob = courses.get_by_id("c1", "bob").await.unwrap().unwrap();
    assert!(alice.is_favorite);
    assert!(!bob.is_favorite);
}

#[tokio::test]
async fn test_batch_lookup_silently_omits_missing_ids() {
    let (db, _dir) = test_db().await;
    let courses = db.courses();

    courses
        .upsert_many(&[
            course("c1", USER, "programming", false, "2024-03-01T00:00:00Z"),
            course("c2", USER, "programming", false, "2024-03-02T00:00:00Z"),
        ])
        .await
        .unwrap();

    let ids: Vec<String> = ["c1", "ghost", "c2"].iter().map(|s| (*s).to_owned()).collect();
    let found = courses.get_by_ids(&ids, USER).await.unwrap();
    let mut found_ids: Vec<&str> = found.iter().map(|c| c.id.as_str()).collect();
    found_ids.sort_unstable();
    assert_eq!(found_ids, vec!["c1", "c2"]);
}

#[tokio::test]
async fn test_category_listing_is_newest_first() {
    let (db, _dir) = test_db().await;
    let courses = db.courses();

    courses
        .upsert_many(&[
            course("old", USER, "medical", false, "2023-01-01T00:00:00Z"),
            course("new", USER, "medical", false, "2024-06-01T00:00:00Z"),
            course("mid", USER, "medical", false, "2023-09-01T00:00:00Z"),
        ])
        .await
        .unwrap();

    let listed = courses.list_by_category("medical", USER, false).await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "mid", "old"]);
}

#[tokio::test]
async fn test_clear_category_only_touches_its_partition() {
    let (db, _dir) = test_db().await;
    let courses = db.courses();

    courses
        .upsert_many(&[
            course("t1", USER, "chan1", true, "2024-01-01T00:00:00Z"),
            course("s1", USER, "chan1", false, "2024-01-02T00:00:00Z"),
            course("s2", USER, "marketing", false, "2024-01-03T00:00:00Z"),
        ])
        .await
        .unwrap();

    courses.clear_category("chan1", USER, true).await.unwrap();

    assert!(courses.get_by_id("t1", USER).await.unwrap().is_none());
    // Same category name, different trending flag: untouched.
    assert!(courses.get_by_id("s1", USER).await.unwrap().is_some());
    assert!(courses.get_by_id("s2", USER).await.unwrap().is_some());
}

#[tokio::test]
async fn test_set_flag_touches_nothing_else() {
    let (db, _dir) = test_db().await;
    let courses = db.courses();

    let row = course("c1", USER, "programming", false, "2024-03-01T00:00:00Z");
    courses.upsert_many(std::slice::from_ref(&row)).await.unwrap();

    courses.set_flag("c1", USER, CourseFlag::WatchLater, true).await.unwrap();

    let cached = courses.get_by_id("c1", USER).await.unwrap().unwrap();
    assert!(cached.is_watch_later);
    assert!(!cached.is_favorite);
    assert!(!cached.is_done);
    assert_eq!(cached.title, row.title);
    assert_eq!(cached.category, row.category);

    // Missing row: silent no-op.
    courses.set_flag("ghost", USER, CourseFlag::Done, true).await.unwrap();
    assert!(courses.get_by_id("ghost", USER).await.unwrap().is_none());
}

#[tokio::test]
async fn test_flag_listing_follows_flag_state() {
    let (db, _dir) = test_db().await;
    let courses = db.courses();

    courses
        .upsert_many(&[
            course("c1", USER, "programming", false, "2024-03-01T00:00:00Z"),
            course("c2", USER, "programming", false, "2024-03-02T00:00:00Z"),
        ])
        .await
        .unwrap();

    courses.set_flag("c1", USER, CourseFlag::Favorite, true).await.unwrap();

    let favorites = courses.list_by_flag(CourseFlag::Favorite, USER).await.unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].id, "c1");

    courses.set_flag("c1", USER, CourseFlag::Favorite, false).await.unwrap();
    assert!(courses.list_by_flag(CourseFlag::Favorite, USER).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_clear_all_for_user_leaves_other_users_alone() {
    let (db, _dir) = test_db().await;
    let courses = db.courses();

    courses
        .upsert_many(&[
            course("c1", "alice", "programming", false, "2024-03-01T00:00:00Z"),
            course("c2", "alice", "chan1", true, "2024-03-02T00:00:00Z"),
            course("c1", "bob", "programming", false, "2024-03-01T00:00:00Z"),
        ])
        .await
        .unwrap();

    courses.clear_all_for_user("alice").await.unwrap();

    assert!(courses.get_by_id("c1", "alice").await.unwrap().is_none());
    assert!(courses.get_by_id("c2", "alice").await.unwrap().is_none());
    assert!(courses.get_by_id("c1", "bob").await.unwrap().is_some());
}

#[tokio::test]
async fn test_category_watch_pushes_snapshot_after_write() {
    let (db, _dir) = test_db().await;
    let courses = db.courses();

    let mut watch = courses.watch_by_category("programming", USER, false).await.unwrap();
    assert!(watch.current().is_empty());

    courses
        .upsert_many(&[course("c1", USER, "programming", false, "2024-03-01T00:00:00Z")])
        .await
        .unwrap();

    timeout(Duration::from_secs(2), watch.changed())
        .await
        .expect("no snapshot published")
        .unwrap();
    let rows = watch.current();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "c1");
}

#[tokio::test]
async fn test_flag_watch_sees_toggle() {
    let (db, _dir) = test_db().await;
    let courses = db.courses();

    courses
        .upsert_many(&[course("c1", USER, "programming", false, "2024-03-01T00:00:00Z")])
        .await
        .unwrap();

    let mut watch = courses.watch_by_flag(CourseFlag::Favorite, USER).await.unwrap();
    assert!(watch.current().is_empty());

    courses.set_flag("c1", USER, CourseFlag::Favorite, true).await.unwrap();

    timeout(Duration::from_secs(2), watch.changed())
        .await
        .expect("no snapshot published")
        .unwrap();
    assert_eq!(watch.current().len(), 1);
}

#[tokio::test]
async fn test_course_watch_follows_point_updates() {
    let (db, _dir) = test_db().await;
    let courses = db.courses();

    courses
        .upsert_many(&[course("c1", USER, "programming", false, "2024-03-01T00:00:00Z")])
        .await
        .unwrap();

    let mut watch = courses.watch_course("c1", USER).await.unwrap();
    assert!(!watch.current().unwrap().is_done);

    courses.set_flag("c1", USER, CourseFlag::Done, true).await.unwrap();

    timeout(Duration::from_secs(2), watch.changed())
        .await
        .expect("no snapshot published")
        .unwrap();
    assert!(watch.current().unwrap().is_done);
}

#[tokio::test]
async fn test_dropping_a_watch_detaches_its_subscription() {
    let (db, _dir) = test_db().await;
    let courses = db.courses();

    let watch = courses.watch_by_category("programming", USER, false).await.unwrap();
    assert_eq!(courses.broker().listener_count(), 1);

    drop(watch);
    assert_eq!(courses.broker().listener_count(), 0);

    // Mutations after the drop must not hang or panic.
    courses
        .upsert_many(&[course("c1", USER, "programming", false, "2024-03-01T00:00:00Z")])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rows_survive_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let url = format!("sqlite:{}/courses.db", dir.path().display());

    {
        let db = Database::new(&url).await.unwrap();
        let courses = db.courses();
        courses
            .upsert_many(&[course("c1", USER, "programming", false, "2024-03-01T00:00:00Z")])
            .await
            .unwrap();
        courses.set_flag("c1", USER, CourseFlag::Favorite, true).await.unwrap();
        db.pool().close().await;
    }

    let reopened = Database::new(&url).await.unwrap();
    let cached = reopened.courses().get_by_id("c1", USER).await.unwrap().unwrap();
    assert!(cached.is_favorite);
}
