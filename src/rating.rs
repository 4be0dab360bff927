// ABOUTME: Pure rating estimator mapping raw view/like counts to a bounded display score
// ABOUTME: Weighted composite of log-scaled views and likes, clamped to [0, 5]
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Learnhub Contributors

//! Rating estimation for ingested courses.
//!
//! The estimate is a weighted, clamped composite of log-scaled engagement
//! counts taken from the first video of a course's playlist. It is computed
//! once per course at ingestion time and stored on the cached row; it is a
//! display heuristic, not a correctness-critical value.

/// Below this view count the estimate is pinned to the low-signal floor:
/// tiny samples would otherwise over-reward a handful of likes.
const LOW_SIGNAL_VIEWS: f32 = 100.0;

/// Rating returned for low-signal content.
const LOW_SIGNAL_RATING: f32 = 1.0;

/// `log10` views saturating the popularity term (~1e6 views).
const VIEW_LOG_SCALE: f32 = 6.0;

/// `log10` likes scale for the quality term.
const LIKE_LOG_SCALE: f32 = 4.0;

const POPULARITY_WEIGHT: f32 = 0.6;
const QUALITY_WEIGHT: f32 = 0.4;

/// Upper bound of the displayed rating scale.
pub const MAX_RATING: f32 = 5.0;

/// Estimate a display rating from parsed engagement counts.
///
/// Total on its inputs: callers that may lack counts go through
/// [`estimate_from_counts`]. The result is always in `[0, MAX_RATING]`.
#[must_use]
pub fn estimate(views: f32, likes: f32) -> f32 {
    if views < LOW_SIGNAL_VIEWS {
        return LOW_SIGNAL_RATING;
    }

    let log_views = (views + 1.0).log10();
    let log_likes = (likes + 1.0).log10();
    let like_ratio = (likes / views).clamp(0.0, 1.0);

    let normalized_views = (log_views / VIEW_LOG_SCALE).clamp(0.0, 1.0);
    let normalized_likes = (log_likes / LIKE_LOG_SCALE + like_ratio).clamp(0.0, 1.0);

    let score = normalized_views * POPULARITY_WEIGHT + normalized_likes * QUALITY_WEIGHT;
    (score * MAX_RATING).clamp(0.0, MAX_RATING)
}

/// Estimate a rating from the raw count fields of a statistics payload.
///
/// The platform reports counts as strings; they are parsed defensively here.
/// A missing or unparseable view count yields `None` (the course is displayed
/// without a rating). A missing or unparseable like count is treated as zero.
#[must_use]
pub fn estimate_from_counts(view_count: Option<&str>, like_count: Option<&str>) -> Option<f32> {
    let views: f32 = view_count?.trim().parse().ok()?;
    let likes: f32 = like_count
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(0.0);
    Some(estimate(views, likes))
}
