// tests/similarity_gate.rs
//
// The Jaccard gate against tracked history, including the degenerate
// empty-input case.

use chrono::NaiveDateTime;
use crypto_content_composer::similarity::{SimilarityGuard, SIMILARITY_WINDOW_HOURS};
use crypto_content_composer::tracker::ContentTracker;

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").expect("ts")
}

#[test]
fn high_overlap_is_blocked_low_overlap_passes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut tracker = ContentTracker::load(dir.path().join("tracking.json"));
    let now = ts("2026-08-04T12:00:00");
    tracker.track_generated_post_at("the market pumped hard today", &[], now);

    let recent = tracker.post_texts_within_at(SIMILARITY_WINDOW_HOURS, now);
    let guard = SimilarityGuard::new(0.7);

    assert!(guard.is_too_similar("the market pumped today", &recent));
    assert!(!guard.is_too_similar("layer2 adoption keeps growing", &recent));
}

#[test]
fn posts_outside_the_window_do_not_count() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut tracker = ContentTracker::load(dir.path().join("tracking.json"));
    let now = ts("2026-08-04T12:00:00");
    tracker.track_generated_post_at("the market pumped hard today", &[], now);

    // 49 hours later the stored post has aged out of the 48h window.
    let later = ts("2026-08-06T13:00:00");
    let recent = tracker.post_texts_within_at(SIMILARITY_WINDOW_HOURS, later);
    assert!(recent.is_empty());
    assert!(!SimilarityGuard::new(0.7).is_too_similar("the market pumped today", &recent));
}

#[test]
fn degenerate_empty_inputs_score_zero() {
    let guard = SimilarityGuard::new(0.0);
    // Empty candidate vs empty history entry: union is empty, similarity is
    // defined as 0, and even a zero threshold must not trip.
    assert!(!guard.is_too_similar("", &[""]));
}
