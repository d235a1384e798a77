//! Near-duplicate gate for candidate posts.
//!
//! Similarity metric: Jaccard over lower-cased whitespace token sets —
//! cheap, order-insensitive, tolerant of paraphrase while still catching
//! near-identical restatements. A candidate is rejected on the first
//! recent post whose similarity exceeds the threshold.

use std::collections::HashSet;

/// Window of history the guard compares against.
pub const SIMILARITY_WINDOW_HOURS: i64 = 48;
/// Default Jaccard threshold above which a candidate is "too similar".
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;

/// Configuration for the similarity gate.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityGuard {
    threshold: f32,
}

impl Default for SimilarityGuard {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl SimilarityGuard {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// True iff `candidate` exceeds the threshold against any of the given
    /// recent post texts. Returns on the first hit.
    pub fn is_too_similar<S: AsRef<str>>(&self, candidate: &str, recent: &[S]) -> bool {
        let candidate_tokens = token_set(candidate);
        for stored in recent {
            let sim = jaccard(&candidate_tokens, &token_set(stored.as_ref()));
            if sim > self.threshold {
                tracing::info!(similarity = sim, "candidate too similar to a recent post");
                return true;
            }
        }
        false
    }
}

fn token_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of two token sets. Two empty sets compare as 0.0 —
/// degenerate input must not divide by zero or read as a duplicate.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sets_have_zero_similarity() {
        assert_eq!(jaccard(&token_set(""), &token_set("")), 0.0);
        assert!(!SimilarityGuard::default().is_too_similar("", &[""]));
    }

    #[test]
    fn near_identical_restatement_is_caught() {
        let guard = SimilarityGuard::default();
        let recent = vec!["the market pumped hard today".to_string()];
        assert!(guard.is_too_similar("the market pumped today", &recent));
    }

    #[test]
    fn unrelated_text_passes() {
        let guard = SimilarityGuard::default();
        let recent = vec!["the market pumped hard today".to_string()];
        assert!(!guard.is_too_similar("layer2 adoption keeps growing", &recent));
    }

    #[test]
    fn comparison_ignores_case_and_word_order() {
        let guard = SimilarityGuard::default();
        let recent = vec!["Bridge Upgrade Shipped Today".to_string()];
        assert!(guard.is_too_similar("today shipped bridge upgrade", &recent));
    }

    #[test]
    fn threshold_is_exclusive() {
        // Identical halves: similarity exactly 1/3 with threshold 1/3 must pass.
        let guard = SimilarityGuard::new(1.0 / 3.0);
        let recent = vec!["alpha beta".to_string()];
        // tokens {alpha, gamma} vs {alpha, beta}: intersection 1, union 3.
        assert!(!guard.is_too_similar("alpha gamma", &recent));
    }

    #[test]
    fn out_of_range_threshold_is_clamped() {
        let guard = SimilarityGuard::new(7.0);
        assert_eq!(guard.threshold(), 1.0);
        // Nothing exceeds 1.0, even an exact duplicate.
        assert!(!guard.is_too_similar("same text", &["same text"]));
    }
}
