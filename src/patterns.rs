// src/patterns.rs
//! Repetition patterns extracted from the most recent accepted posts.
//!
//! One instance is computed per selection attempt and thrown away — the
//! exclusion sets must always reflect the latest persisted history, so they
//! are recomputed, never cached.

use std::collections::BTreeSet;

use crate::tracker::GeneratedPostRecord;

/// How many trailing posts feed the exclusion sets.
pub const RECENT_POSTS_WINDOW: usize = 5;

/// Major coin symbols worth steering away from when recently covered.
pub const MAJOR_TOKENS: [&str; 6] = ["Bitcoin", "BTC", "ETH", "Ethereum", "SOL", "Solana"];

/// Substrings that mark a post as price-themed.
const PRICE_MARKERS: [&str; 5] = ["price", "$", "ath", "high", "low"];

/// Themes recognized by the pattern extractor. Only `Price` today; the enum
/// keeps the exclusion report typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Theme {
    Price,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Price => "price",
        }
    }
}

/// Exclusion sets derived from the last N accepted posts.
#[derive(Debug, Clone, Default)]
pub struct RecentPatterns {
    /// Major tokens mentioned by recent posts (canonical casing from
    /// [`MAJOR_TOKENS`]).
    pub tokens: BTreeSet<&'static str>,
    /// Lower-cased first word of each recent post.
    pub opening_phrases: BTreeSet<String>,
    /// Themes recent posts leaned on.
    pub themes: BTreeSet<Theme>,
}

impl RecentPatterns {
    /// Extract patterns from the given posts (callers pass the last
    /// [`RECENT_POSTS_WINDOW`] accepted posts).
    pub fn from_posts(posts: &[GeneratedPostRecord]) -> Self {
        let mut out = Self::default();

        for post in posts {
            let lower = post.text.to_lowercase();

            for token in MAJOR_TOKENS {
                if lower.contains(&token.to_lowercase()) {
                    out.tokens.insert(token);
                }
            }

            if let Some(first) = post.text.split_whitespace().next() {
                out.opening_phrases.insert(first.to_lowercase());
            }

            if PRICE_MARKERS.iter().any(|m| lower.contains(m)) {
                out.themes.insert(Theme::Price);
            }
        }

        out
    }

    /// True iff the candidate's first word repeats a recent opening phrase.
    pub fn repeats_opening(&self, candidate: &str) -> bool {
        let Some(first) = candidate.split_whitespace().next() else {
            return false;
        };
        let first = first.to_lowercase();
        self.opening_phrases.iter().any(|p| first.contains(p))
    }

    /// True iff the candidate mentions any recently-used major token.
    pub fn mentions_recent_token(&self, candidate: &str) -> bool {
        let lower = candidate.to_lowercase();
        self.tokens.iter().any(|t| lower.contains(&t.to_lowercase()))
    }

    /// True iff the title mentions any recently-used major token. Used to
    /// drop candidate articles before generation.
    pub fn title_mentions_recent_token(&self, title: &str) -> bool {
        let lower = title.to_lowercase();
        self.tokens.iter().any(|t| lower.contains(&t.to_lowercase()))
    }
}
