//! tracker.rs — perzistentní paměť: co už bot řekl, o čem a kdy.
//!
//! The tracker is the single owner of the tracking store: it loads the JSON
//! document at construction, mutates in memory, and persists on every write.
//! All freshness queries slide against "now" at query time; nothing expires
//! by a stamp recorded at creation.
//!
//! Persistence is best-effort: a failed save is logged and swallowed, and
//! the in-memory state stays authoritative for the rest of the process.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDateTime};
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::archive;
use crate::categories::{Category, Classify, KeywordClassifier};
use crate::ingest::types::NewsArticle;

/// Articles seen within this window count as already processed.
pub const CONTENT_WINDOW_HOURS: i64 = 48;
/// Category usage and token mentions are evaluated over this window.
pub const CATEGORY_WINDOW_HOURS: i64 = 24;
/// A category used at least this many times in the window is overused.
pub const OVERUSE_LIMIT: usize = 2;
/// Default retention for [`ContentTracker::cleanup_old_data`].
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// One processed article, keyed by content hash in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub title: String,
    pub url: String,
    pub summary: String,
    pub timestamp: NaiveDateTime,
}

/// Mention bookkeeping for one token/coin symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMention {
    pub last_mention: NaiveDateTime,
    pub mention_count: u32,
}

/// Source article reference embedded in a generated-post record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub title: String,
    pub url: String,
    pub summary: String,
}

/// One accepted-and-published post, keyed by post hash in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPostRecord {
    pub text: String,
    pub timestamp: NaiveDateTime,
    pub sources: Vec<SourceRef>,
}

/// The persisted document. Article hashes and post hashes use the same
/// hashing scheme but live in separate maps; they are never conflated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackingStore {
    #[serde(default)]
    pub article_hashes: HashMap<String, ContentRecord>,
    #[serde(default)]
    pub token_mentions: HashMap<String, TokenMention>,
    #[serde(default)]
    pub generated_posts: HashMap<String, GeneratedPostRecord>,
    /// Reserved for future topic grouping; persisted but unused.
    #[serde(default)]
    pub topic_clusters: HashMap<String, Vec<String>>,
}

/// Hex SHA-256 digest of the lower-cased text. Identical normalized text
/// always yields the same hash, which is what makes exact-duplicate
/// detection independent of record identity.
pub fn content_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.to_lowercase().as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Persistent freshness memory. See module docs for the ownership rules.
pub struct ContentTracker {
    path: PathBuf,
    store: TrackingStore,
    classifier: Arc<dyn Classify>,
}

impl ContentTracker {
    /// Load the store from `path` (missing or unreadable file starts empty)
    /// with the default keyword classifier.
    pub fn load(path: impl AsRef<Path>) -> Self {
        Self::load_with_classifier(path, Arc::new(KeywordClassifier::new()))
    }

    /// Load with an explicit classifier implementation.
    pub fn load_with_classifier(path: impl AsRef<Path>, classifier: Arc<dyn Classify>) -> Self {
        let path = path.as_ref().to_path_buf();
        let store = archive::load_json_or_default(&path);
        Self {
            path,
            store,
            classifier,
        }
    }

    /// Read-only view of the store, for diagnostics and stats.
    pub fn store(&self) -> &TrackingStore {
        &self.store
    }

    fn article_identity(article: &NewsArticle) -> String {
        content_hash(&format!("{}{}", article.title, article.summary))
    }

    // ---- queries ----

    /// True iff this article's content hash was tracked within the last
    /// 48 hours. Older matches are *not* processed: a topic may resurface
    /// after the cool-down.
    pub fn is_content_processed(&self, article: &NewsArticle) -> bool {
        self.is_content_processed_at(article, now_local())
    }

    pub fn is_content_processed_at(&self, article: &NewsArticle, now: NaiveDateTime) -> bool {
        let hash = Self::article_identity(article);
        match self.store.article_hashes.get(&hash) {
            Some(rec) => now - rec.timestamp < Duration::hours(CONTENT_WINDOW_HOURS),
            None => false,
        }
    }

    /// Categories not used by any generated post in the last 24 hours.
    /// Empty when everything was used recently — the caller decides what to
    /// do then.
    pub fn fresh_categories(&self) -> BTreeSet<Category> {
        self.fresh_categories_at(now_local())
    }

    pub fn fresh_categories_at(&self, now: NaiveDateTime) -> BTreeSet<Category> {
        let used = self.used_categories_within(Duration::hours(CATEGORY_WINDOW_HOURS), now);
        Category::ALL
            .into_iter()
            .filter(|c| !used.contains(c))
            .collect()
    }

    fn used_categories_within(&self, window: Duration, now: NaiveDateTime) -> BTreeSet<Category> {
        let cutoff = now - window;
        let mut used = BTreeSet::new();
        for post in self.store.generated_posts.values() {
            if post.timestamp > cutoff {
                used.extend(self.classifier.classify(&post.text));
            }
        }
        used
    }

    /// Softer load-shedding signal, independent of [`fresh_categories`]:
    /// true iff any of the article's categories was used at least
    /// [`OVERUSE_LIMIT`] times by posts in the last 24 hours.
    ///
    /// [`fresh_categories`]: ContentTracker::fresh_categories
    pub fn is_topic_overused(&self, article: &NewsArticle) -> bool {
        self.is_topic_overused_at(article, now_local())
    }

    pub fn is_topic_overused_at(&self, article: &NewsArticle, now: NaiveDateTime) -> bool {
        let article_cats = self
            .classifier
            .classify(&format!("{} {}", article.title, article.summary));
        if article_cats.is_empty() {
            return false;
        }

        let cutoff = now - Duration::hours(CATEGORY_WINDOW_HOURS);
        let mut counts: HashMap<Category, usize> = HashMap::new();
        for post in self.store.generated_posts.values() {
            if post.timestamp > cutoff {
                // One post counts toward every category it matches.
                for cat in self.classifier.classify(&post.text) {
                    *counts.entry(cat).or_insert(0) += 1;
                }
            }
        }

        article_cats
            .iter()
            .any(|c| counts.get(c).copied().unwrap_or(0) >= OVERUSE_LIMIT)
    }

    /// True iff the token has a mention newer than `hours`.
    pub fn is_token_recently_mentioned(&self, token: &str, hours: i64) -> bool {
        self.is_token_recently_mentioned_at(token, hours, now_local())
    }

    pub fn is_token_recently_mentioned_at(
        &self,
        token: &str,
        hours: i64,
        now: NaiveDateTime,
    ) -> bool {
        match self.store.token_mentions.get(token) {
            Some(m) => now - m.last_mention < Duration::hours(hours),
            None => false,
        }
    }

    /// Texts of posts generated within the last `hours`, for the similarity
    /// gate.
    pub fn post_texts_within(&self, hours: i64) -> Vec<String> {
        self.post_texts_within_at(hours, now_local())
    }

    pub fn post_texts_within_at(&self, hours: i64, now: NaiveDateTime) -> Vec<String> {
        let cutoff = now - Duration::hours(hours);
        self.store
            .generated_posts
            .values()
            .filter(|p| p.timestamp >= cutoff)
            .map(|p| p.text.clone())
            .collect()
    }

    /// The last `n` accepted posts, oldest first.
    pub fn recent_posts(&self, n: usize) -> Vec<GeneratedPostRecord> {
        let mut posts: Vec<GeneratedPostRecord> =
            self.store.generated_posts.values().cloned().collect();
        posts.sort_by_key(|p| p.timestamp);
        let start = posts.len().saturating_sub(n);
        posts.split_off(start)
    }

    // ---- mutations (write-through) ----

    /// Record a processed article and persist.
    pub fn track_article(&mut self, article: &NewsArticle) {
        self.track_article_at(article, now_local());
    }

    pub fn track_article_at(&mut self, article: &NewsArticle, now: NaiveDateTime) {
        let hash = Self::article_identity(article);
        self.store.article_hashes.insert(
            hash,
            ContentRecord {
                title: article.title.clone(),
                url: article.link.clone(),
                summary: article.summary.clone(),
                timestamp: now,
            },
        );
        self.persist();
    }

    /// Record a token mention (refresh timestamp, bump count) and persist.
    pub fn track_token_mention(&mut self, token: &str) {
        self.track_token_mention_at(token, now_local());
    }

    pub fn track_token_mention_at(&mut self, token: &str, now: NaiveDateTime) {
        let count = self
            .store
            .token_mentions
            .get(token)
            .map(|m| m.mention_count)
            .unwrap_or(0);
        self.store.token_mentions.insert(
            token.to_string(),
            TokenMention {
                last_mention: now,
                mention_count: count + 1,
            },
        );
        self.persist();
    }

    /// Record an accepted-and-published post and persist.
    pub fn track_generated_post(&mut self, text: &str, sources: &[NewsArticle]) {
        self.track_generated_post_at(text, sources, now_local());
    }

    pub fn track_generated_post_at(
        &mut self,
        text: &str,
        sources: &[NewsArticle],
        now: NaiveDateTime,
    ) {
        let hash = content_hash(text);
        self.store.generated_posts.insert(
            hash,
            GeneratedPostRecord {
                text: text.to_string(),
                timestamp: now,
                sources: sources
                    .iter()
                    .map(|a| SourceRef {
                        title: a.title.clone(),
                        url: a.link.clone(),
                        summary: a.summary.clone(),
                    })
                    .collect(),
            },
        );
        self.persist();
    }

    /// Drop all records older than `days`, then persist.
    pub fn cleanup_old_data(&mut self, days: i64) {
        self.cleanup_old_data_at(days, now_local());
    }

    pub fn cleanup_old_data_at(&mut self, days: i64, now: NaiveDateTime) {
        let cutoff = now - Duration::days(days);

        self.store.article_hashes.retain(|_, r| r.timestamp > cutoff);
        self.store
            .token_mentions
            .retain(|_, m| m.last_mention > cutoff);
        self.store
            .generated_posts
            .retain(|_, p| p.timestamp > cutoff);

        self.persist();
        tracing::info!(days, "cleaned up tracking data");
    }

    fn persist(&self) {
        if let Err(e) = archive::save_json(&self.path, &self.store) {
            counter!("tracker_persist_errors_total").increment(1);
            tracing::warn!(error = %e, path = %self.path.display(), "tracking store not persisted");
        }
    }
}
