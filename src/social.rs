// src/social.rs
//! External social signals: high-engagement posts used as thematic context.
//!
//! The feed itself is a collaborator behind [`SocialFeed`]; the default
//! wiring wraps it in a file-backed cache so a rate-limited upstream is hit
//! at most once per TTL and stale data still serves when the upstream is
//! down.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::archive;

/// Cache refresh interval.
pub const SOCIAL_CACHE_TTL_MINUTES: i64 = 60;

/// One external post with its engagement counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialPost {
    pub text: String,
    pub username: String,
    pub likes: u64,
    pub retweets: u64,
}

impl SocialPost {
    pub fn engagement(&self) -> u64 {
        self.likes + self.retweets
    }
}

/// Sort by engagement, highest first, and keep the top `n`.
pub fn top_by_engagement(mut posts: Vec<SocialPost>, n: usize) -> Vec<SocialPost> {
    posts.sort_by(|a, b| b.engagement().cmp(&a.engagement()));
    posts.truncate(n);
    posts
}

#[async_trait]
pub trait SocialFeed: Send + Sync {
    async fn fetch_recent(&self) -> Result<Vec<SocialPost>>;
}

/// Fixed post list for tests and offline runs.
pub struct StaticSocialFeed(pub Vec<SocialPost>);

#[async_trait]
impl SocialFeed for StaticSocialFeed {
    async fn fetch_recent(&self) -> Result<Vec<SocialPost>> {
        Ok(self.0.clone())
    }
}

/// Feed that never has anything to say; used when no social API is wired.
pub struct DisabledSocialFeed;

#[async_trait]
impl SocialFeed for DisabledSocialFeed {
    async fn fetch_recent(&self) -> Result<Vec<SocialPost>> {
        Ok(Vec::new())
    }
}

// ------------------------------------------------------------
// File-backed cache wrapper
// ------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SocialCacheDoc {
    fetched_at: Option<NaiveDateTime>,
    #[serde(default)]
    posts: Vec<SocialPost>,
}

/// TTL cache around any [`SocialFeed`]. Cache persistence is best-effort;
/// a failed write only costs an extra upstream call next time.
pub struct CachedSocialFeed<F> {
    inner: F,
    path: PathBuf,
    ttl: Duration,
}

impl<F: SocialFeed> CachedSocialFeed<F> {
    pub fn new(inner: F, path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            path: path.into(),
            ttl: Duration::minutes(SOCIAL_CACHE_TTL_MINUTES),
        }
    }

    async fn fetch_at(&self, now: NaiveDateTime) -> Result<Vec<SocialPost>> {
        let cached: SocialCacheDoc = archive::load_json_or_default(&self.path);
        if let Some(fetched_at) = cached.fetched_at {
            if now - fetched_at < self.ttl {
                return Ok(cached.posts);
            }
        }

        match self.inner.fetch_recent().await {
            Ok(posts) => {
                let doc = SocialCacheDoc {
                    fetched_at: Some(now),
                    posts: posts.clone(),
                };
                if let Err(e) = archive::save_json(&self.path, &doc) {
                    tracing::warn!(error = %e, "social cache not persisted");
                }
                Ok(posts)
            }
            Err(e) => {
                // Serve stale data rather than nothing.
                if !cached.posts.is_empty() {
                    tracing::warn!(error = %e, "social feed failed, serving stale cache");
                    return Ok(cached.posts);
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl<F: SocialFeed> SocialFeed for CachedSocialFeed<F> {
    async fn fetch_recent(&self) -> Result<Vec<SocialPost>> {
        self.fetch_at(Local::now().naive_local()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(username: &str, likes: u64, retweets: u64) -> SocialPost {
        SocialPost {
            text: format!("post by {username}"),
            username: username.to_string(),
            likes,
            retweets,
        }
    }

    #[test]
    fn engagement_ordering_keeps_top_n() {
        let posts = vec![post("low", 1, 0), post("top", 50, 30), post("mid", 20, 5)];
        let top = top_by_engagement(posts, 2);
        assert_eq!(top[0].username, "top");
        assert_eq!(top[1].username, "mid");
        assert_eq!(top.len(), 2);
    }

    #[tokio::test]
    async fn cache_hit_skips_the_inner_feed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("social_cache.json");
        let now = NaiveDateTime::parse_from_str("2026-08-04T12:00:00", "%Y-%m-%dT%H:%M:%S")
            .expect("ts");

        let warm = CachedSocialFeed::new(StaticSocialFeed(vec![post("fresh", 5, 5)]), &path);
        let first = warm.fetch_at(now).await.expect("prime cache");
        assert_eq!(first.len(), 1);

        // Second wrapper has an inner feed that would fail; cache must answer.
        struct FailingFeed;
        #[async_trait]
        impl SocialFeed for FailingFeed {
            async fn fetch_recent(&self) -> Result<Vec<SocialPost>> {
                anyhow::bail!("upstream down")
            }
        }

        let cached = CachedSocialFeed::new(FailingFeed, &path);
        let within_ttl = now + Duration::minutes(10);
        let served = cached.fetch_at(within_ttl).await.expect("cache hit");
        assert_eq!(served[0].username, "fresh");

        // Past TTL the failing upstream still falls back to stale data.
        let past_ttl = now + Duration::minutes(90);
        let stale = cached.fetch_at(past_ttl).await.expect("stale fallback");
        assert_eq!(stale[0].username, "fresh");
    }
}
