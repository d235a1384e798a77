// src/pipeline.rs
//! End-to-end run: refresh summaries, compose a post, publish, track.
//!
//! The pipeline owns the wiring between collaborators and the tracker. The
//! selection loop itself never persists; tracking happens here, and only
//! after the platform confirmed the post went out. Runs are serialized
//! behind an async mutex — the tracker's read-modify-persist cycle is not
//! safe across overlapping runs.

use std::sync::Arc;

use anyhow::Result;
use metrics::{counter, describe_counter, gauge};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::archive;
use crate::compose::prompt::{build_summary_prompt, PromptConfig};
use crate::compose::{ComposeInput, ComposeOutcome, Composer};
use crate::config::BotConfig;
use crate::generator::DynGenerator;
use crate::ingest;
use crate::ingest::types::{FeedProvider, NewsArticle};
use crate::market::{MarketData, TrendingPool};
use crate::publisher::Publisher;
use crate::social::SocialFeed;
use crate::tracker::ContentTracker;

/// Articles handed to one composition run.
const ARTICLES_PER_RUN: usize = 5;
/// Market pools handed to one composition run.
const POOLS_PER_RUN: usize = 5;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_runs_total", "Full generate-and-post runs started.");
        describe_counter!("pipeline_empty_runs_total", "Runs that ended with no content.");
        describe_counter!("posts_published_total", "Posts accepted by the platform.");
        describe_counter!("summaries_generated_total", "Article summaries produced.");
    });
}

/// Summaries archive: processed feed URLs plus the summarized items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummariesArchive {
    #[serde(default)]
    pub processed_urls: Vec<String>,
    #[serde(default)]
    pub items: Vec<NewsArticle>,
}

/// One archived run result, posted or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEntry {
    pub timestamp: chrono::NaiveDateTime,
    pub post: String,
    pub reasoning: String,
    pub posted: bool,
    pub source_articles: Vec<NewsArticle>,
    pub market_context: Vec<TrendingPool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostsArchive {
    #[serde(default)]
    pub posts: Vec<PostEntry>,
}

pub struct Pipeline {
    cfg: BotConfig,
    tracker: Mutex<ContentTracker>,
    composer: Composer,
    generator: DynGenerator,
    publisher: Arc<dyn Publisher>,
    market: Arc<dyn MarketData>,
    social: Arc<dyn SocialFeed>,
    feeds: Vec<Box<dyn FeedProvider>>,
}

impl Pipeline {
    pub fn new(
        cfg: BotConfig,
        generator: DynGenerator,
        publisher: Arc<dyn Publisher>,
        market: Arc<dyn MarketData>,
        social: Arc<dyn SocialFeed>,
        feeds: Vec<Box<dyn FeedProvider>>,
    ) -> Self {
        let tracker = ContentTracker::load(&cfg.tracking_file);
        let composer = Composer::new(PromptConfig::load()).with_max_retries(cfg.max_retries);
        Self {
            cfg,
            tracker: Mutex::new(tracker),
            composer,
            generator,
            publisher,
            market,
            social,
            feeds,
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.cfg
    }

    /// Fetch feeds and summarize unseen articles into the archive.
    /// Returns how many new summaries were produced.
    pub async fn refresh_summaries(&self) -> Result<usize> {
        ensure_metrics_described();

        let (items, stale, dups) = ingest::run_once(&self.feeds).await;
        tracing::info!(fetched = items.len(), stale, dups, "feed fetch finished");

        let mut archive_doc: SummariesArchive =
            archive::load_json_or_default(&self.cfg.summaries_file);

        let mut produced = 0usize;
        for item in items {
            if archive_doc.processed_urls.iter().any(|u| u == &item.link) {
                continue;
            }
            let prompt = build_summary_prompt(&item.title, &item.content);
            match self.generator.complete(&prompt).await {
                Ok(summary) => {
                    archive_doc.items.push(NewsArticle {
                        title: item.title,
                        link: item.link.clone(),
                        published: item.published,
                        summary,
                    });
                    archive_doc.processed_urls.push(item.link);
                    produced += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, title = %item.title, "summary failed, skipping article");
                }
            }
        }

        if produced > 0 {
            archive::save_json(&self.cfg.summaries_file, &archive_doc)?;
        }
        counter!("summaries_generated_total").increment(produced as u64);
        gauge!("summaries_archive_items").set(archive_doc.items.len() as f64);
        Ok(produced)
    }

    /// One full generate-and-post run. `Ok(None)` means "no content this
    /// cycle" — an expected outcome, not a failure.
    pub async fn generate_and_post(&self) -> Result<Option<PostEntry>> {
        ensure_metrics_described();
        counter!("pipeline_runs_total").increment(1);
        tracing::info!("=== starting post generation run ===");

        // Serializes concurrent triggers for the whole read-compose-track span.
        let mut tracker = self.tracker.lock().await;

        let summaries: SummariesArchive =
            archive::load_json_or_default(&self.cfg.summaries_file);
        let available: Vec<NewsArticle> = summaries
            .items
            .iter()
            .filter(|a| !tracker.is_content_processed(a))
            .cloned()
            .collect();

        if available.is_empty() {
            tracing::info!("no unprocessed articles available");
            counter!("pipeline_empty_runs_total").increment(1);
            return Ok(None);
        }
        tracing::info!(count = available.len(), "unprocessed articles found");

        // Diagnostic only: overuse does not gate selection.
        for article in &available {
            if tracker.is_topic_overused(article) {
                tracing::debug!(title = %article.title, "article topic is overused in the last 24h");
            }
        }

        let pools = match self.market.trending_pools().await {
            Ok(pools) => pools,
            Err(e) => {
                tracing::warn!(error = %e, "market data unavailable, composing without it");
                Vec::new()
            }
        };
        let pools: Vec<TrendingPool> = pools
            .into_iter()
            .filter(|p| {
                !tracker.is_token_recently_mentioned(&p.base_token, 24)
                    && !tracker.is_token_recently_mentioned(&p.quote_token, 24)
            })
            .take(POOLS_PER_RUN)
            .collect();
        tracing::info!(pools = pools.len(), "market context prepared");

        let social_posts = match self.social.fetch_recent().await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!(error = %e, "social feed unavailable, composing without it");
                Vec::new()
            }
        };

        let selected: Vec<NewsArticle> =
            available.iter().take(ARTICLES_PER_RUN).cloned().collect();

        let outcome = self
            .composer
            .compose(
                &tracker,
                ComposeInput {
                    articles: &selected,
                    social_posts: &social_posts,
                    pools: &pools,
                },
                self.generator.as_ref(),
            )
            .await;

        let (post, reasoning) = match &outcome {
            ComposeOutcome::Accepted {
                post, reasoning, ..
            } => (post.clone(), reasoning.clone()),
            ComposeOutcome::Exhausted(reason) => {
                tracing::info!(?reason, "no content this cycle");
                counter!("pipeline_empty_runs_total").increment(1);
                return Ok(None);
            }
        };

        tracing::info!(len = post.len(), "draft accepted, publishing");
        let posted = match self.publisher.publish(&post).await {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!(error = %e, "publish failed");
                false
            }
        };

        if posted {
            counter!("posts_published_total").increment(1);
            // Track only what actually went out.
            for article in &selected {
                tracker.track_article(article);
            }
            for pool in &pools {
                tracker.track_token_mention(&pool.base_token);
                tracker.track_token_mention(&pool.quote_token);
            }
            tracker.track_generated_post(&post, &selected);
        } else {
            tracing::warn!("post not published (platform not configured or declined)");
        }

        let entry = PostEntry {
            timestamp: chrono::Local::now().naive_local(),
            post,
            reasoning,
            posted,
            source_articles: selected,
            market_context: pools,
        };

        // Archive regardless of posting status; a failed write is logged,
        // the run result still stands.
        let mut posts_doc: PostsArchive =
            archive::load_json_or_default(&self.cfg.posts_archive_file);
        posts_doc.posts.push(entry.clone());
        if let Err(e) = archive::save_json(&self.cfg.posts_archive_file, &posts_doc) {
            tracing::warn!(error = %e, "posts archive not persisted");
        }

        Ok(Some(entry))
    }

    /// Retention pass over the tracking store.
    pub async fn cleanup(&self) {
        let mut tracker = self.tracker.lock().await;
        tracker.cleanup_old_data(self.cfg.retention_days);
    }

    /// (total summarized articles, total archived posts) for /stats.
    pub async fn stats(&self) -> (usize, usize) {
        let summaries: SummariesArchive =
            archive::load_json_or_default(&self.cfg.summaries_file);
        let posts: PostsArchive = archive::load_json_or_default(&self.cfg.posts_archive_file);
        (summaries.items.len(), posts.posts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::MockGenerator;
    use crate::market::StaticMarketData;
    use crate::publisher::{DisabledPublisher, RecordingPublisher};
    use crate::social::StaticSocialFeed;

    fn cfg_in(dir: &std::path::Path) -> BotConfig {
        let mut cfg = BotConfig::default();
        cfg.tracking_file = dir.join("content_tracking.json");
        cfg.summaries_file = dir.join("article_summaries.json");
        cfg.posts_archive_file = dir.join("generated_posts.json");
        cfg.social_cache_file = dir.join("social_cache.json");
        cfg
    }

    fn seed_summaries(cfg: &BotConfig, articles: Vec<NewsArticle>) {
        let doc = SummariesArchive {
            processed_urls: articles.iter().map(|a| a.link.clone()).collect(),
            items: articles,
        };
        archive::save_json(&cfg.summaries_file, &doc).expect("seed summaries");
    }

    fn article(title: &str, summary: &str) -> NewsArticle {
        NewsArticle {
            title: title.to_string(),
            link: format!("https://example.com/{}", title.to_lowercase().replace(' ', "-")),
            published: String::new(),
            summary: summary.to_string(),
        }
    }

    fn pipeline_with(
        cfg: BotConfig,
        generator: DynGenerator,
        publisher: Arc<dyn Publisher>,
    ) -> Pipeline {
        Pipeline::new(
            cfg,
            generator,
            publisher,
            Arc::new(StaticMarketData(Vec::new())),
            Arc::new(StaticSocialFeed(Vec::new())),
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn published_run_tracks_and_archives() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = cfg_in(dir.path());
        seed_summaries(
            &cfg,
            vec![article("Bridge upgrade ships", "layer2 network scaling news")],
        );

        let publisher = Arc::new(RecordingPublisher::accepting());
        let gen = Arc::new(MockGenerator::with_reply(
            "REASONING: infra angle\nPOST: Bridges just got boring, which is the point.",
        ));
        let p = pipeline_with(cfg.clone(), gen, publisher.clone());

        let entry = p.generate_and_post().await.expect("run").expect("entry");
        assert!(entry.posted);
        assert_eq!(publisher.sent.lock().unwrap().len(), 1);

        // Tracker remembered the article and the post.
        let tracker = ContentTracker::load(&cfg.tracking_file);
        assert_eq!(tracker.store().article_hashes.len(), 1);
        assert_eq!(tracker.store().generated_posts.len(), 1);

        // Archive holds the entry too.
        let posts: PostsArchive = archive::load_json_or_default(&cfg.posts_archive_file);
        assert_eq!(posts.posts.len(), 1);
    }

    #[tokio::test]
    async fn unpublished_run_archives_but_does_not_track() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = cfg_in(dir.path());
        seed_summaries(
            &cfg,
            vec![article("Bridge upgrade ships", "layer2 network scaling news")],
        );

        let gen = Arc::new(MockGenerator::with_reply(
            "REASONING: infra angle\nPOST: Bridges just got boring, which is the point.",
        ));
        let p = pipeline_with(cfg.clone(), gen, Arc::new(DisabledPublisher));

        let entry = p.generate_and_post().await.expect("run").expect("entry");
        assert!(!entry.posted);

        let tracker = ContentTracker::load(&cfg.tracking_file);
        assert!(tracker.store().article_hashes.is_empty());
        assert!(tracker.store().generated_posts.is_empty());

        let posts: PostsArchive = archive::load_json_or_default(&cfg.posts_archive_file);
        assert_eq!(posts.posts.len(), 1);
    }

    #[tokio::test]
    async fn empty_archive_means_no_content_cycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = cfg_in(dir.path());

        let gen = Arc::new(MockGenerator::with_reply("POST: unused"));
        let p = pipeline_with(cfg, gen, Arc::new(DisabledPublisher));

        let out = p.generate_and_post().await.expect("run");
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn exhausted_compose_leaves_no_persisted_writes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = cfg_in(dir.path());
        seed_summaries(
            &cfg,
            vec![article("Bridge upgrade ships", "layer2 network scaling news")],
        );

        // Generator never yields a usable post line.
        let gen = Arc::new(MockGenerator::with_reply("no labeled lines at all"));
        let p = pipeline_with(cfg.clone(), gen, Arc::new(DisabledPublisher));

        let out = p.generate_and_post().await.expect("run");
        assert!(out.is_none());

        let tracker = ContentTracker::load(&cfg.tracking_file);
        assert!(tracker.store().article_hashes.is_empty());
        assert!(tracker.store().token_mentions.is_empty());
        assert!(tracker.store().generated_posts.is_empty());

        let posts: PostsArchive = archive::load_json_or_default(&cfg.posts_archive_file);
        assert!(posts.posts.is_empty());
    }

    #[tokio::test]
    async fn refresh_without_feeds_produces_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = cfg_in(dir.path());
        seed_summaries(&cfg, vec![article("Known story", "already summarized")]);

        let gen = Arc::new(MockGenerator::with_reply("a summary"));
        let p = pipeline_with(cfg, gen.clone(), Arc::new(DisabledPublisher));

        let produced = p.refresh_summaries().await.expect("refresh");
        assert_eq!(produced, 0);
        assert_eq!(gen.calls(), 0);
    }
}
