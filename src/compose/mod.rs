// src/compose/mod.rs
//! # Selection & Retry Loop
//! Decides which topic to pursue next, filters the candidate articles, asks
//! the generation collaborator for a draft, and validates the draft against
//! recent history before accepting it.
//!
//! One run walks: pick a fresh category → filter articles → build context →
//! generate → validate → accept, or retry under a different category. The
//! loop is bounded: category exhaustion and generation failures share the
//! same retry budget, so a degenerate input set can never spend more than
//! `max_retries` generation calls. The loop only reads the tracker; nothing
//! is persisted until the caller has actually published the post.

pub mod prompt;

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::categories::{Category, Classify, KeywordClassifier};
use crate::compose::prompt::{build_generation_prompt, ContextArgs, PromptConfig};
use crate::generator::Generator;
use crate::ingest::types::NewsArticle;
use crate::market::TrendingPool;
use crate::patterns::{RecentPatterns, RECENT_POSTS_WINDOW};
use crate::response::DraftResponse;
use crate::similarity::{SimilarityGuard, SIMILARITY_WINDOW_HOURS};
use crate::social::{top_by_engagement, SocialPost};
use crate::tracker::ContentTracker;

/// Default generation attempt budget per run.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// How many top-engagement social posts feed the theme weights.
const SOCIAL_CONTEXT_POSTS: usize = 5;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("compose_attempts_total", "Generation attempts started.");
        describe_counter!("compose_accepted_total", "Drafts accepted by the validation gates.");
        describe_counter!("compose_no_articles_total", "Attempts skipped: no article for the category.");
        describe_counter!("compose_no_post_total", "Attempts with no usable post line in the reply.");
        describe_counter!("compose_rejected_phrase_total", "Drafts rejected for a repeated opening phrase.");
        describe_counter!("compose_rejected_token_total", "Drafts rejected for a recently covered token.");
        describe_counter!("compose_rejected_similar_total", "Drafts rejected by the similarity gate.");
        describe_counter!("compose_exhausted_total", "Runs that ended without an accepted draft.");
    });
}

/// Inputs for one composition run.
pub struct ComposeInput<'a> {
    /// Candidate articles, already summarized and deduplicated upstream.
    pub articles: &'a [NewsArticle],
    /// Optional high-engagement external posts (thematic context only).
    pub social_posts: &'a [SocialPost],
    /// Market context records; only shown for market-aware categories.
    pub pools: &'a [TrendingPool],
}

/// Why a run ended without a post. Exhaustion is an expected outcome, not
/// an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustReason {
    /// Every fresh category was tried (or none existed to begin with).
    NoFreshCategory,
    /// The retry budget ran out without an acceptable draft.
    NoUniqueContent,
}

/// Result of one composition run.
#[derive(Debug, Clone, PartialEq)]
pub enum ComposeOutcome {
    Accepted {
        post: String,
        reasoning: String,
        category: Category,
    },
    Exhausted(ExhaustReason),
}

impl ComposeOutcome {
    /// The accepted `(post, reasoning)` pair, if any.
    pub fn accepted(&self) -> Option<(&str, &str)> {
        match self {
            ComposeOutcome::Accepted { post, reasoning, .. } => {
                Some((post.as_str(), reasoning.as_str()))
            }
            ComposeOutcome::Exhausted(_) => None,
        }
    }
}

/// The selection engine. Holds policy (budgets, thresholds, prompts) but no
/// run state; every [`compose`](Composer::compose) call is independent.
pub struct Composer {
    classifier: Arc<dyn Classify>,
    guard: SimilarityGuard,
    prompts: PromptConfig,
    max_retries: u32,
}

impl Composer {
    pub fn new(prompts: PromptConfig) -> Self {
        Self {
            classifier: Arc::new(KeywordClassifier::new()),
            guard: SimilarityGuard::default(),
            prompts,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classify>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_similarity_guard(mut self, guard: SimilarityGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Theme usage counts over the top-engagement external posts.
    fn social_theme_weights(&self, posts: &[SocialPost]) -> HashMap<Category, usize> {
        let top = top_by_engagement(posts.to_vec(), SOCIAL_CONTEXT_POSTS);
        let mut weights: HashMap<Category, usize> = HashMap::new();
        for post in &top {
            for cat in self.classifier.classify(&post.text) {
                *weights.entry(cat).or_insert(0) += 1;
            }
        }
        weights
    }

    /// Fresh categories ordered for trial: externally trending first (when
    /// social weights exist), otherwise the stable category order. A weight
    /// never filters a category — it is a tie-break only.
    fn ordered_fresh_categories(
        &self,
        tracker: &ContentTracker,
        weights: &HashMap<Category, usize>,
    ) -> Vec<Category> {
        let mut fresh: Vec<Category> = tracker.fresh_categories().into_iter().collect();
        if !weights.is_empty() {
            // Stable sort keeps the canonical order among equal weights.
            fresh.sort_by_key(|c| Reverse(weights.get(c).copied().unwrap_or(0)));
        }
        fresh
    }

    /// Run the bounded selection loop once. Reads the tracker, never writes.
    pub async fn compose(
        &self,
        tracker: &ContentTracker,
        input: ComposeInput<'_>,
        generator: &dyn Generator,
    ) -> ComposeOutcome {
        ensure_metrics_described();

        let weights = self.social_theme_weights(input.social_posts);
        let fresh = self.ordered_fresh_categories(tracker, &weights);
        tracing::info!(?fresh, "fresh categories (prioritized)");

        let social_top = top_by_engagement(input.social_posts.to_vec(), SOCIAL_CONTEXT_POSTS);
        let mut tried: BTreeSet<Category> = BTreeSet::new();

        for attempt in 1..=self.max_retries {
            counter!("compose_attempts_total").increment(1);
            tracing::info!(attempt, max = self.max_retries, "selecting category");

            // Exclusion patterns always reflect the latest persisted history.
            let recent = tracker.recent_posts(RECENT_POSTS_WINDOW);
            let patterns = RecentPatterns::from_posts(&recent);

            let Some(focus) = fresh.iter().copied().find(|c| !tried.contains(c)) else {
                tracing::info!("no fresh category left to try");
                counter!("compose_exhausted_total").increment(1);
                return ComposeOutcome::Exhausted(ExhaustReason::NoFreshCategory);
            };
            tried.insert(focus);
            tracing::info!(category = %focus, "filtering articles");

            let filtered: Vec<&NewsArticle> = input
                .articles
                .iter()
                .filter(|a| {
                    let cats = self
                        .classifier
                        .classify(&format!("{} {}", a.title, a.summary));
                    cats.contains(&focus) && !patterns.title_mentions_recent_token(&a.title)
                })
                .collect();

            if filtered.is_empty() {
                tracing::info!(category = %focus, "no articles for category, trying next");
                counter!("compose_no_articles_total").increment(1);
                continue;
            }

            let prompt = build_generation_prompt(
                &self.prompts,
                &ContextArgs {
                    focus,
                    focus_weight: weights.get(&focus).copied().unwrap_or(0),
                    patterns: &patterns,
                    previous_posts: &recent,
                    social_posts: &social_top,
                    articles: &filtered,
                    pools: input.pools,
                },
            );

            let raw = match generator.complete(&prompt).await {
                Ok(raw) => raw,
                Err(e) => {
                    // A failed call is the same as unusable output: next attempt.
                    tracing::warn!(error = %e, "generation call failed");
                    counter!("compose_no_post_total").increment(1);
                    continue;
                }
            };

            let draft = DraftResponse::parse(&raw);
            let Some(post) = draft.post_text() else {
                tracing::warn!("reply carried no post line, retrying");
                counter!("compose_no_post_total").increment(1);
                continue;
            };

            tracing::info!(category = %focus, "validating draft");
            if patterns.repeats_opening(post) {
                tracing::warn!("draft repeats a recent opening phrase, trying different category");
                counter!("compose_rejected_phrase_total").increment(1);
                continue;
            }
            if patterns.mentions_recent_token(post) {
                tracing::warn!("draft mentions a recently covered token, trying different category");
                counter!("compose_rejected_token_total").increment(1);
                continue;
            }

            let recent_texts = tracker.post_texts_within(SIMILARITY_WINDOW_HOURS);
            if self.guard.is_too_similar(post, &recent_texts) {
                tracing::warn!("draft too similar to recent history, retrying");
                counter!("compose_rejected_similar_total").increment(1);
                continue;
            }

            counter!("compose_accepted_total").increment(1);
            return ComposeOutcome::Accepted {
                post: post.to_string(),
                reasoning: draft.reasoning_text().to_string(),
                category: focus,
            };
        }

        tracing::warn!("failed to generate unique content within the retry budget");
        counter!("compose_exhausted_total").increment(1);
        ComposeOutcome::Exhausted(ExhaustReason::NoUniqueContent)
    }
}
