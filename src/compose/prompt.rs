// src/compose/prompt.rs
//! Prompt assembly for the generation collaborator.
//!
//! Tone and instruction texts are configuration, not code: they load from a
//! TOML file with a built-in seed fallback, so prompt tuning never needs a
//! rebuild. The context sections assembled here mirror the selection
//! attempt: exclusion lists first, then social discussion, category focus,
//! article digest, and market activity where it is relevant.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::categories::Category;
use crate::ingest::types::NewsArticle;
use crate::market::TrendingPool;
use crate::patterns::RecentPatterns;
use crate::response::{POST_PREFIX, REASONING_PREFIX};
use crate::social::SocialPost;
use crate::tracker::GeneratedPostRecord;

pub const DEFAULT_PROMPT_CONFIG_PATH: &str = "config/prompt.toml";
pub const ENV_PROMPT_CONFIG_PATH: &str = "PROMPT_CONFIG_PATH";

/// Categories whose prompts may cite market activity.
const MARKET_AWARE: [Category; 3] = [Category::Adoption, Category::Defi, Category::Infrastructure];

#[derive(Debug, Clone, Deserialize)]
pub struct PromptConfig {
    /// Voice and editorial stance of the bot.
    pub tone: String,
    /// Task framing shown before the context sections.
    pub instructions: String,
}

impl PromptConfig {
    /// Load from `PROMPT_CONFIG_PATH` / the default path; any failure falls
    /// back to the built-in seed.
    pub fn load() -> Self {
        let path = std::env::var(ENV_PROMPT_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_PROMPT_CONFIG_PATH.to_string());
        Self::load_from_file(path)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Self {
        match fs::read_to_string(path.as_ref()) {
            Ok(s) => toml::from_str(&s).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "prompt config malformed, using defaults");
                Self::default_seed()
            }),
            Err(_) => Self::default_seed(),
        }
    }

    /// Built-in seed used as fallback when no config file is found.
    pub fn default_seed() -> Self {
        Self {
            tone: "You are an insightful crypto analyst focused on technological progress, \
                   adoption stories, and infrastructure development. You are optimistic about \
                   crypto's future but discuss concrete developments and real-world impact, \
                   not price action. Tell specific stories with concrete details; avoid \
                   generic market commentary, price predictions, emojis, and hashtags."
                .to_string(),
            instructions: "Using the context below, write ONE social post under 280 characters \
                           that highlights a single specific development. Create engagement \
                           through insight, not speculation."
                .to_string(),
        }
    }
}

/// Everything one generation attempt feeds into the prompt.
pub struct ContextArgs<'a> {
    pub focus: Category,
    /// External social-trend count for the focus category (0 = not trending).
    pub focus_weight: usize,
    pub patterns: &'a RecentPatterns,
    pub previous_posts: &'a [GeneratedPostRecord],
    pub social_posts: &'a [SocialPost],
    /// Articles already filtered for the focus category.
    pub articles: &'a [&'a NewsArticle],
    pub pools: &'a [TrendingPool],
}

/// Assemble the full generation prompt for one attempt.
pub fn build_generation_prompt(cfg: &PromptConfig, args: &ContextArgs<'_>) -> String {
    let mut out = String::with_capacity(4096);

    let _ = writeln!(out, "{}\n", cfg.tone);
    let _ = writeln!(out, "{}\n", cfg.instructions);

    if !args.previous_posts.is_empty() {
        let _ = writeln!(out, "Recent posts to avoid repeating:");
        for (i, post) in args.previous_posts.iter().rev().take(3).enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, post.text);
        }
        let themes = args
            .patterns
            .themes
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            out,
            "\nDO NOT:\n- Use similar opening words: {}\n- Focus on recently mentioned tokens: {}\n- Repeat recent themes: {}\n",
            join_sorted(args.patterns.opening_phrases.iter()),
            join_sorted(args.patterns.tokens.iter()),
            themes,
        );
    }

    if !args.social_posts.is_empty() {
        let _ = writeln!(
            out,
            "Current crypto social discussion (high engagement — consider the themes, do not copy):"
        );
        for p in args.social_posts {
            let _ = writeln!(
                out,
                "@{} ({} likes, {} reposts): {}",
                p.username, p.likes, p.retweets, p.text
            );
        }
        let _ = writeln!(out);
    }

    let trend_note = if args.focus_weight > 0 {
        format!(
            "is trending externally with {} high-engagement posts",
            args.focus_weight
        )
    } else {
        "needs more attention".to_string()
    };
    let _ = writeln!(
        out,
        "FOCUS CATEGORY: {}\nThis theme {}.\n\nGuidelines:\n- Highlight specific developments and milestones\n- Focus on user impact and real-world applications\n- Use concrete details and numbers\n- Tell a story rather than make general observations\n",
        args.focus.as_str().to_uppercase(),
        trend_note,
    );

    let _ = writeln!(out, "Relevant articles:");
    for (i, article) in args.articles.iter().take(3).enumerate() {
        let _ = writeln!(
            out,
            "Article {}:\nTitle: {}\nSummary: {}\n",
            i + 1,
            article.title,
            article.summary
        );
    }

    if MARKET_AWARE.contains(&args.focus) && !args.pools.is_empty() {
        let _ = writeln!(
            out,
            "Market activity (use only if relevant to {}):",
            args.focus
        );
        for pool in args.pools.iter().take(5) {
            let _ = writeln!(
                out,
                "Pool: {}\n24h change: {:+.2}%\n24h volume: ${:.2}\nBuy/sell ratio: {:.2} ({} buys / {} sells)\n",
                pool.name,
                pool.price_change_24h,
                pool.volume_24h,
                pool.buy_sell_ratio(),
                pool.buys_24h,
                pool.sells_24h,
            );
        }
    }

    if !args.patterns.opening_phrases.is_empty() {
        let _ = writeln!(
            out,
            "IMPORTANT: do not start the post with any of: {}\n",
            join_sorted(args.patterns.opening_phrases.iter()),
        );
    }

    let _ = writeln!(
        out,
        "First explain your reasoning on one line prefixed with '{} '.\nThen on a new line provide ONLY the post text prefixed with '{} '.",
        REASONING_PREFIX, POST_PREFIX,
    );

    out
}

/// Prompt for summarizing a single fetched article.
pub fn build_summary_prompt(title: &str, content: &str) -> String {
    format!(
        "Summarize this crypto news article in a clear, informative way that captures key \
         points and market implications. Keep it detailed but concise, one paragraph, no \
         prefixes or labels.\n\nTitle: {title}\nContent: {content}"
    )
}

fn join_sorted<'a, I, S>(items: I) -> String
where
    I: Iterator<Item = &'a S>,
    S: AsRef<str> + 'a + ?Sized,
{
    items.map(|s| s.as_ref()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn article(title: &str, summary: &str) -> NewsArticle {
        NewsArticle {
            title: title.to_string(),
            link: "https://example.com/a".to_string(),
            published: String::new(),
            summary: summary.to_string(),
        }
    }

    fn post(text: &str) -> GeneratedPostRecord {
        GeneratedPostRecord {
            text: text.to_string(),
            timestamp: NaiveDateTime::parse_from_str("2026-08-04T09:00:00", "%Y-%m-%dT%H:%M:%S")
                .expect("ts"),
            sources: Vec::new(),
        }
    }

    #[test]
    fn prompt_names_the_focus_category_and_contract() {
        let cfg = PromptConfig::default_seed();
        let a = article("Rollup fees drop", "Cheaper layer2 transactions");
        let refs = [&a];
        let patterns = RecentPatterns::default();
        let prompt = build_generation_prompt(
            &cfg,
            &ContextArgs {
                focus: Category::Infrastructure,
                focus_weight: 2,
                patterns: &patterns,
                previous_posts: &[],
                social_posts: &[],
                articles: &refs,
                pools: &[],
            },
        );

        assert!(prompt.contains("FOCUS CATEGORY: INFRASTRUCTURE"));
        assert!(prompt.contains("trending externally with 2"));
        assert!(prompt.contains("Rollup fees drop"));
        assert!(prompt.contains("REASONING:"));
        assert!(prompt.contains("POST:"));
    }

    #[test]
    fn exclusions_appear_when_history_exists() {
        let cfg = PromptConfig::default_seed();
        let history = vec![post("Bitcoin keeps climbing")];
        let patterns = RecentPatterns::from_posts(&history);
        let a = article("Validators multiply", "network decentralization grows");
        let refs = [&a];
        let prompt = build_generation_prompt(
            &cfg,
            &ContextArgs {
                focus: Category::Infrastructure,
                focus_weight: 0,
                patterns: &patterns,
                previous_posts: &history,
                social_posts: &[],
                articles: &refs,
                pools: &[],
            },
        );

        assert!(prompt.contains("Recent posts to avoid repeating"));
        assert!(prompt.contains("bitcoin"));
        assert!(prompt.contains("do not start the post"));
    }

    #[test]
    fn market_section_only_for_market_aware_categories() {
        let cfg = PromptConfig::default_seed();
        let pool = TrendingPool {
            name: "WETH / USDC".into(),
            base_token: "WETH".into(),
            quote_token: "USDC".into(),
            price_change_24h: 2.0,
            volume_24h: 1_000_000.0,
            liquidity: 500_000.0,
            buys_24h: 10,
            sells_24h: 5,
        };
        let a = article("Custody law passes", "regulation compliance news");
        let refs = [&a];
        let patterns = RecentPatterns::default();

        let mut args = ContextArgs {
            focus: Category::Regulation,
            focus_weight: 0,
            patterns: &patterns,
            previous_posts: &[],
            social_posts: &[],
            articles: &refs,
            pools: std::slice::from_ref(&pool),
        };
        let without = build_generation_prompt(&cfg, &args);
        assert!(!without.contains("Market activity"));

        args.focus = Category::Defi;
        let with = build_generation_prompt(&cfg, &args);
        assert!(with.contains("Market activity"));
        assert!(with.contains("WETH / USDC"));
    }

    #[test]
    fn missing_config_file_seeds_defaults() {
        let cfg = PromptConfig::load_from_file("definitely/not/here.toml");
        assert!(!cfg.tone.is_empty());
        assert!(!cfg.instructions.is_empty());
    }
}
