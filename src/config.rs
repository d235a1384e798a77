// src/config.rs
//! Runtime configuration: file locations, feed endpoints, and loop budgets.
//! Everything has a sane default and an env override, so local runs work
//! with an empty environment and deployments only set what they change.

use std::path::PathBuf;

pub const DEFAULT_TRACKING_FILE: &str = "data/content_tracking.json";
pub const DEFAULT_SUMMARIES_FILE: &str = "data/article_summaries.json";
pub const DEFAULT_POSTS_ARCHIVE_FILE: &str = "data/generated_posts.json";
pub const DEFAULT_SOCIAL_CACHE_FILE: &str = "data/social_cache.json";
pub const DEFAULT_RSS_FEED: &str = "https://cointelegraph.com/rss";

pub const ENV_DATA_DIR: &str = "COMPOSER_DATA_DIR";
pub const ENV_RSS_FEED: &str = "RSS_FEED_URL";
pub const ENV_GECKO_API: &str = "GECKO_TERMINAL_API";
pub const ENV_MAX_RETRIES: &str = "COMPOSER_MAX_RETRIES";
pub const ENV_RETENTION_DAYS: &str = "COMPOSER_RETENTION_DAYS";

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub tracking_file: PathBuf,
    pub summaries_file: PathBuf,
    pub posts_archive_file: PathBuf,
    pub social_cache_file: PathBuf,
    pub rss_feed: String,
    pub gecko_api: String,
    pub max_retries: u32,
    pub retention_days: i64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            tracking_file: PathBuf::from(DEFAULT_TRACKING_FILE),
            summaries_file: PathBuf::from(DEFAULT_SUMMARIES_FILE),
            posts_archive_file: PathBuf::from(DEFAULT_POSTS_ARCHIVE_FILE),
            social_cache_file: PathBuf::from(DEFAULT_SOCIAL_CACHE_FILE),
            rss_feed: DEFAULT_RSS_FEED.to_string(),
            gecko_api: crate::market::DEFAULT_GECKO_API.to_string(),
            max_retries: crate::compose::DEFAULT_MAX_RETRIES,
            retention_days: crate::tracker::DEFAULT_RETENTION_DAYS,
        }
    }
}

impl BotConfig {
    /// Defaults overlaid with environment overrides.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            let dir = PathBuf::from(dir);
            cfg.tracking_file = dir.join("content_tracking.json");
            cfg.summaries_file = dir.join("article_summaries.json");
            cfg.posts_archive_file = dir.join("generated_posts.json");
            cfg.social_cache_file = dir.join("social_cache.json");
        }
        if let Ok(url) = std::env::var(ENV_RSS_FEED) {
            if !url.is_empty() {
                cfg.rss_feed = url;
            }
        }
        if let Ok(url) = std::env::var(ENV_GECKO_API) {
            if !url.is_empty() {
                cfg.gecko_api = url;
            }
        }
        if let Some(n) = parse_env::<u32>(ENV_MAX_RETRIES) {
            cfg.max_retries = n.max(1);
        }
        if let Some(n) = parse_env::<i64>(ENV_RETENTION_DAYS) {
            cfg.retention_days = n.max(1);
        }

        cfg
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_without_env() {
        for var in [
            ENV_DATA_DIR,
            ENV_RSS_FEED,
            ENV_GECKO_API,
            ENV_MAX_RETRIES,
            ENV_RETENTION_DAYS,
        ] {
            std::env::remove_var(var);
        }
        let cfg = BotConfig::from_env();
        assert_eq!(cfg.rss_feed, DEFAULT_RSS_FEED);
        assert_eq!(cfg.max_retries, crate::compose::DEFAULT_MAX_RETRIES);
        assert_eq!(cfg.tracking_file, PathBuf::from(DEFAULT_TRACKING_FILE));
    }

    #[test]
    #[serial]
    fn env_overrides_apply_and_clamp() {
        std::env::set_var(ENV_DATA_DIR, "/tmp/composer");
        std::env::set_var(ENV_MAX_RETRIES, "0");
        std::env::set_var(ENV_RETENTION_DAYS, "14");

        let cfg = BotConfig::from_env();
        assert_eq!(
            cfg.tracking_file,
            PathBuf::from("/tmp/composer/content_tracking.json")
        );
        assert_eq!(cfg.max_retries, 1); // zero is clamped up
        assert_eq!(cfg.retention_days, 14);

        std::env::remove_var(ENV_DATA_DIR);
        std::env::remove_var(ENV_MAX_RETRIES);
        std::env::remove_var(ENV_RETENTION_DAYS);
    }
}
