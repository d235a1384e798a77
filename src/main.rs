//! Crypto Content Composer — Binary Entrypoint
//! Boots the Axum HTTP server, wires the pipeline collaborators, and spawns
//! the background jobs (summaries refresh, post generation, retention).

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crypto_content_composer::api::{self, AppState};
use crypto_content_composer::config::BotConfig;
use crypto_content_composer::generator::build_generator;
use crypto_content_composer::ingest::providers::cointelegraph_rss::CoinTelegraphRssProvider;
use crypto_content_composer::ingest::types::FeedProvider;
use crypto_content_composer::market::GeckoTerminalClient;
use crypto_content_composer::metrics::Metrics;
use crypto_content_composer::pipeline::Pipeline;
use crypto_content_composer::publisher::DisabledPublisher;
use crypto_content_composer::scheduler::{spawn_jobs, SchedulerCfg};
use crypto_content_composer::social::{CachedSocialFeed, DisabledSocialFeed};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - COMPOSER_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("COMPOSER_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let cfg = BotConfig::from_env();
    let metrics = Metrics::init(cfg.retention_days);

    // --- Wire collaborators ---
    let generator = build_generator();
    let feeds: Vec<Box<dyn FeedProvider>> = vec![Box::new(CoinTelegraphRssProvider::from_url(
        &cfg.rss_feed,
    ))];
    let market = Arc::new(GeckoTerminalClient::new(&cfg.gecko_api));
    // No social API is wired yet.
    let social = Arc::new(CachedSocialFeed::new(
        DisabledSocialFeed,
        cfg.social_cache_file.clone(),
    ));

    let pipeline = Arc::new(Pipeline::new(
        cfg,
        generator,
        Arc::new(DisabledPublisher),
        market,
        social,
        feeds,
    ));

    // Initial fetch so the first post tick has something to work with.
    if let Err(e) = pipeline.refresh_summaries().await {
        tracing::warn!(error = %e, "initial summaries fetch failed");
    }

    spawn_jobs(pipeline.clone(), SchedulerCfg::default());

    let state = AppState { pipeline };
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
