use std::sync::Arc;

use shuttle_axum::axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::pipeline::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/trigger-post", post(trigger_post))
        .route("/trigger-refresh", post(trigger_refresh))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct RootResp {
    status: &'static str,
    uptime: &'static str,
}

async fn root() -> Json<RootResp> {
    Json(RootResp {
        status: "running",
        uptime: "active",
    })
}

#[derive(serde::Serialize)]
struct HealthResp {
    status: &'static str,
    timestamp: String,
}

async fn health() -> Json<HealthResp> {
    Json(HealthResp {
        status: "healthy",
        timestamp: chrono::Local::now().naive_local().to_string(),
    })
}

#[derive(serde::Serialize)]
struct StatsResp {
    total_articles: usize,
    total_posts: usize,
}

async fn stats(State(state): State<AppState>) -> Json<StatsResp> {
    let (total_articles, total_posts) = state.pipeline.stats().await;
    Json(StatsResp {
        total_articles,
        total_posts,
    })
}

#[derive(serde::Serialize)]
struct TriggerResp {
    status: &'static str,
}

/// Manual trigger: runs in the background so the request returns at once.
/// Overlapping triggers serialize on the pipeline's internal mutex.
async fn trigger_post(State(state): State<AppState>) -> Json<TriggerResp> {
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        match pipeline.generate_and_post().await {
            Ok(Some(entry)) => {
                tracing::info!(posted = entry.posted, "triggered run produced a post")
            }
            Ok(None) => tracing::info!("triggered run produced no content"),
            Err(e) => tracing::warn!(error = %e, "triggered run failed"),
        }
    });
    Json(TriggerResp {
        status: "post generation initiated",
    })
}

async fn trigger_refresh(State(state): State<AppState>) -> Json<TriggerResp> {
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        match pipeline.refresh_summaries().await {
            Ok(n) => tracing::info!(new_summaries = n, "triggered refresh finished"),
            Err(e) => tracing::warn!(error = %e, "triggered refresh failed"),
        }
    });
    Json(TriggerResp {
        status: "summary refresh initiated",
    })
}
