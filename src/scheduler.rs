// src/scheduler.rs
use std::sync::Arc;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::pipeline::Pipeline;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    /// Summaries refresh cadence (default 12h).
    pub refresh_interval_secs: u64,
    /// Post generation cadence (default hourly).
    pub post_interval_secs: u64,
    /// Tracker retention pass cadence (default daily).
    pub cleanup_interval_secs: u64,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 12 * 3600,
            post_interval_secs: 3600,
            cleanup_interval_secs: 24 * 3600,
        }
    }
}

/// Spawn the periodic jobs. The first tick of a tokio interval fires
/// immediately, so each loop skips it — startup work is the binary's call,
/// not the scheduler's.
pub fn spawn_jobs(pipeline: Arc<Pipeline>, cfg: SchedulerCfg) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(3);

    {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(cfg.refresh_interval_secs));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                counter!("scheduler_refresh_ticks_total").increment(1);
                match pipeline.refresh_summaries().await {
                    Ok(n) => tracing::info!(target: "scheduler", new_summaries = n, "summaries refresh tick"),
                    Err(e) => tracing::warn!(target: "scheduler", error = %e, "summaries refresh tick failed"),
                }
            }
        }));
    }

    {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(cfg.post_interval_secs));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                counter!("scheduler_post_ticks_total").increment(1);
                match pipeline.generate_and_post().await {
                    Ok(Some(entry)) => {
                        tracing::info!(target: "scheduler", posted = entry.posted, "post tick produced content")
                    }
                    Ok(None) => tracing::info!(target: "scheduler", "post tick produced no content"),
                    Err(e) => tracing::warn!(target: "scheduler", error = %e, "post tick failed"),
                }
            }
        }));
    }

    handles.push(tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(cfg.cleanup_interval_secs));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            pipeline.cleanup().await;
        }
    }));

    handles
}
