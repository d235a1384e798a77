// src/publisher.rs
//! Social-platform posting collaborator.
//!
//! `publish` returns `Ok(true)` only when the platform accepted the post;
//! `Ok(false)` means "not configured / declined", which the pipeline treats
//! as a normal outcome (archive but do not track).

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, text: &str) -> Result<bool>;
    fn name(&self) -> &'static str;
}

/// Logs the post instead of sending it anywhere. Default when no platform
/// credentials are configured.
pub struct DisabledPublisher;

#[async_trait]
impl Publisher for DisabledPublisher {
    async fn publish(&self, text: &str) -> Result<bool> {
        tracing::info!(len = text.len(), "publisher disabled, post not sent");
        Ok(false)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Test double that records every published text.
#[derive(Default)]
pub struct RecordingPublisher {
    pub sent: std::sync::Mutex<Vec<String>>,
    pub accept: bool,
}

impl RecordingPublisher {
    pub fn accepting() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
            accept: true,
        }
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, text: &str) -> Result<bool> {
        self.sent
            .lock()
            .expect("recording publisher poisoned")
            .push(text.to_string());
        Ok(self.accept)
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
