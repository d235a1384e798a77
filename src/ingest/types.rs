// src/ingest/types.rs
use anyhow::Result;

/// Raw feed entry as parsed from a provider, before summarization.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    /// Publication timestamp as given by the feed (RFC 2822).
    pub published: String,
    /// Cleaned body text (description or full content).
    pub content: String,
}

/// Summarized article: the unit the tracker and the composer work with.
/// `link` is the identity key in the summaries archive.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct NewsArticle {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub published: String,
    pub summary: String,
}

#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>>;
    fn name(&self) -> &'static str;
}
