// src/ingest/providers/cointelegraph_rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::normalize_text;
use crate::ingest::types::{FeedItem, FeedProvider};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

enum Source {
    Fixture(String),
    Remote(String),
}

/// CoinTelegraph-style RSS provider. Construct from a fixture string in
/// tests or from a feed URL for live runs.
pub struct CoinTelegraphRssProvider {
    source: Source,
    http: reqwest::Client,
}

impl CoinTelegraphRssProvider {
    pub fn from_fixture(content: &str) -> Self {
        Self {
            source: Source::Fixture(content.to_string()),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_url(url: &str) -> Self {
        Self {
            source: Source::Remote(url.to_string()),
            http: reqwest::Client::new(),
        }
    }

    async fn raw_xml(&self) -> Result<String> {
        match &self.source {
            Source::Fixture(content) => Ok(content.clone()),
            Source::Remote(url) => {
                let resp = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("fetch rss feed {url}"))?;
                resp.text().await.context("read rss feed body")
            }
        }
    }
}

#[async_trait]
impl FeedProvider for CoinTelegraphRssProvider {
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>> {
        let t0 = std::time::Instant::now();

        let xml = self.raw_xml().await?;
        let rss: Rss = from_str(&xml).context("parsing cointelegraph rss xml")?;
        let mut out = Vec::with_capacity(rss.channel.item.len());

        for it in rss.channel.item {
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            let content = normalize_text(it.description.as_deref().unwrap_or_default());
            let Some(link) = it.link.filter(|l| !l.is_empty()) else {
                continue;
            };
            if title.is_empty() {
                continue;
            }
            out.push(FeedItem {
                title,
                link,
                published: it.pub_date.unwrap_or_default(),
                content,
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        counter!("ingest_items_total").increment(out.len() as u64);

        Ok(out)
    }

    fn name(&self) -> &'static str {
        "CoinTelegraph"
    }
}
