// src/market.rs
//! Trending-pool market context.
//!
//! Thin client for a GeckoTerminal-style trending-pools endpoint plus the
//! relevance thresholds applied before a pool may appear in a prompt. The
//! composer treats pools as opaque context records; only the pipeline
//! filters them (by recent token mentions).

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

pub const DEFAULT_GECKO_API: &str = "https://api.geckoterminal.com/api/v2";

/// Pools below these floors are ignored as noise.
pub const MIN_VOLUME_24H_USD: f64 = 100_000.0;
pub const MIN_LIQUIDITY_USD: f64 = 50_000.0;

/// One trending DEX pool, already flattened for prompt building.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrendingPool {
    pub name: String,
    pub base_token: String,
    pub quote_token: String,
    pub price_change_24h: f64,
    pub volume_24h: f64,
    pub liquidity: f64,
    pub buys_24h: u64,
    pub sells_24h: u64,
}

impl TrendingPool {
    /// Buy/sell pressure; 1.0 for a silent pool.
    pub fn buy_sell_ratio(&self) -> f64 {
        if self.sells_24h > 0 {
            self.buys_24h as f64 / self.sells_24h as f64
        } else if self.buys_24h > 0 {
            f64::INFINITY
        } else {
            1.0
        }
    }
}

#[async_trait]
pub trait MarketData: Send + Sync {
    async fn trending_pools(&self) -> Result<Vec<TrendingPool>>;
}

/// Fixed pool list for tests and offline runs.
pub struct StaticMarketData(pub Vec<TrendingPool>);

#[async_trait]
impl MarketData for StaticMarketData {
    async fn trending_pools(&self) -> Result<Vec<TrendingPool>> {
        Ok(self.0.clone())
    }
}

// ------------------------------------------------------------
// GeckoTerminal client
// ------------------------------------------------------------

pub struct GeckoTerminalClient {
    http: reqwest::Client,
    base_url: String,
}

impl GeckoTerminalClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

// JSON:API shape of the trending-pools response; only the fields we read.
#[derive(Debug, Deserialize)]
struct PoolsResponse {
    #[serde(default)]
    data: Vec<PoolEntry>,
}

#[derive(Debug, Deserialize)]
struct PoolEntry {
    attributes: PoolAttributes,
    #[serde(default)]
    relationships: Relationships,
}

#[derive(Debug, Deserialize)]
struct PoolAttributes {
    #[serde(default)]
    name: String,
    #[serde(default)]
    volume_usd: TimeframeMap,
    #[serde(default)]
    price_change_percentage: TimeframeMap,
    #[serde(default)]
    reserve_in_usd: Option<String>,
    #[serde(default)]
    transactions: Transactions,
}

#[derive(Debug, Default, Deserialize)]
struct TimeframeMap {
    #[serde(default)]
    h24: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Transactions {
    #[serde(default)]
    h24: TxCounts,
}

#[derive(Debug, Default, Deserialize)]
struct TxCounts {
    #[serde(default)]
    buys: u64,
    #[serde(default)]
    sells: u64,
}

#[derive(Debug, Default, Deserialize)]
struct Relationships {
    #[serde(default)]
    base_token: TokenRel,
    #[serde(default)]
    quote_token: TokenRel,
}

#[derive(Debug, Default, Deserialize)]
struct TokenRel {
    #[serde(default)]
    data: TokenRelData,
}

#[derive(Debug, Default, Deserialize)]
struct TokenRelData {
    #[serde(default)]
    id: String,
}

/// Token relationship ids look like `eth_0xabc…` or `solana_So11…`;
/// the symbolish part is the last `_` segment.
fn token_from_rel_id(id: &str) -> String {
    id.rsplit('_').next().unwrap_or_default().to_string()
}

fn parse_usd(raw: &Option<String>) -> f64 {
    raw.as_deref()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Flatten the raw response into relevant pools, highest 24h volume first.
/// Downstream callers take a small prefix, so the order matters.
fn flatten_pools(body: PoolsResponse) -> Vec<TrendingPool> {
    let mut out = Vec::with_capacity(body.data.len());
    for entry in body.data {
        let volume_24h = parse_usd(&entry.attributes.volume_usd.h24);
        let liquidity = parse_usd(&entry.attributes.reserve_in_usd);
        if volume_24h < MIN_VOLUME_24H_USD || liquidity < MIN_LIQUIDITY_USD {
            continue;
        }
        out.push(TrendingPool {
            name: entry.attributes.name,
            base_token: token_from_rel_id(&entry.relationships.base_token.data.id),
            quote_token: token_from_rel_id(&entry.relationships.quote_token.data.id),
            price_change_24h: parse_usd(&entry.attributes.price_change_percentage.h24),
            volume_24h,
            liquidity,
            buys_24h: entry.attributes.transactions.h24.buys,
            sells_24h: entry.attributes.transactions.h24.sells,
        });
    }
    out.sort_by(|a, b| {
        b.volume_24h
            .partial_cmp(&a.volume_24h)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    out
}

#[async_trait]
impl MarketData for GeckoTerminalClient {
    async fn trending_pools(&self) -> Result<Vec<TrendingPool>> {
        let url = format!("{}/networks/trending_pools", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("fetch trending pools {url}"))?;
        let body: PoolsResponse = resp.json().await.context("trending pools body")?;
        Ok(flatten_pools(body))
    }
}
