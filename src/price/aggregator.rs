// =============================================================================
// Primary price source — DexScreener-shaped aggregator HTTP client
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::instrument;

const BASE_URL: &str = "https://api.dexscreener.com/latest/dex/tokens";

#[derive(Debug, Deserialize)]
pub struct AggregatorResponse {
    #[serde(default)]
    pub pairs: Vec<Pair>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pair {
    #[serde(default)]
    pub price_native: f64,
    #[serde(default)]
    pub price_usd: StringOrFloat,
    #[serde(default)]
    pub volume: Windowed,
    #[serde(default)]
    pub price_change: Windowed,
    #[serde(default)]
    pub txns: TxnWindows,
    #[serde(default)]
    pub liquidity: Liquidity,
    #[serde(default)]
    pub market_cap: f64,
    #[serde(default)]
    pub fdv: f64,
    #[serde(default)]
    pub pair_address: String,
    #[serde(default)]
    pub base_token: TokenMeta,
    #[serde(default)]
    pub quote_token: TokenMeta,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenMeta {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Windowed {
    #[serde(rename = "h24", default)]
    pub h24: f64,
    #[serde(rename = "h6", default)]
    pub h6: f64,
    #[serde(rename = "h1", default)]
    pub h1: f64,
    #[serde(rename = "m5", default)]
    pub m5: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct TxnWindow {
    #[serde(default)]
    pub buys: u64,
    #[serde(default)]
    pub sells: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct TxnWindows {
    #[serde(rename = "h24", default)]
    pub h24: TxnWindow,
    #[serde(rename = "h6", default)]
    pub h6: TxnWindow,
    #[serde(rename = "h1", default)]
    pub h1: TxnWindow,
}

#[derive(Debug, Default, Deserialize)]
pub struct Liquidity {
    #[serde(default)]
    pub usd: f64,
}

/// DexScreener serializes `priceUsd` as a string in practice; accept either.
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
pub enum StringOrFloat {
    #[default]
    Missing,
    Str(String),
    Num(f64),
}

impl StringOrFloat {
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Missing => 0.0,
            Self::Str(s) => s.parse().unwrap_or(0.0),
            Self::Num(n) => *n,
        }
    }
}

pub struct Aggregator {
    client: reqwest::Client,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build aggregator http client");
        Self { client }
    }

    /// Fetch all pairs for a token and return the one with maximum liquidity,
    /// matching the fallback selection rule in spec §4.2 step 1.
    #[instrument(skip(self), name = "aggregator::fetch_best_pair")]
    pub async fn fetch_best_pair(&self, token_address: &str) -> Result<Option<Pair>> {
        let url = format!("{BASE_URL}/{token_address}");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("aggregator request failed")?;

        if !resp.status().is_success() {
            return Ok(None);
        }

        let body: AggregatorResponse = resp.json().await.context("aggregator response parse failed")?;
        Ok(body
            .pairs
            .into_iter()
            .max_by(|a, b| a.liquidity.usd.partial_cmp(&b.liquidity.usd).unwrap()))
    }
}
