// =============================================================================
// Price Service — TTL cache, request coalescing, multi-source fallback
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{instrument, warn};

use crate::chain::ChainClient;
use crate::price::aggregator::Aggregator;
use crate::types::{normalize_address, PriceChange, PriceSample, PriceSource};

const CACHE_TTL_MS: i64 = 5_000;
const MIN_PLAUSIBLE_PRICE: f64 = 1e-7;
const MAX_PLAUSIBLE_PRICE: f64 = 1e3;

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("all price sources exhausted")]
    AllSourcesExhausted,
    #[error("computed price is anomalous")]
    Anomalous,
}

#[derive(Clone)]
struct CacheEntry {
    sample: PriceSample,
}

/// Process-wide price cache + coalescing table. Not a global/static: owned
/// via `Arc` and threaded through to every agent task that needs it.
pub struct PriceService {
    cache: RwLock<HashMap<String, CacheEntry>>,
    last_known: RwLock<HashMap<String, PriceSample>>,
    inflight: tokio::sync::Mutex<HashMap<String, Arc<Notify>>>,
    aggregator: Aggregator,
    focal_token: String,
}

impl PriceService {
    pub fn new(focal_token: &str) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            last_known: RwLock::new(HashMap::new()),
            inflight: tokio::sync::Mutex::new(HashMap::new()),
            aggregator: Aggregator::new(),
            focal_token: normalize_address(focal_token),
        }
    }

    fn is_focal(&self, key: &str) -> bool {
        key == self.focal_token
    }

    /// §4.2 `fetchPrice`. `chain` is used only for the on-chain fallback
    /// quote on the focal token.
    #[instrument(skip(self, chain), name = "price::fetch_price")]
    pub async fn fetch_price(
        &self,
        token_address: &str,
        chain: Option<&ChainClient>,
    ) -> Result<Option<PriceSample>, PriceError> {
        let key = normalize_address(token_address);
        let now = Utc::now().timestamp_millis();

        if let Some(sample) = self.cached_if_fresh(&key, now) {
            return Ok(Some(sample));
        }

        // Request coalescing: only one in-flight upstream fetch per key.
        let notify = {
            let mut inflight = self.inflight.lock().await;
            if let Some(existing) = inflight.get(&key) {
                Some(existing.clone())
            } else {
                let n = Arc::new(Notify::new());
                inflight.insert(key.clone(), n);
                None
            }
        };

        if let Some(existing) = notify {
            existing.notified().await;
            if let Some(sample) = self.cached_if_fresh(&key, Utc::now().timestamp_millis()) {
                return Ok(Some(sample));
            }
            return Ok(self.last_known.read().get(&key).cloned());
        }

        let result = self.fetch_uncached(&key, chain).await;

        {
            let mut inflight = self.inflight.lock().await;
            if let Some(n) = inflight.remove(&key) {
                n.notify_waiters();
            }
        }

        result
    }

    fn cached_if_fresh(&self, key: &str, now: i64) -> Option<PriceSample> {
        let cache = self.cache.read();
        let entry = cache.get(key)?;
        if now - entry.sample.timestamp < CACHE_TTL_MS {
            let mut sample = entry.sample.clone();
            sample.source = PriceSource::Cache;
            Some(sample)
        } else {
            None
        }
    }

    async fn fetch_uncached(
        &self,
        key: &str,
        chain: Option<&ChainClient>,
    ) -> Result<Option<PriceSample>, PriceError> {
        // Step 1: primary aggregator.
        match self.aggregator.fetch_best_pair(key).await {
            Ok(Some(pair)) if pair.price_native > 0.0 => {
                let sample = PriceSample {
                    price: pair.price_native,
                    price_usd: pair.price_usd.as_f64(),
                    price_native: pair.price_native,
                    timestamp: Utc::now().timestamp_millis(),
                    volume_24h: pair.volume.h24,
                    price_change: PriceChange {
                        m5: pair.price_change.m5,
                        h1: pair.price_change.h1,
                        h24: pair.price_change.h24,
                    },
                    liquidity_usd: pair.liquidity.usd,
                    market_cap: if pair.market_cap > 0.0 { pair.market_cap } else { pair.fdv },
                    buys_24h: pair.txns.h24.buys,
                    sells_24h: pair.txns.h24.sells,
                    buys_1h: pair.txns.h1.buys,
                    sells_1h: pair.txns.h1.sells,
                    source: PriceSource::Primary,
                    token_symbol: pair.base_token.symbol,
                    token_name: pair.base_token.name,
                    token_address: key.to_string(),
                };
                self.cache.write().insert(key.to_string(), CacheEntry { sample: sample.clone() });
                if self.is_focal(key) {
                    self.last_known.write().insert(key.to_string(), sample.clone());
                }
                return Ok(Some(sample));
            }
            Ok(_) => {
                warn!(token = %key, "primary source returned no usable pair");
            }
            Err(e) => {
                warn!(token = %key, error = %e, "primary source failed");
            }
        }

        // Step 2: on-chain fallback, focal token only.
        if self.is_focal(key) {
            if let Some(chain) = chain {
                if let Some(sample) = self.try_onchain_fallback(key, chain).await? {
                    return Ok(Some(sample));
                }
            }
        }

        // Step 3: last-known or cache.
        if let Some(sample) = self.last_known.read().get(key).cloned() {
            let mut sample = sample;
            sample.source = PriceSource::Cache;
            return Ok(Some(sample));
        }
        Ok(self.cache.read().get(key).map(|e| {
            let mut s = e.sample.clone();
            s.source = PriceSource::Cache;
            s
        }))
    }

    async fn try_onchain_fallback(
        &self,
        key: &str,
        chain: &ChainClient,
    ) -> Result<Option<PriceSample>, PriceError> {
        let quoted_price = match chain.quote_swap_price().await {
            Ok(price) => price,
            Err(e) => {
                warn!(token = %key, error = %e, "on-chain swap quote failed");
                None
            }
        };
        match quoted_price {
            Some(price) if (MIN_PLAUSIBLE_PRICE..=MAX_PLAUSIBLE_PRICE).contains(&price) => {
                let sample = PriceSample {
                    price,
                    price_usd: 0.0,
                    price_native: price,
                    timestamp: Utc::now().timestamp_millis(),
                    volume_24h: 0.0,
                    price_change: PriceChange::default(),
                    liquidity_usd: 0.0,
                    market_cap: 0.0,
                    buys_24h: 0,
                    sells_24h: 0,
                    buys_1h: 0,
                    sells_1h: 0,
                    source: PriceSource::Fallback,
                    token_symbol: String::new(),
                    token_name: String::new(),
                    token_address: key.to_string(),
                };
                self.cache.write().insert(key.to_string(), CacheEntry { sample: sample.clone() });
                Ok(Some(sample))
            }
            Some(_) => Err(PriceError::Anomalous),
            None => Ok(None),
        }
    }

    /// §4.2 `buildHistory`: synthesize a bounded price history by repeated
    /// sampling. First sample is immediate; failures are skipped but still
    /// advance one slot.
    #[instrument(skip(self, chain), name = "price::build_history")]
    pub async fn build_history(
        &self,
        token_address: &str,
        count: usize,
        interval: Duration,
        chain: Option<&ChainClient>,
    ) -> Vec<PriceSample> {
        let mut history = Vec::with_capacity(count);
        for i in 0..count {
            if i > 0 {
                tokio::time::sleep(interval).await;
            }
            if let Ok(Some(sample)) = self.fetch_price(token_address, chain).await {
                history.push(sample);
            }
        }
        history
    }

    /// §4.2 `getBondingProgress`. Real bonding-curve reads depend on the
    /// deployed launch contract (outside this core); on any error this
    /// returns the documented `{0, false}` fallback.
    pub async fn bonding_progress(&self, _token_address: &str, _chain: &ChainClient) -> (f64, bool) {
        (0.0, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cache_hit_within_ttl_has_cache_source() {
        let svc = PriceService::new("0xfocal");
        svc.cache.write().insert(
            "0xabc".to_string(),
            CacheEntry {
                sample: PriceSample {
                    price: 1.23,
                    price_usd: 1.23,
                    price_native: 1.23,
                    timestamp: Utc::now().timestamp_millis(),
                    volume_24h: 0.0,
                    price_change: PriceChange::default(),
                    liquidity_usd: 0.0,
                    market_cap: 0.0,
                    buys_24h: 0,
                    sells_24h: 0,
                    buys_1h: 0,
                    sells_1h: 0,
                    source: PriceSource::Primary,
                    token_symbol: "TOK".into(),
                    token_name: "Token".into(),
                    token_address: "0xabc".into(),
                },
            },
        );
        let result = svc.fetch_price("0xABC", None).await.unwrap().unwrap();
        assert_eq!(result.source, PriceSource::Cache);
        assert!((result.price - 1.23).abs() < 1e-9);
    }

    #[tokio::test]
    async fn stale_cache_is_not_returned() {
        let svc = PriceService::new("0xfocal");
        svc.cache.write().insert(
            "0xabc".to_string(),
            CacheEntry {
                sample: PriceSample {
                    price: 1.0,
                    price_usd: 1.0,
                    price_native: 1.0,
                    timestamp: Utc::now().timestamp_millis() - CACHE_TTL_MS - 1,
                    volume_24h: 0.0,
                    price_change: PriceChange::default(),
                    liquidity_usd: 0.0,
                    market_cap: 0.0,
                    buys_24h: 0,
                    sells_24h: 0,
                    buys_1h: 0,
                    sells_1h: 0,
                    source: PriceSource::Primary,
                    token_symbol: "TOK".into(),
                    token_name: "Token".into(),
                    token_address: "0xabc".into(),
                },
            },
        );
        assert!(svc.cached_if_fresh("0xabc", Utc::now().timestamp_millis()).is_none());
    }
}
