// =============================================================================
// Generic Agent Loop — init / tick / fault-handling / cancellation scaffold
// =============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use crate::chain::ChainClient;
use crate::hub_client::HubClient;
use crate::price::PriceService;
use crate::types::{Category, SignalType};

/// Per-agent bounded price/volume rings (§3, testable property #1).
pub struct History {
    pub prices: VecDeque<f64>,
    pub volumes: VecDeque<f64>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            prices: VecDeque::with_capacity(capacity),
            volumes: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, price: f64, volume: f64) {
        self.prices.push_back(price);
        self.volumes.push_back(volume);
        while self.prices.len() > self.capacity {
            self.prices.pop_front();
        }
        while self.volumes.len() > self.capacity {
            self.volumes.pop_front();
        }
    }

    pub fn price_slice(&self) -> Vec<f64> {
        self.prices.iter().copied().collect()
    }

    pub fn volume_slice(&self) -> Vec<f64> {
        self.volumes.iter().copied().collect()
    }

    pub fn invariant_holds(&self) -> bool {
        self.prices.len() <= self.capacity && self.prices.len() == self.volumes.len()
    }
}

/// A side-channel event posted to one of the hub's dedicated ring buffers,
/// in addition to the generic signal every tick produces (§4.7).
pub enum SidePost {
    WhaleAlert(serde_json::Value),
    GasUpdate(serde_json::Value),
    TokenLaunch(serde_json::Value),
    MevOpportunity(serde_json::Value),
}

/// Outcome of one `analyze` call.
pub struct AnalyzeOutcome {
    pub signal_type: SignalType,
    pub confidence: f64,
    pub reason: String,
    pub extra: serde_json::Map<String, serde_json::Value>,
    pub side_post: Option<SidePost>,
}

impl AnalyzeOutcome {
    pub fn hold_insufficient_data() -> Self {
        Self {
            signal_type: SignalType::Hold,
            confidence: 30.0,
            reason: "Insufficient data".to_string(),
            extra: serde_json::Map::new(),
            side_post: None,
        }
    }
}

/// Shared context passed into every `analyze` call.
pub struct AnalysisContext<'a> {
    pub history: &'a History,
    pub latest_price: f64,
    pub latest_volume: f64,
    pub chain: &'a ChainClient,
    pub price_service: &'a PriceService,
    pub token_address: &'a str,
}

#[async_trait]
pub trait AgentSpec: Send + Sync {
    fn name(&self) -> &str;
    fn category(&self) -> Category;
    fn interval_ms(&self) -> u64;
    fn history_size(&self) -> usize;
    fn min_confidence_for_onchain_post(&self) -> f64 {
        60.0
    }

    async fn analyze(&mut self, ctx: &AnalysisContext<'_>) -> AnalyzeOutcome;

    /// Hook run before step (a) of the tick (§4.5 step 2e) — the Prediction
    /// variant overrides this to verify pending predictions against a real
    /// fetched price, and the On-chain variant uses it to refresh the
    /// router address used for buy/sell classification.
    async fn before_tick(&mut self, _chain: &ChainClient, _price_service: &PriceService, _token_address: &str) {}
}

pub struct AgentRuntime<S: AgentSpec> {
    spec: S,
    chain: Arc<ChainClient>,
    price_service: Arc<PriceService>,
    hub_client: Arc<HubClient>,
    token_address: String,
    history: History,
    shutdown: tokio::sync::watch::Receiver<bool>,
}

impl<S: AgentSpec> AgentRuntime<S> {
    pub fn new(
        spec: S,
        chain: Arc<ChainClient>,
        price_service: Arc<PriceService>,
        hub_client: Arc<HubClient>,
        token_address: String,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> Self {
        let history_size = spec.history_size();
        Self {
            spec,
            chain,
            price_service,
            hub_client,
            token_address,
            history: History::new(history_size),
            shutdown,
        }
    }

    /// §4.5 step 1: register, start heartbeat, prime history.
    #[instrument(skip(self), name = "agent::init")]
    pub async fn init(&mut self) {
        if let Err(e) = self.chain.register_agent(self.spec.name()).await {
            warn!(agent = %self.spec.name(), error = %e, "registration failed — continuing in degraded mode");
        }

        let hub = self.hub_client.clone();
        let name = self.spec.name().to_string();
        hub.start_heartbeat(name, 30_000);

        let samples = self
            .price_service
            .build_history(&self.token_address, 10, Duration::from_millis(500), Some(&self.chain))
            .await;
        for s in samples {
            self.history.push(s.price, s.volume_24h);
        }
        info!(agent = %self.spec.name(), primed = self.history.prices.len(), "history primed");
    }

    /// §4.5 step 2-3: the tick loop with fault isolation and cancellation.
    pub async fn run(&mut self) {
        self.init().await;

        let mut ticker = tokio::time::interval(Duration::from_millis(self.spec.interval_ms()));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(agent = %self.spec.name(), error = %e, "tick failed — continuing");
                    }
                }
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        info!(agent = %self.spec.name(), "shutdown signal received, exiting after grace window");
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        break;
                    }
                }
            }
        }
    }

    async fn tick(&mut self) -> anyhow::Result<()> {
        self.spec.before_tick(&self.chain, &self.price_service, &self.token_address).await;

        let sample = self
            .price_service
            .fetch_price(&self.token_address, Some(&self.chain))
            .await
            .ok()
            .flatten();

        let Some(sample) = sample else {
            warn!(agent = %self.spec.name(), "no price available this tick");
            return Ok(());
        };
        self.history.push(sample.price, sample.volume_24h);
        debug_assert!(self.history.invariant_holds());

        let ctx = AnalysisContext {
            history: &self.history,
            latest_price: sample.price,
            latest_volume: sample.volume_24h,
            chain: &self.chain,
            price_service: &self.price_service,
            token_address: &self.token_address,
        };
        let outcome = self.spec.analyze(&ctx).await;

        if outcome.confidence >= self.spec.min_confidence_for_onchain_post() && !self.chain.is_read_only() {
            let confidence_u8 = outcome.confidence.round().clamp(0.0, 100.0) as u8;
            if let Err(e) = self
                .chain
                .post_signal(&outcome.signal_type.to_string(), confidence_u8, sample.price, &outcome.reason)
                .await
            {
                warn!(agent = %self.spec.name(), error = %e, "on-chain signal post failed");
            }
        }

        let mut body = outcome.extra.clone();
        body.insert("agentName".into(), self.spec.name().into());
        body.insert("type".into(), outcome.signal_type.to_string().into());
        body.insert("confidence".into(), outcome.confidence.into());
        body.insert("price".into(), sample.price.into());
        body.insert("category".into(), self.spec.category().to_string().into());
        body.insert("reason".into(), outcome.reason.into());

        if let Some(side_post) = outcome.side_post {
            match side_post {
                SidePost::WhaleAlert(v) => {
                    self.hub_client.post_whale_alert(&v).await;
                }
                SidePost::GasUpdate(v) => {
                    self.hub_client.post_gas_update(&v).await;
                }
                SidePost::TokenLaunch(v) => {
                    self.hub_client.post_token_launch(&v).await;
                }
                SidePost::MevOpportunity(v) => {
                    self.hub_client.post_mev_opportunity(&v).await;
                }
            }
        }

        self.hub_client.post_signal(&serde_json::Value::Object(body)).await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_ring_stays_within_capacity() {
        let mut h = History::new(3);
        for i in 0..10 {
            h.push(i as f64, i as f64);
        }
        assert_eq!(h.prices.len(), 3);
        assert_eq!(h.volumes.len(), 3);
        assert!(h.invariant_holds());
        assert_eq!(h.price_slice(), vec![7.0, 8.0, 9.0]);
    }

    #[test]
    fn history_price_volume_len_always_equal() {
        let mut h = History::new(5);
        for i in 0..5 {
            h.push(i as f64, i as f64 * 2.0);
        }
        assert_eq!(h.prices.len(), h.volumes.len());
    }
}
