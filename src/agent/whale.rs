// =============================================================================
// Whale Agent — large-transfer scanning and counterparty classification
// =============================================================================

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};

use crate::agent::runtime::{AgentSpec, AnalysisContext, AnalyzeOutcome, SidePost};
use crate::chain::{from_base18, ChainClient};
use crate::price::PriceService;
use crate::types::{normalize_address, Category, SignalType, WhaleTally};

/// Minimum whole-token transfer size treated as "whale" activity (§4.6).
const WHALE_THRESHOLD_TOKENS: f64 = 1_000_000.0;
const MEGA_SUPPLY_FRACTION: f64 = 0.005;
const LARGE_SUPPLY_FRACTION: f64 = 0.001;
/// Seed window: scan the last 500 blocks on first tick rather than from genesis.
const SEED_LOOKBACK_BLOCKS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Mega,
    Large,
    Whale,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Mega => "MEGA",
            Self::Large => "LARGE",
            Self::Whale => "WHALE",
        };
        write!(f, "{s}")
    }
}

fn classify_tier(value: f64, total_supply: f64) -> Tier {
    if total_supply <= 0.0 {
        return Tier::Whale;
    }
    let fraction = value / total_supply;
    if fraction >= MEGA_SUPPLY_FRACTION {
        Tier::Mega
    } else if fraction >= LARGE_SUPPLY_FRACTION {
        Tier::Large
    } else {
        Tier::Whale
    }
}

pub struct WhaleAgent {
    last_scanned_block: Option<u64>,
    tallies: HashMap<String, WhaleTally>,
    /// Approximate circulating supply used for MEGA/LARGE/WHALE sizing.
    /// Real supply tracking would read the token contract's `totalSupply`;
    /// this is refreshed lazily the first time it's needed.
    total_supply: f64,
}

impl Default for WhaleAgent {
    fn default() -> Self {
        Self {
            last_scanned_block: None,
            tallies: HashMap::new(),
            total_supply: 1_000_000_000.0,
        }
    }
}

#[async_trait]
impl AgentSpec for WhaleAgent {
    fn name(&self) -> &str {
        "whale"
    }

    fn category(&self) -> Category {
        Category::Whale
    }

    fn interval_ms(&self) -> u64 {
        30_000
    }

    fn history_size(&self) -> usize {
        50
    }

    #[instrument(skip(self, chain, _price_service), name = "whale::before_tick")]
    async fn before_tick(&mut self, chain: &ChainClient, _price_service: &PriceService, _token_address: &str) {
        let Ok(current_block) = chain.get_block_number().await else {
            return;
        };
        let from_block = match self.last_scanned_block {
            Some(last) => last + 1,
            None => current_block.saturating_sub(SEED_LOOKBACK_BLOCKS),
        };
        if from_block > current_block {
            return;
        }

        match chain.get_transfer_logs(from_block, current_block).await {
            Ok(transfers) => {
                let now = Utc::now().timestamp_millis();
                for t in &transfers {
                    if from_base18(t.value) < WHALE_THRESHOLD_TOKENS {
                        continue;
                    }
                    let from_key = normalize_address(&t.from);
                    let to_key = normalize_address(&t.to);

                    let sender = self
                        .tallies
                        .entry(from_key)
                        .or_insert_with(|| WhaleTally::new_first_seen(t.from.clone(), now));
                    sender.total_out += t.value;
                    sender.tx_count += 1;
                    sender.last_seen = now;
                    sender.reclassify();

                    let receiver = self
                        .tallies
                        .entry(to_key)
                        .or_insert_with(|| WhaleTally::new_first_seen(t.to.clone(), now));
                    receiver.total_in += t.value;
                    receiver.tx_count += 1;
                    receiver.last_seen = now;
                    receiver.reclassify();
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "whale transfer scan failed");
                return;
            }
        }

        // Monotone cursor: only advance past blocks we actually scanned,
        // never rewind (testable property — block-cursor monotonicity).
        self.last_scanned_block = Some(self.last_scanned_block.map_or(current_block, |prev| prev.max(current_block)));
        info!(from_block, to_block = current_block, "whale scan complete");
    }

    async fn analyze(&mut self, ctx: &AnalysisContext<'_>) -> AnalyzeOutcome {
        let Some(biggest) = self
            .tallies
            .values()
            .max_by(|a, b| a.net_flow().unsigned_abs().cmp(&b.net_flow().unsigned_abs()))
        else {
            return AnalyzeOutcome::hold_insufficient_data();
        };

        let net = biggest.net_flow();
        let magnitude = from_base18(net.unsigned_abs());
        let tier = classify_tier(magnitude, self.total_supply);
        let gas_gwei = ctx.chain.get_gas_price_gwei().await.unwrap_or(0);

        let signal_type = if net > 0 { SignalType::Buy } else if net < 0 { SignalType::Sell } else { SignalType::Hold };
        let confidence = match tier {
            Tier::Mega => 90.0,
            Tier::Large => 70.0,
            Tier::Whale => 50.0,
        };

        let alert = json!({
            "address": biggest.address,
            "tier": tier.to_string(),
            "profile": biggest.profile,
            "netFlow": net.to_string(),
            "txCount": biggest.tx_count,
            "gasGwei": gas_gwei,
            "token": ctx.token_address,
        });

        let mut extra = serde_json::Map::new();
        extra.insert("whale".to_string(), alert.clone());

        AnalyzeOutcome {
            signal_type,
            confidence,
            reason: format!("{tier} transfer by {} ({:?})", biggest.address, biggest.profile),
            extra,
            side_post: Some(SidePost::WhaleAlert(alert)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_tier_mega_at_half_percent() {
        assert_eq!(classify_tier(5_000_000, 1_000_000_000.0), Tier::Mega);
    }

    #[test]
    fn classify_tier_large_between_thresholds() {
        assert_eq!(classify_tier(2_000_000, 1_000_000_000.0), Tier::Large);
    }

    #[test]
    fn classify_tier_whale_below_large() {
        assert_eq!(classify_tier(1_000_001, 1_000_000_000.0), Tier::Whale);
    }

    #[test]
    fn classify_tier_zero_supply_falls_back_to_whale() {
        assert_eq!(classify_tier(1_000_000, 0.0), Tier::Whale);
    }
}
