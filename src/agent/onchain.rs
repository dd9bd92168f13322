// =============================================================================
// On-chain Agent — holder growth, transfer velocity, organic-activity score
// =============================================================================

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;

use crate::agent::runtime::{AgentSpec, AnalysisContext, AnalyzeOutcome};
use crate::chain::ChainClient;
use crate::price::PriceService;
use crate::types::{normalize_address, Category, SignalType, TransferEvent};

pub const MIN_SAMPLES: usize = 1;

/// How many hops back a circular transfer pattern is searched for (§4.6, §9).
const CIRCULAR_DETECTION_DEPTH: usize = 3;
/// Rolling window (in agent ticks) used for velocity computation (§9).
const VELOCITY_WINDOW: usize = 60;

fn coefficient_of_variation(values: &[u128]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<u128>() as f64 / values.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values
        .iter()
        .map(|v| {
            let d = *v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt() / mean
}

/// Depth-3 circular pattern detection: A->B->A or A->B->C->A within a single
/// scan batch.
fn has_circular_pattern(transfers: &[TransferEvent]) -> bool {
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    for t in transfers {
        adjacency
            .entry(normalize_address(&t.from))
            .or_default()
            .push(normalize_address(&t.to));
    }

    for start in adjacency.keys() {
        let mut stack = vec![(start.clone(), 0usize)];
        while let Some((node, depth)) = stack.pop() {
            if depth >= CIRCULAR_DETECTION_DEPTH {
                continue;
            }
            if let Some(next_hops) = adjacency.get(&node) {
                for next in next_hops {
                    if next == start && depth > 0 {
                        return true;
                    }
                    stack.push((next.clone(), depth + 1));
                }
            }
        }
    }
    false
}

pub struct OnchainAgent {
    holder_set: std::collections::HashSet<String>,
    transfer_window: std::collections::VecDeque<TransferEvent>,
    /// The configured swap router, refreshed each tick — a transfer from
    /// this address to a non-router address is a "buy", the reverse a
    /// "sell" (§4.6).
    router_address: Option<String>,
}

impl Default for OnchainAgent {
    fn default() -> Self {
        Self {
            holder_set: std::collections::HashSet::new(),
            transfer_window: std::collections::VecDeque::new(),
            router_address: None,
        }
    }
}

#[async_trait]
impl AgentSpec for OnchainAgent {
    fn name(&self) -> &str {
        "onchain"
    }

    fn category(&self) -> Category {
        Category::Onchain
    }

    fn interval_ms(&self) -> u64 {
        30_000
    }

    fn history_size(&self) -> usize {
        50
    }

    async fn before_tick(&mut self, chain: &ChainClient, _price_service: &PriceService, _token_address: &str) {
        self.router_address = chain.router_address().map(|a| normalize_address(&format!("{a:#x}")));

        let Ok(to_block) = chain.get_block_number().await else {
            return;
        };
        let from_block = to_block.saturating_sub(20);
        if let Ok(transfers) = chain.get_transfer_logs(from_block, to_block).await {
            for t in transfers {
                self.holder_set.insert(normalize_address(&t.to));
                self.transfer_window.push_back(t);
                while self.transfer_window.len() > VELOCITY_WINDOW {
                    self.transfer_window.pop_front();
                }
            }
        }
    }

    async fn analyze(&mut self, _ctx: &AnalysisContext<'_>) -> AnalyzeOutcome {
        let transfers: Vec<TransferEvent> = self.transfer_window.iter().cloned().collect();
        if transfers.is_empty() {
            return AnalyzeOutcome::hold_insufficient_data();
        }

        let values: Vec<u128> = transfers.iter().map(|t| t.value).collect();
        let unique_senders: std::collections::HashSet<_> =
            transfers.iter().map(|t| normalize_address(&t.from)).collect();
        let unique_receivers: std::collections::HashSet<_> =
            transfers.iter().map(|t| normalize_address(&t.to)).collect();

        let mut score: f64 = 70.0;

        if has_circular_pattern(&transfers) {
            score -= 25.0;
        }

        let cv = coefficient_of_variation(&values);
        if cv < 0.1 {
            score -= 15.0;
        } else {
            score += 5.0;
        }

        let unique_ratio = (unique_senders.len() + unique_receivers.len()) as f64 / (transfers.len() as f64 * 2.0);
        if unique_ratio > 0.6 {
            score += 10.0;
        }

        // A "buy" is a transfer from the known router to a non-router
        // address; a "sell" is the reverse (§4.6). Without a configured
        // router we can't classify direction, so both stay at zero.
        let (buys, sells) = match &self.router_address {
            Some(router) => {
                let mut buys = 0u64;
                let mut sells = 0u64;
                for t in &transfers {
                    let from = normalize_address(&t.from);
                    let to = normalize_address(&t.to);
                    if &from == router && &to != router {
                        buys += 1;
                    } else if &to == router && &from != router {
                        sells += 1;
                    }
                }
                (buys, sells)
            }
            None => (0, 0),
        };

        let score = score.clamp(0.0, 100.0);
        let velocity = transfers.len() as f64 / VELOCITY_WINDOW as f64;
        let holder_growth = self.holder_set.len();

        let signal_type = if score >= 65.0 {
            SignalType::Buy
        } else if score <= 35.0 {
            SignalType::Sell
        } else {
            SignalType::Hold
        };
        let confidence = score.max(30.0).min(90.0);

        let mut extra = serde_json::Map::new();
        extra.insert(
            "onchain".to_string(),
            json!({
                "organicScore": score,
                "velocity": velocity,
                "holderGrowth": holder_growth,
                "coefficientOfVariation": cv,
                "buys": buys,
                "sells": sells,
            }),
        );

        AnalyzeOutcome {
            signal_type,
            confidence,
            reason: format!("organic activity score {score:.1}"),
            extra,
            side_post: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(from: &str, to: &str, value: u128) -> TransferEvent {
        TransferEvent { from: from.into(), to: to.into(), value, block_number: 1, tx_hash: "0x0".into() }
    }

    #[test]
    fn cv_zero_for_empty() {
        assert_eq!(coefficient_of_variation(&[]), 0.0);
    }

    #[test]
    fn cv_low_for_uniform_sizes() {
        let values = vec![1_000_000u128; 10];
        assert!(coefficient_of_variation(&values) < 0.1);
    }

    #[test]
    fn cv_high_for_varied_sizes() {
        let values = vec![100u128, 5_000_000, 20, 9_000_000];
        assert!(coefficient_of_variation(&values) > 0.1);
    }

    #[test]
    fn detects_direct_circular_pattern() {
        let transfers = vec![t("a", "b", 1), t("b", "a", 1)];
        assert!(has_circular_pattern(&transfers));
    }

    #[test]
    fn detects_depth_three_circular_pattern() {
        let transfers = vec![t("a", "b", 1), t("b", "c", 1), t("c", "a", 1)];
        assert!(has_circular_pattern(&transfers));
    }

    #[test]
    fn no_false_positive_on_linear_chain() {
        let transfers = vec![t("a", "b", 1), t("c", "d", 1)];
        assert!(!has_circular_pattern(&transfers));
    }

    #[test]
    fn buy_sell_classification_follows_router_direction() {
        let router = normalize_address("0xrouter");
        let mut agent = OnchainAgent { router_address: Some(router.clone()), ..Default::default() };
        agent.transfer_window.push_back(t("0xrouter", "0xalice", 1));
        agent.transfer_window.push_back(t("0xbob", "0xrouter", 1));
        agent.transfer_window.push_back(t("0xalice", "0xbob", 1));

        let transfers: Vec<TransferEvent> = agent.transfer_window.iter().cloned().collect();
        let mut buys = 0u64;
        let mut sells = 0u64;
        for tr in &transfers {
            let from = normalize_address(&tr.from);
            let to = normalize_address(&tr.to);
            if from == router && to != router {
                buys += 1;
            } else if to == router && from != router {
                sells += 1;
            }
        }
        assert_eq!(buys, 1);
        assert_eq!(sells, 1);
    }
}
