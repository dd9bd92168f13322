// =============================================================================
// Gas Agent — fast-cadence gas price tracking and next-block extrapolation
// =============================================================================

use std::collections::VecDeque;

use async_trait::async_trait;
use serde_json::json;

use crate::agent::runtime::{AgentSpec, AnalysisContext, AnalyzeOutcome, SidePost};
use crate::types::{Category, SignalType};

const RING_CAPACITY: usize = 50;

fn label(gwei: f64) -> &'static str {
    if gwei < 1.0 {
        "EXCELLENT"
    } else if gwei < 5.0 {
        "GOOD"
    } else if gwei < 20.0 {
        "NORMAL"
    } else if gwei < 50.0 {
        "ELEVATED"
    } else {
        "HIGH"
    }
}

fn extrapolate_next(ring: &VecDeque<f64>) -> f64 {
    if ring.len() < 2 {
        return ring.back().copied().unwrap_or(0.0);
    }
    let n = ring.len();
    let last = ring[n - 1];
    let prev = ring[n - 2];
    (last + (last - prev)).max(0.0)
}

pub struct GasAgent {
    ring: VecDeque<f64>,
}

impl Default for GasAgent {
    fn default() -> Self {
        Self { ring: VecDeque::with_capacity(RING_CAPACITY) }
    }
}

#[async_trait]
impl AgentSpec for GasAgent {
    fn name(&self) -> &str {
        "gas"
    }

    fn category(&self) -> Category {
        Category::Gas
    }

    fn interval_ms(&self) -> u64 {
        10_000
    }

    fn history_size(&self) -> usize {
        10
    }

    async fn analyze(&mut self, ctx: &AnalysisContext<'_>) -> AnalyzeOutcome {
        let gwei = match ctx.chain.get_gas_price_gwei().await {
            Ok(v) => v as f64,
            Err(e) => {
                tracing::warn!(error = %e, "gas price read failed");
                return AnalyzeOutcome::hold_insufficient_data();
            }
        };

        self.ring.push_back(gwei);
        while self.ring.len() > RING_CAPACITY {
            self.ring.pop_front();
        }

        let next_block_estimate = extrapolate_next(&self.ring);
        let tag = label(gwei);

        let signal_type = match tag {
            "EXCELLENT" | "GOOD" => SignalType::Buy,
            "HIGH" => SignalType::Sell,
            _ => SignalType::Hold,
        };
        let confidence = match tag {
            "EXCELLENT" => 90.0,
            "GOOD" => 75.0,
            "NORMAL" => 55.0,
            "ELEVATED" => 65.0,
            _ => 80.0,
        };

        let update = json!({
            "gweiCurrent": gwei,
            "gweiNextBlockEstimate": next_block_estimate,
            "label": tag,
        });

        let mut extra = serde_json::Map::new();
        extra.insert("gas".to_string(), update.clone());

        AnalyzeOutcome {
            signal_type,
            confidence,
            reason: format!("gas {tag} at {gwei:.1} gwei"),
            extra,
            side_post: Some(SidePost::GasUpdate(update)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_thresholds() {
        assert_eq!(label(0.5), "EXCELLENT");
        assert_eq!(label(3.0), "GOOD");
        assert_eq!(label(10.0), "NORMAL");
        assert_eq!(label(30.0), "ELEVATED");
        assert_eq!(label(60.0), "HIGH");
    }

    #[test]
    fn extrapolate_linear_trend() {
        let ring: VecDeque<f64> = vec![10.0, 12.0, 14.0].into();
        assert_eq!(extrapolate_next(&ring), 16.0);
    }

    #[test]
    fn extrapolate_single_value_holds() {
        let ring: VecDeque<f64> = vec![10.0].into();
        assert_eq!(extrapolate_next(&ring), 10.0);
    }
}
