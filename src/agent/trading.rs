// =============================================================================
// Trading Agent — weighted vote across technical indicators
// =============================================================================

use async_trait::async_trait;
use serde_json::json;

use crate::agent::runtime::{AgentSpec, AnalysisContext, AnalyzeOutcome};
use crate::ta;
use crate::types::{Category, SignalType};

pub const MIN_SAMPLES: usize = 30;

pub struct TradingAgent;

struct WeightedInput {
    weight: f64,
    direction: f64,
}

fn net_score(inputs: &[WeightedInput]) -> f64 {
    let total_weight: f64 = inputs.iter().map(|i| i.weight).sum();
    if total_weight == 0.0 {
        return 0.0;
    }
    inputs.iter().map(|i| i.weight * i.direction).sum::<f64>() / total_weight
}

#[async_trait]
impl AgentSpec for TradingAgent {
    fn name(&self) -> &str {
        "trading"
    }

    fn category(&self) -> Category {
        Category::Technical
    }

    fn interval_ms(&self) -> u64 {
        60_000
    }

    fn history_size(&self) -> usize {
        200
    }

    async fn analyze(&mut self, ctx: &AnalysisContext<'_>) -> AnalyzeOutcome {
        let prices = ctx.history.price_slice();
        let volumes = ctx.history.volume_slice();

        if prices.len() < MIN_SAMPLES {
            return AnalyzeOutcome::hold_insufficient_data();
        }

        let mut inputs = Vec::new();

        if let Some((rsi, _)) = ta::current_rsi(&prices, 14) {
            let direction = ((50.0 - rsi) / 50.0).clamp(-1.0, 1.0) * -1.0;
            inputs.push(WeightedInput { weight: 0.15, direction });
        }

        if let Some(macd) = ta::calculate_macd(&prices, 12, 26, 9) {
            let hist_dir = macd.histogram.signum();
            let line_dir = macd.line.signum();
            inputs.push(WeightedInput { weight: 0.15, direction: (hist_dir + line_dir) / 2.0 });
        }

        if let Some(bb) = ta::calculate_bollinger(&prices, 20, 2.0) {
            if let Some(pb) = bb.percent_b(ctx.latest_price) {
                let direction = ((pb - 0.5) * 2.0).clamp(-1.0, 1.0);
                inputs.push(WeightedInput { weight: 0.12, direction });
            }
        }

        if let Some(trend) = ta::calculate_trend(&prices, 50) {
            inputs.push(WeightedInput { weight: 0.15, direction: trend.signed_strength() });
        }

        if let Some(ichi) = ta::calculate_ichimoku(&prices) {
            inputs.push(WeightedInput {
                weight: 0.13,
                direction: if ichi.bullish { 1.0 } else { -1.0 },
            });
        }

        if let Some(stoch) = ta::calculate_stoch_rsi(&prices, 14, 14, 3, 3) {
            let direction = ((stoch.k - 50.0) / 50.0).clamp(-1.0, 1.0);
            inputs.push(WeightedInput { weight: 0.15, direction });
        }

        if let Some(momentum) = ta::calculate_roc(&prices, 10).last() {
            inputs.push(WeightedInput { weight: 0.10, direction: (momentum / 10.0).clamp(-1.0, 1.0) });
        }

        if let Some(dev) = ta::vwap_deviation_pct(&prices, &volumes) {
            inputs.push(WeightedInput { weight: 0.05, direction: (dev / 5.0).clamp(-1.0, 1.0) });
        }

        let net = net_score(&inputs);
        let signal_type = if net > 0.15 {
            SignalType::Buy
        } else if net < -0.15 {
            SignalType::Sell
        } else {
            SignalType::Hold
        };
        let confidence = (50.0 + net.abs() * 100.0).min(95.0).max(25.0);

        let mut extra = serde_json::Map::new();
        extra.insert("indicators".to_string(), json!({ "netScore": net }));

        AnalyzeOutcome {
            signal_type,
            confidence,
            reason: format!("weighted technical vote net={net:.3}"),
            extra,
            side_post: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_score_empty_is_zero() {
        assert_eq!(net_score(&[]), 0.0);
    }

    #[test]
    fn net_score_all_bullish_is_positive() {
        let inputs = vec![
            WeightedInput { weight: 0.5, direction: 1.0 },
            WeightedInput { weight: 0.5, direction: 1.0 },
        ];
        assert_eq!(net_score(&inputs), 1.0);
    }

    #[test]
    fn net_score_mixed_weights_correctly() {
        let inputs = vec![
            WeightedInput { weight: 0.3, direction: 1.0 },
            WeightedInput { weight: 0.7, direction: -1.0 },
        ];
        assert!((net_score(&inputs) - (-0.4)).abs() < 1e-9);
    }
}
