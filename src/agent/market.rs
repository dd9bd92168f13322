// =============================================================================
// Market Agent — composite technical read, regime classification, whale-move flag
// =============================================================================

use async_trait::async_trait;
use serde_json::json;

use crate::agent::runtime::{AgentSpec, AnalysisContext, AnalyzeOutcome};
use crate::ta;
use crate::types::{Category, SignalType};

pub const MIN_SAMPLES: usize = 20;

/// Large single-tick price move, as a fraction of price, that the Market
/// agent flags as a possible whale-driven move (§4.6).
const WHALE_MOVE_THRESHOLD: f64 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Regime {
    Trending,
    Ranging,
    Volatile,
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Trending => "TRENDING",
            Self::Ranging => "RANGING",
            Self::Volatile => "VOLATILE",
        };
        write!(f, "{s}")
    }
}

fn classify_regime(trend_strength: f64, atr_pct: Option<f64>) -> Regime {
    let volatility = atr_pct.unwrap_or(0.0);
    if volatility > 5.0 {
        Regime::Volatile
    } else if trend_strength > 0.4 {
        Regime::Trending
    } else {
        Regime::Ranging
    }
}

pub struct MarketAgent;

#[async_trait]
impl AgentSpec for MarketAgent {
    fn name(&self) -> &str {
        "market"
    }

    fn category(&self) -> Category {
        Category::Market
    }

    fn interval_ms(&self) -> u64 {
        60_000
    }

    fn history_size(&self) -> usize {
        200
    }

    async fn analyze(&mut self, ctx: &AnalysisContext<'_>) -> AnalyzeOutcome {
        let prices = ctx.history.price_slice();
        if prices.len() < MIN_SAMPLES {
            return AnalyzeOutcome::hold_insufficient_data();
        }

        let rsi = ta::current_rsi(&prices, 14);
        let macd = ta::calculate_macd(&prices, 12, 26, 9);
        let bollinger = ta::calculate_bollinger(&prices, 20, 2.0);
        let trend = ta::calculate_trend(&prices, prices.len().min(50));
        let fear_greed = ta::calculate_fear_greed(&prices);
        let atr_pct = ta::atr::calculate_atr_pct(&prices, 14);

        let trend_strength = trend.map(|t| t.strength).unwrap_or(0.0);
        let regime = classify_regime(trend_strength, atr_pct);

        let whale_move = if prices.len() >= 2 {
            let prev = prices[prices.len() - 2];
            let cur = *prices.last().unwrap();
            if prev != 0.0 {
                ((cur - prev) / prev).abs() > WHALE_MOVE_THRESHOLD
            } else {
                false
            }
        } else {
            false
        };

        let mut net = 0.0;
        let mut weight_sum = 0.0;
        if let Some((rsi_val, _)) = rsi {
            net += ((50.0 - rsi_val) / 50.0) * -1.0 * 0.25;
            weight_sum += 0.25;
        }
        if let Some(m) = &macd {
            net += m.histogram.signum() * 0.25;
            weight_sum += 0.25;
        }
        if let Some(t) = &trend {
            net += t.signed_strength() * 0.30;
            weight_sum += 0.30;
        }
        if let Some(fg) = fear_greed {
            net += ((fg - 50.0) / 50.0) * 0.20;
            weight_sum += 0.20;
        }
        let net = if weight_sum > 0.0 { net / weight_sum } else { 0.0 };

        let signal_type = if net > 0.15 {
            SignalType::Buy
        } else if net < -0.15 {
            SignalType::Sell
        } else {
            SignalType::Hold
        };
        let confidence = (50.0 + net.abs() * 100.0).min(95.0).max(25.0);

        let mut extra = serde_json::Map::new();
        extra.insert(
            "market".to_string(),
            json!({
                "regime": regime.to_string(),
                "whaleMove": whale_move,
                "fearGreed": fear_greed,
                "bollingerPercentB": bollinger.and_then(|b| b.percent_b(ctx.latest_price)),
                "netScore": net,
            }),
        );

        let reason = if whale_move {
            format!("{regime} regime, large single-tick move detected")
        } else {
            format!("{regime} regime, net={net:.3}")
        };

        AnalyzeOutcome {
            signal_type,
            confidence,
            reason,
            extra,
            side_post: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regime_volatile_when_atr_high() {
        assert_eq!(classify_regime(0.1, Some(10.0)), Regime::Volatile);
    }

    #[test]
    fn regime_trending_when_strong_trend_and_low_volatility() {
        assert_eq!(classify_regime(0.6, Some(1.0)), Regime::Trending);
    }

    #[test]
    fn regime_ranging_default() {
        assert_eq!(classify_regime(0.1, Some(1.0)), Regime::Ranging);
    }
}
