// =============================================================================
// Liquidity Agent — bonding-curve progress, rug-risk, graduation alerts
// =============================================================================

use async_trait::async_trait;
use serde_json::json;

use crate::agent::runtime::{AgentSpec, AnalysisContext, AnalyzeOutcome, SidePost};
use crate::types::{Category, SignalType};

pub const MIN_SAMPLES: usize = 10;

/// Bonding progress at or above this fraction triggers a graduation-imminent
/// alert (§4.6).
const GRADUATION_THRESHOLD: f64 = 0.85;

fn rug_risk_score(
    liquidity_usd: f64,
    volume_24h: f64,
    price_volatility_pct: f64,
    graduated: bool,
    sell_buy_ratio: f64,
) -> f64 {
    // Weighted heuristic: thin liquidity, low turnover, high volatility,
    // a non-graduated bonding curve, and heavy sell pressure each push the
    // score up. Score is 0 (safe) .. 100 (high risk).
    let liquidity_risk = if liquidity_usd <= 0.0 {
        100.0
    } else {
        (50_000.0 / liquidity_usd).min(1.0) * 100.0
    };
    let turnover_risk = if liquidity_usd <= 0.0 {
        100.0
    } else {
        let turnover = volume_24h / liquidity_usd;
        (1.0 - turnover.min(1.0)) * 100.0
    };
    let volatility_risk = price_volatility_pct.min(100.0);
    let graduation_risk = if graduated { 0.0 } else { 100.0 };
    let sell_pressure_risk = ((sell_buy_ratio - 1.0).max(0.0) / 2.0 * 100.0).min(100.0);

    (liquidity_risk * 0.3
        + turnover_risk * 0.2
        + volatility_risk * 0.2
        + graduation_risk * 0.15
        + sell_pressure_risk * 0.15)
        .clamp(0.0, 100.0)
}

pub struct LiquidityAgent;

#[async_trait]
impl AgentSpec for LiquidityAgent {
    fn name(&self) -> &str {
        "liquidity"
    }

    fn category(&self) -> Category {
        Category::Liquidity
    }

    fn interval_ms(&self) -> u64 {
        45_000
    }

    fn history_size(&self) -> usize {
        100
    }

    async fn analyze(&mut self, ctx: &AnalysisContext<'_>) -> AnalyzeOutcome {
        let prices = ctx.history.price_slice();
        if prices.len() < MIN_SAMPLES {
            return AnalyzeOutcome::hold_insufficient_data();
        }

        let (progress, graduated) = ctx.price_service.bonding_progress(ctx.token_address, ctx.chain).await;

        let sample = ctx.price_service.fetch_price(ctx.token_address, Some(ctx.chain)).await.ok().flatten();
        let liquidity_usd = sample.as_ref().map(|s| s.liquidity_usd).unwrap_or(0.0);
        let sell_buy_ratio = sample
            .as_ref()
            .map(|s| s.sells_24h as f64 / s.buys_24h.max(1) as f64)
            .unwrap_or(1.0);

        let atr_pct = crate::ta::atr::calculate_atr_pct(&prices, prices.len().min(14)).unwrap_or(0.0);
        let risk = rug_risk_score(liquidity_usd, ctx.latest_volume, atr_pct, graduated, sell_buy_ratio);

        let graduation_imminent = !graduated && progress >= GRADUATION_THRESHOLD;

        let signal_type = if risk < 30.0 {
            SignalType::Buy
        } else if risk > 70.0 {
            SignalType::Sell
        } else {
            SignalType::Hold
        };
        let confidence = (100.0 - risk).clamp(25.0, 90.0);

        let mut extra = serde_json::Map::new();
        extra.insert(
            "liquidity".to_string(),
            json!({
                "bondingProgress": progress,
                "graduated": graduated,
                "graduationImminent": graduation_imminent,
                "rugRisk": risk,
                "liquidityUsd": liquidity_usd,
                "sellBuyRatio": sell_buy_ratio,
            }),
        );

        let reason = if graduation_imminent {
            format!("bonding curve at {:.1}% — graduation imminent", progress * 100.0)
        } else {
            format!("rug-risk score {risk:.1}")
        };

        let side_post = if graduation_imminent {
            Some(SidePost::TokenLaunch(json!({
                "token": ctx.token_address,
                "bondingProgress": progress,
            })))
        } else {
            None
        };

        AnalyzeOutcome {
            signal_type,
            confidence,
            reason,
            extra,
            side_post,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rug_risk_high_when_no_liquidity() {
        let score = rug_risk_score(0.0, 100.0, 0.0, false, 1.0);
        assert_eq!(score, 100.0 * 0.3 + 100.0 * 0.2 + 0.0 + 100.0 * 0.15 + 0.0);
    }

    #[test]
    fn rug_risk_low_when_deep_liquidity_and_turnover() {
        let score = rug_risk_score(1_000_000.0, 1_000_000.0, 1.0, true, 1.0);
        assert!(score < 20.0);
    }

    #[test]
    fn rug_risk_rises_with_non_graduation_and_sell_pressure() {
        let baseline = rug_risk_score(1_000_000.0, 1_000_000.0, 1.0, true, 1.0);
        let ungraduated = rug_risk_score(1_000_000.0, 1_000_000.0, 1.0, false, 1.0);
        let heavy_sells = rug_risk_score(1_000_000.0, 1_000_000.0, 1.0, true, 3.0);
        assert!(ungraduated > baseline);
        assert!(heavy_sells > baseline);
    }
}
