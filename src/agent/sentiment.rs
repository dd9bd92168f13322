// =============================================================================
// Sentiment Agent — buy/sell pressure, volume acceleration, activity growth
// =============================================================================

use async_trait::async_trait;
use serde_json::json;

use crate::agent::runtime::{AgentSpec, AnalysisContext, AnalyzeOutcome};
use crate::types::{Category, SignalType};

pub const MIN_SAMPLES: usize = 10;

fn label(score: f64) -> &'static str {
    if score >= 80.0 {
        "EXTREME BULLISH"
    } else if score >= 60.0 {
        "BULLISH"
    } else if score >= 40.0 {
        "NEUTRAL"
    } else if score >= 20.0 {
        "BEARISH"
    } else {
        "EXTREME BEARISH"
    }
}

fn ratio_score(buys: u64, sells: u64) -> f64 {
    let total = buys + sells;
    if total == 0 {
        return 50.0
    }
    (buys as f64 / total as f64) * 100.0
}

pub struct SentimentAgent;

#[async_trait]
impl AgentSpec for SentimentAgent {
    fn name(&self) -> &str {
        "sentiment"
    }

    fn category(&self) -> Category {
        Category::Sentiment
    }

    fn interval_ms(&self) -> u64 {
        60_000
    }

    fn history_size(&self) -> usize {
        50
    }

    async fn analyze(&mut self, ctx: &AnalysisContext<'_>) -> AnalyzeOutcome {
        let volumes = ctx.history.volume_slice();
        if volumes.len() < MIN_SAMPLES {
            return AnalyzeOutcome::hold_insufficient_data();
        }

        // Proxy buy/sell ratios from the sample's own aggregated 24h/1h tx
        // counts, since the ring only carries price+volume per tick.
        let sample = ctx
            .price_service
            .fetch_price(ctx.token_address, Some(ctx.chain))
            .await
            .ok()
            .flatten();

        let (ratio_24h, ratio_1h) = match &sample {
            Some(s) => (
                ratio_score(s.buys_24h, s.sells_24h),
                ratio_score(s.buys_1h, s.sells_1h),
            ),
            None => (50.0, 50.0),
        };

        let recent_6h_len = volumes.len().min(36).max(1);
        let recent_1h_len = volumes.len().min(6).max(1);
        let vol_6h: f64 = volumes[volumes.len() - recent_6h_len..].iter().sum();
        let vol_1h: f64 = volumes[volumes.len() - recent_1h_len..].iter().sum();
        let vol_accel = if vol_6h > 0.0 {
            ((vol_1h / recent_1h_len as f64) / (vol_6h / recent_6h_len as f64) - 1.0) * 100.0
        } else {
            0.0
        };

        let prices = ctx.history.price_slice();
        let roc_period = 10.min(prices.len().saturating_sub(1).max(1));
        let momentum = crate::ta::calculate_roc(&prices, roc_period).last().copied().unwrap_or(0.0);

        let activity_growth = if volumes.len() >= 2 {
            let prev = volumes[volumes.len() - 2];
            let cur = *volumes.last().unwrap();
            if prev > 0.0 { ((cur - prev) / prev) * 100.0 } else { 0.0 }
        } else {
            0.0
        };

        let score = (ratio_24h * 0.35
            + ratio_1h * 0.25
            + (50.0 + vol_accel.clamp(-50.0, 50.0)) * 0.2
            + (50.0 + momentum.clamp(-50.0, 50.0)) * 0.1
            + (50.0 + activity_growth.clamp(-50.0, 50.0)) * 0.1)
            .clamp(0.0, 100.0);

        let signal_type = if score >= 60.0 {
            SignalType::Buy
        } else if score <= 40.0 {
            SignalType::Sell
        } else {
            SignalType::Hold
        };
        let confidence = (score - 50.0).abs() * 2.0 + 30.0;

        let mut extra = serde_json::Map::new();
        extra.insert(
            "sentiment".to_string(),
            json!({
                "score": score,
                "label": label(score),
                "buySellRatio24h": ratio_24h,
                "buySellRatio1h": ratio_1h,
                "volumeAcceleration": vol_accel,
                "activityGrowth": activity_growth,
            }),
        );

        AnalyzeOutcome {
            signal_type,
            confidence: confidence.min(95.0),
            reason: format!("sentiment {} (score {score:.1})", label(score)),
            extra,
            side_post: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_score_all_buys_is_100() {
        assert_eq!(ratio_score(10, 0), 100.0);
    }

    #[test]
    fn ratio_score_no_activity_is_neutral() {
        assert_eq!(ratio_score(0, 0), 50.0);
    }

    #[test]
    fn label_thresholds() {
        assert_eq!(label(90.0), "EXTREME BULLISH");
        assert_eq!(label(50.0), "NEUTRAL");
        assert_eq!(label(5.0), "EXTREME BEARISH");
    }
}
