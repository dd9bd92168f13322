// =============================================================================
// Prediction Agent — multi-horizon ensemble forecaster
// =============================================================================

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::agent::runtime::{AgentSpec, AnalysisContext, AnalyzeOutcome};
use crate::chain::ChainClient;
use crate::price::PriceService;
use crate::types::{Direction, PendingPrediction, SignalType};
use crate::types::Category;

const HORIZONS_MINUTES: [u32; 4] = [5, 15, 60, 240];

struct SubModelResult {
    direction: f64, // -1..1
    magnitude: f64,
    confidence: f64,
}

fn linear_regression_model(prices: &[f64]) -> Option<SubModelResult> {
    let window = if prices.len() > 30 { &prices[prices.len() - 30..] } else { prices };
    if window.len() < 3 {
        return None;
    }
    let t = crate::ta::calculate_trend(window, window.len())?;
    Some(SubModelResult {
        direction: t.direction,
        magnitude: t.strength,
        confidence: (t.strength * 100.0).min(90.0),
    })
}

fn ma_crossover_model(prices: &[f64]) -> Option<SubModelResult> {
    if prices.len() < 20 {
        return None;
    }
    let fast: f64 = prices[prices.len() - 5..].iter().sum::<f64>() / 5.0;
    let slow: f64 = prices[prices.len() - 20..].iter().sum::<f64>() / 20.0;
    if slow == 0.0 {
        return None;
    }
    let diff = (fast - slow) / slow;
    Some(SubModelResult {
        direction: diff.signum(),
        magnitude: diff.abs().min(1.0),
        confidence: (diff.abs() * 500.0).min(85.0),
    })
}

fn mean_reversion_model(prices: &[f64]) -> Option<SubModelResult> {
    if prices.len() < 20 {
        return None;
    }
    let sma20: f64 = prices[prices.len() - 20..].iter().sum::<f64>() / 20.0;
    let current = *prices.last()?;
    if sma20 == 0.0 {
        return None;
    }
    let deviation = (current - sma20) / sma20;
    // Mean reversion predicts a move back toward the mean.
    Some(SubModelResult {
        direction: -deviation.signum(),
        magnitude: deviation.abs().min(1.0),
        confidence: (deviation.abs() * 300.0).min(80.0),
    })
}

fn momentum_cascade_model(prices: &[f64]) -> Option<SubModelResult> {
    if prices.len() < 10 {
        return None;
    }
    let roc = crate::ta::calculate_roc(prices, 10);
    let last = *roc.last()?;
    Some(SubModelResult {
        direction: last.signum(),
        magnitude: (last.abs() / 10.0).min(1.0),
        confidence: (last.abs() * 5.0).min(75.0),
    })
}

fn ensemble(prices: &[f64]) -> Option<(Direction, f64)> {
    let models: Vec<SubModelResult> = [
        linear_regression_model(prices),
        ma_crossover_model(prices),
        mean_reversion_model(prices),
        momentum_cascade_model(prices),
    ]
    .into_iter()
    .flatten()
    .collect();

    if models.is_empty() {
        return None;
    }

    let total_confidence: f64 = models.iter().map(|m| m.confidence).sum();
    if total_confidence == 0.0 {
        return None;
    }
    let mean_direction: f64 = models
        .iter()
        .map(|m| m.direction * m.magnitude * m.confidence)
        .sum::<f64>()
        / total_confidence;
    let mean_confidence = total_confidence / models.len() as f64;

    let label = if mean_direction > 0.15 {
        Direction::Up
    } else if mean_direction < -0.15 {
        Direction::Down
    } else {
        Direction::Sideways
    };
    Some((label, mean_confidence))
}

pub struct PredictionAgent {
    pending: Vec<PendingPrediction>,
    total_created: u64,
    total_verified: u64,
    total_correct: u64,
}

impl Default for PredictionAgent {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            total_created: 0,
            total_verified: 0,
            total_correct: 0,
        }
    }
}

#[async_trait]
impl AgentSpec for PredictionAgent {
    fn name(&self) -> &str {
        "prediction"
    }

    fn category(&self) -> Category {
        Category::Prediction
    }

    fn interval_ms(&self) -> u64 {
        120_000
    }

    fn history_size(&self) -> usize {
        100
    }

    async fn before_tick(&mut self, chain: &ChainClient, price_service: &PriceService, token_address: &str) {
        // §4.5 step 2e: verify pending predictions whose target time has
        // passed, exactly once, before fetching the next price (property #7).
        let now = Utc::now().timestamp_millis();
        let any_due = self.pending.iter().any(|p| now >= p.target_time_ms);
        let realized_price = if any_due {
            price_service
                .fetch_price(token_address, Some(chain))
                .await
                .ok()
                .flatten()
                .map(|s| s.price)
        } else {
            None
        };

        let mut still_pending = Vec::with_capacity(self.pending.len());
        for mut p in std::mem::take(&mut self.pending) {
            if now >= p.target_time_ms {
                // Fall back to the reference price only when a fresh sample
                // genuinely couldn't be fetched this tick.
                let actual = realized_price.unwrap_or(p.reference_price);
                let correct = p.verify(actual);
                self.total_verified += 1;
                if correct {
                    self.total_correct += 1;
                }
                if !chain.is_read_only() {
                    let index = self.total_verified - 1;
                    if let Err(e) = chain.verify_prediction(index, actual).await {
                        tracing::warn!(error = %e, "on-chain prediction verification failed");
                    }
                }
                info!(correct, "prediction verified");
            } else {
                still_pending.push(p);
            }
        }
        self.pending = still_pending;
    }

    async fn analyze(&mut self, ctx: &AnalysisContext<'_>) -> AnalyzeOutcome {
        let prices = ctx.history.price_slice();
        if prices.len() < 20 {
            return AnalyzeOutcome::hold_insufficient_data();
        }

        let Some((direction, confidence)) = ensemble(&prices) else {
            return AnalyzeOutcome::hold_insufficient_data();
        };

        let now = Utc::now().timestamp_millis();
        for minutes in HORIZONS_MINUTES {
            let target_time_ms = now + (minutes as i64) * 60_000;
            if !ctx.chain.is_read_only() {
                let target_unix_sec = target_time_ms / 1000;
                if let Err(e) = ctx
                    .chain
                    .post_prediction(&direction.to_string(), confidence.clamp(0.0, 100.0) as u8, ctx.latest_price, target_unix_sec)
                    .await
                {
                    tracing::warn!(error = %e, "on-chain prediction post failed");
                }
            }
            self.pending.push(PendingPrediction {
                direction,
                confidence,
                reference_price: ctx.latest_price,
                target_time_ms,
                horizon_minutes: minutes,
                verified: false,
                correct: false,
            });
            self.total_created += 1;
        }

        let signal_type = match direction {
            Direction::Up => SignalType::Buy,
            Direction::Down => SignalType::Sell,
            Direction::Sideways => SignalType::Hold,
        };

        let mut extra = serde_json::Map::new();
        extra.insert(
            "prediction".to_string(),
            json!({
                "direction": direction.to_string(),
                "pendingCount": self.pending.len(),
                "totalCreated": self.total_created,
                "totalVerified": self.total_verified,
                "totalCorrect": self.total_correct,
            }),
        );

        AnalyzeOutcome {
            signal_type,
            confidence,
            reason: format!("ensemble forecast: {direction}"),
            extra,
            side_post: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensemble_uptrend_predicts_up() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let (dir, conf) = ensemble(&prices).unwrap();
        assert_eq!(dir, Direction::Up);
        assert!(conf > 0.0);
    }

    #[test]
    fn ensemble_flat_predicts_sideways() {
        let prices = vec![100.0; 40];
        let (dir, _) = ensemble(&prices).unwrap();
        assert_eq!(dir, Direction::Sideways);
    }

    #[test]
    fn ensemble_insufficient_data_is_none() {
        let prices = vec![100.0; 5];
        assert!(ensemble(&prices).is_none());
    }
}
