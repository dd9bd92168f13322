// =============================================================================
// Fear / Greed composite index
// =============================================================================
//
// Composes RSI, realized volatility, momentum (ROC), trend, and Bollinger
// %B via fixed weights into a single 0..100 score (0 = extreme fear, 100 =
// extreme greed).
// =============================================================================

use crate::ta::bollinger::calculate_bollinger;
use crate::ta::rsi::calculate_rsi;
use crate::ta::trend::calculate_trend;

const W_RSI: f64 = 0.30;
const W_VOL: f64 = 0.20;
const W_MOMENTUM: f64 = 0.20;
const W_TREND: f64 = 0.15;
const W_BB: f64 = 0.15;

fn realized_volatility(prices: &[f64]) -> Option<f64> {
    if prices.len() < 2 {
        return None;
    }
    let returns: Vec<f64> = prices
        .windows(2)
        .filter_map(|w| if w[0] != 0.0 { Some((w[1] - w[0]) / w[0]) } else { None })
        .collect();
    if returns.is_empty() {
        return None;
    }
    let mean: f64 = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance: f64 =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    Some(variance.sqrt())
}

/// Requires at least 20 samples (the Bollinger default period). Returns a
/// value clamped to [0, 100].
pub fn calculate_fear_greed(prices: &[f64]) -> Option<f64> {
    if prices.len() < 20 {
        return None;
    }

    let rsi = calculate_rsi(prices, 14).last().copied().unwrap_or(50.0);
    let rsi_component = rsi; // already 0..100, greed-aligned

    let vol = realized_volatility(prices).unwrap_or(0.0);
    // High volatility reads as fear: invert and clamp to 0..100.
    let vol_component = (100.0 - (vol * 1000.0).min(100.0)).max(0.0);

    let momentum = prices
        .len()
        .checked_sub(15)
        .and_then(|start| {
            let prev = prices[start];
            if prev == 0.0 {
                None
            } else {
                Some(((prices.last().unwrap() - prev) / prev) * 100.0)
            }
        })
        .unwrap_or(0.0);
    let momentum_component = (50.0 + momentum.clamp(-50.0, 50.0)).clamp(0.0, 100.0);

    let trend_component = calculate_trend(prices, 30)
        .map(|t| (50.0 + t.signed_strength() * 50.0).clamp(0.0, 100.0))
        .unwrap_or(50.0);

    let bb_component = calculate_bollinger(prices, 20, 2.0)
        .and_then(|bb| bb.percent_b(*prices.last().unwrap()))
        .map(|pb| (pb * 100.0).clamp(0.0, 100.0))
        .unwrap_or(50.0);

    let score = rsi_component * W_RSI
        + vol_component * W_VOL
        + momentum_component * W_MOMENTUM
        + trend_component * W_TREND
        + bb_component * W_BB;

    Some(score.clamp(0.0, 100.0))
}

/// Human-readable label for a fear/greed score.
pub fn label(score: f64) -> &'static str {
    if score >= 75.0 {
        "EXTREME GREED"
    } else if score >= 55.0 {
        "GREED"
    } else if score >= 45.0 {
        "NEUTRAL"
    } else if score >= 25.0 {
        "FEAR"
    } else {
        "EXTREME FEAR"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fear_greed_insufficient_data() {
        let prices = vec![100.0; 10];
        assert!(calculate_fear_greed(&prices).is_none());
    }

    #[test]
    fn fear_greed_clamped_to_range() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 5.0).collect();
        let score = calculate_fear_greed(&prices).unwrap();
        assert!((0.0..=100.0).contains(&score));
    }

    #[test]
    fn fear_greed_flat_is_near_neutral() {
        let prices = vec![100.0; 60];
        let score = calculate_fear_greed(&prices).unwrap();
        assert!((30.0..=70.0).contains(&score), "got {score}");
    }

    #[test]
    fn label_boundaries() {
        assert_eq!(label(90.0), "EXTREME GREED");
        assert_eq!(label(60.0), "GREED");
        assert_eq!(label(50.0), "NEUTRAL");
        assert_eq!(label(30.0), "FEAR");
        assert_eq!(label(5.0), "EXTREME FEAR");
    }
}
