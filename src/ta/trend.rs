// =============================================================================
// Trend direction & strength
// =============================================================================
//
// Fits a least-squares line over the trailing window and normalizes its
// slope by the mean price so the strength is comparable across assets of
// different scale: direction is the sign, strength is the clamped magnitude.
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendResult {
    /// -1.0 (strong down) .. +1.0 (strong up)
    pub direction: f64,
    /// 0.0 .. 1.0
    pub strength: f64,
}

impl TrendResult {
    /// Signed composite used directly in weighted-vote signal composition.
    pub fn signed_strength(&self) -> f64 {
        self.direction * self.strength
    }
}

/// Requires at least 2 points. `lookback` caps the window (uses the tail).
pub fn calculate_trend(prices: &[f64], lookback: usize) -> Option<TrendResult> {
    if prices.len() < 2 {
        return None;
    }
    let window = if prices.len() > lookback {
        &prices[prices.len() - lookback..]
    } else {
        prices
    };
    let n = window.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y: f64 = window.iter().sum::<f64>() / n;
    if mean_y == 0.0 {
        return None;
    }

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &y) in window.iter().enumerate() {
        let x = i as f64 - mean_x;
        num += x * (y - mean_y);
        den += x * x;
    }
    if den == 0.0 {
        return None;
    }
    let slope = num / den;
    let normalized = slope / mean_y; // fractional change per sample

    let direction = if normalized > 0.0 {
        1.0
    } else if normalized < 0.0 {
        -1.0
    } else {
        0.0
    };
    // Scale so a 1%-per-sample slope saturates strength near 1.0.
    let strength = (normalized.abs() * 100.0).min(1.0);

    if !strength.is_finite() {
        return None;
    }
    Some(TrendResult { direction, strength })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_insufficient_data() {
        assert!(calculate_trend(&[1.0], 30).is_none());
    }

    #[test]
    fn trend_flat_is_zero_direction() {
        let prices = vec![100.0; 30];
        let t = calculate_trend(&prices, 30).unwrap();
        assert_eq!(t.direction, 0.0);
        assert!((t.strength - 0.0).abs() < 1e-9);
    }

    #[test]
    fn trend_uptrend_is_positive() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let t = calculate_trend(&prices, 30).unwrap();
        assert_eq!(t.direction, 1.0);
        assert!(t.strength > 0.0);
    }

    #[test]
    fn trend_downtrend_is_negative() {
        let prices: Vec<f64> = (0..30).map(|i| 200.0 - i as f64).collect();
        let t = calculate_trend(&prices, 30).unwrap();
        assert_eq!(t.direction, -1.0);
    }

    #[test]
    fn trend_strength_is_bounded() {
        let prices: Vec<f64> = (0..30).map(|i| 1.0 + i as f64 * 1000.0).collect();
        let t = calculate_trend(&prices, 30).unwrap();
        assert!(t.strength <= 1.0);
    }
}
