// =============================================================================
// Average True Range (ATR) — Wilder's Smoothing Method, price-only variant
// =============================================================================
//
// Agents here never see OHLC bars, only a sampled price ring, so true range
// degenerates to the absolute close-to-close move:
//   TR_t = |price_t - price_{t-1}|
//
// ATR is then the smoothed average of TR using Wilder's method:
//   ATR_0 = SMA of first `period` TR values
//   ATR_t = (ATR_{t-1} * (period - 1) + TR_t) / period
//
// Default period: 14
// =============================================================================

/// Compute the most recent ATR value from an oldest-first price series using
/// Wilder's smoothing method, with true range approximated from closes only.
///
/// Returns `None` when:
/// - `period` is zero.
/// - There are fewer than `period + 1` prices.
/// - Any intermediate value is non-finite.
pub fn calculate_atr(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let tr_values: Vec<f64> = prices.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    if tr_values.len() < period {
        return None;
    }

    let seed: f64 = tr_values[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return None;
    }

    let period_f = period as f64;
    let mut atr = seed;
    for &tr in &tr_values[period..] {
        atr = (atr * (period_f - 1.0) + tr) / period_f;
        if !atr.is_finite() {
            return None;
        }
    }

    Some(atr)
}

/// ATR expressed as a percentage of the current (last) price.
pub fn calculate_atr_pct(prices: &[f64], period: usize) -> Option<f64> {
    let atr = calculate_atr(prices, period)?;
    let last = *prices.last()?;
    if last == 0.0 {
        return None;
    }
    Some((atr / last) * 100.0)
}

/// Convenience wrapper: ATR with the standard 14-period default.
pub fn calculate(prices: &[f64]) -> Option<f64> {
    calculate_atr(prices, 14)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atr_period_zero() {
        let prices = vec![100.0; 20];
        assert!(calculate_atr(&prices, 0).is_none());
    }

    #[test]
    fn atr_insufficient_data() {
        let prices = vec![100.0; 10];
        assert!(calculate_atr(&prices, 14).is_none());
    }

    #[test]
    fn atr_exact_minimum_data() {
        let prices = vec![100.0, 101.0, 99.0, 103.0];
        let atr = calculate_atr(&prices, 3);
        assert!(atr.is_some());
        let val = atr.unwrap();
        assert!(val > 0.0);
        assert!(val.is_finite());
    }

    #[test]
    fn atr_constant_moves_converge() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64) * 2.0).collect();
        let atr = calculate_atr(&prices, 14).unwrap();
        assert!((atr - 2.0).abs() < 1e-9, "expected ATR near 2.0, got {atr}");
    }

    #[test]
    fn atr_flat_series_is_zero() {
        let prices = vec![100.0; 30];
        let atr = calculate_atr(&prices, 14).unwrap();
        assert!((atr - 0.0).abs() < 1e-12);
    }

    #[test]
    fn atr_pct() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let pct = calculate_atr_pct(&prices, 14);
        assert!(pct.is_some());
        assert!(pct.unwrap() > 0.0);
    }

    #[test]
    fn atr_convenience_function_matches() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        assert_eq!(calculate_atr(&prices, 14), calculate(&prices));
    }

    #[test]
    fn atr_nan_returns_none() {
        let prices = vec![100.0, f64::NAN, 100.0, 100.0];
        assert!(calculate_atr(&prices, 3).is_none());
    }
}
