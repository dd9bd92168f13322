// =============================================================================
// Stochastic RSI
// =============================================================================
//
// StochRSI applies the stochastic oscillator formula to RSI values instead of
// price:
//   StochRSI = (RSI - min(RSI, period)) / (max(RSI, period) - min(RSI, period))
// %K is a smoothed (SMA) StochRSI; %D is a smoothed %K.
// =============================================================================

use crate::ta::rsi::calculate_rsi;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochRsiResult {
    pub k: f64,
    pub d: f64,
}

fn sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    (0..=values.len() - period)
        .map(|i| values[i..i + period].iter().sum::<f64>() / period as f64)
        .collect()
}

/// Compute Stochastic RSI %K/%D. `rsi_period` default 14, `stoch_period` 14,
/// `k_smooth` 3, `d_smooth` 3. Needs `rsi_period + stoch_period + k_smooth +
/// d_smooth` closes, consistent with the EMA-based windowing discipline used
/// by other oscillators in this library: correct only once enough samples
/// have accumulated.
pub fn calculate_stoch_rsi(
    closes: &[f64],
    rsi_period: usize,
    stoch_period: usize,
    k_smooth: usize,
    d_smooth: usize,
) -> Option<StochRsiResult> {
    if rsi_period == 0 || stoch_period == 0 || k_smooth == 0 || d_smooth == 0 {
        return None;
    }
    let rsi_series = calculate_rsi(closes, rsi_period);
    if rsi_series.len() < stoch_period {
        return None;
    }

    let raw_k: Vec<f64> = (0..=rsi_series.len() - stoch_period)
        .filter_map(|i| {
            let window = &rsi_series[i..i + stoch_period];
            let lo = window.iter().cloned().fold(f64::INFINITY, f64::min);
            let hi = window.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let span = hi - lo;
            if span == 0.0 {
                Some(50.0)
            } else {
                let last = *window.last().unwrap();
                Some(((last - lo) / span) * 100.0)
            }
        })
        .collect();

    let k_series = sma(&raw_k, k_smooth);
    if k_series.len() < d_smooth {
        return None;
    }
    let d_series = sma(&k_series, d_smooth);

    let k = *k_series.last()?;
    let d = *d_series.last()?;
    if !k.is_finite() || !d.is_finite() {
        return None;
    }
    Some(StochRsiResult { k, d })
}

/// Standard 14/14/3/3 Stochastic RSI.
pub fn calculate(closes: &[f64]) -> Option<StochRsiResult> {
    calculate_stoch_rsi(closes, 14, 14, 3, 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stoch_rsi_insufficient_data() {
        let closes = vec![100.0; 20];
        assert!(calculate(&closes).is_none());
    }

    #[test]
    fn stoch_rsi_flat_series_is_midline() {
        let closes = vec![100.0; 60];
        let r = calculate(&closes).unwrap();
        assert!((r.k - 50.0).abs() < 1e-6);
        assert!((r.d - 50.0).abs() < 1e-6);
    }

    #[test]
    fn stoch_rsi_bounded() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.5).sin() * 15.0).collect();
        let r = calculate(&closes).unwrap();
        assert!(r.k >= 0.0 && r.k <= 100.0);
        assert!(r.d >= 0.0 && r.d <= 100.0);
    }
}
