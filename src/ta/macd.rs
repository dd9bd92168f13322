// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
// MACD line  = EMA(fast) - EMA(slow)               (default 12/26)
// Signal line = EMA(signal) of the MACD-line series (default 9)
// Histogram   = MACD line - signal line
//
// The signal line is a genuine EMA of the trailing MACD-line series, never a
// scalar multiple of the MACD line.
// =============================================================================

use crate::ta::ema::calculate_ema;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdResult {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Compute the full MACD-line series for `closes` (oldest first).
pub fn macd_line_series(closes: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    if fast == 0 || slow == 0 || fast >= slow || closes.len() < slow {
        return Vec::new();
    }
    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);
    if ema_fast.is_empty() || ema_slow.is_empty() {
        return Vec::new();
    }
    // ema_fast is longer (starts earlier) than ema_slow by (slow - fast)
    // entries; align on the tail so both series cover the same closes.
    let offset = ema_fast.len() - ema_slow.len();
    ema_fast[offset..]
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| f - s)
        .collect()
}

/// Compute MACD line, signal, and histogram at the most recent point.
///
/// Returns `None` when there are fewer than `slow + signal` closes — the
/// signal line needs `signal` MACD-line points to seed its own EMA.
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Option<MacdResult> {
    if signal == 0 || closes.len() < slow + signal {
        return None;
    }
    let line_series = macd_line_series(closes, fast, slow);
    if line_series.len() < signal {
        return None;
    }
    let signal_series = calculate_ema(&line_series, signal);
    let line = *line_series.last()?;
    let sig = *signal_series.last()?;
    let histogram = line - sig;
    if !line.is_finite() || !sig.is_finite() || !histogram.is_finite() {
        return None;
    }
    Some(MacdResult {
        line,
        signal: sig,
        histogram,
    })
}

/// Standard 12/26/9 MACD.
pub fn calculate(closes: &[f64]) -> Option<MacdResult> {
    calculate_macd(closes, 12, 26, 9)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macd_insufficient_data_is_none() {
        let closes = vec![100.0; 20];
        assert!(calculate(&closes).is_none());
    }

    #[test]
    fn macd_flat_series_is_all_zero() {
        // Property #10: constant price series => line, signal, histogram all 0.
        let closes = vec![50.0; 60];
        let macd = calculate(&closes).unwrap();
        assert!(macd.line.abs() < 1e-9, "line={}", macd.line);
        assert!(macd.signal.abs() < 1e-9, "signal={}", macd.signal);
        assert!(macd.histogram.abs() < 1e-9, "hist={}", macd.histogram);
    }

    #[test]
    fn macd_signal_is_not_a_scalar_multiple_of_line() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.3).sin() * 10.0).collect();
        let macd = calculate(&closes).unwrap();
        // If signal were simply line * 0.9 this ratio would be exactly 0.9;
        // a genuine 9-EMA of the MACD-line series will not land there.
        if macd.line.abs() > 1e-6 {
            let ratio = macd.signal / macd.line;
            assert!((ratio - 0.9).abs() > 1e-4, "ratio suspiciously == 0.9: {ratio}");
        }
    }

    #[test]
    fn macd_uptrend_has_positive_line() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        let macd = calculate(&closes).unwrap();
        assert!(macd.line > 0.0);
    }
}
