// =============================================================================
// Support / resistance, Fibonacci retracement, volume profile, OBV
// =============================================================================

const MAX_BINS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportResistance {
    pub support: f64,
    pub resistance: f64,
}

/// Volume-weighted support/resistance over the trailing `lookback` samples.
///
/// Bins the window into up to [`MAX_BINS`] price buckets weighted by volume;
/// support is the highest-volume bin below the current price, resistance the
/// highest-volume bin above it. Falls back to the 10th/90th price percentile
/// when volumes are uniform (no discriminating signal).
pub fn support_resistance(prices: &[f64], volumes: &[f64], lookback: usize) -> Option<SupportResistance> {
    if prices.len() != volumes.len() || prices.len() < 5 {
        return None;
    }
    let n = prices.len();
    let start = n.saturating_sub(lookback);
    let p = &prices[start..];
    let v = &volumes[start..];
    let current = *p.last()?;

    let lo = p.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = p.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = hi - lo;

    let uniform_volume = {
        let first = v.first().copied().unwrap_or(0.0);
        v.iter().all(|&x| (x - first).abs() < f64::EPSILON)
    };

    if span <= 0.0 || uniform_volume {
        return percentile_fallback(p, current);
    }

    let bin_count = MAX_BINS.min(p.len());
    let bin_width = span / bin_count as f64;
    let mut bins = vec![0.0_f64; bin_count];
    for (&price, &vol) in p.iter().zip(v.iter()) {
        let mut idx = (((price - lo) / bin_width) as usize).min(bin_count - 1);
        if idx >= bin_count {
            idx = bin_count - 1;
        }
        bins[idx] += vol;
    }

    let midpoint = |i: usize| lo + bin_width * (i as f64 + 0.5);

    let support = (0..bin_count)
        .filter(|&i| midpoint(i) < current)
        .max_by(|&a, &b| bins[a].partial_cmp(&bins[b]).unwrap())
        .map(midpoint);
    let resistance = (0..bin_count)
        .filter(|&i| midpoint(i) > current)
        .max_by(|&a, &b| bins[a].partial_cmp(&bins[b]).unwrap())
        .map(midpoint);

    match (support, resistance) {
        (Some(s), Some(r)) => Some(SupportResistance { support: s, resistance: r }),
        _ => percentile_fallback(p, current),
    }
}

fn percentile_fallback(prices: &[f64], _current: f64) -> Option<SupportResistance> {
    let mut sorted: Vec<f64> = prices.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let idx = |pct: f64| -> f64 {
        let pos = ((sorted.len() - 1) as f64 * pct).round() as usize;
        sorted[pos.min(sorted.len() - 1)]
    };
    Some(SupportResistance {
        support: idx(0.10),
        resistance: idx(0.90),
    })
}

/// Fibonacci retracement levels between the lookback window's high and low.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FibLevels {
    pub level_236: f64,
    pub level_382: f64,
    pub level_500: f64,
    pub level_618: f64,
    pub level_786: f64,
}

pub fn fibonacci_levels(prices: &[f64], lookback: usize) -> Option<FibLevels> {
    if prices.is_empty() {
        return None;
    }
    let start = prices.len().saturating_sub(lookback);
    let window = &prices[start..];
    let lo = window.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = window.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = hi - lo;
    if !span.is_finite() {
        return None;
    }
    Some(FibLevels {
        level_236: hi - span * 0.236,
        level_382: hi - span * 0.382,
        level_500: hi - span * 0.5,
        level_618: hi - span * 0.618,
        level_786: hi - span * 0.786,
    })
}

/// On-Balance Volume: running sum, +volume on up closes, -volume on down
/// closes, unchanged on flat closes.
pub fn on_balance_volume(prices: &[f64], volumes: &[f64]) -> Option<f64> {
    if prices.len() != volumes.len() || prices.len() < 2 {
        return None;
    }
    let mut obv = 0.0;
    for i in 1..prices.len() {
        if prices[i] > prices[i - 1] {
            obv += volumes[i];
        } else if prices[i] < prices[i - 1] {
            obv -= volumes[i];
        }
    }
    Some(obv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn support_resistance_insufficient_data() {
        assert!(support_resistance(&[1.0, 2.0], &[1.0, 1.0], 20).is_none());
    }

    #[test]
    fn support_resistance_uniform_volume_falls_back_to_percentile() {
        let prices: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let volumes = vec![10.0; 20];
        let sr = support_resistance(&prices, &volumes, 20).unwrap();
        assert!(sr.support < sr.resistance);
    }

    #[test]
    fn support_resistance_respects_current_price_ordering() {
        let prices: Vec<f64> = (1..=40).map(|x| x as f64).collect();
        let mut volumes = vec![1.0; 40];
        volumes[5] = 500.0; // strong support candidate below price
        volumes[35] = 500.0; // strong resistance candidate above price
        let sr = support_resistance(&prices, &volumes, 40).unwrap();
        assert!(sr.support < prices[prices.len() - 1]);
        assert!(sr.resistance > prices[prices.len() - 1]);
    }

    #[test]
    fn fibonacci_levels_ordering() {
        let prices: Vec<f64> = (1..=50).map(|x| x as f64).collect();
        let fib = fibonacci_levels(&prices, 50).unwrap();
        assert!(fib.level_236 > fib.level_382);
        assert!(fib.level_382 > fib.level_500);
        assert!(fib.level_500 > fib.level_618);
        assert!(fib.level_618 > fib.level_786);
    }

    #[test]
    fn obv_accumulates_on_up_moves() {
        let prices = vec![10.0, 11.0, 10.5, 12.0];
        let volumes = vec![100.0, 100.0, 100.0, 100.0];
        let obv = on_balance_volume(&prices, &volumes).unwrap();
        // +100 (up) -100 (down) +100 (up) = 100
        assert!((obv - 100.0).abs() < 1e-9);
    }
}
