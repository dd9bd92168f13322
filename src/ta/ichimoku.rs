// =============================================================================
// Ichimoku Kinko Hyo (simplified, price-only)
// =============================================================================
//
// Classic Ichimoku uses separate high/low series; this library only has a
// sampled close-price ring, so each span is computed from the rolling
// high/low of the close series itself — a standard simplification for
// tick-sampled (rather than bar) data.
//
//   Tenkan-sen (conversion, 9)  = (max9 + min9) / 2
//   Kijun-sen  (base, 26)       = (max26 + min26) / 2
//   Senkou Span A               = (Tenkan + Kijun) / 2
//   Senkou Span B (52)          = (max52 + min52) / 2
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IchimokuResult {
    pub tenkan: f64,
    pub kijun: f64,
    pub senkou_a: f64,
    pub senkou_b: f64,
    /// true = bullish cloud signal (price above cloud, Tenkan > Kijun)
    pub bullish: bool,
}

fn midrange(prices: &[f64], period: usize) -> Option<f64> {
    if prices.len() < period {
        return None;
    }
    let window = &prices[prices.len() - period..];
    let lo = window.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = window.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    Some((hi + lo) / 2.0)
}

/// Requires at least 52 samples (the Senkou Span B look-back).
pub fn calculate_ichimoku(prices: &[f64]) -> Option<IchimokuResult> {
    if prices.len() < 52 {
        return None;
    }
    let tenkan = midrange(prices, 9)?;
    let kijun = midrange(prices, 26)?;
    let senkou_b = midrange(prices, 52)?;
    let senkou_a = (tenkan + kijun) / 2.0;
    let price = *prices.last()?;
    let cloud_top = senkou_a.max(senkou_b);
    let bullish = price > cloud_top && tenkan > kijun;

    if ![tenkan, kijun, senkou_a, senkou_b].iter().all(|v| v.is_finite()) {
        return None;
    }
    Some(IchimokuResult {
        tenkan,
        kijun,
        senkou_a,
        senkou_b,
        bullish,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ichimoku_insufficient_data() {
        let prices = vec![100.0; 30];
        assert!(calculate_ichimoku(&prices).is_none());
    }

    #[test]
    fn ichimoku_uptrend_is_bullish() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let r = calculate_ichimoku(&prices).unwrap();
        assert!(r.bullish);
        assert!(r.tenkan > r.kijun);
    }

    #[test]
    fn ichimoku_downtrend_is_not_bullish() {
        let prices: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let r = calculate_ichimoku(&prices).unwrap();
        assert!(!r.bullish);
    }

    #[test]
    fn ichimoku_flat_series() {
        let prices = vec![100.0; 60];
        let r = calculate_ichimoku(&prices).unwrap();
        assert!((r.tenkan - 100.0).abs() < 1e-9);
        assert!((r.kijun - 100.0).abs() < 1e-9);
        assert!(!r.bullish); // price not strictly above cloud
    }
}
