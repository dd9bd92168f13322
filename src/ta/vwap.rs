// =============================================================================
// Volume Weighted Average Price (VWAP)
// =============================================================================

/// Rolling VWAP over the full supplied window: sum(price*volume) / sum(volume).
///
/// Returns `None` when the slices differ in length, are empty, or total
/// volume is zero.
pub fn calculate_vwap(prices: &[f64], volumes: &[f64]) -> Option<f64> {
    if prices.is_empty() || prices.len() != volumes.len() {
        return None;
    }
    let total_volume: f64 = volumes.iter().sum();
    if total_volume <= 0.0 {
        return None;
    }
    let weighted: f64 = prices.iter().zip(volumes.iter()).map(|(p, v)| p * v).sum();
    let vwap = weighted / total_volume;
    vwap.is_finite().then_some(vwap)
}

/// Percentage deviation of the current price from VWAP: positive => trading
/// above VWAP.
pub fn vwap_deviation_pct(prices: &[f64], volumes: &[f64]) -> Option<f64> {
    let vwap = calculate_vwap(prices, volumes)?;
    let last = *prices.last()?;
    if vwap == 0.0 {
        return None;
    }
    let dev = ((last - vwap) / vwap) * 100.0;
    dev.is_finite().then_some(dev)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vwap_empty_is_none() {
        assert!(calculate_vwap(&[], &[]).is_none());
    }

    #[test]
    fn vwap_mismatched_lengths_is_none() {
        assert!(calculate_vwap(&[1.0, 2.0], &[1.0]).is_none());
    }

    #[test]
    fn vwap_zero_volume_is_none() {
        assert!(calculate_vwap(&[1.0, 2.0], &[0.0, 0.0]).is_none());
    }

    #[test]
    fn vwap_uniform_volume_equals_average_price() {
        let prices = vec![10.0, 20.0, 30.0];
        let volumes = vec![1.0, 1.0, 1.0];
        let vwap = calculate_vwap(&prices, &volumes).unwrap();
        assert!((vwap - 20.0).abs() < 1e-9);
    }

    #[test]
    fn vwap_deviation_positive_when_above() {
        let prices = vec![10.0, 10.0, 20.0];
        let volumes = vec![1.0, 1.0, 1.0];
        let dev = vwap_deviation_pct(&prices, &volumes).unwrap();
        assert!(dev > 0.0);
    }
}
