// =============================================================================
// Risk Levels — ATR-based stop/targets and half-Kelly position sizing
// =============================================================================

use serde::Serialize;

use crate::ta;

/// Half-Kelly clamp bounds, expressed as a fraction of bankroll (§9 Open
/// Question: this is a heuristic Kelly, not the textbook formula).
const KELLY_MIN: f64 = 0.0;
const KELLY_MAX: f64 = 0.125;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RiskLevels {
    pub stop_loss: f64,
    pub target_2r: f64,
    pub target_3r: f64,
    pub position_size_fraction: f64,
}

/// Heuristic win-rate used for the Kelly-derived sizing: higher when the
/// consensus label agrees with the direction being sized, lower otherwise.
fn heuristic_win_rate(consensus_agrees: bool) -> f64 {
    if consensus_agrees {
        0.55
    } else {
        0.50
    }
}

fn half_kelly(win_rate: f64, reward_risk_ratio: f64) -> f64 {
    if reward_risk_ratio <= 0.0 {
        return KELLY_MIN;
    }
    let kelly = win_rate - (1.0 - win_rate) / reward_risk_ratio;
    (kelly / 2.0).clamp(KELLY_MIN, KELLY_MAX)
}

/// Compute stop/target levels and a position-size fraction from the price
/// history and nearest support/resistance levels. `current_price` anchors
/// the ATR stop; `support` and `resistance` come from the volume-weighted
/// support/resistance read. The reward side of the Kelly ratio is measured
/// against `resistance` (the nearest real ceiling) rather than against the
/// fixed 2R target, so sizing actually reacts to market structure instead
/// of always seeing a reward/risk ratio of exactly 2.
pub fn compute_risk_levels(
    prices: &[f64],
    current_price: f64,
    support: f64,
    resistance: f64,
    consensus_agrees: bool,
) -> Option<RiskLevels> {
    let atr = ta::calculate_atr(prices, 14)?;
    if atr <= 0.0 || current_price <= 0.0 {
        return None;
    }

    let raw_stop = current_price - 1.5 * atr;
    // Clip the stop to 99% of the nearest support — never place it below a
    // known support shelf (§4.7).
    let stop_loss = if support > 0.0 { raw_stop.max(support * 0.99) } else { raw_stop }.max(0.0);

    let risk_per_unit = (current_price - stop_loss).max(f64::EPSILON);
    let target_2r = current_price + 2.0 * risk_per_unit;
    let target_3r = current_price + 3.0 * risk_per_unit;

    // Reward side measured against the nearest resistance ceiling when one
    // exists above the current price; otherwise fall back to twice the ATR
    // as a proxy expected move.
    let reward_per_unit = if resistance > current_price {
        resistance - current_price
    } else {
        atr * 2.0
    };
    let reward_risk_ratio = reward_per_unit / risk_per_unit;
    let win_rate = heuristic_win_rate(consensus_agrees);
    let position_size_fraction = half_kelly(win_rate, reward_risk_ratio);

    Some(RiskLevels { stop_loss, target_2r, target_3r, position_size_fraction })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_kelly_clamped_to_upper_bound() {
        assert!(half_kelly(0.9, 10.0) <= KELLY_MAX);
    }

    #[test]
    fn half_kelly_floors_at_zero() {
        assert_eq!(half_kelly(0.1, 0.5), KELLY_MIN);
    }

    #[test]
    fn risk_levels_targets_above_current_price() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 % 5.0)).collect();
        let levels = compute_risk_levels(&prices, 102.0, 95.0, 110.0, true).unwrap();
        assert!(levels.target_2r > 102.0);
        assert!(levels.target_3r > levels.target_2r);
        assert!(levels.stop_loss < 102.0);
    }

    #[test]
    fn position_size_fraction_varies_with_market_inputs() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 % 5.0)).collect();

        // A nearby resistance ceiling caps the reward, shrinking the ratio
        // and the resulting size relative to a distant one.
        let near_resistance = compute_risk_levels(&prices, 102.0, 95.0, 103.0, true).unwrap();
        let far_resistance = compute_risk_levels(&prices, 102.0, 95.0, 160.0, true).unwrap();
        assert!(far_resistance.position_size_fraction > near_resistance.position_size_fraction);

        // Consensus agreement raises the heuristic win rate and should never
        // produce a smaller size, holding everything else fixed.
        let disagreeing = compute_risk_levels(&prices, 102.0, 95.0, 160.0, false).unwrap();
        assert!(far_resistance.position_size_fraction >= disagreeing.position_size_fraction);
    }
}
