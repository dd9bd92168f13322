// =============================================================================
// Consensus — weighted-vote aggregation across fresh agent signals (§4.7.1)
// =============================================================================

use crate::types::{Category, Signal};

/// Per-category weights; sum to 1.00 exactly (§4.7.1). If a category is
/// missing its weight is simply unused rather than renormalized against a
/// smaller sum — see DESIGN.md's Open Question decision on this.
fn weight_for(category: Category) -> f64 {
    match category {
        Category::Technical => 0.30,
        Category::Market => 0.20,
        Category::Prediction => 0.15,
        Category::Liquidity => 0.12,
        Category::Sentiment => 0.10,
        Category::Onchain => 0.08,
        Category::Whale => 0.05,
        Category::Gas => 0.0,
    }
}

/// Signals older than this are excluded from consensus (§4.7.1).
pub const FRESHNESS_WINDOW_MS: i64 = 20 * 60_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsensusResult {
    pub normalized: f64,
    pub strength: f64,
    pub label: &'static str,
    pub contributing: usize,
}

/// Weighted-vote consensus over the freshest signal per agent category.
///
/// Each signal contributes `weight(category) * sign(type) * (confidence/100)`.
/// The sum is divided by the total weight of contributing categories, which
/// renormalizes defensively when some categories are stale or absent.
pub fn compute_consensus(signals: &[Signal], now_ms: i64) -> Option<ConsensusResult> {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let mut contributing = 0usize;

    for s in signals {
        if !s.is_fresh(now_ms, FRESHNESS_WINDOW_MS) {
            continue;
        }
        let w = weight_for(s.category);
        if w == 0.0 {
            continue;
        }
        weighted_sum += w * s.signal_type.sign() * (s.confidence / 100.0);
        weight_total += w;
        contributing += 1;
    }

    if weight_total == 0.0 {
        return None;
    }

    let normalized = weighted_sum / weight_total;
    let label = if normalized > 0.15 {
        "BUY"
    } else if normalized < -0.15 {
        "SELL"
    } else {
        "HOLD"
    };
    let strength = (normalized.abs() * 100.0).round().min(95.0);

    Some(ConsensusResult { normalized, strength, label, contributing })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignalType;

    fn sig(category: Category, signal_type: SignalType, confidence: f64, age_ms: i64, now: i64) -> Signal {
        Signal {
            agent_name: "x".into(),
            signal_type,
            confidence,
            price: 1.0,
            reason: String::new(),
            category,
            received_at: now - age_ms,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn weights_sum_to_one() {
        let total: f64 = [
            Category::Technical,
            Category::Market,
            Category::Prediction,
            Category::Liquidity,
            Category::Sentiment,
            Category::Onchain,
            Category::Whale,
        ]
        .iter()
        .map(|c| weight_for(*c))
        .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn stale_signals_are_excluded() {
        let now = 1_000_000_000;
        let signals = vec![sig(Category::Technical, SignalType::Buy, 90.0, FRESHNESS_WINDOW_MS + 1, now)];
        assert!(compute_consensus(&signals, now).is_none());
    }

    #[test]
    fn mixed_votes_produce_bounded_normalized_buy() {
        let now = 1_000_000_000;
        let signals = vec![
            sig(Category::Technical, SignalType::Buy, 80.0, 0, now),
            sig(Category::Market, SignalType::Buy, 60.0, 0, now),
            sig(Category::Whale, SignalType::Sell, 50.0, 0, now),
        ];
        let result = compute_consensus(&signals, now).unwrap();
        assert!(result.normalized > 0.0 && result.normalized <= 1.0);
        assert_eq!(result.label, "BUY");
        assert_eq!(result.contributing, 3);
    }
}
