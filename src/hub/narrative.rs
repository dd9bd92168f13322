// =============================================================================
// Narrative — fixed-template prose summarizing a token's analysis
// =============================================================================

use crate::hub::consensus::ConsensusResult;
use crate::hub::risk_levels::RiskLevels;

pub fn build_narrative(token_symbol: &str, consensus: &ConsensusResult, risk: Option<&RiskLevels>) -> String {
    let mut parts = vec![format!(
        "{token_symbol}: {} consensus ({} contributing signal{}, strength {:.0})",
        consensus.label,
        consensus.contributing,
        if consensus.contributing == 1 { "" } else { "s" },
        consensus.strength
    )];

    if let Some(r) = risk {
        parts.push(format!(
            "Suggested stop {:.6}, targets {:.6} / {:.6}, size {:.1}% of bankroll.",
            r.stop_loss,
            r.target_2r,
            r.target_3r,
            r.position_size_fraction * 100.0
        ));
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrative_includes_label_and_strength() {
        let consensus = ConsensusResult { normalized: 0.3, strength: 30.0, label: "BUY", contributing: 2 };
        let text = build_narrative("DUCK", &consensus, None);
        assert!(text.contains("BUY"));
        assert!(text.contains("DUCK"));
    }
}
