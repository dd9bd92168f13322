// =============================================================================
// Shared data model — tokens, prices, transfers, signals, predictions
// =============================================================================

use serde::{Deserialize, Serialize};

/// Normalize a chain address to the map-key form used everywhere: lowercase.
pub fn normalize_address(addr: &str) -> String {
    addr.to_lowercase()
}

/// Where a price sample's value was sourced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Primary,
    Fallback,
    Cache,
}

impl std::fmt::Display for PriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Fallback => write!(f, "fallback"),
            Self::Cache => write!(f, "cache"),
        }
    }
}

/// Percentage price changes over a few standard windows.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PriceChange {
    #[serde(rename = "5m", default)]
    pub m5: f64,
    #[serde(rename = "1h", default)]
    pub h1: f64,
    #[serde(rename = "24h", default)]
    pub h24: f64,
}

/// A single price observation for a token, immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSample {
    pub price: f64,
    pub price_usd: f64,
    pub price_native: f64,
    pub timestamp: i64,
    pub volume_24h: f64,
    pub price_change: PriceChange,
    pub liquidity_usd: f64,
    pub market_cap: f64,
    pub buys_24h: u64,
    pub sells_24h: u64,
    pub buys_1h: u64,
    pub sells_1h: u64,
    pub source: PriceSource,
    pub token_symbol: String,
    pub token_name: String,
    pub token_address: String,
}

/// A single on-chain value transfer, as derived from a log query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferEvent {
    pub from: String,
    pub to: String,
    /// Base-units integer amount, exact (no floating point).
    pub value: u128,
    pub block_number: u64,
    pub tx_hash: String,
}

/// Classification of a whale wallet's observed behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WhaleProfile {
    New,
    Accumulator,
    Distributor,
    Trader,
    Mixed,
}

/// Running tally of a single address's large-transfer activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhaleTally {
    pub address: String,
    pub total_in: u128,
    pub total_out: u128,
    pub tx_count: u64,
    pub first_seen: i64,
    pub last_seen: i64,
    pub profile: WhaleProfile,
}

impl WhaleTally {
    pub fn net_flow(&self) -> i128 {
        self.total_in as i128 - self.total_out as i128
    }

    pub fn new_first_seen(address: String, now_ms: i64) -> Self {
        Self {
            address,
            total_in: 0,
            total_out: 0,
            tx_count: 0,
            first_seen: now_ms,
            last_seen: now_ms,
            profile: WhaleProfile::New,
        }
    }

    /// Recompute `profile` from the accumulated in/out/tx_count, matching
    /// the heuristic the Whale agent uses when classifying counterparties.
    pub fn reclassify(&mut self) {
        let net = self.net_flow();
        let total = self.total_in as i128 + self.total_out as i128;
        self.profile = if self.tx_count <= 1 {
            WhaleProfile::New
        } else if total == 0 {
            WhaleProfile::New
        } else if net as f64 > total as f64 * 0.6 {
            WhaleProfile::Accumulator
        } else if (net as f64) < total as f64 * -0.6 {
            WhaleProfile::Distributor
        } else if self.tx_count >= 5 {
            WhaleProfile::Trader
        } else {
            WhaleProfile::Mixed
        };
    }
}

/// Direction of a price prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Sideways,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
            Self::Sideways => write!(f, "SIDEWAYS"),
        }
    }
}

/// A forecast awaiting verification against the realized price at `target_time_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingPrediction {
    pub direction: Direction,
    pub confidence: f64,
    pub reference_price: f64,
    pub target_time_ms: i64,
    pub horizon_minutes: u32,
    pub verified: bool,
    pub correct: bool,
}

impl PendingPrediction {
    /// Classify a realized return into UP/DOWN/SIDEWAYS using the spec's
    /// fixed thresholds (±0.5% for UP/DOWN, |return|<1% for SIDEWAYS).
    pub fn realized_direction(return_pct: f64) -> Direction {
        if return_pct >= 0.5 {
            Direction::Up
        } else if return_pct <= -0.5 {
            Direction::Down
        } else if return_pct.abs() < 1.0 {
            Direction::Sideways
        } else if return_pct > 0.0 {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    /// Verify against a realized price, returning whether the label matched.
    pub fn verify(&mut self, actual_price: f64) -> bool {
        let return_pct = if self.reference_price != 0.0 {
            ((actual_price - self.reference_price) / self.reference_price) * 100.0
        } else {
            0.0
        };
        let realized = Self::realized_direction(return_pct);
        self.verified = true;
        self.correct = realized == self.direction;
        self.correct
    }
}

/// BUY/SELL/HOLD recommendation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Buy,
    Sell,
    Hold,
}

impl SignalType {
    /// +1 for BUY, -1 for SELL, 0 for HOLD — used directly in weighted-vote
    /// and consensus math.
    pub fn sign(&self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
            Self::Hold => 0.0,
        }
    }
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
            Self::Hold => write!(f, "HOLD"),
        }
    }
}

/// Classification tag on an emitted signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Technical,
    Prediction,
    Market,
    Whale,
    Liquidity,
    Sentiment,
    Onchain,
    Gas,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Technical => "technical",
            Self::Prediction => "prediction",
            Self::Market => "market",
            Self::Whale => "whale",
            Self::Liquidity => "liquidity",
            Self::Sentiment => "sentiment",
            Self::Onchain => "onchain",
            Self::Gas => "gas",
        };
        write!(f, "{s}")
    }
}

/// An emitted agent signal, immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub agent_name: String,
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub confidence: f64,
    pub price: f64,
    /// Free-text rationale, capped at 1KB by the producing agent.
    pub reason: String,
    pub category: Category,
    pub received_at: i64,
    /// Category-specific extra fields (indicators blob, ratios, ...),
    /// preserved opaquely.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Signal {
    pub fn is_fresh(&self, now_ms: i64, freshness_window_ms: i64) -> bool {
        now_ms - self.received_at <= freshness_window_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_address_lowercases() {
        assert_eq!(normalize_address("0xABCDef"), "0xabcdef");
    }

    #[test]
    fn signal_type_sign_matches_spec() {
        assert_eq!(SignalType::Buy.sign(), 1.0);
        assert_eq!(SignalType::Sell.sign(), -1.0);
        assert_eq!(SignalType::Hold.sign(), 0.0);
    }

    #[test]
    fn realized_direction_thresholds() {
        assert_eq!(PendingPrediction::realized_direction(0.6), Direction::Up);
        assert_eq!(PendingPrediction::realized_direction(-0.6), Direction::Down);
        assert_eq!(PendingPrediction::realized_direction(0.2), Direction::Sideways);
    }

    #[test]
    fn prediction_verify_up_correct() {
        let mut p = PendingPrediction {
            direction: Direction::Up,
            confidence: 70.0,
            reference_price: 1.0,
            target_time_ms: 0,
            horizon_minutes: 5,
            verified: false,
            correct: false,
        };
        assert!(p.verify(1.01));
        assert!(p.verified);
        assert!(p.correct);
    }

    #[test]
    fn signal_freshness_window() {
        let sig = Signal {
            agent_name: "trading".into(),
            signal_type: SignalType::Buy,
            confidence: 80.0,
            price: 1.0,
            reason: "test".into(),
            category: Category::Technical,
            received_at: 1_000_000,
            extra: serde_json::Map::new(),
        };
        assert!(sig.is_fresh(1_000_000 + 19 * 60_000, 20 * 60_000));
        assert!(!sig.is_fresh(1_000_000 + 21 * 60_000, 20 * 60_000));
    }
}
