//! Technical library — pure functions over price/volume ring buffers.
//!
//! No I/O, no hidden state. Every function documents its minimum sample
//! count and returns a defined neutral fallback rather than panicking on
//! short input.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod fear_greed;
pub mod ichimoku;
pub mod levels;
pub mod macd;
pub mod roc;
pub mod rsi;
pub mod stoch_rsi;
pub mod trend;
pub mod vwap;

pub use atr::calculate_atr;
pub use bollinger::{calculate_bollinger, BollingerResult};
pub use ema::calculate_ema;
pub use fear_greed::calculate_fear_greed;
pub use ichimoku::{calculate_ichimoku, IchimokuResult};
pub use levels::{fibonacci_levels, on_balance_volume, support_resistance, FibLevels, SupportResistance};
pub use macd::{calculate_macd, MacdResult};
pub use roc::calculate_roc;
pub use rsi::{calculate_rsi, current_rsi};
pub use stoch_rsi::{calculate_stoch_rsi, StochRsiResult};
pub use trend::{calculate_trend, TrendResult};
pub use vwap::{calculate_vwap, vwap_deviation_pct};
