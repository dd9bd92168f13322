//! Agent variants and the shared runtime loop that drives all of them.

pub mod gas;
pub mod liquidity;
pub mod market;
pub mod onchain;
pub mod prediction;
pub mod runtime;
pub mod sentiment;
pub mod trading;
pub mod whale;

pub use gas::GasAgent;
pub use liquidity::LiquidityAgent;
pub use market::MarketAgent;
pub use onchain::OnchainAgent;
pub use prediction::PredictionAgent;
pub use runtime::{AgentRuntime, AgentSpec, AnalysisContext, AnalyzeOutcome, History, SidePost};
pub use sentiment::SentimentAgent;
pub use trading::TradingAgent;
pub use whale::WhaleAgent;
