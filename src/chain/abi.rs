//! Registry contract ABI bindings.
//!
//! Generated from the human-readable fragments in the external interface
//! spec: agent registration, signal/prediction posting and verification,
//! and the view accessors used to check registration status.

use ethers::contract::abigen;

abigen!(
    RegistryContract,
    r#"[
        function registerAgent(string name) external
        function postSignal(string signalType, uint256 confidence, uint256 price, string reason) external
        function postPrediction(string direction, uint256 confidence, uint256 referencePrice, uint256 targetTimeUnixSec) external
        function verifyPrediction(uint256 index, uint256 actualPrice) external
        function agents(address agent) external view returns (string name, uint256 totalSignals, uint256 totalPredictions, uint256 correctPredictions, uint256 lastActive, bool isRegistered)
        function getRecentSignals(uint256 count) external view returns (bytes[] memory)
        function getRecentPredictions(uint256 count) external view returns (bytes[] memory)
        function getAgentAccuracy(address agent) external view returns (uint256)
        event AgentRegistered(address indexed agent, string name)
        event SignalPosted(address indexed agent, string signalType, uint256 confidence, uint256 price)
        event PredictionPosted(address indexed agent, string direction, uint256 confidence, uint256 referencePrice, uint256 targetTimeUnixSec)
        event PredictionVerified(address indexed agent, uint256 index, bool correct)
    ]"#,
);

/// Minimal Uniswap-V2-style router fragment used for the Price Service's
/// on-chain swap-quote fallback (one native-token swap path only).
abigen!(
    SwapRouter,
    r#"[
        function getAmountsOut(uint256 amountIn, address[] path) external view returns (uint256[] memory amounts)
    ]"#,
);
