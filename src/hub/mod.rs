//! The Hub: REST/WebSocket ingress, self-analysis loop, and consensus engine.

pub mod analysis;
pub mod consensus;
pub mod narrative;
pub mod rest;
pub mod risk_levels;
pub mod state;
pub mod ws;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::advisor::Advisor;
use crate::chain::ChainClient;
use crate::price::PriceService;
use state::HubState;

/// Shared Axum state: the hub's own data plus the chain/price clients the
/// self-analysis loop and `token:analyze` handler both need.
pub struct HubAppState {
    pub state: Arc<HubState>,
    pub chain: Arc<ChainClient>,
    pub price_service: Arc<PriceService>,
    /// `None` unless an API key was configured — narrative enrichment is
    /// always optional, see `advisor::Advisor::call`.
    pub advisor: Option<Arc<Advisor>>,
    /// The currently-running self-analysis loop task. `token:analyze`
    /// aborts and replaces this when retargeting the focal token (§4.7).
    pub analysis_handle: Mutex<JoinHandle<()>>,
}

/// Builds the Axum router and spawns the self-analysis loop for the focal
/// token. Returns the router and the shared state, so the caller can abort
/// the analysis loop on shutdown.
pub fn build(
    chain: Arc<ChainClient>,
    price_service: Arc<PriceService>,
    focal_token: String,
    advisor: Option<Arc<Advisor>>,
) -> (axum::Router, Arc<HubAppState>) {
    let hub_state = Arc::new(HubState::new(&focal_token));

    let analysis_handle = analysis::start_analysis_loop(
        hub_state.clone(),
        chain.clone(),
        price_service.clone(),
        advisor.clone(),
        focal_token,
        analysis::ANALYSIS_INTERVAL,
    );

    let deps = Arc::new(HubAppState {
        state: hub_state,
        chain,
        price_service,
        advisor,
        analysis_handle: Mutex::new(analysis_handle),
    });

    (rest::router(deps.clone()), deps)
}
