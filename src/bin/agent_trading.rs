// =============================================================================
// Trading Agent Process
// =============================================================================

use std::sync::Arc;

use duck_fleet::agent::{AgentRuntime, TradingAgent};
use duck_fleet::chain::ChainClient;
use duck_fleet::config::{init_logging, Config};
use duck_fleet::hub_client::HubClient;
use duck_fleet::price::PriceService;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_logging();

    let config = Config::load()?;
    info!(read_only = config.is_read_only(), "trading agent starting");

    let chain = Arc::new(
        ChainClient::new(
            &config.rpc_url,
            config.private_key.as_deref(),
            config.signals_address.as_deref(),
            &config.token_address,
            config.router_address.as_deref(),
            config.wmon_address.as_deref(),
        )
        .await?,
    );
    let price_service = Arc::new(PriceService::new(&config.token_address));
    let hub_client = Arc::new(HubClient::new(&config.websocket_server_url));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let mut runtime = AgentRuntime::new(TradingAgent, chain, price_service, hub_client, config.token_address.clone(), shutdown_rx);
    let run_handle = tokio::spawn(async move {
        runtime.run().await;
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl_c");
    }
    let _ = shutdown_tx.send(true);
    let _ = run_handle.await;

    info!("trading agent shut down");
    Ok(())
}
