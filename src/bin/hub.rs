// =============================================================================
// Hub Process — REST/WS ingress, consensus engine, self-analysis loop
// =============================================================================

use std::sync::Arc;

use duck_fleet::advisor::Advisor;
use duck_fleet::chain::ChainClient;
use duck_fleet::config::{init_logging, AdvisorConfig, Config, HubConfig};
use duck_fleet::price::PriceService;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_logging();

    let config = Config::load()?;
    let hub_config = HubConfig::load()?;
    info!(port = hub_config.port, token = %config.token_address, "hub starting");

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

    let advisor = AdvisorConfig::load().api_key.map(|key| Arc::new(Advisor::new(key)));
    if advisor.is_none() {
        info!("no advisor API key configured — narratives use the template only");
    }

    let (router, deps) = duck_fleet::hub::build(chain, price_service, config.token_address.clone(), advisor);

    let bind_addr = format!("0.0.0.0:{}", hub_config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "hub listening");

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            warn!(error = %e, "hub server exited with error");
        }
    });

    tokio::signal::ctrl_c().await?;
    warn!("shutdown signal received");
    deps.analysis_handle.lock().abort();
    server.abort();

    info!("hub shut down");
    Ok(())
}
