// =============================================================================
// Supervisor Binary — launches and restarts the fleet's agent/hub processes
// =============================================================================

use std::sync::Arc;

use clap::Parser;
use duck_fleet::config::init_logging;
use duck_fleet::supervisor::{Supervisor, SupervisorConfig};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

const DEFAULT_AGENTS: &[&str] = &[
    "hub",
    "agent-trading",
    "agent-prediction",
    "agent-market",
    "agent-whale",
    "agent-liquidity",
    "agent-sentiment",
    "agent-onchain",
    "agent-gas",
];

#[derive(Parser, Debug)]
#[command(name = "supervisor")]
#[command(about = "Launches and supervises the duck-fleet agent/hub processes")]
struct Args {
    /// Run only this single agent binary name instead of the full fleet.
    #[arg(long, env = "SUPERVISOR_ONLY")]
    only: Option<String>,

    /// Comma-separated binary names to supervise, overriding the default set.
    #[arg(long, env = "SUPERVISOR_AGENTS")]
    agents: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_logging();

    let args = Args::parse();

    let agents: Vec<String> = if let Some(only) = args.only {
        vec![only]
    } else if let Some(list) = args.agents {
        list.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
    } else {
        DEFAULT_AGENTS.iter().map(|s| s.to_string()).collect()
    };

    info!(?agents, "supervisor starting");

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let supervisor = Arc::new(Supervisor::new(SupervisorConfig { agents }));

    let sup = supervisor.clone();
    let run_handle = tokio::spawn(async move {
        sup.run(shutdown_rx).await;
    });

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!(error = %e, "failed to listen for ctrl_c");
            }
            warn!("SIGINT received — stopping fleet");
        }
        _ = sigterm.recv() => {
            warn!("SIGTERM received — stopping fleet");
        }
    }
    let _ = shutdown_tx.send(true);
    let _ = run_handle.await;

    info!("supervisor shut down");
    Ok(())
}
