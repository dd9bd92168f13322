// =============================================================================
// Configuration — environment-variable driven, per-process
// =============================================================================
//
// Every tunable surface this system exposes is an environment variable
// (there is no hot-reloadable file config, unlike a single-process trading
// engine): `.env` is loaded once via `dotenvy` at process start, then each
// binary builds its own typed `Config`.
// =============================================================================

use anyhow::{Context, Result};
use tracing::warn;

/// The zero address — registration is skipped when `DUCK_SIGNALS_ADDRESS`
/// equals this value.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Shared chain + hub configuration read by every agent process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Hex private key, with or without `0x` prefix. Absence => read-only mode.
    pub private_key: Option<String>,
    pub rpc_url: String,
    pub signals_address: Option<String>,
    pub token_address: String,
    pub wmon_address: Option<String>,
    pub router_address: Option<String>,
    pub websocket_server_url: String,
}

impl Config {
    /// Load from the process environment. `dotenvy::dotenv()` should already
    /// have been called by the caller (each `main` does this before `load`).
    pub fn load() -> Result<Self> {
        let rpc_url = std::env::var("RPC_URL").context("RPC_URL must be set")?;
        let token_address = std::env::var("DUCK_TOKEN_ADDRESS")
            .context("DUCK_TOKEN_ADDRESS must be set")?;

        let private_key = match std::env::var("PRIVATE_KEY") {
            Ok(v) if !v.trim().is_empty() => Some(v),
            _ => {
                warn!("PRIVATE_KEY not set — running in read-only mode, no on-chain writes");
                None
            }
        };

        let signals_address = match std::env::var("DUCK_SIGNALS_ADDRESS") {
            Ok(v) if !v.trim().is_empty() && v.to_lowercase() != ZERO_ADDRESS => Some(v),
            Ok(_) => {
                warn!("DUCK_SIGNALS_ADDRESS unset or zero-address — registration will be skipped");
                None
            }
            Err(_) => {
                warn!("DUCK_SIGNALS_ADDRESS not set — registration will be skipped");
                None
            }
        };

        let wmon_address = std::env::var("WMON_ADDRESS").ok();
        let router_address = std::env::var("DUCK_ROUTER_ADDRESS").ok();

        let websocket_server_url = std::env::var("WEBSOCKET_SERVER_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:4000".to_string());

        Ok(Self {
            private_key,
            rpc_url,
            signals_address,
            token_address,
            wmon_address,
            router_address,
            websocket_server_url,
        })
    }

    pub fn is_read_only(&self) -> bool {
        self.private_key.is_none()
    }
}

/// Hub-specific configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub port: u16,
}

impl HubConfig {
    pub fn load() -> Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(4000);
        Ok(Self { port })
    }
}

/// Advisor-specific configuration.
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub api_key: Option<String>,
}

impl AdvisorConfig {
    pub fn load() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .or_else(|| std::env::var("VITE_API_KEY").ok());
        Self { api_key }
    }
}

pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_address_is_lowercase() {
        assert_eq!(ZERO_ADDRESS, ZERO_ADDRESS.to_lowercase());
    }
}
