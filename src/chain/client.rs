// =============================================================================
// Chain Client — EVM reads/writes, idempotent registration, transfer scan
// =============================================================================

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use ethers::abi::RawLog;
use ethers::contract::EthEvent;
use ethers::middleware::SignerMiddleware;
use ethers::prelude::*;
use ethers::signers::LocalWallet;
use ethers::types::{Address, Filter, H256, U256};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::chain::abi::{RegistryContract, SwapRouter};
use crate::types::TransferEvent;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("transaction reverted: {0}")]
    Revert(String),
    #[error("confidence {0} out of range [0,100]")]
    InvalidConfidence(u8),
    #[error("target time must be in the future")]
    InvalidTargetTime,
    #[error("timed out waiting for receipt")]
    ReceiptTimeout,
    #[error("wallet not configured — read-only mode")]
    NotRegistered,
    #[error("address parse error: {0}")]
    BadAddress(String),
}

type HttpProvider = Provider<Http>;

/// The ERC-20-style `Transfer(address,address,uint256)` signature hash.
const TRANSFER_EVENT_SIG: &str = "Transfer(address,address,uint256)";

/// Wraps either a plain read-only provider or a signer-wrapped one.
enum Backend {
    ReadOnly(Arc<HttpProvider>),
    Signing(Arc<SignerMiddleware<HttpProvider, LocalWallet>>),
}

pub struct ChainClient {
    backend: Backend,
    registry_address: Option<Address>,
    token_address: Address,
    router_address: Option<Address>,
    wmon_address: Option<Address>,
}

impl ChainClient {
    #[instrument(skip(private_key), name = "chain::new")]
    pub async fn new(
        rpc_url: &str,
        private_key: Option<&str>,
        registry_address: Option<&str>,
        token_address: &str,
        router_address: Option<&str>,
        wmon_address: Option<&str>,
    ) -> Result<Self, ChainError> {
        let provider = HttpProvider::try_from(rpc_url).map_err(|e| ChainError::Rpc(e.to_string()))?;
        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?
            .as_u64();

        let token_address = parse_address(token_address)?;
        let registry_address = registry_address.map(parse_address).transpose()?;
        let router_address = router_address.map(parse_address).transpose()?;
        let wmon_address = wmon_address.map(parse_address).transpose()?;

        let backend = match private_key {
            Some(key) => {
                let key = key.strip_prefix("0x").unwrap_or(key);
                let wallet: LocalWallet = LocalWallet::from_str(key)
                    .map_err(|e| ChainError::Rpc(e.to_string()))?
                    .with_chain_id(chain_id);
                Backend::Signing(Arc::new(SignerMiddleware::new(provider, wallet)))
            }
            None => {
                warn!("no private key configured — chain client is read-only");
                Backend::ReadOnly(Arc::new(provider))
            }
        };

        Ok(Self {
            backend,
            registry_address,
            token_address,
            router_address,
            wmon_address,
        })
    }

    /// The configured swap-router address, if any (used by on-chain agents
    /// to classify transfers as buys/sells).
    pub fn router_address(&self) -> Option<Address> {
        self.router_address
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self.backend, Backend::ReadOnly(_))
    }

    pub fn wallet_address(&self) -> Option<Address> {
        match &self.backend {
            Backend::Signing(client) => Some(client.address()),
            Backend::ReadOnly(_) => None,
        }
    }

    fn provider(&self) -> &HttpProvider {
        match &self.backend {
            Backend::ReadOnly(p) => p,
            Backend::Signing(c) => c.provider(),
        }
    }

    // ---- primitive reads/writes -------------------------------------------

    #[instrument(skip(self), name = "chain::get_block_number")]
    pub async fn get_block_number(&self) -> Result<u64, ChainError> {
        self.provider()
            .get_block_number()
            .await
            .map(|n| n.as_u64())
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    #[instrument(skip(self), name = "chain::get_gas_price")]
    pub async fn get_gas_price(&self) -> Result<U256, ChainError> {
        self.provider()
            .get_gas_price()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    /// Gas price converted to gwei using the exact integer divisor (property
    /// #9 regression guard — never mis-scaled by a formatting bug).
    pub async fn get_gas_price_gwei(&self) -> Result<u64, ChainError> {
        let wei = self.get_gas_price().await?;
        Ok((wei / U256::from(1_000_000_000u64)).as_u64())
    }

    #[instrument(skip(self), name = "chain::get_logs")]
    pub async fn get_transfer_logs(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferEvent>, ChainError> {
        let sig = H256::from(ethers::utils::keccak256(TRANSFER_EVENT_SIG.as_bytes()));
        let filter = Filter::new()
            .address(self.token_address)
            .topic0(sig)
            .from_block(from_block)
            .to_block(to_block);

        let logs = self
            .provider()
            .get_logs(&filter)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            let raw = RawLog {
                topics: log.topics.clone(),
                data: log.data.to_vec(),
            };
            if let Ok(parsed) = TransferFilter::decode_log(&raw) {
                events.push(TransferEvent {
                    from: format!("{:#x}", parsed.from),
                    to: format!("{:#x}", parsed.to),
                    value: parsed.value.as_u128(),
                    block_number: log.block_number.map(|b| b.as_u64()).unwrap_or(to_block),
                    tx_hash: log
                        .transaction_hash
                        .map(|h| format!("{h:#x}"))
                        .unwrap_or_default(),
                });
            }
        }
        Ok(events)
    }

    /// Quotes the price of the focal token via the configured router's
    /// `getAmountsOut`, swapping one whole unit of the native-wrapped token
    /// for the focal token (§4.2 on-chain fallback, step 2). Returns `None`
    /// when the router or native-wrapper address isn't configured rather
    /// than erroring, since the fallback is optional infrastructure.
    #[instrument(skip(self), name = "chain::quote_swap_price")]
    pub async fn quote_swap_price(&self) -> Result<Option<f64>, ChainError> {
        let (Some(router), Some(wmon)) = (self.router_address, self.wmon_address) else {
            return Ok(None);
        };
        let router = SwapRouter::new(router, Arc::new(self.provider().clone()));
        let amount_in = U256::from(10u128.pow(18));
        let path = vec![wmon, self.token_address];

        let amounts = router
            .get_amounts_out(amount_in, path)
            .call()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        let Some(amount_out) = amounts.get(1) else {
            return Ok(None);
        };
        let tokens_out = from_base18(amount_out.as_u128());
        if tokens_out <= 0.0 {
            return Ok(None);
        }
        Ok(Some(1.0 / tokens_out))
    }

    // ---- derived operations (§4.1) ----------------------------------------

    /// Idempotent: reads `agents(self)` first; only writes if not already
    /// registered.
    #[instrument(skip(self), name = "chain::register_agent")]
    pub async fn register_agent(&self, name: &str) -> Result<bool, ChainError> {
        let Backend::Signing(client) = &self.backend else {
            return Err(ChainError::NotRegistered);
        };
        let Some(registry_addr) = self.registry_address else {
            info!("no registry address configured — skipping registration");
            return Ok(false);
        };

        let contract = RegistryContract::new(registry_addr, client.clone());
        let my_address = client.address();

        let info = contract
            .agents(my_address)
            .call()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        let is_registered = info.5;
        if is_registered {
            info!(agent = %name, "already registered, skipping write");
            return Ok(true);
        }

        let pending = contract
            .register_agent(name.to_string())
            .send()
            .await
            .map_err(|e| ChainError::Revert(e.to_string()))?;
        let receipt = pending
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?
            .ok_or(ChainError::ReceiptTimeout)?;

        info!(agent = %name, tx = ?receipt.transaction_hash, "agent registered");
        Ok(true)
    }

    #[instrument(skip(self, reason), name = "chain::post_signal")]
    pub async fn post_signal(
        &self,
        signal_type: &str,
        confidence: u8,
        price: f64,
        reason: &str,
    ) -> Result<H256, ChainError> {
        if confidence > 100 {
            return Err(ChainError::InvalidConfidence(confidence));
        }
        let Backend::Signing(client) = &self.backend else {
            return Err(ChainError::NotRegistered);
        };
        let Some(registry_addr) = self.registry_address else {
            return Err(ChainError::NotRegistered);
        };

        let contract = RegistryContract::new(registry_addr, client.clone());
        let price_scaled = to_base18(price);

        let pending = contract
            .post_signal(signal_type.to_string(), U256::from(confidence), price_scaled, reason.to_string())
            .send()
            .await
            .map_err(|e| ChainError::Revert(e.to_string()))?;
        let receipt = pending
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?
            .ok_or(ChainError::ReceiptTimeout)?;
        Ok(receipt.transaction_hash)
    }

    #[instrument(skip(self), name = "chain::post_prediction")]
    pub async fn post_prediction(
        &self,
        direction: &str,
        confidence: u8,
        reference_price: f64,
        target_unix_sec: i64,
    ) -> Result<H256, ChainError> {
        if confidence > 100 {
            return Err(ChainError::InvalidConfidence(confidence));
        }
        let now = chrono::Utc::now().timestamp();
        if target_unix_sec <= now {
            return Err(ChainError::InvalidTargetTime);
        }
        let Backend::Signing(client) = &self.backend else {
            return Err(ChainError::NotRegistered);
        };
        let Some(registry_addr) = self.registry_address else {
            return Err(ChainError::NotRegistered);
        };

        let contract = RegistryContract::new(registry_addr, client.clone());
        let pending = contract
            .post_prediction(
                direction.to_string(),
                U256::from(confidence),
                to_base18(reference_price),
                U256::from(target_unix_sec as u64),
            )
            .send()
            .await
            .map_err(|e| ChainError::Revert(e.to_string()))?;
        let receipt = pending
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?
            .ok_or(ChainError::ReceiptTimeout)?;
        Ok(receipt.transaction_hash)
    }

    #[instrument(skip(self), name = "chain::verify_prediction")]
    pub async fn verify_prediction(&self, index: u64, actual_price: f64) -> Result<H256, ChainError> {
        let Backend::Signing(client) = &self.backend else {
            return Err(ChainError::NotRegistered);
        };
        let Some(registry_addr) = self.registry_address else {
            return Err(ChainError::NotRegistered);
        };
        let contract = RegistryContract::new(registry_addr, client.clone());
        let pending = contract
            .verify_prediction(U256::from(index), to_base18(actual_price))
            .send()
            .await
            .map_err(|e| ChainError::Revert(e.to_string()))?;
        let receipt = pending
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?
            .ok_or(ChainError::ReceiptTimeout)?;
        Ok(receipt.transaction_hash)
    }

    /// `waitForReceipt` with an explicit timeout, per-call (§4.1, §5).
    pub async fn wait_for_receipt(&self, tx_hash: H256, timeout: Duration) -> Result<bool, ChainError> {
        let fut = self.provider().get_transaction_receipt(tx_hash);
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(Some(receipt))) => Ok(receipt.status == Some(U256::from(1))),
            Ok(Ok(None)) => Err(ChainError::ReceiptTimeout),
            Ok(Err(e)) => Err(ChainError::Rpc(e.to_string())),
            Err(_) => Err(ChainError::ReceiptTimeout),
        }
    }
}

fn parse_address(addr: &str) -> Result<Address, ChainError> {
    Address::from_str(addr).map_err(|_| ChainError::BadAddress(addr.to_string()))
}

/// Convert a floating-point "whole token" price to base-18 fixed point.
fn to_base18(value: f64) -> U256 {
    if !value.is_finite() || value < 0.0 {
        return U256::zero();
    }
    let scaled = value * 1e18;
    U256::from(scaled as u128)
}

/// Convert a base-18 fixed-point integer back to a whole-token float. The
/// symmetric counterpart of [`to_base18`].
pub fn from_base18(value: u128) -> f64 {
    value as f64 / 1e18
}

#[derive(Debug, Clone, EthEvent)]
#[ethevent(name = "Transfer", abi = "Transfer(address,address,uint256)")]
struct TransferFilter {
    #[ethevent(indexed)]
    pub from: Address,
    #[ethevent(indexed)]
    pub to: Address,
    pub value: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base18_scales_correctly() {
        assert_eq!(to_base18(1.0), U256::from(10u128.pow(18)));
        assert_eq!(to_base18(0.0), U256::zero());
    }

    #[test]
    fn base18_rejects_negative() {
        assert_eq!(to_base18(-1.0), U256::zero());
    }

    #[test]
    fn from_base18_round_trips_to_base18() {
        assert_eq!(from_base18(10u128.pow(18)), 1.0);
        assert!((from_base18(5 * 10u128.pow(17)) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn parse_address_rejects_malformed() {
        assert!(parse_address("not-an-address").is_err());
    }

    #[test]
    fn parse_address_accepts_checksum() {
        assert!(parse_address("0x0000000000000000000000000000000000000001").is_ok());
    }
}
