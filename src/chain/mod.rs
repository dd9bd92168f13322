//! EVM chain client: reads/writes to the registry contract, idempotent
//! agent registration, and transfer-log scanning.

pub mod abi;
pub mod client;

pub use client::{from_base18, ChainClient, ChainError};
