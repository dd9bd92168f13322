//! duck-fleet: a distributed fleet of EVM market-intelligence agents that
//! report independent signals to a central hub, which combines them into a
//! weighted consensus view of a single focal token.

pub mod advisor;
pub mod agent;
pub mod chain;
pub mod config;
pub mod hub;
pub mod hub_client;
pub mod price;
pub mod supervisor;
pub mod ta;
pub mod types;
