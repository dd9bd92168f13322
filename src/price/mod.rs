//! Price Service: per-token TTL cache, multi-source fallback, request
//! coalescing, and bounded history synthesis.

pub mod aggregator;
pub mod service;

pub use service::{PriceError, PriceService};
