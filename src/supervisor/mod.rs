//! Process supervisor: staggered launch, capped exponential backoff restart,
//! SIGTERM fan-out, periodic status table (§4.8).

pub mod process;

pub use process::{AgentHandle, Supervisor, SupervisorConfig};
