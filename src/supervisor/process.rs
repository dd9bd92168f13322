// =============================================================================
// Supervisor — staggered launch, exponential-backoff restart, health table
// =============================================================================

use std::collections::HashMap;
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

/// Base restart delay, doubled on every consecutive non-zero exit up to
/// `MAX_RESTART_DELAY` (§4.8).
const BASE_RESTART_DELAY: Duration = Duration::from_secs(5);
const MAX_RESTART_DELAY: Duration = Duration::from_secs(5 * 60);
/// Stagger between launching successive agents.
const LAUNCH_STAGGER: Duration = Duration::from_millis(750);
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);
/// Grace period given to a child after SIGTERM before the supervisor moves on.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Binary names under `target/.../bin/` to launch, in order.
    pub agents: Vec<String>,
}

pub struct AgentHandle {
    name: String,
    restart_count: u32,
    current_delay: Duration,
    last_exit_code: Option<i32>,
}

/// Computes the backoff delay for the k-th consecutive restart:
/// `min(5s * 2^(k-1), 5min)` (§8 testable property #4).
pub fn backoff_delay(restart_count: u32) -> Duration {
    if restart_count == 0 {
        return Duration::ZERO;
    }
    let exp = restart_count.saturating_sub(1).min(10);
    let scaled = BASE_RESTART_DELAY.saturating_mul(1 << exp);
    scaled.min(MAX_RESTART_DELAY)
}

pub struct Supervisor {
    config: SupervisorConfig,
    handles: Mutex<HashMap<String, AgentHandle>>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self { config, handles: Mutex::new(HashMap::new()) }
    }

    /// Launches all configured agents with a stagger, then supervises them
    /// until `shutdown` fires. Each agent runs in its own task with its own
    /// restart loop so one crash-looping agent never blocks the others.
    pub async fn run(self: std::sync::Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut tasks = Vec::new();
        for (i, agent) in self.config.agents.iter().cloned().enumerate() {
            let sup = self.clone();
            let mut agent_shutdown = shutdown.clone();
            tasks.push(tokio::spawn(async move {
                tokio::time::sleep(LAUNCH_STAGGER * i as u32).await;
                sup.supervise_one(agent, &mut agent_shutdown).await;
            }));
        }

        let mut health_ticker = tokio::time::interval(HEALTH_CHECK_INTERVAL);
        loop {
            tokio::select! {
                _ = health_ticker.tick() => self.log_health_table().await,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        for t in tasks {
            let _ = t.await;
        }
    }

    #[instrument(skip(self, shutdown), fields(agent = %name))]
    async fn supervise_one(&self, name: String, shutdown: &mut tokio::sync::watch::Receiver<bool>) {
        self.handles.lock().await.insert(
            name.clone(),
            AgentHandle { name: name.clone(), restart_count: 0, current_delay: Duration::ZERO, last_exit_code: None },
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let bin_path = format!("./{name}");
            let spawn_result = Command::new(&bin_path).kill_on_drop(true).spawn();

            let mut child = match spawn_result {
                Ok(c) => c,
                Err(e) => {
                    error!(error = %e, "failed to spawn agent binary");
                    tokio::time::sleep(BASE_RESTART_DELAY).await;
                    continue;
                }
            };

            info!("agent started");
            let exit_status = tokio::select! {
                status = child.wait() => status,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        terminate(&mut child).await;
                        break;
                    }
                    continue;
                }
            };

            let code = exit_status.ok().and_then(|s| s.code());
            let mut handles = self.handles.lock().await;
            let handle = handles.get_mut(&name).expect("handle inserted above");
            handle.last_exit_code = code;

            match code {
                Some(0) | None => {
                    info!("agent exited cleanly — not restarting");
                    break;
                }
                Some(nonzero) => {
                    handle.restart_count += 1;
                    handle.current_delay = backoff_delay(handle.restart_count);
                    // A few hundred ms of jitter keeps a multi-agent crash
                    // (e.g. the hub dying) from bunching every restart attempt
                    // onto the same tick.
                    let jittered = handle.current_delay + Duration::from_millis(rand::random::<u64>() % 250);
                    warn!(exit_code = nonzero, restart_count = handle.restart_count, delay_ms = jittered.as_millis() as u64, "agent crashed — restarting after backoff");
                    drop(handles);
                    tokio::time::sleep(jittered).await;
                }
            }
        }
    }

    async fn log_health_table(&self) {
        let handles = self.handles.lock().await;
        for h in handles.values() {
            info!(agent = %h.name, restarts = h.restart_count, last_exit_code = ?h.last_exit_code, "health check");
        }
    }
}

/// Sends SIGTERM and gives the child `SHUTDOWN_GRACE` to exit on its own (it
/// also observes the same shutdown signal via its own ctrl_c/SIGTERM
/// handler), then force-kills it with SIGKILL if it's still alive.
async fn terminate(child: &mut Child) {
    if let Some(pid) = child.id() {
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            warn!(error = %e, "failed to send SIGTERM to agent");
        }
    }
    if tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await.is_err() {
        warn!("agent did not exit within grace period — killing");
        let _ = child.kill().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_each_restart_capped_at_five_minutes() {
        assert_eq!(backoff_delay(1), Duration::from_secs(5));
        assert_eq!(backoff_delay(2), Duration::from_secs(10));
        assert_eq!(backoff_delay(3), Duration::from_secs(20));
        assert_eq!(backoff_delay(7), Duration::from_secs(5 * 60));
        assert_eq!(backoff_delay(20), Duration::from_secs(5 * 60));
    }

    #[test]
    fn zero_restarts_has_no_delay() {
        assert_eq!(backoff_delay(0), Duration::ZERO);
    }
}
