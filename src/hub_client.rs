// =============================================================================
// Hub Client — outbound fire-and-forget sink used by agents
// =============================================================================

use std::time::Duration;

use serde_json::Value;
use tokio::task::AbortHandle;
use tracing::{instrument, warn};

pub struct HubClient {
    client: reqwest::Client,
    base_url: String,
}

impl HubClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build hub http client");
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn post(&self, path: &str, body: &Value) -> bool {
        let url = format!("{}{}", self.base_url, path);
        match self.client.post(&url).json(body).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(path, status = %resp.status(), "hub rejected event");
                false
            }
            Err(e) => {
                warn!(path, error = %e, "hub post failed — swallowing, agent continues");
                false
            }
        }
    }

    #[instrument(skip(self, body), name = "hub_client::post_signal")]
    pub async fn post_signal(&self, body: &Value) -> bool {
        self.post("/api/signal", body).await
    }

    pub async fn post_mev_opportunity(&self, body: &Value) -> bool {
        self.post("/api/mev/opportunity", body).await
    }

    pub async fn post_token_launch(&self, body: &Value) -> bool {
        self.post("/api/token/launch", body).await
    }

    pub async fn post_gas_update(&self, body: &Value) -> bool {
        self.post("/api/gas/update", body).await
    }

    pub async fn post_whale_alert(&self, body: &Value) -> bool {
        self.post("/api/whale/alert", body).await
    }

    pub async fn post_heartbeat(&self, body: &Value) -> bool {
        self.post("/api/agent/heartbeat", body).await
    }

    /// Starts a background heartbeat cadence; returns a handle that cancels
    /// it on drop/abort. Agents must never block their tick loop on the hub.
    pub fn start_heartbeat(self: std::sync::Arc<Self>, agent_name: String, interval_ms: u64) -> AbortHandle {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
            loop {
                ticker.tick().await;
                let body = serde_json::json!({ "agentName": agent_name });
                self.post_heartbeat(&body).await;
            }
        });
        handle.abort_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn post_to_unreachable_host_returns_false_without_panicking() {
        let client = HubClient::new("http://127.0.0.1:1");
        let ok = client.post_signal(&serde_json::json!({"agentName": "trading"})).await;
        assert!(!ok);
    }
}
