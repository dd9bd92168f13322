// =============================================================================
// Hub REST Endpoints — Axum 0.7 ingress for agent events (§4.7, §6)
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};

use crate::hub::HubAppState;
use crate::types::{Category, Signal, SignalType};

pub fn router(deps: Arc<HubAppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/state", get(state_snapshot))
        .route("/api/signal", post(post_signal))
        .route("/api/whale/alert", post(post_whale_alert))
        .route("/api/token/launch", post(post_token_launch))
        .route("/api/mev/opportunity", post(post_mev_opportunity))
        .route("/api/gas/update", post(post_gas_update))
        .route("/api/agent/heartbeat", post(post_heartbeat))
        .route("/api/ws", get(crate::hub::ws::ws_handler))
        .layer(cors)
        .with_state(deps)
}

/// `GET /health` (§6): process-liveness probe with enough of the fleet's
/// shape for an operator glance — not the full state snapshot.
async fn health(State(deps): State<Arc<HubAppState>>) -> impl IntoResponse {
    let state = &deps.state;
    let confluence_agents = state.confluence().map(|c| c.contributing).unwrap_or(0);
    Json(serde_json::json!({
        "status": "ok",
        "uptime": state.uptime_ms(),
        "agents": state.heartbeats.read().len(),
        "connections": state.connections(),
        "currentToken": state.focal_token(),
        "confluenceAgents": confluence_agents,
    }))
}

/// `GET /api/state` (§6, §8 round-trip property): the hub's full readable
/// state — agent roster, current consensus, lifetime counters, and recent
/// signals/alerts for the focal token.
async fn state_snapshot(State(deps): State<Arc<HubAppState>>) -> impl IntoResponse {
    let state = &deps.state;
    let confluence = state.confluence().map(|c| {
        serde_json::json!({
            "label": c.label,
            "strength": c.strength,
            "normalized": c.normalized,
            "contributing": c.contributing,
        })
    });
    Json(serde_json::json!({
        "uptime": state.uptime_ms(),
        "agents": state.agents_snapshot(),
        "confluence": confluence,
        "totalSignals": state.total_signals(),
        "totalAlerts": state.total_whale_alerts(),
        "totalLaunches": state.total_token_launches(),
        "totalMev": state.total_mev_opportunities(),
        "recentSignals": state.recent_signals(20),
        "recentAlerts": state.recent_alerts(20),
        "currentToken": state.focal_token(),
    }))
}

#[derive(Debug, Deserialize)]
struct SignalPayload {
    #[serde(rename = "agentName")]
    agent_name: String,
    #[serde(rename = "type")]
    signal_type: SignalType,
    confidence: f64,
    price: f64,
    #[serde(default)]
    reason: String,
    category: Category,
    #[serde(flatten)]
    extra: serde_json::Map<String, Value>,
}

async fn post_signal(State(deps): State<Arc<HubAppState>>, Json(payload): Json<SignalPayload>) -> impl IntoResponse {
    if !(0.0..=100.0).contains(&payload.confidence) {
        return (StatusCode::BAD_REQUEST, "confidence out of range").into_response();
    }
    let signal = Signal {
        agent_name: payload.agent_name,
        signal_type: payload.signal_type,
        confidence: payload.confidence,
        price: payload.price,
        reason: payload.reason,
        category: payload.category,
        received_at: 0,
        extra: payload.extra,
    };
    deps.state.ingest_signal(signal);
    StatusCode::ACCEPTED.into_response()
}

async fn post_whale_alert(State(deps): State<Arc<HubAppState>>, Json(payload): Json<Value>) -> impl IntoResponse {
    deps.state.ingest_whale_alert(payload);
    StatusCode::ACCEPTED
}

async fn post_token_launch(State(deps): State<Arc<HubAppState>>, Json(payload): Json<Value>) -> impl IntoResponse {
    deps.state.ingest_token_launch(payload);
    StatusCode::ACCEPTED
}

async fn post_mev_opportunity(State(deps): State<Arc<HubAppState>>, Json(payload): Json<Value>) -> impl IntoResponse {
    deps.state.ingest_mev_opportunity(payload);
    StatusCode::ACCEPTED
}

async fn post_gas_update(State(deps): State<Arc<HubAppState>>, Json(payload): Json<Value>) -> impl IntoResponse {
    deps.state.ingest_gas_update(payload);
    StatusCode::ACCEPTED
}

#[derive(Debug, Deserialize)]
struct HeartbeatPayload {
    #[serde(rename = "agentName")]
    agent_name: String,
}

async fn post_heartbeat(State(deps): State<Arc<HubAppState>>, Json(payload): Json<HeartbeatPayload>) -> impl IntoResponse {
    deps.state.ingest_heartbeat(payload.agent_name);
    StatusCode::ACCEPTED
}
