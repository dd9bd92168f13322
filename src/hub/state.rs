// =============================================================================
// Hub State — central in-process store for the fleet's ingress events
// =============================================================================
//
// Mirrors the shape of the teacher's AppState: every mutable collection lives
// behind its own parking_lot::RwLock, subsystems are reached through Arc, and
// a single broadcast channel fans state changes out to connected sockets.
// =============================================================================

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::hub::analysis::AnalysisResult;
use crate::hub::consensus::{compute_consensus, ConsensusResult};
use crate::types::Signal;

pub const SIGNALS_CAP: usize = 100;
pub const ALERTS_CAP: usize = 50;
pub const PRICE_HISTORY_CAP: usize = 200;
/// Broadcast to sockets under this name on every ingress; see §4.7.
pub const WS_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
pub struct Heartbeat {
    pub agent_name: String,
    pub received_at: i64,
}

/// A bounded ring that drops the oldest element once full (§3 "caps").
pub struct Ring<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> Ring<T> {
    pub fn new(capacity: usize) -> Self {
        Self { items: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, item: T) {
        self.items.push_back(item);
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub struct HubState {
    pub signals: RwLock<Ring<Signal>>,
    /// Latest signal per agent name, overwritten on every `/api/signal` post.
    pub agent_signals: RwLock<HashMap<String, Signal>>,
    pub whale_alerts: RwLock<Ring<Value>>,
    pub token_launches: RwLock<Ring<Value>>,
    pub mev_opportunities: RwLock<Ring<Value>>,
    pub gas_updates: RwLock<Ring<Value>>,
    pub heartbeats: RwLock<HashMap<String, Heartbeat>>,
    pub price_histories: RwLock<HashMap<String, VecDeque<f64>>>,
    pub volume_histories: RwLock<HashMap<String, VecDeque<f64>>>,
    pub analysis_cache: RwLock<HashMap<String, AnalysisResult>>,
    pub focal_token: RwLock<String>,
    pub event_sequence: AtomicU64,
    pub broadcast: broadcast::Sender<Value>,
    start_time_ms: i64,
    total_signals: AtomicU64,
    total_whale_alerts: AtomicU64,
    total_token_launches: AtomicU64,
    total_mev_opportunities: AtomicU64,
    connections: AtomicU64,
}

impl HubState {
    pub fn new(focal_token: &str) -> Self {
        let (tx, _rx) = broadcast::channel(WS_EVENT_CAPACITY);
        Self {
            signals: RwLock::new(Ring::new(SIGNALS_CAP)),
            agent_signals: RwLock::new(HashMap::new()),
            whale_alerts: RwLock::new(Ring::new(ALERTS_CAP)),
            token_launches: RwLock::new(Ring::new(ALERTS_CAP)),
            mev_opportunities: RwLock::new(Ring::new(ALERTS_CAP)),
            gas_updates: RwLock::new(Ring::new(ALERTS_CAP)),
            heartbeats: RwLock::new(HashMap::new()),
            price_histories: RwLock::new(HashMap::new()),
            volume_histories: RwLock::new(HashMap::new()),
            analysis_cache: RwLock::new(HashMap::new()),
            focal_token: RwLock::new(focal_token.to_lowercase()),
            event_sequence: AtomicU64::new(0),
            broadcast: tx,
            start_time_ms: Utc::now().timestamp_millis(),
            total_signals: AtomicU64::new(0),
            total_whale_alerts: AtomicU64::new(0),
            total_token_launches: AtomicU64::new(0),
            total_mev_opportunities: AtomicU64::new(0),
            connections: AtomicU64::new(0),
        }
    }

    pub fn focal_token(&self) -> String {
        self.focal_token.read().clone()
    }

    /// Retarget the focal token (§4.7 `token:analyze`): the self-analysis
    /// loop and every snapshot accessor read this on their next cycle/call.
    pub fn set_focal_token(&self, token: &str) {
        *self.focal_token.write() = token.to_lowercase();
    }

    pub fn uptime_ms(&self) -> i64 {
        Utc::now().timestamp_millis() - self.start_time_ms
    }

    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    pub fn connection_opened(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn total_signals(&self) -> u64 {
        self.total_signals.load(Ordering::Relaxed)
    }

    pub fn total_whale_alerts(&self) -> u64 {
        self.total_whale_alerts.load(Ordering::Relaxed)
    }

    pub fn total_token_launches(&self) -> u64 {
        self.total_token_launches.load(Ordering::Relaxed)
    }

    pub fn total_mev_opportunities(&self) -> u64 {
        self.total_mev_opportunities.load(Ordering::Relaxed)
    }

    /// `{name, lastHeartbeat, isAlive}` per registered agent, for `/api/state`.
    pub fn agents_snapshot(&self) -> Value {
        let now = Utc::now().timestamp_millis();
        let heartbeats = self.heartbeats.read();
        let agents: Vec<Value> = heartbeats
            .values()
            .map(|hb| {
                serde_json::json!({
                    "name": hb.agent_name,
                    "lastHeartbeat": hb.received_at,
                    "isAlive": now - hb.received_at < 120_000,
                })
            })
            .collect();
        Value::Array(agents)
    }

    /// Current weighted-vote consensus over fresh agent signals, or `None`
    /// when nothing fresh is contributing.
    pub fn confluence(&self) -> Option<ConsensusResult> {
        let now = Utc::now().timestamp_millis();
        let signals: Vec<Signal> = self.agent_signals.read().values().cloned().collect();
        compute_consensus(&signals, now)
    }

    pub fn recent_signals(&self, limit: usize) -> Vec<Signal> {
        let signals = self.signals.read();
        let len = signals.len();
        signals.iter().rev().take(limit.min(len)).rev().cloned().collect()
    }

    pub fn recent_alerts(&self, limit: usize) -> Vec<Value> {
        let alerts = self.whale_alerts.read();
        let len = alerts.len();
        alerts.iter().rev().take(limit.min(len)).rev().cloned().collect()
    }

    /// Record a price/volume sample for a token's history ring (cap 200).
    pub fn record_price(&self, token: &str, price: f64, volume: f64) {
        let key = token.to_lowercase();
        {
            let mut prices = self.price_histories.write();
            let ring = prices.entry(key.clone()).or_insert_with(|| VecDeque::with_capacity(PRICE_HISTORY_CAP));
            ring.push_back(price);
            while ring.len() > PRICE_HISTORY_CAP {
                ring.pop_front();
            }
        }
        {
            let mut volumes = self.volume_histories.write();
            let ring = volumes.entry(key).or_insert_with(|| VecDeque::with_capacity(PRICE_HISTORY_CAP));
            ring.push_back(volume);
            while ring.len() > PRICE_HISTORY_CAP {
                ring.pop_front();
            }
        }
    }

    pub fn price_history(&self, token: &str) -> Vec<f64> {
        self.price_histories.read().get(&token.to_lowercase()).map(|r| r.iter().copied().collect()).unwrap_or_default()
    }

    pub fn volume_history(&self, token: &str) -> Vec<f64> {
        self.volume_histories.read().get(&token.to_lowercase()).map(|r| r.iter().copied().collect()).unwrap_or_default()
    }

    /// Ingest one signal: append to the bounded ring, stamp `received_at`,
    /// overwrite the agent's latest entry, and broadcast (§4.7 — atomic per
    /// event: single-writer discipline under the lock, broadcast fires once
    /// the write completes).
    pub fn ingest_signal(&self, mut signal: Signal) {
        signal.received_at = Utc::now().timestamp_millis();
        self.agent_signals.write().insert(signal.agent_name.clone(), signal.clone());
        self.signals.write().push(signal.clone());
        self.total_signals.fetch_add(1, Ordering::Relaxed);
        self.broadcast_event("signal", serde_json::to_value(&signal).unwrap_or(Value::Null));
    }

    pub fn ingest_whale_alert(&self, alert: Value) {
        self.whale_alerts.write().push(alert.clone());
        self.total_whale_alerts.fetch_add(1, Ordering::Relaxed);
        self.broadcast_event("whale:alert", alert);
    }

    pub fn ingest_token_launch(&self, launch: Value) {
        self.token_launches.write().push(launch.clone());
        self.total_token_launches.fetch_add(1, Ordering::Relaxed);
        self.broadcast_event("token:launch", launch);
    }

    pub fn ingest_mev_opportunity(&self, opp: Value) {
        self.mev_opportunities.write().push(opp.clone());
        self.total_mev_opportunities.fetch_add(1, Ordering::Relaxed);
        self.broadcast_event("mev:opportunity", opp);
    }

    pub fn ingest_gas_update(&self, update: Value) {
        self.gas_updates.write().push(update.clone());
        self.broadcast_event("gas:update", update);
    }

    pub fn ingest_heartbeat(&self, agent_name: String) {
        let hb = Heartbeat { agent_name: agent_name.clone(), received_at: Utc::now().timestamp_millis() };
        self.heartbeats.write().insert(agent_name, hb.clone());
        self.broadcast_event("agent:heartbeat", serde_json::to_value(&hb).unwrap_or(Value::Null));
    }

    pub fn broadcast_event(&self, event: &str, payload: Value) {
        self.event_sequence.fetch_add(1, Ordering::Relaxed);
        let envelope = serde_json::json!({ "event": event, "payload": payload });
        // No subscribers is the common case between socket connections; the
        // send error is not actionable.
        let _ = self.broadcast.send(envelope);
    }

    /// Initial `state` event payload sent to a newly connected socket (§4.7):
    /// at most 20 signals overall, at most 10 per category, at most 10 of
    /// each other alert-like category, focal token, and any cached analysis
    /// for it.
    pub fn initial_state_snapshot(&self) -> Value {
        let signals = self.signals.read();
        let mut per_category: HashMap<String, usize> = HashMap::new();
        let mut capped: Vec<&Signal> = Vec::new();
        for s in signals.iter().rev() {
            let count = per_category.entry(s.category.to_string()).or_insert(0);
            if *count >= 10 || capped.len() >= 20 {
                continue;
            }
            *count += 1;
            capped.push(s);
        }
        capped.reverse();

        let focal_token = self.focal_token();
        let analysis = self.analysis_cache.read().get(&focal_token).cloned();

        let last_n = |ring: &Ring<Value>| -> Vec<Value> {
            let len = ring.len();
            ring.iter().rev().take(10.min(len)).rev().cloned().collect::<Vec<_>>()
        };

        serde_json::json!({
            "signals": capped,
            "focalToken": focal_token,
            "analysis": analysis,
            "whaleAlerts": last_n(&self.whale_alerts.read()),
            "tokenLaunches": last_n(&self.token_launches.read()),
            "mevOpportunities": last_n(&self.mev_opportunities.read()),
            "gasUpdates": last_n(&self.gas_updates.read()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_drops_oldest_once_full() {
        let mut ring: Ring<i32> = Ring::new(3);
        for i in 0..5 {
            ring.push(i);
        }
        let items: Vec<_> = ring.iter().copied().collect();
        assert_eq!(items, vec![2, 3, 4]);
    }

    #[test]
    fn price_history_capped_at_200() {
        let state = HubState::new("0xfocal");
        for i in 0..250 {
            state.record_price("0xfocal", i as f64, 1.0);
        }
        assert_eq!(state.price_history("0xfocal").len(), PRICE_HISTORY_CAP);
    }

    #[test]
    fn set_focal_token_retargets_state() {
        let state = HubState::new("0xfocal");
        assert_eq!(state.focal_token(), "0xfocal");
        state.set_focal_token("0xOTHER");
        assert_eq!(state.focal_token(), "0xother");
    }

    #[test]
    fn initial_snapshot_includes_capped_alert_rings() {
        let state = HubState::new("0xfocal");
        for i in 0..15 {
            state.ingest_whale_alert(serde_json::json!({ "i": i }));
            state.ingest_token_launch(serde_json::json!({ "i": i }));
            state.ingest_mev_opportunity(serde_json::json!({ "i": i }));
            state.ingest_gas_update(serde_json::json!({ "i": i }));
        }
        let snapshot = state.initial_state_snapshot();
        assert_eq!(snapshot["whaleAlerts"].as_array().unwrap().len(), 10);
        assert_eq!(snapshot["tokenLaunches"].as_array().unwrap().len(), 10);
        assert_eq!(snapshot["mevOpportunities"].as_array().unwrap().len(), 10);
        assert_eq!(snapshot["gasUpdates"].as_array().unwrap().len(), 10);
        assert_eq!(state.total_whale_alerts(), 15);
    }
}
