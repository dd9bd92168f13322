// =============================================================================
// Hub WebSocket — one named event per ingress, plus client-initiated analyze
// =============================================================================
//
// Unlike the teacher's version-polled full-snapshot feed, this protocol pushes
// exactly one event per ingress (§4.7): on connect the client gets a `state`
// event; thereafter every signal/alert/heartbeat/analysis ingested anywhere in
// the process is forwarded verbatim. Clients may send `{"type":"token:analyze",
// "token":"0x..."}` to request an out-of-band analysis cycle.
// =============================================================================

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::hub::analysis::{analyze_token, start_analysis_loop, ANALYSIS_INTERVAL};
use crate::hub::HubAppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    #[serde(rename = "token:analyze")]
    TokenAnalyze { token: String },
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(deps): State<Arc<HubAppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, deps))
}

async fn handle_connection(socket: WebSocket, deps: Arc<HubAppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = deps.state.broadcast.subscribe();
    deps.state.connection_opened();

    let initial = serde_json::json!({ "event": "state", "payload": deps.state.initial_state_snapshot() });
    if sender.send(Message::Text(initial.to_string())).await.is_err() {
        deps.state.connection_closed();
        return;
    }

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(value) => {
                        if sender.send(Message::Text(value.to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "ws consumer lagged, events dropped");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::TokenAnalyze { token }) => {
                                deps.state.set_focal_token(&token);

                                let new_handle = start_analysis_loop(
                                    deps.state.clone(),
                                    deps.chain.clone(),
                                    deps.price_service.clone(),
                                    deps.advisor.clone(),
                                    token.clone(),
                                    ANALYSIS_INTERVAL,
                                );
                                std::mem::replace(&mut *deps.analysis_handle.lock(), new_handle).abort();

                                let state = deps.state.clone();
                                let chain = deps.chain.clone();
                                let price_service = deps.price_service.clone();
                                let advisor = deps.advisor.clone();
                                tokio::spawn(async move {
                                    analyze_token(&state, &chain, &price_service, advisor.as_deref(), &token).await;
                                });
                            }
                            Err(e) => debug!(error = %e, "unrecognized ws client message"),
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(error = %e, "ws recv error — disconnecting");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
    deps.state.connection_closed();
    info!("ws connection closed");
}
