//! Push subscription endpoints (`GET /v2/stream/...`).
//!
//! An `axum::extract::ws` upgrade whose handler loop forwards whatever
//! the engine's event-bus channels hand it straight to the socket,
//! carrying pre-encoded GalacticBuf bytes as opaque binary frames instead
//! of typed JSON messages, since the wire codec is this system's one
//! response envelope. The handshake is axum's native upgrade machinery;
//! the framing bytes placed on the wire afterward are what matters.
//!
//! A subscriber that can't keep up or disconnects is reaped the next time
//! a send fails — there is no explicit heartbeat/ping loop.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};

use crate::errors::ExchangeError;
use crate::AppState;

/// `GET /v2/stream/trades` — every V2 trade, in publish order.
pub async fn trades(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let rx = state.engine.events.subscribe_trades();
    ws.on_upgrade(move |socket| forward_broadcast(socket, rx))
}

/// `GET /v2/stream/order-book` — every ADD/MODIFY/REMOVE book delta,
/// across all contracts, in publish order.
pub async fn order_book(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let rx = state.engine.events.subscribe_order_book();
    ws.on_upgrade(move |socket| forward_broadcast(socket, rx))
}

#[derive(Debug, Deserialize)]
pub struct ExecutionReportsQuery {
    pub token: String,
}

/// `GET /v2/stream/execution-reports?token=…` — per-user execution
/// reports; the token must resolve to a user or the upgrade is refused
/// with an error response before any socket is opened.
pub async fn execution_reports(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(q): Query<ExecutionReportsQuery>,
) -> Result<Response, ExchangeError> {
    let username = state
        .engine
        .resolve_token(&q.token)
        .ok_or_else(|| ExchangeError::Unauthorized("invalid token".into()))?;
    let rx = state.engine.events.subscribe_execution_reports(&username);
    Ok(ws.on_upgrade(move |socket| forward_mpsc(socket, rx)))
}

/// Forwards every message from a broadcast receiver to the socket as a
/// binary frame until the peer closes or the channel lags/closes.
async fn forward_broadcast(mut socket: WebSocket, mut rx: broadcast::Receiver<Vec<u8>>) {
    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
            event = rx.recv() => {
                match event {
                    Ok(bytes) => {
                        if socket.send(WsMessage::Binary(bytes)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(missed = n, "stream subscriber lagged, dropping missed events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

/// Per-user variant: forwards a bounded mpsc channel instead of a
/// broadcast topic — execution reports are keyed per-owner.
async fn forward_mpsc(mut socket: WebSocket, mut rx: mpsc::Receiver<Vec<u8>>) {
    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
            event = rx.recv() => {
                match event {
                    Some(bytes) => {
                        if socket.send(WsMessage::Binary(bytes)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }
}
