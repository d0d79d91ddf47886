//! WebSocket upgrade handler.

use std::sync::Arc;

use axum::Json;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use pulse_realtime::connection::handle::ConnectionHandle;
use pulse_realtime::error::AdmissionError;

use crate::state::AppState;

/// Query parameters for the WebSocket handshake.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// Bearer credential.
    pub token: Option<String>,
}

/// GET /ws?token={jwt} — WebSocket upgrade.
///
/// Admission runs before the upgrade so rejected handshakes get a proper
/// HTTP status and reason code instead of a doomed socket.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Response {
    match state.engine.gate.admit(query.token.as_deref()).await {
        Ok((handle, outbound)) => {
            ws.on_upgrade(move |socket| handle_ws_connection(state, handle, outbound, socket))
        }
        Err(err) => rejection_response(err),
    }
}

fn rejection_response(err: AdmissionError) -> Response {
    let status = match err {
        AdmissionError::AuthRequired
        | AdmissionError::InvalidToken
        | AdmissionError::TokenExpired => StatusCode::UNAUTHORIZED,
        AdmissionError::TemporaryBan => StatusCode::FORBIDDEN,
        AdmissionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = serde_json::json!({
        "code": err.code(),
        "message": err.to_string(),
    });

    (status, Json(body)).into_response()
}

/// Bridges an established WebSocket to the gateway engine.
async fn handle_ws_connection(
    state: AppState,
    handle: Arc<ConnectionHandle>,
    mut outbound: mpsc::Receiver<String>,
    socket: WebSocket,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let identity = handle.identity;
    let conn_id = handle.id;

    info!(identity = %identity, conn_id = %conn_id, "WebSocket session established");

    // Forward engine-originated frames to the client.
    let forwarder = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => {
                state.engine.handle_inbound(identity, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            // Liveness counts every inbound frame, whatever its type.
            Ok(_) => handle.touch(),
            Err(e) => {
                warn!(identity = %identity, conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }

        if !handle.is_alive() {
            // Replaced by a reconnect or force-disconnected.
            break;
        }
    }

    forwarder.abort();
    state.engine.registry.remove_exact(&identity, conn_id).await;

    info!(identity = %identity, conn_id = %conn_id, "WebSocket session closed");
}
