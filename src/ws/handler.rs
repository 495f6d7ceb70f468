//! WebSocket upgrade handler (host side)

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::{PeerEvent, SessionEvent};
use crate::util::rate_limit::PeerRateLimiter;
use crate::ws::protocol::SyncMessage;
use crate::ws::{report_closed, ConnectionId, PeerLink, OUTBOUND_BUFFER};

/// WebSocket upgrade handler. Only one opponent may be connected at a time.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.link.is_attached() {
        warn!("Refusing second peer connection");
        return (StatusCode::CONFLICT, "Duel already has an opponent").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);

    let conn = match state.link.attach(outbound_tx) {
        Ok(conn) => conn,
        Err(e) => {
            warn!(error = %e, "Peer connection rejected");
            let _ = socket.close().await;
            return;
        }
    };

    info!(session_id = %state.handle.id, conn, "Opponent connected");

    // Open is queued before the reader exists, so Closed can never overtake it
    let events_tx = state.handle.events();
    if events_tx.send(SessionEvent::Peer(PeerEvent::Open)).await.is_err() {
        state.link.detach(conn);
        return;
    }

    let (ws_sink, ws_stream) = socket.split();
    let writer = tokio::spawn(run_writer(ws_sink, outbound_rx));
    let reader = tokio::spawn(run_reader(ws_stream, events_tx, state.link.clone(), conn));
    state.link.track(writer);
    state.link.track(reader);
}

/// Duel loop -> WebSocket
async fn run_writer(
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<SyncMessage>,
) {
    while let Some(msg) = outbound_rx.recv().await {
        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            debug!(error = %e, "WebSocket send failed");
            break;
        }
    }

    // Outbound side dropped: the link was detached or torn down
    let _ = ws_sink.send(Message::Close(None)).await;
}

/// WebSocket -> duel loop
async fn run_reader(
    mut ws_stream: SplitStream<WebSocket>,
    events_tx: mpsc::Sender<SessionEvent>,
    link: PeerLink,
    conn: ConnectionId,
) {
    let rate_limiter = PeerRateLimiter::new();

    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_inbound() {
                    warn!("Rate limited peer message");
                    continue;
                }

                match serde_json::from_str::<SyncMessage>(&text) {
                    Ok(msg) => {
                        let event = SessionEvent::Peer(PeerEvent::Message(msg));
                        if events_tx.send(event).await.is_err() {
                            debug!("Duel loop gone");
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to parse peer message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!("Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!("Opponent closed the connection");
                break;
            }
            Err(e) => {
                error!(error = %e, "WebSocket error");
                let _ = events_tx
                    .send(SessionEvent::Peer(PeerEvent::Error(e.to_string())))
                    .await;
                break;
            }
        }
    }

    report_closed(&link, conn, &events_tx).await;
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &SyncMessage,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
