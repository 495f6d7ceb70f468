//! WebSocket connector (client side)

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::game::{PeerEvent, SessionEvent};
use crate::ws::protocol::SyncMessage;
use crate::ws::{report_closed, ConnectionId, PeerLink, OUTBOUND_BUFFER};

type HostSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dial the host in the background. Failures surface as peer events.
pub fn spawn_connector(url: String, link: PeerLink, events_tx: mpsc::Sender<SessionEvent>) {
    let task_link = link.clone();
    let task = tokio::spawn(async move {
        info!(url = %url, "Connecting to host");

        let socket = match connect_async(url.as_str()).await {
            Ok((socket, _)) => socket,
            Err(e) => {
                error!(url = %url, error = %e, "Failed to connect to host");
                let _ = events_tx
                    .send(SessionEvent::Peer(PeerEvent::Error(e.to_string())))
                    .await;
                let _ = events_tx.send(SessionEvent::Peer(PeerEvent::Closed)).await;
                return;
            }
        };

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let conn = match task_link.attach(outbound_tx) {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "Connected after the link was closed");
                return;
            }
        };

        info!(url = %url, conn, "Connected to host");
        let (write, read) = socket.split();
        let writer = tokio::spawn(run_writer(write, outbound_rx));
        task_link.track(writer);

        let _ = events_tx.send(SessionEvent::Peer(PeerEvent::Open)).await;
        run_reader(read, events_tx, task_link, conn).await;
    });

    link.track(task);
}

async fn run_writer(
    mut write: SplitSink<HostSocket, Message>,
    mut outbound_rx: mpsc::Receiver<SyncMessage>,
) {
    while let Some(msg) = outbound_rx.recv().await {
        let json = match serde_json::to_string(&msg) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "Failed to encode message");
                continue;
            }
        };
        if let Err(e) = write.send(Message::Text(json)).await {
            debug!(error = %e, "WebSocket send failed");
            break;
        }
    }

    let _ = write.send(Message::Close(None)).await;
}

async fn run_reader(
    mut read: SplitStream<HostSocket>,
    events_tx: mpsc::Sender<SessionEvent>,
    link: PeerLink,
    conn: ConnectionId,
) {
    while let Some(result) = read.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<SyncMessage>(&text) {
                Ok(msg) => {
                    if events_tx
                        .send(SessionEvent::Peer(PeerEvent::Message(msg)))
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                Err(e) => warn!(error = %e, "Failed to parse host message"),
            },
            Ok(Message::Close(_)) => {
                info!("Host closed the connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "WebSocket read error");
                let _ = events_tx
                    .send(SessionEvent::Peer(PeerEvent::Error(e.to_string())))
                    .await;
                break;
            }
        }
    }

    report_closed(&link, conn, &events_tx).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn unreachable_host_reports_error_then_close() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (events_tx, mut events_rx) = mpsc::channel(8);
        let link = PeerLink::new();
        spawn_connector(format!("ws://{addr}/ws"), link.clone(), events_tx);

        let mut events = Vec::new();
        for _ in 0..2 {
            match tokio::time::timeout(Duration::from_secs(5), events_rx.recv()).await {
                Ok(Some(SessionEvent::Peer(event))) => events.push(event),
                other => panic!("expected a peer event, got {other:?}"),
            }
        }

        assert!(matches!(events[0], PeerEvent::Error(_)));
        assert!(matches!(events[1], PeerEvent::Closed));
        assert!(!link.is_attached());
    }
}
