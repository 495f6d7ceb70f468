//! Peer transport - wire protocol, host upgrade handler and client connector

pub mod client;
pub mod handler;
pub mod protocol;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::game::{PeerEvent, SessionEvent};
use protocol::SyncMessage;

/// Outbound frames buffered per connection
pub const OUTBOUND_BUFFER: usize = 64;

/// Identifies one attached connection for the lifetime of a link
pub type ConnectionId = u64;

/// Peer link errors
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("No peer attached")]
    NotAttached,

    #[error("A peer is already attached")]
    Occupied,

    #[error("Peer link has been torn down")]
    TornDown,

    #[error("Outbound queue is full")]
    Full,
}

#[derive(Default)]
struct LinkSlot {
    outbound: Option<(ConnectionId, mpsc::Sender<SyncMessage>)>,
    next_id: ConnectionId,
    tasks: Vec<JoinHandle<()>>,
    torn_down: bool,
}

impl LinkSlot {
    fn live(&self) -> Option<&mpsc::Sender<SyncMessage>> {
        self.outbound
            .as_ref()
            .map(|(_, tx)| tx)
            .filter(|tx| !tx.is_closed())
    }
}

/// The single connection between host and client. The duel loop writes through it;
/// the transport tasks attach to it.
#[derive(Clone, Default)]
pub struct PeerLink {
    slot: Arc<Mutex<LinkSlot>>,
}

impl PeerLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for a new connection
    pub fn attach(&self, outbound: mpsc::Sender<SyncMessage>) -> Result<ConnectionId, LinkError> {
        let mut slot = self.slot.lock();
        if slot.torn_down {
            return Err(LinkError::TornDown);
        }
        if slot.live().is_some() {
            return Err(LinkError::Occupied);
        }

        slot.tasks.retain(|task| !task.is_finished());
        slot.next_id += 1;
        let id = slot.next_id;
        slot.outbound = Some((id, outbound));
        Ok(id)
    }

    /// Register a transport task so teardown can cancel it
    pub fn track(&self, task: JoinHandle<()>) {
        let mut slot = self.slot.lock();
        if slot.torn_down {
            task.abort();
        } else {
            slot.tasks.push(task);
        }
    }

    /// Release the slot after connection `id` closed. Returns false when a newer
    /// connection already owns it.
    pub fn detach(&self, id: ConnectionId) -> bool {
        let mut slot = self.slot.lock();
        let owned = matches!(slot.outbound, Some((current, _)) if current == id);
        if owned {
            slot.outbound = None;
        }
        owned
    }

    pub fn is_attached(&self) -> bool {
        self.slot.lock().live().is_some()
    }

    /// Queue a message for the peer without waiting
    pub fn send(&self, msg: SyncMessage) -> Result<(), LinkError> {
        let slot = self.slot.lock();
        let (_, tx) = slot.outbound.as_ref().ok_or(LinkError::NotAttached)?;
        tx.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => LinkError::Full,
            mpsc::error::TrySendError::Closed(_) => LinkError::NotAttached,
        })
    }

    /// Close the connection for good. Returns true only the first time.
    pub fn teardown(&self) -> bool {
        let mut slot = self.slot.lock();
        if slot.torn_down {
            return false;
        }
        slot.torn_down = true;

        // Dropping the sender lets the writer flush a close frame
        slot.outbound = None;
        for task in slot.tasks.drain(..) {
            task.abort();
        }
        info!("Peer link torn down");
        true
    }
}

/// Release the slot for a finished connection and tell the duel loop. A connection
/// that was already replaced closes silently.
pub(crate) async fn report_closed(
    link: &PeerLink,
    conn: ConnectionId,
    events_tx: &mpsc::Sender<SessionEvent>,
) {
    if link.detach(conn) {
        let _ = events_tx.send(SessionEvent::Peer(PeerEvent::Closed)).await;
    } else {
        debug!(conn, "Replaced connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::Move;

    fn commit() -> SyncMessage {
        SyncMessage::MoveCommit { mv: Move::Block }
    }

    #[test]
    fn send_needs_a_peer() {
        let link = PeerLink::new();
        assert!(matches!(link.send(commit()), Err(LinkError::NotAttached)));
    }

    #[test]
    fn attached_peer_receives() {
        let link = PeerLink::new();
        let (tx, mut rx) = mpsc::channel(4);
        link.attach(tx).unwrap();

        link.send(commit()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), commit());
    }

    #[test]
    fn second_peer_is_refused() {
        let link = PeerLink::new();
        let (first, _first_rx) = mpsc::channel(4);
        let (second, _second_rx) = mpsc::channel(4);
        link.attach(first).unwrap();
        assert!(matches!(link.attach(second), Err(LinkError::Occupied)));
    }

    #[test]
    fn slot_frees_after_close() {
        let link = PeerLink::new();
        let (first, first_rx) = mpsc::channel(4);
        link.attach(first).unwrap();
        drop(first_rx);
        assert!(!link.is_attached());

        let (second, _second_rx) = mpsc::channel(4);
        link.attach(second).unwrap();
        assert!(link.is_attached());
    }

    #[test]
    fn late_cleanup_keeps_the_newer_peer() {
        let link = PeerLink::new();
        let (first, first_rx) = mpsc::channel(4);
        let first_id = link.attach(first).unwrap();
        drop(first_rx);

        let (second, mut second_rx) = mpsc::channel(4);
        let second_id = link.attach(second).unwrap();
        assert_ne!(first_id, second_id);

        // First connection's reader finishes after the second one attached
        assert!(!link.detach(first_id));
        assert!(link.is_attached());
        link.send(commit()).unwrap();
        assert_eq!(second_rx.try_recv().unwrap(), commit());

        assert!(link.detach(second_id));
        assert!(!link.detach(second_id));
        assert!(matches!(link.send(commit()), Err(LinkError::NotAttached)));
    }

    #[tokio::test]
    async fn replaced_connection_closes_silently() {
        let link = PeerLink::new();
        let (events_tx, mut events_rx) = mpsc::channel(4);

        let (first, first_rx) = mpsc::channel(4);
        let first_id = link.attach(first).unwrap();
        drop(first_rx);
        let (second, _second_rx) = mpsc::channel(4);
        let second_id = link.attach(second).unwrap();

        report_closed(&link, first_id, &events_tx).await;
        assert!(events_rx.try_recv().is_err());
        assert!(link.is_attached());

        report_closed(&link, second_id, &events_tx).await;
        assert!(matches!(
            events_rx.try_recv(),
            Ok(SessionEvent::Peer(PeerEvent::Closed))
        ));
    }

    #[test]
    fn full_queue_is_reported() {
        let link = PeerLink::new();
        let (tx, _rx) = mpsc::channel(1);
        link.attach(tx).unwrap();
        link.send(commit()).unwrap();
        assert!(matches!(link.send(commit()), Err(LinkError::Full)));
    }

    #[tokio::test]
    async fn teardown_happens_once() {
        let link = PeerLink::new();
        let (tx, mut rx) = mpsc::channel(4);
        link.attach(tx).unwrap();
        let task = tokio::spawn(std::future::pending::<()>());
        link.track(task);

        assert!(link.teardown());
        assert!(!link.teardown());
        assert!(rx.recv().await.is_none());

        let (again, _again_rx) = mpsc::channel(4);
        assert!(matches!(link.attach(again), Err(LinkError::TornDown)));
    }
}
