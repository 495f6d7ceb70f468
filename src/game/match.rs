//! Duel loop - owns the session and carries out its effects

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::Presenter;
use crate::config::Config;
use crate::ws::{LinkError, PeerLink};

use super::clock::BeatClock;
use super::session::{Effect, Session};
use super::snapshot::SessionSnapshot;
use super::{DuelError, SessionEvent};

/// Cheap handle for feeding events to a running duel and reading its state
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    events_tx: mpsc::Sender<SessionEvent>,
    snapshot: Arc<RwLock<SessionSnapshot>>,
}

impl MatchHandle {
    /// Sender for the duel's event queue
    pub fn events(&self) -> mpsc::Sender<SessionEvent> {
        self.events_tx.clone()
    }

    /// Queue an event. Returns false if the duel has finished.
    pub async fn send(&self, event: SessionEvent) -> bool {
        self.events_tx.send(event).await.is_ok()
    }

    /// State as of the last handled event
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.read().clone()
    }

    /// Handle over a bare event queue with no duel loop draining it
    #[cfg(test)]
    pub(crate) fn from_queue(events_tx: mpsc::Sender<SessionEvent>) -> Self {
        let session = Session::new(super::Role::Host, 0);
        Self {
            id: session.id(),
            events_tx,
            snapshot: Arc::new(RwLock::new(session.snapshot())),
        }
    }
}

/// One duel, driven by a single task
pub struct DuelMatch {
    session: Session,
    events_rx: mpsc::Receiver<SessionEvent>,
    events_tx: mpsc::Sender<SessionEvent>,
    clock: BeatClock,
    finalize: Option<JoinHandle<()>>,
    gameover_delay: Duration,
    link: PeerLink,
    presenter: Arc<dyn Presenter>,
    snapshot: Arc<RwLock<SessionSnapshot>>,
}

impl DuelMatch {
    pub fn new(config: &Config, link: PeerLink, presenter: Arc<dyn Presenter>) -> (Self, MatchHandle) {
        let (events_tx, events_rx) = mpsc::channel(256);

        let seed = config.cpu_seed.unwrap_or_else(rand::random);
        let session = Session::new(config.role, seed);
        let snapshot = Arc::new(RwLock::new(session.snapshot()));

        let handle = MatchHandle {
            id: session.id(),
            events_tx: events_tx.clone(),
            snapshot: snapshot.clone(),
        };

        let duel = Self {
            session,
            events_rx,
            clock: BeatClock::new(config.beat_period(), events_tx.clone()),
            events_tx,
            finalize: None,
            gameover_delay: config.gameover_delay,
            link,
            presenter,
            snapshot,
        };

        (duel, handle)
    }

    /// Run until the session exits
    pub async fn run(mut self) -> Result<(), DuelError> {
        info!(
            session_id = %self.session.id(),
            role = ?self.session.role(),
            period_ms = self.clock.period().as_millis() as u64,
            "Duel loop started"
        );

        let mut done = self.apply_effects();
        self.publish();

        while !done {
            let Some(event) = self.events_rx.recv().await else {
                break;
            };

            let result = self.handle_event(event);
            if let Err(e) = &result {
                error!(session_id = %self.session.id(), error = %e, "Duel aborted");
                self.session.exit();
            }

            done = self.apply_effects();
            self.publish();
            result?;
        }

        self.clock.stop();
        if let Some(task) = self.finalize.take() {
            task.abort();
        }

        info!(session_id = %self.session.id(), "Duel loop finished");
        Ok(())
    }

    fn handle_event(&mut self, event: SessionEvent) -> Result<(), DuelError> {
        match event {
            SessionEvent::Beat { epoch } => {
                if !self.clock.is_current(epoch) {
                    debug!(epoch, "Dropping stale beat");
                    return Ok(());
                }
                self.session.on_beat()?;
            }
            SessionEvent::Command(command) => self.session.handle_command(command),
            SessionEvent::Peer(event) => self.session.on_peer_event(event),
            SessionEvent::Finalize => {
                self.finalize = None;
                self.session.finalize_match();
            }
        }
        Ok(())
    }

    /// Carry out queued effects. Returns true once the session asked to exit.
    fn apply_effects(&mut self) -> bool {
        let mut exit = false;

        for effect in self.session.take_effects() {
            match effect {
                Effect::Send(msg) => match self.link.send(msg) {
                    Ok(()) => {}
                    Err(LinkError::NotAttached) => debug!("No peer to sync with"),
                    Err(e) => warn!(error = %e, "Failed to queue peer message"),
                },
                Effect::Music(track) => self.presenter.on_music_change(track),
                Effect::StartClock => self.clock.start(),
                Effect::StopClock => {
                    self.clock.stop();
                }
                Effect::ScheduleFinalize => {
                    if let Some(task) = self.finalize.take() {
                        task.abort();
                    }
                    let delay = self.gameover_delay;
                    let tx = self.events_tx.clone();
                    self.finalize = Some(tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(SessionEvent::Finalize).await;
                    }));
                }
                Effect::CancelFinalize => {
                    if let Some(task) = self.finalize.take() {
                        task.abort();
                    }
                }
                Effect::TeardownPeer => {
                    self.link.teardown();
                }
                Effect::Exit => {
                    self.presenter.on_exit();
                    exit = true;
                }
            }
        }

        exit
    }

    fn publish(&self) {
        let snapshot = self.session.snapshot();
        self.presenter.render(&snapshot);
        *self.snapshot.write() = snapshot;
    }
}
