//! Session state machine - duel lifecycle, beat gating and turn resolution
//!
//! A `Session` never touches timers or sockets. Every mutation queues the side
//! effects it implies (`Effect`) and the owning loop in `r#match` carries them out.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ws::protocol::{BeatPhase, Combatant, Move, Phase, SyncMessage};

use super::resolver::{self, TurnVerdict};
use super::snapshot::{peer_view, SessionSnapshot};
use super::{cpu, Command, DuelError, PeerEvent, Role, WINS_TO_WIN};

/// Track identifier understood by the presentation layer
pub type TrackId = &'static str;

pub const TITLE_TRACK: TrackId = "titlescreen";
pub const BATTLE_TRACKS: [TrackId; 3] = ["song1", "song2", "song3"];
pub const VICTORY_TRACK: TrackId = "winner";

const GET_READY: &str = "Get Ready...";
const FIGHT: &str = "FIGHT!";
const CONNECTION_LOST: &str = "Connection Lost!";
const VICTORY: &str = "VICTORY!";
const DEFEAT: &str = "DEFEAT!";
const DRAW: &str = "DRAW!";

/// Full duel state from this side's point of view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct SessionState {
    pub phase: Phase,
    pub beat_phase: BeatPhase,
    pub self_combatant: Combatant,
    pub opponent_combatant: Combatant,
    pub self_wins: u32,
    pub opponent_wins: u32,
    pub self_message: String,
    pub opponent_message: String,
}

/// Side effect requested by the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Transmit to the remote peer
    Send(SyncMessage),
    /// Switch ambient audio; `None` means silence
    Music(Option<TrackId>),
    /// (Re)start the beat clock at the first beat
    StartClock,
    StopClock,
    /// Arm the game-over presentation delay
    ScheduleFinalize,
    CancelFinalize,
    /// Close the peer connection
    TeardownPeer,
    /// Hand control back to the outer menu
    Exit,
}

/// One duel session, parameterized by role
pub struct Session {
    id: Uuid,
    role: Role,
    state: SessionState,
    connected: bool,
    clock_running: bool,
    finalizing: bool,
    exited: bool,
    /// Host: latest commitment from the client since the last resolution
    pending_remote: Option<Move>,
    /// Client: our own commitment, kept apart from the synced display state
    local_selection: Option<Move>,
    rng: ChaCha8Rng,
    effects: Vec<Effect>,
}

impl Session {
    pub fn new(role: Role, seed: u64) -> Self {
        let id = Uuid::new_v4();
        info!(session_id = %id, role = ?role, "Session opened");

        Self {
            id,
            role,
            state: SessionState::default(),
            connected: false,
            clock_running: false,
            finalizing: false,
            exited: false,
            pending_remote: None,
            local_selection: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
            effects: vec![Effect::Music(Some(TITLE_TRACK))],
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &SessionState {
        &self.state
    }

    /// Drain effects queued since the last call
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            role: self.role,
            connected: self.connected,
            finalizing: self.finalizing,
            state: self.state.clone(),
        }
    }

    pub fn handle_command(&mut self, command: Command) {
        if self.exited {
            return;
        }

        match command {
            Command::Select(mv) => self.select_move(mv),
            Command::StartMatch => self.start_match(),
            Command::NextRound => self.next_round(),
            Command::Exit => self.exit(),
        }
    }

    /// MENU or GAMEOVER -> READY with both scores reset
    pub fn start_match(&mut self) {
        if !self.role.is_authoritative() {
            debug!(session_id = %self.id, "Only the host can start a match");
            return;
        }
        if !matches!(self.state.phase, Phase::Menu | Phase::GameOver) {
            return;
        }
        if self.role == Role::Host && !self.connected {
            info!(session_id = %self.id, "Waiting for an opponent before starting");
            return;
        }

        self.state.self_wins = 0;
        self.state.opponent_wins = 0;
        info!(session_id = %self.id, "Match started");
        self.start_round();
    }

    /// ROUND_OVER -> READY
    pub fn next_round(&mut self) {
        if !self.role.is_authoritative() || self.state.phase != Phase::RoundOver {
            return;
        }
        self.start_round();
    }

    fn start_round(&mut self) {
        self.state.self_combatant = Combatant::fresh();
        self.state.opponent_combatant = Combatant::fresh();
        self.pending_remote = None;
        self.set_messages(GET_READY, GET_READY);
        self.state.beat_phase = BeatPhase::FirstBeat;
        self.set_phase(Phase::Ready);
        self.start_clock();

        self.first_beat();
        self.sync_to_peer();
    }

    /// Advance one beat. Ignored unless this side owns a running clock.
    pub fn on_beat(&mut self) -> Result<(), DuelError> {
        if self.exited || !self.clock_running || !self.role.is_authoritative() {
            return Ok(());
        }
        if !matches!(self.state.phase, Phase::Ready | Phase::Playing) || self.finalizing {
            return Ok(());
        }

        self.state.beat_phase = self.state.beat_phase.next();
        debug!(session_id = %self.id, beat = ?self.state.beat_phase, phase = ?self.state.phase, "Beat");

        match self.state.beat_phase {
            BeatPhase::FirstBeat => {
                self.first_beat();
                self.sync_to_peer();
            }
            BeatPhase::SecondBeat | BeatPhase::RestBeat => self.sync_to_peer(),
            BeatPhase::ResolveBeat => match self.state.phase {
                Phase::Ready => {
                    self.set_phase(Phase::Playing);
                    self.set_messages(FIGHT, FIGHT);
                    self.sync_to_peer();
                }
                Phase::Playing => self.resolve_turn()?,
                _ => {}
            },
        }

        Ok(())
    }

    /// Start-of-cycle housekeeping: forget last moves, re-check the pending selection
    fn first_beat(&mut self) {
        let me = &mut self.state.self_combatant;
        if let Some(mv) = me.selected_move {
            if !me.can_select(mv) {
                me.selected_move = Some(Move::Reload);
            }
        }
        me.last_move = None;
        self.state.opponent_combatant.last_move = None;

        if self.state.phase == Phase::Playing {
            self.state.self_message.clear();
            self.state.opponent_message.clear();
        }
    }

    fn resolve_turn(&mut self) -> Result<(), DuelError> {
        let me = &self.state.self_combatant;
        let them = &self.state.opponent_combatant;

        let self_move = resolver::committed_move(me);
        let opponent_move = match self.role {
            Role::Local => cpu::choose_move(&mut self.rng, them.bullets, me.bullets),
            _ => resolver::remote_move(self.pending_remote.take(), them),
        };

        let result = resolver::resolve_turn(me, them, self_move, opponent_move)?;

        info!(
            session_id = %self.id,
            self_move = %result.self_move,
            opponent_move = %result.opponent_move,
            self_outcome = ?result.self_outcome,
            opponent_outcome = ?result.opponent_outcome,
            "Turn resolved"
        );

        self.state.self_combatant = result.self_combatant;
        self.state.opponent_combatant = result.opponent_combatant;
        self.state.self_message = result.self_message;
        self.state.opponent_message = result.opponent_message;
        self.record_verdict(result.verdict);

        // The resolve beat carries the resolved state, nothing else this tick
        self.sync_to_peer();
        Ok(())
    }

    fn record_verdict(&mut self, verdict: TurnVerdict) {
        match verdict {
            TurnVerdict::Continue => return,
            TurnVerdict::Draw => {}
            TurnVerdict::SelfWon => self.state.self_wins += 1,
            TurnVerdict::OpponentWon => self.state.opponent_wins += 1,
        }

        info!(
            session_id = %self.id,
            self_wins = self.state.self_wins,
            opponent_wins = self.state.opponent_wins,
            "Round over"
        );

        if self.state.self_wins >= WINS_TO_WIN || self.state.opponent_wins >= WINS_TO_WIN {
            self.finalizing = true;
            self.stop_clock();
            self.effects.push(Effect::ScheduleFinalize);
        } else {
            self.set_phase(Phase::RoundOver);
        }
    }

    /// Presentation delay elapsed: PLAYING -> GAMEOVER
    pub fn finalize_match(&mut self) {
        if !self.finalizing || self.exited {
            return;
        }
        self.finalizing = false;

        let (mine, theirs) = if self.state.self_wins > self.state.opponent_wins {
            (VICTORY, DEFEAT)
        } else if self.state.opponent_wins > self.state.self_wins {
            (DEFEAT, VICTORY)
        } else {
            (DRAW, DRAW)
        };
        self.set_messages(mine, theirs);
        self.set_phase(Phase::GameOver);
        self.sync_to_peer();
    }

    /// Commit a move for the next resolve beat
    pub fn select_move(&mut self, mv: Move) {
        if !matches!(self.state.phase, Phase::Ready | Phase::Playing) || self.finalizing {
            return;
        }
        if self.state.beat_phase == BeatPhase::ResolveBeat {
            debug!(session_id = %self.id, mv = %mv, "Too late, resolve beat");
            return;
        }
        if !self.state.self_combatant.can_select(mv) {
            debug!(session_id = %self.id, mv = %mv, "Move not available");
            return;
        }

        self.state.self_combatant.selected_move = Some(mv);
        if self.role == Role::Client {
            self.local_selection = Some(mv);
            self.effects.push(Effect::Send(SyncMessage::MoveCommit { mv }));
        }
    }

    pub fn on_peer_event(&mut self, event: PeerEvent) {
        if self.exited || self.role == Role::Local {
            return;
        }

        match event {
            PeerEvent::Open => {
                self.connected = true;
                info!(session_id = %self.id, "Peer connected");
                self.sync_to_peer();
            }
            PeerEvent::Message(msg) => self.on_peer_message(msg),
            PeerEvent::Closed => {
                if self.connected {
                    warn!(session_id = %self.id, "Peer connection lost");
                }
                self.connected = false;
                self.state.self_message = CONNECTION_LOST.to_string();
            }
            PeerEvent::Error(error) => {
                warn!(session_id = %self.id, error = %error, "Peer connection error");
            }
        }
    }

    fn on_peer_message(&mut self, msg: SyncMessage) {
        match (self.role, msg) {
            (Role::Host, SyncMessage::MoveCommit { mv }) => {
                debug!(session_id = %self.id, mv = %mv, "Opponent committed");
                self.pending_remote = Some(mv);
            }
            (
                Role::Client,
                SyncMessage::StateSync {
                    beat_phase,
                    phase,
                    message,
                    self_combatant,
                    opponent_combatant,
                    self_wins,
                    opponent_wins,
                },
            ) => {
                let new_round = phase == Phase::Ready && self.state.phase != Phase::Ready;
                let resolved =
                    beat_phase == BeatPhase::ResolveBeat && self_combatant.last_move.is_some();
                if new_round || resolved {
                    self.local_selection = None;
                }

                self.set_phase(phase);
                self.state.beat_phase = beat_phase;
                self.state.self_combatant = self_combatant;
                self.state.self_combatant.selected_move = self.local_selection;
                self.state.opponent_combatant = opponent_combatant;
                self.state.self_wins = self_wins;
                self.state.opponent_wins = opponent_wins;
                self.state.self_message = message;
            }
            (role, msg) => {
                warn!(session_id = %self.id, role = ?role, kind = msg.kind(), "Unexpected peer message");
            }
        }
    }

    /// Leave the session. Everything is torn down once.
    pub fn exit(&mut self) {
        if self.exited {
            return;
        }
        self.exited = true;

        self.stop_clock();
        if self.finalizing {
            self.finalizing = false;
            self.effects.push(Effect::CancelFinalize);
        }
        if self.role != Role::Local {
            self.effects.push(Effect::TeardownPeer);
        }
        self.effects.push(Effect::Exit);
        info!(session_id = %self.id, "Session exit");
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.state.phase == phase {
            return;
        }
        info!(session_id = %self.id, from = ?self.state.phase, to = ?phase, "Phase change");
        self.state.phase = phase;

        if matches!(phase, Phase::Menu | Phase::RoundOver | Phase::GameOver) {
            self.stop_clock();
        }

        let track = match phase {
            Phase::Menu => Some(TITLE_TRACK),
            Phase::Ready => Some(BATTLE_TRACKS[self.rng.gen_range(0..BATTLE_TRACKS.len())]),
            Phase::RoundOver => None,
            Phase::GameOver => Some(VICTORY_TRACK),
            // Battle music from READY keeps playing
            Phase::Playing => return,
        };
        self.effects.push(Effect::Music(track));
    }

    fn set_messages(&mut self, mine: &str, theirs: &str) {
        self.state.self_message = mine.to_string();
        self.state.opponent_message = theirs.to_string();
    }

    fn start_clock(&mut self) {
        if self.role.is_authoritative() {
            self.clock_running = true;
            self.effects.push(Effect::StartClock);
        }
    }

    fn stop_clock(&mut self) {
        if self.clock_running {
            self.clock_running = false;
            self.effects.push(Effect::StopClock);
        }
    }

    fn sync_to_peer(&mut self) {
        if self.role == Role::Host {
            self.effects
                .push(Effect::Send(peer_view(&self.state, self.state.beat_phase)));
        }
    }
}
