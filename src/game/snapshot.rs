//! Snapshot building - peer payloads and read-only views for presentation

use serde::Serialize;
use uuid::Uuid;

use crate::ws::protocol::{BeatPhase, Combatant, SyncMessage};

use super::session::SessionState;
use super::Role;

/// Read-only copy of a session handed to presentation and HTTP handlers
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub role: Role,
    pub connected: bool,
    /// Match point reached, waiting for the game-over delay
    pub finalizing: bool,
    #[serde(flatten)]
    pub state: SessionState,
}

/// Build the host -> client payload. Self and opponent trade places and the
/// client gets its own message. Pending selections are never sent.
pub fn peer_view(state: &SessionState, beat_phase: BeatPhase) -> SyncMessage {
    SyncMessage::StateSync {
        beat_phase,
        phase: state.phase,
        message: state.opponent_message.clone(),
        self_combatant: public(&state.opponent_combatant),
        opponent_combatant: public(&state.self_combatant),
        self_wins: state.opponent_wins,
        opponent_wins: state.self_wins,
    }
}

fn public(combatant: &Combatant) -> Combatant {
    Combatant {
        selected_move: None,
        ..combatant.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::{Move, Phase};

    fn host_state() -> SessionState {
        SessionState {
            phase: Phase::Playing,
            beat_phase: BeatPhase::SecondBeat,
            self_combatant: Combatant {
                bullets: 2,
                is_alive: true,
                last_move: Some(Move::Reload),
                selected_move: Some(Move::Shoot),
            },
            opponent_combatant: Combatant {
                bullets: 0,
                is_alive: true,
                last_move: Some(Move::Block),
                selected_move: None,
            },
            self_wins: 2,
            opponent_wins: 1,
            self_message: "Safe.".to_string(),
            opponent_message: "Opponent Defended.".to_string(),
        }
    }

    #[test]
    fn swaps_perspective() {
        let state = host_state();
        match peer_view(&state, state.beat_phase) {
            SyncMessage::StateSync {
                beat_phase,
                phase,
                message,
                self_combatant,
                opponent_combatant,
                self_wins,
                opponent_wins,
            } => {
                assert_eq!(beat_phase, BeatPhase::SecondBeat);
                assert_eq!(phase, Phase::Playing);
                assert_eq!(message, "Opponent Defended.");
                assert_eq!(self_combatant.bullets, 0);
                assert_eq!(self_combatant.last_move, Some(Move::Block));
                assert_eq!(opponent_combatant.bullets, 2);
                assert_eq!(self_wins, 1);
                assert_eq!(opponent_wins, 2);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn host_selection_is_not_leaked() {
        let state = host_state();
        match peer_view(&state, BeatPhase::ResolveBeat) {
            SyncMessage::StateSync {
                beat_phase,
                opponent_combatant,
                ..
            } => {
                assert_eq!(beat_phase, BeatPhase::ResolveBeat);
                assert_eq!(opponent_combatant.selected_move, None);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn new_session_publishes_a_disconnected_menu() {
        let session = crate::game::session::Session::new(Role::Host, 0);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.session_id, session.id());
        assert_eq!(snapshot.role, Role::Host);
        assert!(!snapshot.connected);
        assert!(!snapshot.finalizing);
        assert_eq!(snapshot.state, SessionState::default());
        assert_eq!(snapshot.state.phase, Phase::Menu);
    }
}
