//! Wire protocol message definitions
//! These are the wire types exchanged between host and client

use std::fmt;

use serde::{Deserialize, Serialize};

/// A combat move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Move {
    /// +1 bullet
    Reload,
    /// Costs 1 bullet, beats reload, stab and counter stab
    Shoot,
    /// Costs 1 bullet, beats reload and block
    Stab,
    /// Stops a shot
    Block,
    /// Stops a stab
    CounterStab,
    /// Stand-in when nothing was committed. Never selectable.
    Fumble,
}

impl Move {
    /// Shoot and stab both spend a bullet
    pub fn is_attack(self) -> bool {
        matches!(self, Move::Shoot | Move::Stab)
    }

    pub fn is_selectable(self) -> bool {
        self != Move::Fumble
    }

    pub fn is_passive(self) -> bool {
        matches!(self, Move::Block | Move::CounterStab)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Reload => "RELOAD",
            Move::Shoot => "SHOOT",
            Move::Stab => "STAB",
            Move::Block => "BLOCK",
            Move::CounterStab => "COUNTER_STAB",
            Move::Fumble => "FUMBLE",
        };
        f.write_str(name)
    }
}

/// Duel lifecycle phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for a match to be started
    #[default]
    Menu,
    /// One beat cycle of "get ready"
    Ready,
    /// Rounds are being fought
    Playing,
    /// Someone died, waiting for the next round
    RoundOver,
    /// Someone reached the winning score
    GameOver,
}

/// Position in the four-beat cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatPhase {
    #[default]
    FirstBeat,
    SecondBeat,
    /// Moves become binding here
    ResolveBeat,
    RestBeat,
}

impl BeatPhase {
    /// The phase following this one, wrapping after the rest beat
    pub fn next(self) -> Self {
        match self {
            BeatPhase::FirstBeat => BeatPhase::SecondBeat,
            BeatPhase::SecondBeat => BeatPhase::ResolveBeat,
            BeatPhase::ResolveBeat => BeatPhase::RestBeat,
            BeatPhase::RestBeat => BeatPhase::FirstBeat,
        }
    }

    /// Index within the cycle (0..=3)
    pub fn index(self) -> u8 {
        match self {
            BeatPhase::FirstBeat => 0,
            BeatPhase::SecondBeat => 1,
            BeatPhase::ResolveBeat => 2,
            BeatPhase::RestBeat => 3,
        }
    }
}

/// One side of the duel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub bullets: u32,
    pub is_alive: bool,
    /// Move resolved on the last resolve beat
    pub last_move: Option<Move>,
    /// Pending commitment for the next resolve beat
    pub selected_move: Option<Move>,
}

impl Combatant {
    /// Fresh combatant for the start of a round
    pub fn fresh() -> Self {
        Self {
            bullets: 0,
            is_alive: true,
            last_move: None,
            selected_move: None,
        }
    }

    /// Whether `mv` may be committed given current bullets
    pub fn can_select(&self, mv: Move) -> bool {
        mv.is_selectable() && !(mv.is_attack() && self.bullets == 0)
    }
}

impl Default for Combatant {
    fn default() -> Self {
        Self::fresh()
    }
}

/// Messages exchanged between the two peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncMessage {
    /// Client -> host: the client's committed move
    MoveCommit {
        #[serde(rename = "move")]
        mv: Move,
    },

    /// Host -> client: full display state, already swapped to the client's perspective
    StateSync {
        beat_phase: BeatPhase,
        phase: Phase,
        /// Message for the recipient
        message: String,
        self_combatant: Combatant,
        opponent_combatant: Combatant,
        self_wins: u32,
        opponent_wins: u32,
    },
}

impl SyncMessage {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            SyncMessage::MoveCommit { .. } => "move_commit",
            SyncMessage::StateSync { .. } => "state_sync",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_commit_wire_shape() {
        let json = serde_json::to_string(&SyncMessage::MoveCommit {
            mv: Move::CounterStab,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"move_commit","move":"counter_stab"}"#);
    }

    #[test]
    fn state_sync_parses_from_host_json() {
        let json = r#"{
            "type": "state_sync",
            "beat_phase": "resolve_beat",
            "phase": "round_over",
            "message": "YOU WERE SHOT!",
            "self_combatant": {"bullets": 1, "is_alive": false, "last_move": "reload", "selected_move": null},
            "opponent_combatant": {"bullets": 0, "is_alive": true, "last_move": "shoot", "selected_move": null},
            "self_wins": 0,
            "opponent_wins": 2
        }"#;

        match serde_json::from_str::<SyncMessage>(json).unwrap() {
            SyncMessage::StateSync {
                beat_phase,
                phase,
                self_combatant,
                opponent_wins,
                ..
            } => {
                assert_eq!(beat_phase, BeatPhase::ResolveBeat);
                assert_eq!(phase, Phase::RoundOver);
                assert!(!self_combatant.is_alive);
                assert_eq!(self_combatant.last_move, Some(Move::Reload));
                assert_eq!(opponent_wins, 2);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn unknown_message_type_is_rejected() {
        assert!(serde_json::from_str::<SyncMessage>(r#"{"type":"ping","t":1}"#).is_err());
    }

    #[test]
    fn beat_cycle_wraps() {
        let mut beat = BeatPhase::FirstBeat;
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(beat.index());
            beat = beat.next();
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 0]);
    }

    #[test]
    fn fresh_state_is_the_menu_on_the_first_beat() {
        assert_eq!(Phase::default(), Phase::Menu);
        assert_eq!(BeatPhase::default(), BeatPhase::FirstBeat);
    }

    #[test]
    fn attacks_need_bullets() {
        let empty = Combatant::fresh();
        assert!(!empty.can_select(Move::Shoot));
        assert!(!empty.can_select(Move::Stab));
        assert!(empty.can_select(Move::Block));
        assert!(!empty.can_select(Move::Fumble));

        let armed = Combatant {
            bullets: 1,
            ..Combatant::fresh()
        };
        assert!(armed.can_select(Move::Shoot));
    }
}
