//! Combat system - move resolution and bullet bookkeeping

use serde::Serialize;

use crate::ws::protocol::Move;

use super::DuelError;

/// Result of a round for one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    Win,
    /// Dead
    Lose,
    Neutral,
    /// Attack was stopped
    Blocked,
    /// Stopped the opponent's attack
    BlockSuccess,
}

impl RoundOutcome {
    pub fn is_death(self) -> bool {
        self == RoundOutcome::Lose
    }
}

/// Resolve one round. Each side is judged from its own point of view, so the two
/// outcomes are not necessarily mirror images.
pub fn resolve(self_move: Move, opponent_move: Move) -> (RoundOutcome, RoundOutcome) {
    // A fumbling side is always killed by an attack, whatever the table says.
    if opponent_move == Move::Fumble && self_move.is_attack() {
        return (RoundOutcome::Win, RoundOutcome::Lose);
    }
    if self_move == Move::Fumble && opponent_move.is_attack() {
        return (RoundOutcome::Lose, RoundOutcome::Win);
    }

    (
        outcome_for(self_move, opponent_move),
        outcome_for(opponent_move, self_move),
    )
}

/// Outcome for `mover` facing `other`
fn outcome_for(mover: Move, other: Move) -> RoundOutcome {
    use Move::*;
    use RoundOutcome::*;

    match (mover, other) {
        (Fumble, Shoot | Stab) => Lose,
        (Fumble, _) => Neutral,

        // Shoot vs counter stab is a clean win, unlike stab vs counter stab.
        (Shoot, Reload | Stab | CounterStab) => Win,
        (Shoot, Block) => Blocked,
        (Shoot, _) => Neutral,

        (Stab, Reload | Block) => Win,
        (Stab, Shoot) => Lose,
        (Stab, CounterStab) => Blocked,
        (Stab, _) => Neutral,

        (Block, Shoot) => BlockSuccess,
        (Block, Stab) => Lose,
        (Block, _) => Neutral,

        (CounterStab, Stab) => BlockSuccess,
        (CounterStab, Shoot) => Lose,
        (CounterStab, _) => Neutral,

        (Reload, Shoot | Stab) => Lose,
        (Reload, _) => Neutral,
    }
}

/// Bullet count after playing `mv`. Attacks cost one bullet whatever happens;
/// reloading adds one.
pub fn spend(bullets: u32, mv: Move) -> Result<u32, DuelError> {
    if mv.is_attack() {
        bullets
            .checked_sub(1)
            .ok_or(DuelError::Invariant("attack resolved with an empty chamber"))
    } else if mv == Move::Reload {
        Ok(bullets + 1)
    } else {
        Ok(bullets)
    }
}
