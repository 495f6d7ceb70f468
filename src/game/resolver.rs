//! Turn resolution - combines committed moves, the rule table and bullet
//! bookkeeping into the next combatant pair and per-side messages

use crate::ws::protocol::{Combatant, Move};

use super::combat::{resolve, spend, RoundOutcome};
use super::DuelError;

/// Who survived a resolved turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnVerdict {
    /// Nobody died, the round continues
    Continue,
    /// Both died, nobody scores
    Draw,
    SelfWon,
    OpponentWon,
}

/// Everything a resolve beat produces
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub self_move: Move,
    pub opponent_move: Move,
    pub self_outcome: RoundOutcome,
    pub opponent_outcome: RoundOutcome,
    pub self_combatant: Combatant,
    pub opponent_combatant: Combatant,
    pub self_message: String,
    pub opponent_message: String,
    pub verdict: TurnVerdict,
}

/// The move a combatant actually plays: its commitment, or a fumble if it never made one.
/// An attack with an empty chamber turns into a reload.
pub fn committed_move(combatant: &Combatant) -> Move {
    match combatant.selected_move {
        Some(mv) => legalize(mv, combatant.bullets),
        None => Move::Fumble,
    }
}

/// The move of a remote opponent: the last commitment received since the previous
/// resolution, reload when nothing arrived in time.
pub fn remote_move(pending: Option<Move>, combatant: &Combatant) -> Move {
    match pending {
        Some(Move::Fumble) | None => Move::Reload,
        Some(mv) => legalize(mv, combatant.bullets),
    }
}

fn legalize(mv: Move, bullets: u32) -> Move {
    if mv.is_attack() && bullets == 0 {
        Move::Reload
    } else {
        mv
    }
}

/// Resolve one turn between two already-determined moves
pub fn resolve_turn(
    self_combatant: &Combatant,
    opponent_combatant: &Combatant,
    self_move: Move,
    opponent_move: Move,
) -> Result<TurnResult, DuelError> {
    let (self_outcome, opponent_outcome) = resolve(self_move, opponent_move);

    let self_next = settle(self_combatant, self_move, self_outcome)?;
    let opponent_next = settle(opponent_combatant, opponent_move, opponent_outcome)?;

    let verdict = match (self_next.is_alive, opponent_next.is_alive) {
        (false, false) => TurnVerdict::Draw,
        (true, false) => TurnVerdict::SelfWon,
        (false, true) => TurnVerdict::OpponentWon,
        (true, true) => TurnVerdict::Continue,
    };

    let (self_message, opponent_message) = turn_messages(
        self_move,
        opponent_move,
        self_next.is_alive,
        opponent_next.is_alive,
    );

    Ok(TurnResult {
        self_move,
        opponent_move,
        self_outcome,
        opponent_outcome,
        self_combatant: self_next,
        opponent_combatant: opponent_next,
        self_message,
        opponent_message,
        verdict,
    })
}

fn settle(before: &Combatant, mv: Move, outcome: RoundOutcome) -> Result<Combatant, DuelError> {
    Ok(Combatant {
        bullets: spend(before.bullets, mv)?,
        is_alive: !outcome.is_death(),
        last_move: Some(mv),
        selected_move: before.selected_move,
    })
}

/// (self message, opponent message) for a resolved turn
pub fn turn_messages(
    self_move: Move,
    opponent_move: Move,
    self_alive: bool,
    opponent_alive: bool,
) -> (String, String) {
    let (mine, theirs): (&str, &str) = match (self_alive, opponent_alive) {
        (false, false) => ("DRAW! DOUBLE KILL!", "DRAW! DOUBLE KILL!"),
        (false, true) => {
            let (victim, killer) = kill_lines(opponent_move);
            (victim, killer)
        }
        (true, false) => {
            let (victim, killer) = kill_lines(self_move);
            (killer, victim)
        }
        (true, true) if self_move == opponent_move => match self_move {
            Move::Reload => ("Both Reloaded", "Both Reloaded"),
            Move::Block => ("Both Blocked", "Both Blocked"),
            Move::Shoot => ("Bullets Collided!", "Bullets Collided!"),
            Move::Stab => ("Cling! Swords Clashed.", "Cling! Swords Clashed."),
            _ => {
                let text = format!("{self_move} vs {opponent_move}");
                return (text.clone(), text);
            }
        },
        (true, true) => match (self_move, opponent_move) {
            (Move::Shoot, Move::Block) => ("Blocked!", "You Blocked!"),
            (Move::Shoot, _) => ("You Shot!", "Opponent Shot!"),
            (Move::Stab, Move::CounterStab) => ("Countered!", "You Countered!"),
            (Move::Stab, _) => ("You Stabbed!", "Opponent Stabbed!"),
            (Move::Block, Move::Shoot) => ("You Blocked!", "Blocked!"),
            (_, Move::Shoot) => ("Opponent Shot!", "You Shot!"),
            (Move::CounterStab, Move::Stab) => ("You Countered!", "Countered!"),
            (_, Move::Stab) => ("Opponent Stabbed!", "You Stabbed!"),
            (mv, _) if mv.is_passive() => ("Safe.", "Opponent Defended."),
            (_, mv) if mv.is_passive() => ("Opponent Defended.", "Safe."),
            _ => {
                return (
                    format!("{self_move} vs {opponent_move}"),
                    format!("{opponent_move} vs {self_move}"),
                );
            }
        },
    };

    (mine.to_string(), theirs.to_string())
}

/// (victim line, killer line) for a lethal move
fn kill_lines(lethal: Move) -> (&'static str, &'static str) {
    match lethal {
        Move::Shoot => ("YOU WERE SHOT!", "YOU SHOT THE OPPONENT!"),
        Move::Stab => ("YOU WERE STABBED!", "YOU STABBED THE OPPONENT!"),
        _ => ("YOU DIED!", "YOU WON!"),
    }
}
