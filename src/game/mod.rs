//! Duel simulation modules

pub mod clock;
pub mod combat;
pub mod cpu;
pub mod r#match;
pub mod resolver;
pub mod session;
pub mod snapshot;

pub use r#match::{DuelMatch, MatchHandle};
pub use snapshot::SessionSnapshot;

use std::str::FromStr;

use serde::Serialize;

use crate::ws::protocol::{Move, SyncMessage};

/// First side to this many round wins takes the match
pub const WINS_TO_WIN: u32 = 3;

/// Which seat this process occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Single player against the CPU
    Local,
    /// Runs the simulation and serves a remote client
    Host,
    /// Displays whatever the host sends
    Client,
}

impl Role {
    /// Host and local sides run the clock and resolve turns
    pub fn is_authoritative(self) -> bool {
        matches!(self, Role::Local | Role::Host)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "single" => Ok(Role::Local),
            "host" => Ok(Role::Host),
            "client" | "join" => Ok(Role::Client),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// User actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Select(Move),
    /// Start, or play again after a finished match
    StartMatch,
    NextRound,
    Exit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let command = match s.trim().to_ascii_lowercase().as_str() {
            "r" | "reload" => Command::Select(Move::Reload),
            "s" | "shoot" => Command::Select(Move::Shoot),
            "t" | "stab" => Command::Select(Move::Stab),
            "b" | "block" => Command::Select(Move::Block),
            "c" | "counter" | "counter_stab" => Command::Select(Move::CounterStab),
            "start" | "again" => Command::StartMatch,
            "n" | "next" => Command::NextRound,
            "q" | "exit" | "quit" => Command::Exit,
            other => return Err(format!("unknown command '{other}'")),
        };
        Ok(command)
    }
}

/// Peer connection lifecycle, as observed by the duel loop
#[derive(Debug, Clone)]
pub enum PeerEvent {
    Open,
    Message(SyncMessage),
    Closed,
    Error(String),
}

/// Everything that can wake the duel loop
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Beat clock tick, tagged with the clock run that produced it
    Beat { epoch: u64 },
    Command(Command),
    Peer(PeerEvent),
    /// Presentation delay after match point has elapsed
    Finalize,
}

/// Fatal duel errors
#[derive(Debug, thiserror::Error)]
pub enum DuelError {
    #[error("Duel invariant violated: {0}")]
    Invariant(&'static str),
}
