//! Presentation seam between the duel loop and whatever shows it

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::game::session::TrackId;
use crate::game::SessionSnapshot;
use crate::ws::protocol::{BeatPhase, Phase};

/// Receives state and audio changes from the duel loop. Called from the loop task only.
pub trait Presenter: Send + Sync {
    /// Latest state after an event was handled
    fn render(&self, snapshot: &SessionSnapshot);

    /// Switch background music; `None` stops it
    fn on_music_change(&self, track: Option<TrackId>);

    /// The session has ended and control goes back to the menu
    fn on_exit(&self);
}

/// Presenter that narrates the duel through the log
#[derive(Default)]
pub struct ConsolePresenter {
    last: Mutex<Option<(Phase, BeatPhase, String)>>,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Presenter for ConsolePresenter {
    fn render(&self, snapshot: &SessionSnapshot) {
        let state = &snapshot.state;
        let current = (state.phase, state.beat_phase, state.self_message.clone());

        let mut last = self.last.lock();
        if last.as_ref() == Some(&current) {
            return;
        }

        let message_changed = last
            .as_ref()
            .map_or(true, |(phase, _, message)| *phase != state.phase || *message != state.self_message);

        if message_changed && !state.self_message.is_empty() {
            info!(
                phase = ?state.phase,
                score = %format!("{}-{}", state.self_wins, state.opponent_wins),
                bullets = state.self_combatant.bullets,
                opponent_bullets = state.opponent_combatant.bullets,
                "{}",
                state.self_message
            );
        }

        debug!(
            beat = state.beat_phase.index() + 1,
            selected = ?state.self_combatant.selected_move,
            connected = snapshot.connected,
            "Beat"
        );

        *last = Some(current);
    }

    fn on_music_change(&self, track: Option<TrackId>) {
        match track {
            Some(track) => info!(track, "Now playing"),
            None => info!("Music stopped"),
        }
    }

    fn on_exit(&self) {
        info!("Back to the menu");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::session::Session;
    use crate::game::Role;

    #[test]
    fn remembers_the_last_frame() {
        let presenter = ConsolePresenter::new();
        let mut snapshot = Session::new(Role::Local, 0).snapshot();
        snapshot.state.self_message = "FIGHT!".to_string();

        presenter.render(&snapshot);
        presenter.render(&snapshot);

        let last = presenter.last.lock();
        assert_eq!(
            last.as_ref(),
            Some(&(Phase::Menu, BeatPhase::FirstBeat, "FIGHT!".to_string()))
        );
    }
}
