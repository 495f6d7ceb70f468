//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::MatchHandle;
use crate::ws::PeerLink;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Handle into the running duel loop
    pub handle: MatchHandle,
    /// Slot the opponent's connection attaches to
    pub link: PeerLink,
}

impl AppState {
    pub fn new(config: Config, handle: MatchHandle, link: PeerLink) -> Self {
        Self {
            config: Arc::new(config),
            handle,
            link,
        }
    }
}
