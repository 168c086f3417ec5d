//! Application state shared across routes and connections

use std::sync::Arc;

use crate::config::Config;
use crate::store::{GameStore, PlayerStore};
use crate::ws::SessionRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub players: PlayerStore,
    pub games: GameStore,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            players: PlayerStore::new(),
            games: GameStore::new(),
            // One registry per process, handed to every connection
            sessions: Arc::new(SessionRegistry::new()),
        }
    }
}
