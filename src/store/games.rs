//! Game records and their boards

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::game::{generate_board, Game, GameError, GameSession, GameStatus};

/// A game session behind its own lock. All state transitions for one game
/// happen while holding it.
pub type SharedGame = Arc<Mutex<GameSession>>;

/// Game store operations
#[derive(Clone, Default)]
pub struct GameStore {
    games: Arc<DashMap<Uuid, SharedGame>>,
    /// Serializes "check for active game, then create" so two requests
    /// cannot both pass the check
    create_lock: Arc<Mutex<()>>,
}

impl GameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a game in Waiting with a freshly generated board per player.
    ///
    /// Fails if either player already has a Waiting or InProgress game.
    pub fn create_game(&self, player1_id: Uuid, player2_id: Uuid) -> Result<SharedGame, StoreError> {
        let _guard = self.create_lock.lock();

        if let Some(existing) = self.find_active_for(&[player1_id, player2_id]) {
            return Err(StoreError::ActiveGameExists(existing));
        }

        let game = Game::new(Uuid::new_v4(), player1_id, player2_id)?;
        let game_id = game.id;
        let shared = self.insert(GameSession::new(game, generate_board(), generate_board()));

        info!(
            game_id = %game_id,
            player1_id = %player1_id,
            player2_id = %player2_id,
            "Game created"
        );

        Ok(shared)
    }

    /// Store a session as-is
    pub fn insert(&self, session: GameSession) -> SharedGame {
        let id = session.game.id;
        let shared = Arc::new(Mutex::new(session));
        self.games.insert(id, shared.clone());
        shared
    }

    pub fn get(&self, game_id: &Uuid) -> Option<SharedGame> {
        self.games.get(game_id).map(|g| g.value().clone())
    }

    /// Id of an active game in which any of `player_ids` takes part
    pub fn find_active_for(&self, player_ids: &[Uuid]) -> Option<Uuid> {
        self.games.iter().find_map(|entry| {
            let session = entry.value().lock();
            let game = &session.game;
            let involved = player_ids.iter().any(|&p| game.is_participant(p));
            (game.status.is_active() && involved).then_some(game.id)
        })
    }

    /// Snapshot of game records with one of the given statuses, newest first
    pub fn list_by_status(&self, statuses: &[GameStatus]) -> Vec<Game> {
        let mut games: Vec<Game> = self
            .games
            .iter()
            .map(|entry| entry.value().lock().game.clone())
            .filter(|game| statuses.contains(&game.status))
            .collect();
        games.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        games
    }

    pub fn count(&self) -> usize {
        self.games.len()
    }
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("A player already has an active game ({0})")]
    ActiveGameExists(Uuid),

    #[error(transparent)]
    Game(#[from] GameError),
}
