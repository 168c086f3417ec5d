//! Player records

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

/// Player as known to this server. The id comes from the identity
/// provider's token subject.
#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub id: Uuid,
    /// Public display name
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl Player {
    /// Name used when the token carries none
    pub fn default_username(id: Uuid) -> String {
        format!("Player_{}", &id.to_string()[..8])
    }
}

/// Player store operations
#[derive(Clone, Default)]
pub struct PlayerStore {
    players: Arc<DashMap<Uuid, Player>>,
}

impl PlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a player by ID
    pub fn get_player(&self, player_id: Uuid) -> Option<Player> {
        self.players.get(&player_id).map(|p| p.value().clone())
    }

    /// Get or create player (first authenticated request registers them)
    pub fn ensure_player(&self, player_id: Uuid, username: Option<&str>) -> Player {
        self.players
            .entry(player_id)
            .or_insert_with(|| Player {
                id: player_id,
                username: username
                    .map(str::to_string)
                    .unwrap_or_else(|| Player::default_username(player_id)),
                created_at: Utc::now(),
            })
            .value()
            .clone()
    }

    pub fn count(&self) -> usize {
        self.players.len()
    }
}
