//! Game rules: boards, fleet generation, shot resolution and the game state machine

pub mod board;
pub mod combat;
pub mod generator;
pub mod snapshot;
pub mod state;

#[cfg(test)]
pub mod testing;

pub use board::Board;
pub use generator::generate_board;
pub use snapshot::GameStateView;
pub use state::{Game, GameSession, GameStatus};

/// Rule violations raised by the game engine.
///
/// None of these close a connection; they are reported back to the player
/// who caused them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Game is not in progress")]
    NotActive,

    #[error("Game has already started")]
    AlreadyStarted,

    #[error("Game is already finished")]
    GameFinished,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Player is not a participant of this game")]
    NotParticipant,

    #[error("A game needs two different players")]
    SamePlayer,

    #[error("Coordinates ({x}, {y}) are outside the board")]
    OutOfBounds { x: i64, y: i64 },

    #[error("Cell ({x}, {y}) has already been targeted")]
    AlreadyTargeted { x: usize, y: usize },
}

impl GameError {
    /// Machine-readable error class sent alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            GameError::NotActive | GameError::AlreadyStarted | GameError::GameFinished => {
                "protocol_state"
            }
            GameError::NotYourTurn => "turn_violation",
            GameError::OutOfBounds { .. } | GameError::AlreadyTargeted { .. } => "invalid_move",
            GameError::NotParticipant | GameError::SamePlayer => "invalid_game",
        }
    }
}
