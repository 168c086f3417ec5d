//! Per-player state views
//!
//! Each participant gets their own view of the shared session: their full
//! grid, and for the opponent only what their own shots have revealed.

use serde::Serialize;
use uuid::Uuid;

use super::board::{Grid, ShotGrid};
use super::state::{GameSession, GameStatus};

/// State pushed to one participant after every change
#[derive(Debug, Clone, Serialize)]
pub struct GameStateView {
    pub game_id: Uuid,
    pub status: GameStatus,
    /// Public id of the player entitled to fire next
    pub turn_player_id: Option<Uuid>,
    /// Own grid, ship layout included
    pub your_board: Grid,
    /// Opponent grid restricted to cells this player has fired at
    pub opponent_board: Grid,
    /// Cells of your board the opponent has fired at
    pub opponent_shots: ShotGrid,
    /// Cells of the opponent's board you have fired at
    pub your_shots: ShotGrid,
    pub your_ships_remaining: u8,
    pub opponent_ships_remaining: u8,
}

/// View of `session` for `player_id`; `None` if they are not playing
pub fn build_view(session: &GameSession, player_id: Uuid) -> Option<GameStateView> {
    let game = &session.game;
    let opponent_id = game.opponent_of(player_id)?;
    let own = session.board_of(player_id)?;
    let opponent = session.board_of(opponent_id)?;

    Some(GameStateView {
        game_id: game.id,
        status: game.status,
        turn_player_id: game.turn_player_id,
        your_board: *own.grid(),
        opponent_board: opponent.masked_grid(),
        opponent_shots: *own.shots_received(),
        your_shots: *opponent.shots_received(),
        your_ships_remaining: own.ships_remaining(),
        opponent_ships_remaining: opponent.ships_remaining(),
    })
}

/// Views for both participants, player 1 first
pub fn build_views(session: &GameSession) -> Vec<(Uuid, GameStateView)> {
    [session.game.player1_id, session.game.player2_id]
        .into_iter()
        .filter_map(|player_id| build_view(session, player_id).map(|view| (player_id, view)))
        .collect()
}
