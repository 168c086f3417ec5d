//! Game record and its state machine (Waiting -> InProgress -> Finished)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::board::Board;
use super::combat::{check_target, resolve_shot};
use super::GameError;

/// Game lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Created, boards generated, waiting for someone to start it
    Waiting,
    InProgress,
    /// Terminal
    Finished,
}

impl GameStatus {
    /// Waiting and InProgress games count as active
    pub fn is_active(self) -> bool {
        matches!(self, GameStatus::Waiting | GameStatus::InProgress)
    }
}

/// Game record
#[derive(Debug, Clone, Serialize)]
pub struct Game {
    pub id: Uuid,
    pub player1_id: Uuid,
    pub player2_id: Uuid,
    /// Player entitled to fire next
    pub turn_player_id: Option<Uuid>,
    /// Set exactly when the game is finished
    pub winner_id: Option<Uuid>,
    pub status: GameStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Game {
    /// New game in Waiting with player 1 holding the first turn
    pub fn new(id: Uuid, player1_id: Uuid, player2_id: Uuid) -> Result<Self, GameError> {
        if player1_id == player2_id {
            return Err(GameError::SamePlayer);
        }

        Ok(Self {
            id,
            player1_id,
            player2_id,
            turn_player_id: Some(player1_id),
            winner_id: None,
            status: GameStatus::Waiting,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        })
    }

    pub fn is_participant(&self, player_id: Uuid) -> bool {
        player_id == self.player1_id || player_id == self.player2_id
    }

    /// The other participant, or `None` for outsiders
    pub fn opponent_of(&self, player_id: Uuid) -> Option<Uuid> {
        if player_id == self.player1_id {
            Some(self.player2_id)
        } else if player_id == self.player2_id {
            Some(self.player1_id)
        } else {
            None
        }
    }
}

/// What a successful move did, enough to build the outbound messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub is_hit: bool,
    pub sunk: bool,
    /// Set when this move sank the last ship of the defender
    pub winner: Option<Uuid>,
    /// Turn holder after the move
    pub next_turn: Option<Uuid>,
}

/// A game together with both players' boards.
///
/// This is the unit guarded by the per-game lock: every transition
/// happens through `&mut self`.
#[derive(Debug, Clone)]
pub struct GameSession {
    pub game: Game,
    /// Index 0 belongs to player 1, index 1 to player 2
    boards: [Board; 2],
}

impl GameSession {
    pub fn new(game: Game, player1_board: Board, player2_board: Board) -> Self {
        Self {
            game,
            boards: [player1_board, player2_board],
        }
    }

    fn board_index(&self, player_id: Uuid) -> Option<usize> {
        if player_id == self.game.player1_id {
            Some(0)
        } else if player_id == self.game.player2_id {
            Some(1)
        } else {
            None
        }
    }

    /// Board owned by `player_id`
    pub fn board_of(&self, player_id: Uuid) -> Option<&Board> {
        self.board_index(player_id).map(|i| &self.boards[i])
    }

    /// Waiting -> InProgress. Turn stays with player 1.
    pub fn start(&mut self) -> Result<(), GameError> {
        match self.game.status {
            GameStatus::Waiting => {}
            GameStatus::InProgress => return Err(GameError::AlreadyStarted),
            GameStatus::Finished => return Err(GameError::GameFinished),
        }

        self.game.status = GameStatus::InProgress;
        self.game.started_at = Some(Utc::now());

        info!(game_id = %self.game.id, "Game started");
        Ok(())
    }

    /// Fire at the opponent's board on behalf of `mover_id`.
    ///
    /// A miss hands the turn to the opponent; any hit keeps it. Sinking the
    /// defender's last ship finishes the game with the mover as winner.
    /// Rejected moves change nothing.
    pub fn apply_move(&mut self, mover_id: Uuid, x: i64, y: i64) -> Result<MoveOutcome, GameError> {
        match self.game.status {
            GameStatus::InProgress => {}
            GameStatus::Waiting => return Err(GameError::NotActive),
            GameStatus::Finished => return Err(GameError::GameFinished),
        }

        let opponent_id = self.game.opponent_of(mover_id).ok_or(GameError::NotParticipant)?;
        if self.game.turn_player_id != Some(mover_id) {
            return Err(GameError::NotYourTurn);
        }

        let defender = self
            .board_index(opponent_id)
            .ok_or(GameError::NotParticipant)?;
        let (x, y) = check_target(&self.boards[defender], x, y)?;
        let shot = resolve_shot(&mut self.boards[defender], x, y)?;

        let mut winner = None;
        if self.boards[defender].ships_remaining() == 0 {
            self.game.status = GameStatus::Finished;
            self.game.winner_id = Some(mover_id);
            self.game.finished_at = Some(Utc::now());
            winner = Some(mover_id);

            info!(game_id = %self.game.id, winner_id = %mover_id, "Game finished");
        } else if !shot.is_hit {
            self.game.turn_player_id = Some(opponent_id);
        }

        Ok(MoveOutcome {
            is_hit: shot.is_hit,
            sunk: shot.sunk,
            winner,
            next_turn: self.game.turn_player_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::testing::{fleet_board, fleet_cells};

    fn session() -> (GameSession, Uuid, Uuid) {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let game = Game::new(Uuid::new_v4(), a, b).unwrap();
        (GameSession::new(game, fleet_board(), fleet_board()), a, b)
    }

    fn started() -> (GameSession, Uuid, Uuid) {
        let (mut s, a, b) = session();
        s.start().unwrap();
        (s, a, b)
    }

    #[test]
    fn new_game_waits_with_player_one_to_move() {
        let (s, a, _) = session();
        assert_eq!(s.game.status, GameStatus::Waiting);
        assert_eq!(s.game.turn_player_id, Some(a));
        assert!(s.game.winner_id.is_none());
        assert!(s.game.started_at.is_none());
    }

    #[test]
    fn same_player_twice_is_rejected() {
        let p = Uuid::new_v4();
        assert_eq!(Game::new(Uuid::new_v4(), p, p).unwrap_err(), GameError::SamePlayer);
    }

    #[test]
    fn start_only_from_waiting() {
        let (mut s, a, _) = session();
        s.start().unwrap();
        assert_eq!(s.game.status, GameStatus::InProgress);
        assert!(s.game.started_at.is_some());
        assert_eq!(s.game.turn_player_id, Some(a));
        assert_eq!(s.start().unwrap_err(), GameError::AlreadyStarted);
    }

    #[test]
    fn move_before_start_is_rejected() {
        let (mut s, a, _) = session();
        assert_eq!(s.apply_move(a, 9, 9).unwrap_err(), GameError::NotActive);
        assert!(!s.board_of(s.game.player2_id).unwrap().is_targeted(9, 9));
    }

    #[test]
    fn miss_passes_the_turn() {
        let (mut s, a, b) = started();
        let outcome = s.apply_move(a, 9, 9).unwrap();
        assert!(!outcome.is_hit && !outcome.sunk);
        assert_eq!(outcome.next_turn, Some(b));
        assert_eq!(s.game.turn_player_id, Some(b));
    }

    #[test]
    fn hit_keeps_the_turn() {
        let (mut s, a, _) = started();
        let outcome = s.apply_move(a, 0, 0).unwrap();
        assert!(outcome.is_hit && !outcome.sunk);
        assert_eq!(s.game.turn_player_id, Some(a));
    }

    #[test]
    fn sinking_a_single_ship_keeps_the_turn() {
        let (mut s, a, b) = started();
        let outcome = s.apply_move(a, 6, 0).unwrap();
        assert_eq!((outcome.is_hit, outcome.sunk), (true, true));
        assert_eq!(outcome.winner, None);
        assert_eq!(s.board_of(b).unwrap().ships_remaining(), 9);
        assert_eq!(s.game.turn_player_id, Some(a));
    }

    #[test]
    fn non_turn_holder_is_rejected() {
        let (mut s, _, b) = started();
        assert_eq!(s.apply_move(b, 0, 0).unwrap_err(), GameError::NotYourTurn);
    }

    #[test]
    fn outsider_is_rejected() {
        let (mut s, _, _) = started();
        assert_eq!(
            s.apply_move(Uuid::new_v4(), 0, 0).unwrap_err(),
            GameError::NotParticipant
        );
    }

    #[test]
    fn retargeting_is_rejected_without_state_change() {
        let (mut s, a, b) = started();
        s.apply_move(a, 0, 0).unwrap();
        let game_before = s.game.clone();
        let board_before = s.board_of(b).unwrap().clone();

        assert_eq!(
            s.apply_move(a, 0, 0).unwrap_err(),
            GameError::AlreadyTargeted { x: 0, y: 0 }
        );
        assert_eq!(s.game.turn_player_id, game_before.turn_player_id);
        assert_eq!(s.game.status, game_before.status);
        assert_eq!(s.board_of(b).unwrap().shots_received(), board_before.shots_received());
        assert_eq!(s.board_of(b).unwrap().grid(), board_before.grid());
    }

    #[test]
    fn out_of_bounds_move_is_rejected() {
        let (mut s, a, _) = started();
        assert_eq!(
            s.apply_move(a, 10, 3).unwrap_err(),
            GameError::OutOfBounds { x: 10, y: 3 }
        );
        assert_eq!(s.game.turn_player_id, Some(a));
    }

    #[test]
    fn sinking_the_fleet_finishes_the_game() {
        let (mut s, a, b) = started();
        let cells = fleet_cells();
        let last = cells.len() - 1;

        for (i, (x, y)) in cells.into_iter().enumerate() {
            let outcome = s.apply_move(a, x as i64, y as i64).unwrap();
            assert!(outcome.is_hit);
            if i < last {
                assert_eq!(outcome.winner, None);
                assert_eq!(s.game.status, GameStatus::InProgress);
            } else {
                assert!(outcome.sunk);
                assert_eq!(outcome.winner, Some(a));
            }
        }

        assert_eq!(s.game.status, GameStatus::Finished);
        assert_eq!(s.game.winner_id, Some(a));
        assert!(s.game.finished_at.is_some());
        assert_eq!(s.board_of(b).unwrap().ships_remaining(), 0);

        assert_eq!(s.apply_move(a, 9, 9).unwrap_err(), GameError::GameFinished);
        assert_eq!(s.apply_move(b, 9, 9).unwrap_err(), GameError::GameFinished);
        assert_eq!(s.start().unwrap_err(), GameError::GameFinished);
    }

    #[test]
    fn turn_alternates_across_misses() {
        let (mut s, a, b) = started();
        s.apply_move(a, 9, 0).unwrap();
        s.apply_move(b, 9, 0).unwrap();
        assert_eq!(s.game.turn_player_id, Some(a));
        // each shot landed on the other player's board
        assert!(s.board_of(a).unwrap().is_targeted(9, 0));
        assert!(s.board_of(b).unwrap().is_targeted(9, 0));
    }
}
