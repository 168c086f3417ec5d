//! Shot resolution against a single board

use super::board::{Board, Cell, BOARD_SIZE};
use super::GameError;

/// Result of one resolved shot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotOutcome {
    pub is_hit: bool,
    /// The shot completed a ship
    pub sunk: bool,
}

impl ShotOutcome {
    pub const MISS: Self = Self {
        is_hit: false,
        sunk: false,
    };
}

/// Validate shot coordinates and convert them to grid indices
pub fn check_target(board: &Board, x: i64, y: i64) -> Result<(usize, usize), GameError> {
    let range = 0..BOARD_SIZE as i64;
    if !range.contains(&x) || !range.contains(&y) {
        return Err(GameError::OutOfBounds { x, y });
    }

    let (x, y) = (x as usize, y as usize);
    if board.is_targeted(x, y) {
        return Err(GameError::AlreadyTargeted { x, y });
    }
    Ok((x, y))
}

/// Fire at `(x, y)` on `board`.
///
/// Records the shot, turns a ship segment into a hit (or water into a miss)
/// and decrements `ships_remaining` when the hit completes a ship. Rejected
/// shots leave the board untouched.
pub fn resolve_shot(board: &mut Board, x: usize, y: usize) -> Result<ShotOutcome, GameError> {
    let (x, y) = check_target(board, x as i64, y as i64)?;

    board.shots_received[x][y] = true;

    match board.grid[x][y] {
        Cell::Ship(_) => {
            board.grid[x][y] = Cell::Hit;

            let sunk = board
                .ship_footprint(x, y)
                .iter()
                .all(|&(sx, sy)| board.grid[sx][sy] == Cell::Hit);
            if sunk {
                board.ships_remaining = board.ships_remaining.saturating_sub(1);
            }

            Ok(ShotOutcome { is_hit: true, sunk })
        }
        Cell::Empty => {
            board.grid[x][y] = Cell::Miss;
            Ok(ShotOutcome::MISS)
        }
        // Hit/Miss cells always carry a recorded shot, so check_target has
        // already rejected them.
        Cell::Hit | Cell::Miss => Err(GameError::AlreadyTargeted { x, y }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::{Orientation, Placement};

    fn board() -> Board {
        Board::from_placements(&[
            Placement::new(0, 0, 3, Orientation::Horizontal),
            Placement::new(4, 4, 1, Orientation::Horizontal),
            Placement::new(7, 9, 2, Orientation::Vertical),
        ])
        .unwrap()
    }

    fn afloat(board: &Board) -> usize {
        board
            .ships()
            .iter()
            .filter(|ship| ship.iter().any(|&(x, y)| matches!(board.cell(x, y), Cell::Ship(_))))
            .count()
    }

    #[test]
    fn miss_marks_water() {
        let mut board = board();
        let outcome = resolve_shot(&mut board, 9, 0).unwrap();
        assert_eq!(outcome, ShotOutcome::MISS);
        assert_eq!(board.cell(9, 0), Cell::Miss);
        assert!(board.is_targeted(9, 0));
        assert_eq!(board.ships_remaining(), 3);
    }

    #[test]
    fn single_cell_ship_sinks_in_one_shot() {
        let mut board = board();
        let outcome = resolve_shot(&mut board, 4, 4).unwrap();
        assert_eq!(outcome, ShotOutcome { is_hit: true, sunk: true });
        assert_eq!(board.ships_remaining(), 2);
    }

    #[test]
    fn sink_reported_only_on_completing_shot() {
        let mut board = board();
        assert_eq!(
            resolve_shot(&mut board, 0, 2).unwrap(),
            ShotOutcome { is_hit: true, sunk: false }
        );
        assert_eq!(
            resolve_shot(&mut board, 0, 0).unwrap(),
            ShotOutcome { is_hit: true, sunk: false }
        );
        assert_eq!(board.ships_remaining(), 3);
        assert_eq!(
            resolve_shot(&mut board, 0, 1).unwrap(),
            ShotOutcome { is_hit: true, sunk: true }
        );
        assert_eq!(board.ships_remaining(), 2);
        assert_eq!(afloat(&board), 2);
    }

    #[test]
    fn ships_remaining_tracks_afloat_ships() {
        let mut board = board();
        for (x, y) in [(7, 9), (3, 3), (8, 9), (0, 1), (4, 4)] {
            resolve_shot(&mut board, x, y).unwrap();
            assert_eq!(board.ships_remaining() as usize, afloat(&board));
        }
        assert_eq!(board.ships_remaining(), 1);
    }

    #[test]
    fn repeated_shot_is_rejected_without_mutation() {
        let mut board = board();
        resolve_shot(&mut board, 0, 0).unwrap();
        let before = board.clone();

        let err = resolve_shot(&mut board, 0, 0).unwrap_err();
        assert!(matches!(err, GameError::AlreadyTargeted { x: 0, y: 0 }));
        assert_eq!(board.grid(), before.grid());
        assert_eq!(board.shots_received(), before.shots_received());
        assert_eq!(board.ships_remaining(), before.ships_remaining());
    }

    #[test]
    fn out_of_range_target_is_rejected() {
        let board = board();
        assert!(matches!(
            check_target(&board, 10, 0),
            Err(GameError::OutOfBounds { x: 10, y: 0 })
        ));
        assert!(matches!(
            check_target(&board, 0, -1),
            Err(GameError::OutOfBounds { x: 0, y: -1 })
        ));
    }
}
