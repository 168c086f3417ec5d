//! Random fleet placement

use rand::Rng;
use tracing::{debug, warn};

use super::board::{Board, Orientation, Placement, BOARD_SIZE, FLEET};

/// Random positions tried for a single ship before the board is reset
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 1_000;

/// Board resets allowed before one generation attempt gives up
pub const MAX_BOARD_RESETS: u32 = 50;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("fleet placement exhausted after {0} board resets")]
    Exhausted(u32),
}

/// Generate a fully populated board using the thread-local RNG.
///
/// Exhaustion is never surfaced: the attempt is thrown away and generation
/// starts over from an empty grid.
pub fn generate_board() -> Board {
    let mut rng = rand::thread_rng();
    retry_until_placed(|| try_generate_board(&mut rng))
}

/// Run `attempt` until it yields a board. Each attempt starts from scratch.
fn retry_until_placed(mut attempt: impl FnMut() -> Result<Board, GenerationError>) -> Board {
    loop {
        match attempt() {
            Ok(board) => return board,
            Err(e) => warn!(error = %e, "Board generation exhausted, retrying"),
        }
    }
}

/// One bounded generation attempt with the given RNG
pub fn try_generate_board<R: Rng + ?Sized>(rng: &mut R) -> Result<Board, GenerationError> {
    for reset in 0..MAX_BOARD_RESETS {
        if let Some(board) = place_fleet(rng) {
            if reset > 0 {
                debug!(resets = reset, "Fleet placed after board resets");
            }
            return Ok(board);
        }
    }
    Err(GenerationError::Exhausted(MAX_BOARD_RESETS))
}

/// Place every ship of the fleet, largest first. `None` if any ship could
/// not be placed within its attempt budget.
fn place_fleet<R: Rng + ?Sized>(rng: &mut R) -> Option<Board> {
    let mut board = Board::empty();

    for &size in FLEET.iter() {
        let placed = (0..MAX_PLACEMENT_ATTEMPTS).any(|_| {
            let orientation = if rng.gen_bool(0.5) {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            let placement = Placement::new(
                rng.gen_range(0..BOARD_SIZE),
                rng.gen_range(0..BOARD_SIZE),
                size,
                orientation,
            );
            board.place(placement)
        });

        if !placed {
            return None;
        }
    }

    Some(board)
}
