//! Deterministic boards for tests

use super::board::{Board, Orientation, Placement};

/// A full fleet in fixed positions. Row 9 is open water.
pub fn fleet_placements() -> Vec<Placement> {
    use Orientation::Horizontal as H;
    vec![
        Placement::new(0, 0, 4, H),
        Placement::new(2, 0, 3, H),
        Placement::new(2, 4, 3, H),
        Placement::new(4, 0, 2, H),
        Placement::new(4, 3, 2, H),
        Placement::new(4, 6, 2, H),
        Placement::new(6, 0, 1, H),
        Placement::new(6, 2, 1, H),
        Placement::new(6, 4, 1, H),
        Placement::new(6, 6, 1, H),
    ]
}

pub fn fleet_board() -> Board {
    Board::from_placements(&fleet_placements()).expect("fixture fleet is valid")
}

/// Every ship cell of [`fleet_board`], in an order that sinks the
/// single-cell ships last
pub fn fleet_cells() -> Vec<(usize, usize)> {
    let mut cells: Vec<(usize, usize)> = fleet_placements()
        .iter()
        .flat_map(|p| p.cells().unwrap_or_default())
        .collect();
    cells.sort_by_key(|&(x, _)| x);
    cells
}
