//! Board model - grid cells, shot record and fleet bookkeeping

use serde::{Serialize, Serializer};

/// Board edge length (boards are always square)
pub const BOARD_SIZE: usize = 10;

/// Ship sizes placed on every board, largest first
pub const FLEET: [u8; 10] = [4, 3, 3, 2, 2, 2, 1, 1, 1, 1];

pub type Grid = [[Cell; BOARD_SIZE]; BOARD_SIZE];
pub type ShotGrid = [[bool; BOARD_SIZE]; BOARD_SIZE];

/// Single board cell.
///
/// On the wire a cell is a small integer: `0` empty, `1..=4` an intact ship
/// segment tagged with its ship size, `-1` miss, `-2` hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    /// Intact segment of a ship of the given size
    Ship(u8),
    Miss,
    Hit,
}

impl Cell {
    pub fn to_i8(self) -> i8 {
        match self {
            Cell::Empty => 0,
            Cell::Ship(size) => size as i8,
            Cell::Miss => -1,
            Cell::Hit => -2,
        }
    }

    /// True for any cell that belongs to a ship, hit or not
    pub fn is_ship_footprint(self) -> bool {
        matches!(self, Cell::Ship(_) | Cell::Hit)
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.to_i8())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Ship extends along `y` (same row)
    Horizontal,
    /// Ship extends along `x` (same column)
    Vertical,
}

/// Candidate position of one ship: bow cell, size and direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: usize,
    pub y: usize,
    pub size: u8,
    pub orientation: Orientation,
}

impl Placement {
    pub fn new(x: usize, y: usize, size: u8, orientation: Orientation) -> Self {
        Self {
            x,
            y,
            size,
            orientation,
        }
    }

    /// Cells covered by this placement; `None` if any falls off the board
    pub fn cells(&self) -> Option<Vec<(usize, usize)>> {
        let len = self.size as usize;
        let (end_x, end_y) = match self.orientation {
            Orientation::Horizontal => (self.x, self.y + len.checked_sub(1)?),
            Orientation::Vertical => (self.x + len.checked_sub(1)?, self.y),
        };
        if end_x >= BOARD_SIZE || end_y >= BOARD_SIZE {
            return None;
        }

        Some(
            (0..len)
                .map(|i| match self.orientation {
                    Orientation::Horizontal => (self.x, self.y + i),
                    Orientation::Vertical => (self.x + i, self.y),
                })
                .collect(),
        )
    }
}

/// One player's board: ship layout, shots received from the opponent and the
/// number of ships still afloat.
#[derive(Debug, Clone, Serialize)]
pub struct Board {
    pub(super) grid: Grid,
    pub(super) shots_received: ShotGrid,
    pub(super) ships_remaining: u8,
}

impl Board {
    /// Board with no ships and no shots
    pub fn empty() -> Self {
        Self {
            grid: [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE],
            shots_received: [[false; BOARD_SIZE]; BOARD_SIZE],
            ships_remaining: 0,
        }
    }

    /// Build a board from explicit placements.
    ///
    /// Returns `None` if any placement breaks the overlap/adjacency rules.
    #[cfg(test)]
    pub fn from_placements(placements: &[Placement]) -> Option<Self> {
        let mut board = Self::empty();
        for placement in placements {
            if !board.place(*placement) {
                return None;
            }
        }
        Some(board)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn shots_received(&self) -> &ShotGrid {
        &self.shots_received
    }

    pub fn ships_remaining(&self) -> u8 {
        self.ships_remaining
    }

    #[cfg(test)]
    pub fn cell(&self, x: usize, y: usize) -> Cell {
        self.grid[x][y]
    }

    pub fn is_targeted(&self, x: usize, y: usize) -> bool {
        self.shots_received[x][y]
    }

    /// Check that a ship fits: in bounds, on empty water, and not touching
    /// any other ship, diagonals included.
    pub fn can_place(&self, placement: &Placement) -> bool {
        let Some(cells) = placement.cells() else {
            return false;
        };

        cells.iter().all(|&(x, y)| {
            self.grid[x][y] == Cell::Empty
                && neighbours(x, y).all(|(nx, ny)| !self.grid[nx][ny].is_ship_footprint())
        })
    }

    /// Place a ship if the placement is legal. Returns whether it was placed.
    pub fn place(&mut self, placement: Placement) -> bool {
        if !self.can_place(&placement) {
            return false;
        }
        if let Some(cells) = placement.cells() {
            for (x, y) in cells {
                self.grid[x][y] = Cell::Ship(placement.size);
            }
            self.ships_remaining += 1;
        }
        true
    }

    /// All cells of the ship occupying `(x, y)`, hit or intact.
    ///
    /// Ships never touch, so the straight run of footprint cells through
    /// `(x, y)` is exactly one ship.
    pub fn ship_footprint(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        if !self.grid[x][y].is_ship_footprint() {
            return Vec::new();
        }

        let mut cells = vec![(x, y)];
        for (dx, dy) in [(-1i32, 0i32), (1, 0), (0, -1), (0, 1)] {
            let (mut cx, mut cy) = (x as i32 + dx, y as i32 + dy);
            while in_bounds(cx, cy) && self.grid[cx as usize][cy as usize].is_ship_footprint() {
                cells.push((cx as usize, cy as usize));
                cx += dx;
                cy += dy;
            }
        }
        cells
    }

    /// Opponent-facing view: only cells the opponent has fired at are
    /// revealed, everything else reads as empty water.
    pub fn masked_grid(&self) -> Grid {
        let mut masked = [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE];
        for x in 0..BOARD_SIZE {
            for y in 0..BOARD_SIZE {
                if self.shots_received[x][y] {
                    masked[x][y] = self.grid[x][y];
                }
            }
        }
        masked
    }

    /// Every ship on the board as its list of cells
    #[cfg(test)]
    pub fn ships(&self) -> Vec<Vec<(usize, usize)>> {
        let mut seen = [[false; BOARD_SIZE]; BOARD_SIZE];
        let mut ships = Vec::new();
        for x in 0..BOARD_SIZE {
            for y in 0..BOARD_SIZE {
                if seen[x][y] || !self.grid[x][y].is_ship_footprint() {
                    continue;
                }
                let ship = self.ship_footprint(x, y);
                for &(sx, sy) in &ship {
                    seen[sx][sy] = true;
                }
                ships.push(ship);
            }
        }
        ships
    }
}

fn in_bounds(x: i32, y: i32) -> bool {
    (0..BOARD_SIZE as i32).contains(&x) && (0..BOARD_SIZE as i32).contains(&y)
}

/// The up to eight in-bounds cells surrounding `(x, y)`
fn neighbours(x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> {
    (-1i32..=1)
        .flat_map(move |dx| (-1i32..=1).map(move |dy| (dx, dy)))
        .filter(|&(dx, dy)| dx != 0 || dy != 0)
        .map(move |(dx, dy)| (x as i32 + dx, y as i32 + dy))
        .filter(|&(nx, ny)| in_bounds(nx, ny))
        .map(|(nx, ny)| (nx as usize, ny as usize))
}
