//! In-process store for players and games

pub mod games;
pub mod players;

pub use games::{GameStore, SharedGame, StoreError};
pub use players::{Player, PlayerStore};
