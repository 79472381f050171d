//! Movement use cases.

mod move_player;

pub use move_player::{MoveError, MovePlayer, MoveResult};
