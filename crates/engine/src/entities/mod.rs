//! Entities - the live world graph.
//!
//! Rooms are hydrated from the backing store on demand and shared between area actors
//! and connection tasks behind per-room locks.

pub mod room;
pub mod world;

pub use room::{Exit, Occupants, RoomNode, RoomState};
pub use world::{AreaRooms, Reloaded, World, WorldError};
