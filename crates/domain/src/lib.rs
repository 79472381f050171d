//! tickmud domain types.
//!
//! Plain records and value objects shared by the engine: identifiers, the world graph
//! rows (areas and rooms), players and their vitals, items, mobs and queued actions.

pub mod action;
pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use action::Action;
pub use entities::{find_item, validate_name, Area, Item, Mob, Player, Room, MAX_NAME_LEN};
pub use error::DomainError;
pub use ids::{AreaId, ItemId, MobId, PlayerId, RoomId};
pub use value_objects::{Direction, Vitals};
