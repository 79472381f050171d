//! Domain entities - Core business objects with identity

mod area;
mod item;
mod mob;
mod player;
mod room;

pub use area::Area;
pub use item::{find_item, Item};
pub use mob::Mob;
pub use player::{validate_name, Player, MAX_NAME_LEN};
pub use room::Room;
