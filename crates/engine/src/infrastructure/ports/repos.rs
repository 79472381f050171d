//! Repository port traits for backing store access.
//!
//! The world graph only needs a handful of row-level queries: rooms by id, per-area room
//! counts and listings, and the occupants of a room. Players and items have their own
//! ports so handlers declare exactly what they touch.

use async_trait::async_trait;
use tickmud_domain::{Area, AreaId, Item, ItemId, Mob, Player, PlayerId, Room, RoomId, Vitals};

use super::error::RepoError;

// =============================================================================
// World Graph
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorldStore: Send + Sync {
    async fn list_areas(&self) -> Result<Vec<Area>, RepoError>;
    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, RepoError>;

    /// Number of room rows owned by an area; used to validate the in-memory snapshot.
    async fn count_rooms_in_area(&self, area_id: AreaId) -> Result<u64, RepoError>;
    async fn list_rooms_in_area(&self, area_id: AreaId) -> Result<Vec<Room>, RepoError>;

    // Occupants
    async fn list_items_in_room(&self, room_id: RoomId) -> Result<Vec<Item>, RepoError>;
    async fn list_mobs_in_room(&self, room_id: RoomId) -> Result<Vec<Mob>, RepoError>;
    /// Only players currently logged in.
    async fn list_players_in_room(&self, room_id: RoomId) -> Result<Vec<PlayerId>, RepoError>;
}

// =============================================================================
// Players
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlayerStore: Send + Sync {
    /// Case-insensitive lookup; the returned player has its inventory loaded.
    async fn get_player_by_name(&self, name: &str) -> Result<Option<Player>, RepoError>;
    async fn create_player(&self, player: &Player) -> Result<(), RepoError>;
    async fn set_player_location(
        &self,
        id: PlayerId,
        room_id: RoomId,
        area_id: AreaId,
    ) -> Result<(), RepoError>;
    async fn save_vitals(&self, id: PlayerId, vitals: &Vitals) -> Result<(), RepoError>;
    async fn set_online(&self, id: PlayerId, online: bool) -> Result<(), RepoError>;
}

// =============================================================================
// Items
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn list_inventory(&self, player_id: PlayerId) -> Result<Vec<Item>, RepoError>;
    /// Clears the item's room and equipped flag.
    async fn move_item_to_player(&self, item_id: ItemId, player_id: PlayerId)
        -> Result<(), RepoError>;
    /// Clears the item's owner and equipped flag.
    async fn move_item_to_room(&self, item_id: ItemId, room_id: RoomId) -> Result<(), RepoError>;
    async fn set_equipped(&self, item_id: ItemId, equipped: bool) -> Result<(), RepoError>;
}
