//! Player entity - a participant occupying exactly one room.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::{AreaId, Item, ItemId, PlayerId, RoomId, Vitals};

/// Longest accepted player name.
pub const MAX_NAME_LEN: usize = 24;

/// A player as persisted and as held by a live session.
///
/// `room_id`/`area_id` always name the room whose occupant set holds this player
/// while the player is connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub room_id: RoomId,
    pub area_id: AreaId,
    pub vitals: Vitals,
    pub inventory: Vec<Item>,
    pub is_admin: bool,
}

impl Player {
    /// Create a new player standing in `room_id`.
    pub fn new(name: impl Into<String>, room_id: RoomId, area_id: AreaId) -> Result<Self, DomainError> {
        let name = validate_name(name.into())?;
        Ok(Self {
            id: PlayerId::new(),
            name,
            room_id,
            area_id,
            vitals: Vitals::default(),
            inventory: Vec::new(),
            is_admin: false,
        })
    }

    pub fn with_id(mut self, id: PlayerId) -> Self {
        self.id = id;
        self
    }

    pub fn with_vitals(mut self, vitals: Vitals) -> Self {
        self.vitals = vitals;
        self
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    /// Find a carried item by a typed token.
    pub fn find_item(&self, token: &str) -> Option<&Item> {
        crate::entities::find_item(&self.inventory, token)
    }

    /// Remove a carried item by id.
    pub fn take_item(&mut self, id: ItemId) -> Option<Item> {
        let index = self.inventory.iter().position(|item| item.id == id)?;
        Some(self.inventory.remove(index))
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.inventory.iter_mut().find(|item| item.id == id)
    }
}

/// Normalise and validate a login name.
///
/// Names are a single word of ASCII letters, stored with a leading capital.
pub fn validate_name(name: String) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("Player name cannot be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(DomainError::validation(format!(
            "Player name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DomainError::validation("Player name may only contain letters"));
    }
    let lower = name.to_ascii_lowercase();
    let mut chars = lower.chars();
    Ok(match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => lower,
    })
}
