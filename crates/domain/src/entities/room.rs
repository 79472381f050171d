//! Room entity - a node in the world graph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AreaId, Direction, RoomId};

/// A room row: identity, owning area, display text and exit targets.
///
/// Exits are plain target ids here. Whether a target has been hydrated is tracked by the
/// engine, not by the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub area_id: AreaId,
    pub name: String,
    pub description: String,
    pub exits: BTreeMap<Direction, RoomId>,
}

impl Room {
    pub fn new(area_id: AreaId, name: impl Into<String>) -> Self {
        Self {
            id: RoomId::new(),
            area_id,
            name: name.into(),
            description: String::new(),
            exits: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: RoomId) -> Self {
        self.id = id;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a one-way exit. Exits are directional; no reverse exit is implied.
    pub fn with_exit(mut self, direction: Direction, target: RoomId) -> Self {
        self.exits.insert(direction, target);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exits_are_one_way() {
        let area = AreaId::new();
        let b = Room::new(area, "B");
        let a = Room::new(area, "A").with_exit(Direction::North, b.id);

        assert_eq!(a.exits.get(&Direction::North), Some(&b.id));
        assert!(b.exits.is_empty());
    }
}
