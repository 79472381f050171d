//! Live room nodes of the world graph.
//!
//! A `RoomNode` is shared (`Arc`) between the area that owns it and any exits that have
//! been hydrated to point at it. Everything mutable sits behind the node's mutex, which is
//! the per-room critical section for occupant changes.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, MutexGuard};

use tickmud_domain::{AreaId, Direction, Item, Mob, PlayerId, Room, RoomId};

/// A directional edge to another room.
///
/// Starts as a bare id and is hydrated on first traversal. The hydrated form holds a weak
/// reference so the cyclic room graph never keeps itself alive; a reference whose target
/// was dropped by an area reload reads as unresolved again.
#[derive(Debug, Clone)]
pub enum Exit {
    Unresolved(RoomId),
    Resolved { id: RoomId, room: Weak<RoomNode> },
}

impl Exit {
    pub fn resolved(room: &Arc<RoomNode>) -> Self {
        Self::Resolved {
            id: room.id(),
            room: Arc::downgrade(room),
        }
    }

    /// Id of the room this exit leads to.
    pub fn target(&self) -> RoomId {
        match self {
            Self::Unresolved(id) => *id,
            Self::Resolved { id, .. } => *id,
        }
    }

    /// The target node, if hydrated and still alive.
    pub fn hydrated(&self) -> Option<Arc<RoomNode>> {
        match self {
            Self::Unresolved(_) => None,
            Self::Resolved { room, .. } => room.upgrade(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.hydrated().is_some()
    }
}

/// Occupant sub-collections loaded alongside a room row.
#[derive(Debug, Clone, Default)]
pub struct Occupants {
    pub items: Vec<Item>,
    pub mobs: Vec<Mob>,
    pub players: Vec<PlayerId>,
}

/// Mutable state of a room.
#[derive(Debug)]
pub struct RoomState {
    pub name: String,
    pub description: String,
    pub exits: BTreeMap<Direction, Exit>,
    pub items: Vec<Item>,
    pub mobs: Vec<Mob>,
    pub players: BTreeSet<PlayerId>,
}

impl RoomState {
    fn new(record: &Room, occupants: Occupants) -> Self {
        Self {
            name: record.name.clone(),
            description: record.description.clone(),
            exits: record
                .exits
                .iter()
                .map(|(dir, target)| (*dir, Exit::Unresolved(*target)))
                .collect(),
            items: occupants.items,
            mobs: occupants.mobs,
            players: occupants.players.into_iter().collect(),
        }
    }

    /// Apply a fresh row to an already-loaded room.
    ///
    /// Hydrated exits survive when their target is unchanged. Occupants are left alone:
    /// once a room is loaded its in-memory sets are authoritative.
    pub(crate) fn refresh(&mut self, record: &Room) {
        self.name = record.name.clone();
        self.description = record.description.clone();

        let mut exits = BTreeMap::new();
        for (dir, target) in &record.exits {
            let exit = match self.exits.remove(dir) {
                Some(existing) if existing.target() == *target => existing,
                _ => Exit::Unresolved(*target),
            };
            exits.insert(*dir, exit);
        }
        self.exits = exits;
    }

    /// Directions with an exit, in display order.
    pub fn exit_directions(&self) -> Vec<Direction> {
        self.exits.keys().copied().collect()
    }

    pub fn take_item(&mut self, token: &str) -> Option<Item> {
        let index = self.items.iter().position(|item| item.matches(token))?;
        Some(self.items.remove(index))
    }
}

/// A room as held by the world graph.
#[derive(Debug)]
pub struct RoomNode {
    id: RoomId,
    area_id: AreaId,
    state: Mutex<RoomState>,
}

impl RoomNode {
    pub fn new(record: &Room, occupants: Occupants) -> Self {
        Self {
            id: record.id,
            area_id: record.area_id,
            state: Mutex::new(RoomState::new(record, occupants)),
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn area_id(&self) -> AreaId {
        self.area_id
    }

    /// Enter this room's critical section.
    pub async fn lock(&self) -> MutexGuard<'_, RoomState> {
        self.state.lock().await
    }

    pub async fn has_player(&self, player_id: PlayerId) -> bool {
        self.state.lock().await.players.contains(&player_id)
    }

    pub async fn players(&self) -> Vec<PlayerId> {
        self.state.lock().await.players.iter().copied().collect()
    }
}
