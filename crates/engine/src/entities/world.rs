//! World graph and loader.
//!
//! Holds every area known to the backing store and the rooms loaded for each. Rooms are
//! fetched lazily: an area's room map is only trusted while its length matches the store's
//! row count for that area, otherwise the area is reloaded before answering.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{MutexGuard, RwLock};

use tickmud_domain::{Area, AreaId, Direction, PlayerId, RoomId};

use super::room::{Exit, Occupants, RoomNode, RoomState};
use crate::infrastructure::ports::{RepoError, WorldStore};

/// An area and the rooms loaded for it so far.
pub struct AreaRooms {
    area: Area,
    rooms: RwLock<HashMap<RoomId, Arc<RoomNode>>>,
}

impl AreaRooms {
    fn new(area: Area) -> Self {
        Self {
            area,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    pub fn area(&self) -> &Area {
        &self.area
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }

    async fn get(&self, id: RoomId) -> Option<Arc<RoomNode>> {
        self.rooms.read().await.get(&id).cloned()
    }
}

/// Outcome of [`World::reload_area`].
#[derive(Debug, Default)]
pub struct Reloaded {
    /// Rooms held for the area afterwards.
    pub rooms: usize,
    /// Players who were standing in rooms that no longer exist.
    pub displaced: Vec<PlayerId>,
}

/// The in-memory world graph.
pub struct World {
    store: Arc<dyn WorldStore>,
    areas: DashMap<AreaId, Arc<AreaRooms>>,
    room_areas: DashMap<RoomId, AreaId>,
}

impl World {
    /// Build the graph skeleton: every area, no rooms yet.
    pub async fn load(store: Arc<dyn WorldStore>) -> Result<Self, WorldError> {
        let world = Self {
            store,
            areas: DashMap::new(),
            room_areas: DashMap::new(),
        };
        let count = world.refresh_areas().await?;
        tracing::info!(areas = count, "World graph initialised");
        Ok(world)
    }

    /// Eagerly load every area's rooms. Returns the number of rooms loaded.
    pub async fn preload(&self) -> Result<usize, WorldError> {
        let ids: Vec<AreaId> = self.areas.iter().map(|entry| *entry.key()).collect();
        let mut total = 0;
        for area_id in ids {
            total += self.reload_area(area_id).await?.rooms;
        }
        tracing::info!(rooms = total, "World preloaded");
        Ok(total)
    }

    pub fn areas(&self) -> Vec<Area> {
        self.areas
            .iter()
            .map(|entry| entry.value().area().clone())
            .collect()
    }

    /// Owning area of a loaded room.
    pub fn area_of(&self, room_id: RoomId) -> Option<AreaId> {
        self.room_areas.get(&room_id).map(|entry| *entry.value())
    }

    /// Number of rooms currently held in memory for an area.
    #[cfg(test)]
    pub async fn loaded_room_count(&self, area_id: AreaId) -> usize {
        let area = self.areas.get(&area_id).map(|entry| entry.value().clone());
        match area {
            Some(area) => area.len().await,
            None => 0,
        }
    }

    /// Every room currently held in memory.
    #[cfg(test)]
    pub async fn loaded_rooms(&self) -> Vec<Arc<RoomNode>> {
        let areas: Vec<Arc<AreaRooms>> = self.areas.iter().map(|entry| entry.value().clone()).collect();
        let mut rooms = Vec::new();
        for area in areas {
            rooms.extend(area.rooms.read().await.values().cloned());
        }
        rooms
    }

    /// Look up a room, reloading its area first if the snapshot disagrees with the store.
    pub async fn room(&self, id: RoomId) -> Result<Arc<RoomNode>, WorldError> {
        let area_id = match self.area_of(id) {
            Some(area_id) => area_id,
            None => {
                let record = self
                    .store
                    .get_room(id)
                    .await?
                    .ok_or(WorldError::RoomNotFound(id))?;
                record.area_id
            }
        };

        let area = self.area_rooms(area_id).await?;
        self.ensure_coherent(&area).await?;

        area.get(id).await.ok_or(WorldError::RoomNotFound(id))
    }

    /// Follow an exit, hydrating it on first use.
    ///
    /// Returns `Ok(None)` when there is no exit in that direction and
    /// `Err(WorldError::RoomNotFound)` when the exit points at a missing row.
    pub async fn resolve_exit(
        &self,
        from: &RoomNode,
        direction: Direction,
    ) -> Result<Option<Arc<RoomNode>>, WorldError> {
        let exit = match from.lock().await.exits.get(&direction) {
            Some(exit) => exit.clone(),
            None => return Ok(None),
        };

        if let Some(room) = exit.hydrated() {
            return Ok(Some(room));
        }

        let target = self.room(exit.target()).await?;

        let mut state = from.lock().await;
        if let Some(slot) = state.exits.get_mut(&direction) {
            if slot.target() == target.id() {
                *slot = Exit::resolved(&target);
            }
        }
        drop(state);

        tracing::debug!(
            from = %from.id(),
            direction = %direction,
            to = %target.id(),
            "Exit hydrated"
        );
        Ok(Some(target))
    }

    /// Lock two distinct rooms in a global order and return the guards as `(a, b)`.
    ///
    /// Every two-room operation goes through here so concurrent movers in opposite
    /// directions cannot deadlock.
    pub async fn lock_pair<'a>(
        a: &'a RoomNode,
        b: &'a RoomNode,
    ) -> Result<(MutexGuard<'a, RoomState>, MutexGuard<'a, RoomState>), WorldError> {
        if a.id() == b.id() {
            return Err(WorldError::SameRoom(a.id()));
        }
        if a.id() < b.id() {
            let guard_a = a.lock().await;
            let guard_b = b.lock().await;
            Ok((guard_a, guard_b))
        } else {
            let guard_b = b.lock().await;
            let guard_a = a.lock().await;
            Ok((guard_a, guard_b))
        }
    }

    /// Add a player to a room's occupant set.
    pub async fn place_player(
        &self,
        player_id: PlayerId,
        room_id: RoomId,
    ) -> Result<Arc<RoomNode>, WorldError> {
        let room = self.room(room_id).await?;
        room.lock().await.players.insert(player_id);
        Ok(room)
    }

    /// Remove a player from a room's occupant set. Returns whether they were present.
    pub async fn remove_player(
        &self,
        player_id: PlayerId,
        room_id: RoomId,
    ) -> Result<bool, WorldError> {
        let room = self.room(room_id).await?;
        let removed = room.lock().await.players.remove(&player_id);
        Ok(removed)
    }

    /// Reload an area's rooms from the store.
    ///
    /// Existing nodes are kept (and their text and exits refreshed) so hydrated exits and
    /// live occupants stay valid; missing rooms are inserted with their occupants; rooms
    /// no longer in the store are dropped. Players still standing in a dropped room are
    /// reported back as displaced.
    pub async fn reload_area(&self, area_id: AreaId) -> Result<Reloaded, WorldError> {
        let area = self.area_rooms(area_id).await?;
        let records = self.store.list_rooms_in_area(area_id).await?;

        let known: HashSet<RoomId> = area.rooms.read().await.keys().copied().collect();
        let mut fresh = HashMap::new();
        for record in records.iter().filter(|r| !known.contains(&r.id)) {
            fresh.insert(record.id, self.load_occupants(record.id).await?);
        }

        let keep: HashSet<RoomId> = records.iter().map(|r| r.id).collect();
        let mut rooms = area.rooms.write().await;

        let stale: Vec<RoomId> = rooms
            .keys()
            .filter(|id| !keep.contains(id))
            .copied()
            .collect();
        let mut displaced = Vec::new();
        for id in &stale {
            self.room_areas.remove(id);
            let Some(node) = rooms.remove(id) else {
                continue;
            };
            let players = std::mem::take(&mut node.lock().await.players);
            for player_id in players {
                tracing::warn!(
                    area_id = %area_id,
                    room_id = %id,
                    player_id = %player_id,
                    "Room removed from store while occupied, player displaced"
                );
                displaced.push(player_id);
            }
        }

        for record in &records {
            self.room_areas.insert(record.id, record.area_id);
            match rooms.get(&record.id) {
                Some(node) => node.lock().await.refresh(record),
                None => {
                    let occupants = fresh.remove(&record.id).unwrap_or_default();
                    rooms.insert(record.id, Arc::new(RoomNode::new(record, occupants)));
                }
            }
        }

        tracing::debug!(
            area_id = %area_id,
            rooms = rooms.len(),
            dropped = stale.len(),
            displaced = displaced.len(),
            "Area reloaded"
        );
        Ok(Reloaded {
            rooms: rooms.len(),
            displaced,
        })
    }

    async fn ensure_coherent(&self, area: &AreaRooms) -> Result<(), WorldError> {
        let stored = self.store.count_rooms_in_area(area.area.id).await?;
        let loaded = area.len().await as u64;
        if loaded != stored {
            tracing::debug!(
                area_id = %area.area.id,
                loaded,
                stored,
                "Area snapshot out of date, reloading"
            );
            self.reload_area(area.area.id).await?;
        }
        Ok(())
    }

    async fn area_rooms(&self, area_id: AreaId) -> Result<Arc<AreaRooms>, WorldError> {
        if let Some(area) = self.areas.get(&area_id) {
            return Ok(area.value().clone());
        }
        // Areas created after startup.
        self.refresh_areas().await?;
        self.areas
            .get(&area_id)
            .map(|entry| entry.value().clone())
            .ok_or(WorldError::AreaNotFound(area_id))
    }

    async fn refresh_areas(&self) -> Result<usize, WorldError> {
        for area in self.store.list_areas().await? {
            self.areas
                .entry(area.id)
                .or_insert_with(|| Arc::new(AreaRooms::new(area)));
        }
        Ok(self.areas.len())
    }

    async fn load_occupants(&self, room_id: RoomId) -> Result<Occupants, RepoError> {
        Ok(Occupants {
            items: self.store.list_items_in_room(room_id).await?,
            mobs: self.store.list_mobs_in_room(room_id).await?,
            players: self.store.list_players_in_room(room_id).await?,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),
    #[error("Area not found: {0}")]
    AreaNotFound(AreaId),
    #[error("Cannot pair room {0} with itself")]
    SameRoom(RoomId),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl WorldError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RoomNotFound(_) | Self::AreaNotFound(_))
            || matches!(self, Self::Repo(err) if err.is_not_found())
    }
}
