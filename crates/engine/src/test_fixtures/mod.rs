//! Test fixtures: an in-memory store, a world builder and a full-engine harness.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut builder = WorldBuilder::new();
//! let town = builder.area("Town");
//! let square = builder.room(town, "Square");
//! let harness = Harness::new(builder).await;
//! let mut ann = harness.login("Ann", square).await;
//! harness.run(&mut ann, "look").await;
//! assert!(ann.drain()[0].starts_with("Square"));
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tickmud_domain::{
    Area, AreaId, Direction, Item, ItemId, Mob, MobId, Player, PlayerId, Room, RoomId, Vitals,
};
use tokio::sync::mpsc;

use crate::api::connections::SessionRegistry;
use crate::api::notify::Broadcaster;
use crate::app::App;
use crate::areas::{AreaDirectory, AreaRouteHandle};
use crate::entities::World;
use crate::infrastructure::ports::{ItemStore, PlayerStore, RepoError, WorldStore};
use crate::infrastructure::settings::EngineSettings;
use crate::use_cases::commands::{AreaRoute, CommandRouter, LineOutcome};
use crate::use_cases::JoinGame;

// =============================================================================
// In-memory store
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Holder {
    Room(RoomId),
    Player(PlayerId),
}

#[derive(Default)]
struct State {
    areas: Vec<Area>,
    rooms: Vec<Room>,
    items: Vec<(Holder, Item)>,
    mobs: Vec<(RoomId, Mob)>,
    /// Stored without inventory; items live in `items`.
    players: Vec<(Player, bool)>,
}

impl State {
    fn player_mut(&mut self, id: PlayerId) -> Result<&mut (Player, bool), RepoError> {
        self.players
            .iter_mut()
            .find(|(player, _)| player.id == id)
            .ok_or_else(|| RepoError::not_found("Player", id))
    }

    fn item_mut(&mut self, id: ItemId) -> Result<&mut (Holder, Item), RepoError> {
        self.items
            .iter_mut()
            .find(|(_, item)| item.id == id)
            .ok_or_else(|| RepoError::not_found("Item", id))
    }

    fn room_mut(&mut self, id: RoomId) -> &mut Room {
        self.rooms
            .iter_mut()
            .find(|room| room.id == id)
            .expect("room was added to the builder")
    }

    fn held_by(&self, holder: Holder) -> Vec<Item> {
        self.items
            .iter()
            .filter(|(h, _)| *h == holder)
            .map(|(_, item)| item.clone())
            .collect()
    }
}

/// Store double backed by plain vectors, implementing every port.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("store lock poisoned")
    }

    /// Drop a room row, leaving exits that point at it dangling.
    pub fn delete_room(&self, id: RoomId) {
        self.state().rooms.retain(|room| room.id != id);
    }

    pub fn is_online(&self, id: PlayerId) -> bool {
        self.state()
            .players
            .iter()
            .any(|(player, online)| player.id == id && *online)
    }

    pub fn player_location(&self, id: PlayerId) -> Option<(RoomId, AreaId)> {
        self.state()
            .players
            .iter()
            .find(|(player, _)| player.id == id)
            .map(|(player, _)| (player.room_id, player.area_id))
    }

    pub fn saved_health(&self, id: PlayerId) -> Option<i32> {
        self.state()
            .players
            .iter()
            .find(|(player, _)| player.id == id)
            .map(|(player, _)| player.vitals.health)
    }

    /// Id of the room or player holding the item, as a string.
    pub fn item_holder(&self, id: ItemId) -> Option<String> {
        self.state()
            .items
            .iter()
            .find(|(_, item)| item.id == id)
            .map(|(holder, _)| match holder {
                Holder::Room(room) => room.to_string(),
                Holder::Player(player) => player.to_string(),
            })
    }

    pub fn is_equipped(&self, id: ItemId) -> bool {
        self.state()
            .items
            .iter()
            .any(|(_, item)| item.id == id && item.equipped)
    }

    pub fn area_of_room(&self, id: RoomId) -> Option<AreaId> {
        self.state()
            .rooms
            .iter()
            .find(|room| room.id == id)
            .map(|room| room.area_id)
    }
}

#[async_trait]
impl WorldStore for InMemoryStore {
    async fn list_areas(&self) -> Result<Vec<Area>, RepoError> {
        Ok(self.state().areas.clone())
    }

    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, RepoError> {
        Ok(self.state().rooms.iter().find(|room| room.id == id).cloned())
    }

    async fn count_rooms_in_area(&self, area_id: AreaId) -> Result<u64, RepoError> {
        Ok(self
            .state()
            .rooms
            .iter()
            .filter(|room| room.area_id == area_id)
            .count() as u64)
    }

    async fn list_rooms_in_area(&self, area_id: AreaId) -> Result<Vec<Room>, RepoError> {
        Ok(self
            .state()
            .rooms
            .iter()
            .filter(|room| room.area_id == area_id)
            .cloned()
            .collect())
    }

    async fn list_items_in_room(&self, room_id: RoomId) -> Result<Vec<Item>, RepoError> {
        Ok(self.state().held_by(Holder::Room(room_id)))
    }

    async fn list_mobs_in_room(&self, room_id: RoomId) -> Result<Vec<Mob>, RepoError> {
        Ok(self
            .state()
            .mobs
            .iter()
            .filter(|(room, _)| *room == room_id)
            .map(|(_, mob)| mob.clone())
            .collect())
    }

    async fn list_players_in_room(&self, room_id: RoomId) -> Result<Vec<PlayerId>, RepoError> {
        Ok(self
            .state()
            .players
            .iter()
            .filter(|(player, online)| *online && player.room_id == room_id)
            .map(|(player, _)| player.id)
            .collect())
    }
}

#[async_trait]
impl PlayerStore for InMemoryStore {
    async fn get_player_by_name(&self, name: &str) -> Result<Option<Player>, RepoError> {
        let state = self.state();
        Ok(state
            .players
            .iter()
            .find(|(player, _)| player.name.eq_ignore_ascii_case(name))
            .map(|(player, _)| Player {
                inventory: state.held_by(Holder::Player(player.id)),
                ..player.clone()
            }))
    }

    async fn create_player(&self, player: &Player) -> Result<(), RepoError> {
        let mut state = self.state();
        if state
            .players
            .iter()
            .any(|(existing, _)| existing.name.eq_ignore_ascii_case(&player.name))
        {
            return Err(RepoError::constraint(format!(
                "player name '{}' is taken",
                player.name
            )));
        }
        for item in &player.inventory {
            state.items.push((Holder::Player(player.id), item.clone()));
        }
        let stored = Player {
            inventory: Vec::new(),
            ..player.clone()
        };
        state.players.push((stored, false));
        Ok(())
    }

    async fn set_player_location(
        &self,
        id: PlayerId,
        room_id: RoomId,
        area_id: AreaId,
    ) -> Result<(), RepoError> {
        let mut state = self.state();
        let (player, _) = state.player_mut(id)?;
        player.room_id = room_id;
        player.area_id = area_id;
        Ok(())
    }

    async fn save_vitals(&self, id: PlayerId, vitals: &Vitals) -> Result<(), RepoError> {
        let mut state = self.state();
        state.player_mut(id)?.0.vitals = *vitals;
        Ok(())
    }

    async fn set_online(&self, id: PlayerId, online: bool) -> Result<(), RepoError> {
        let mut state = self.state();
        state.player_mut(id)?.1 = online;
        Ok(())
    }
}

#[async_trait]
impl ItemStore for InMemoryStore {
    async fn list_inventory(&self, player_id: PlayerId) -> Result<Vec<Item>, RepoError> {
        Ok(self.state().held_by(Holder::Player(player_id)))
    }

    async fn move_item_to_player(
        &self,
        item_id: ItemId,
        player_id: PlayerId,
    ) -> Result<(), RepoError> {
        let mut state = self.state();
        let (holder, item) = state.item_mut(item_id)?;
        *holder = Holder::Player(player_id);
        item.equipped = false;
        Ok(())
    }

    async fn move_item_to_room(&self, item_id: ItemId, room_id: RoomId) -> Result<(), RepoError> {
        let mut state = self.state();
        let (holder, item) = state.item_mut(item_id)?;
        *holder = Holder::Room(room_id);
        item.equipped = false;
        Ok(())
    }

    async fn set_equipped(&self, item_id: ItemId, equipped: bool) -> Result<(), RepoError> {
        let mut state = self.state();
        state.item_mut(item_id)?.1.equipped = equipped;
        Ok(())
    }
}

// =============================================================================
// World builder
// =============================================================================

/// Builds the contents of an [`InMemoryStore`].
#[derive(Default)]
pub struct WorldBuilder {
    state: State,
}

impl WorldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn area(&mut self, name: &str) -> AreaId {
        let area = Area::new(name);
        let id = area.id;
        self.state.areas.push(area);
        id
    }

    pub fn room(&mut self, area: AreaId, name: &str) -> RoomId {
        self.room_with(Room::new(area, name))
    }

    pub fn room_with(&mut self, room: Room) -> RoomId {
        let id = room.id;
        self.state.rooms.push(room);
        id
    }

    /// One-way exit; `to` need not exist.
    pub fn exit(&mut self, from: RoomId, direction: Direction, to: RoomId) {
        self.state.room_mut(from).exits.insert(direction, to);
    }

    pub fn item_in_room(&mut self, room: RoomId, item: Item) -> ItemId {
        let id = item.id;
        self.state.items.push((Holder::Room(room), item));
        id
    }

    pub fn mob_in_room(&mut self, room: RoomId, name: &str) -> MobId {
        let mob = Mob::new(name);
        let id = mob.id;
        self.state.mobs.push((room, mob));
        id
    }

    pub fn into_store(self) -> Arc<InMemoryStore> {
        Arc::new(InMemoryStore {
            state: Mutex::new(self.state),
        })
    }
}

// =============================================================================
// Engine harness
// =============================================================================

/// The whole engine over an in-memory store, with fast ticks and no heartbeat.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub world: Arc<World>,
    pub sessions: Arc<SessionRegistry>,
    pub broadcaster: Arc<Broadcaster>,
    pub router: Arc<CommandRouter>,
    pub directory: Arc<AreaDirectory>,
    pub join: Arc<JoinGame>,
}

impl Harness {
    pub async fn new(builder: WorldBuilder) -> Self {
        let store = builder.into_store();
        let settings = EngineSettings {
            tick_interval: Duration::from_millis(10),
            heartbeat_ticks: 0,
            area_queue_capacity: 64,
            ..EngineSettings::default()
        };
        let app = match App::new(store.clone(), settings).await {
            Ok(app) => app,
            Err(e) => panic!("test engine failed to assemble: {e}"),
        };

        Self {
            store,
            world: app.world,
            sessions: app.sessions,
            broadcaster: app.broadcaster,
            router: app.router,
            directory: app.areas,
            join: app.join,
        }
    }

    /// Log `name` in, creating the character in `room` if it does not exist yet.
    pub async fn login(&self, name: &str, room: RoomId) -> TestClient {
        self.login_as(name, room, false).await
    }

    pub async fn login_admin(&self, name: &str, room: RoomId) -> TestClient {
        self.login_as(name, room, true).await
    }

    async fn login_as(&self, name: &str, room: RoomId, is_admin: bool) -> TestClient {
        if self.store.get_player_by_name(name).await.unwrap().is_none() {
            let area = self
                .store
                .area_of_room(room)
                .expect("login room exists in the store");
            let player = Player::new(name, room, area).unwrap().with_admin(is_admin);
            self.store.create_player(&player).await.unwrap();
        }

        let (tx, rx) = mpsc::channel(256);
        let session = self.join.login(name, tx).await.unwrap();
        let (_, area) = session.location().await;
        TestClient {
            player_id: session.player_id(),
            rx,
            route: self.directory.route(area).unwrap(),
        }
    }

    /// Run a line the way the client's connection would.
    pub async fn run(&self, client: &mut TestClient, line: &str) -> LineOutcome {
        self.router
            .handle_command(client.player_id, line, &mut client.route)
            .await
    }

    /// Run a line with a route built from the player's current area.
    pub async fn run_detached(&self, player_id: PlayerId, line: &str) -> LineOutcome {
        let session = self.sessions.require(player_id).await.unwrap();
        let (_, area) = session.location().await;
        let mut route = self.directory.route(area).unwrap();
        self.router.handle_command(player_id, line, &mut route).await
    }

    /// Assert `player` is an occupant of `room` and of no other loaded room.
    pub async fn assert_only_in(&self, player: PlayerId, room: RoomId) {
        for node in self.world.loaded_rooms().await {
            let present = node.has_player(player).await;
            if node.id() == room {
                assert!(present, "player missing from room {}", node.id());
            } else {
                assert!(!present, "player also listed in room {}", node.id());
            }
        }
    }
}

/// The receiving end of a logged-in player's connection.
pub struct TestClient {
    pub player_id: PlayerId,
    rx: mpsc::Receiver<String>,
    route: AreaRouteHandle,
}

impl TestClient {
    /// Everything delivered so far, without status lines.
    pub fn drain(&mut self) -> Vec<String> {
        self.drain_raw()
            .into_iter()
            .filter(|line| !is_status_line(line))
            .collect()
    }

    pub fn drain_raw(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    pub fn route_area(&self) -> AreaId {
        self.route.area()
    }

    /// Wait for the next non-status line.
    pub async fn recv_within(&mut self, wait: Duration) -> Option<String> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let line = tokio::time::timeout_at(deadline, self.rx.recv())
                .await
                .ok()??;
            if !is_status_line(&line) {
                return Some(line);
            }
        }
    }
}

fn is_status_line(line: &str) -> bool {
    line.starts_with('<') && line.ends_with("mv> ")
}
