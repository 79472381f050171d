//! Application state and composition.

use std::sync::Arc;

use tickmud_domain::RoomId;

use crate::api::connections::SessionRegistry;
use crate::api::notify::Broadcaster;
use crate::areas::{ActionRegistry, AreaDirectory, AreaSpawner, TickConfig};
use crate::entities::{World, WorldError};
use crate::infrastructure::ports::{ItemStore, PlayerStore, RepoError, WorldStore};
use crate::infrastructure::settings::EngineSettings;
use crate::use_cases::commands::{CommandRouter, RouterError};
use crate::use_cases::{register_commands, JoinGame};

/// Main application state.
///
/// Built once at startup and shared with every connection task.
pub struct App {
    pub settings: EngineSettings,
    pub world: Arc<World>,
    pub sessions: Arc<SessionRegistry>,
    pub broadcaster: Arc<Broadcaster>,
    pub router: Arc<CommandRouter>,
    pub areas: Arc<AreaDirectory>,
    pub join: Arc<JoinGame>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("World error: {0}")]
    World(#[from] WorldError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
    #[error("Command registration failed: {0}")]
    Router(#[from] RouterError),
    #[error("The world has no rooms to start in")]
    NoStartRoom,
}

impl App {
    /// Wire every component over one backing store.
    ///
    /// Must run inside a Tokio runtime: area actors are spawned as players reach them.
    pub async fn new<S>(store: Arc<S>, settings: EngineSettings) -> Result<Self, AppError>
    where
        S: WorldStore + PlayerStore + ItemStore + 'static,
    {
        let world = Arc::new(World::load(store.clone()).await?);
        if settings.preload_world {
            let rooms = world.preload().await?;
            tracing::info!(rooms, "World preloaded");
        }

        let start_room = match settings.start_room {
            Some(id) => world.room(id).await?.id(),
            None => first_room(store.as_ref()).await?.ok_or(AppError::NoStartRoom)?,
        };
        tracing::info!(start_room = %start_room, areas = world.areas().len(), "World ready");

        let sessions = Arc::new(SessionRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(sessions.clone()));

        let router = CommandRouter::new()
            .with_broadcaster(broadcaster.clone())
            .with_world(world.clone())
            .with_player_store(store.clone())
            .with_item_store(store.clone())
            .with_sessions(sessions.clone());
        register_commands(&router)?;

        let areas = Arc::new(AreaDirectory::new(AreaSpawner {
            broadcaster: broadcaster.clone(),
            sessions: sessions.clone(),
            players: store.clone(),
            registry: Arc::new(ActionRegistry::standard()),
            config: TickConfig {
                interval: settings.tick_interval,
                heartbeat_ticks: settings.heartbeat_ticks,
                max_pending: settings.area_queue_capacity,
            },
            queue_capacity: settings.area_queue_capacity,
        }));

        let join = Arc::new(
            JoinGame::new(
                world.clone(),
                store,
                sessions.clone(),
                broadcaster.clone(),
                start_room,
            )
            .with_areas(areas.clone()),
        );

        Ok(Self {
            settings,
            world,
            sessions,
            broadcaster,
            router: Arc::new(router),
            areas,
            join,
        })
    }

    /// Tell every connected player the server is going down. Returns how many were told.
    pub async fn announce_shutdown(&self) -> usize {
        self.broadcaster
            .notify_all("The world is shutting down. Goodbye.")
            .await
    }
}

/// First room of the first area that has any.
async fn first_room(store: &dyn WorldStore) -> Result<Option<RoomId>, RepoError> {
    for area in store.list_areas().await? {
        if let Some(room) = store.list_rooms_in_area(area.id).await?.first() {
            return Ok(Some(room.id));
        }
    }
    Ok(None)
}
