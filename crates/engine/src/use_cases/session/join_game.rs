//! Login and logout.

use std::sync::Arc;

use tickmud_domain::{validate_name, DomainError, Player, PlayerId, RoomId};
use tokio::sync::mpsc;

use crate::api::connections::{Session, SessionRegistry};
use crate::api::notify::Broadcaster;
use crate::areas::AreaDirectory;
use crate::entities::{RoomNode, World, WorldError};
use crate::infrastructure::ports::{PlayerStore, RepoError, SessionError};
use crate::use_cases::look::describe_room;

/// Use case for attaching a connection to a player and detaching it again.
pub struct JoinGame {
    world: Arc<World>,
    players: Arc<dyn PlayerStore>,
    sessions: Arc<SessionRegistry>,
    broadcaster: Arc<Broadcaster>,
    start_room: RoomId,
    areas: Option<Arc<AreaDirectory>>,
}

impl JoinGame {
    pub fn new(
        world: Arc<World>,
        players: Arc<dyn PlayerStore>,
        sessions: Arc<SessionRegistry>,
        broadcaster: Arc<Broadcaster>,
        start_room: RoomId,
    ) -> Self {
        Self {
            world,
            players,
            sessions,
            broadcaster,
            start_room,
            areas: None,
        }
    }

    /// Purge a leaving player's queued actions from these areas.
    pub fn with_areas(mut self, areas: Arc<AreaDirectory>) -> Self {
        self.areas = Some(areas);
        self
    }

    /// Log a player in, creating a default character for an unknown name.
    ///
    /// On success the session is registered, the player is marked online and placed in
    /// their room, and the room has been told.
    pub async fn login(
        &self,
        name: &str,
        outbox: mpsc::Sender<String>,
    ) -> Result<Arc<Session>, JoinGameError> {
        let name = validate_name(name.to_string())?;
        let mut player = match self.players.get_player_by_name(&name).await? {
            Some(player) => player,
            None => self.create_player(&name).await?,
        };
        let room = self.arrival_room(&mut player).await?;
        let player_id = player.id;
        let name = player.name.clone();

        let session = Arc::new(Session::new(player, outbox));
        self.sessions.register(session.clone()).await?;

        if let Err(e) = self.players.set_online(player_id, true).await {
            self.sessions.unregister(player_id).await;
            return Err(e.into());
        }
        room.lock().await.players.insert(player_id);

        tracing::info!(player_id = %player_id, name = %name, room_id = %room.id(), "Player logged in");

        self.broadcaster
            .notify_location(room.id(), Some(player_id), &format!("{name} has entered the game."))
            .await;
        self.broadcaster
            .notify_player(player_id, &format!("Welcome, {name}."))
            .await;
        let view = describe_room(&room, player_id, &self.sessions).await;
        self.broadcaster.notify_player(player_id, &view).await;

        Ok(session)
    }

    /// Detach a player. Safe to call more than once.
    pub async fn logout(&self, player_id: PlayerId) -> Result<(), JoinGameError> {
        if self.sessions.get(player_id).await.is_none() {
            return Ok(());
        }
        // Purge while still registered: a re-login cannot start until the old queue is gone.
        if let Some(areas) = &self.areas {
            let told = areas.forget(player_id).await;
            tracing::debug!(player_id = %player_id, areas = told, "Queued actions purged");
        }

        let Some(session) = self.sessions.unregister(player_id).await else {
            return Ok(());
        };
        let player = session.snapshot().await;

        if let Err(e) = self.world.remove_player(player_id, player.room_id).await {
            tracing::warn!(player_id = %player_id, error = %e, "Failed to clear room occupancy");
        }
        if let Err(e) = self.players.save_vitals(player_id, &player.vitals).await {
            tracing::warn!(player_id = %player_id, error = %e, "Failed to save vitals at logout");
        }
        self.players.set_online(player_id, false).await?;

        self.broadcaster
            .notify_location(
                player.room_id,
                None,
                &format!("{} has left the game.", player.name),
            )
            .await;
        tracing::info!(player_id = %player_id, name = %player.name, "Player logged out");
        Ok(())
    }

    async fn create_player(&self, name: &str) -> Result<Player, JoinGameError> {
        let start = self.world.room(self.start_room).await?;
        let player = Player::new(name, start.id(), start.area_id())?;
        self.players.create_player(&player).await?;
        tracing::info!(player_id = %player.id, name = %player.name, "New player created");
        Ok(player)
    }

    /// The room the player appears in; falls back to the start room if theirs is gone.
    async fn arrival_room(&self, player: &mut Player) -> Result<Arc<RoomNode>, JoinGameError> {
        let room = match self.world.room(player.room_id).await {
            Ok(room) => room,
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    player_id = %player.id,
                    room_id = %player.room_id,
                    "Saved room no longer exists, using start room"
                );
                let start = self.world.room(self.start_room).await?;
                self.players
                    .set_player_location(player.id, start.id(), start.area_id())
                    .await?;
                start
            }
            Err(e) => return Err(e.into()),
        };
        player.room_id = room.id();
        player.area_id = room.area_id();
        Ok(room)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JoinGameError {
    #[error("Invalid name: {0}")]
    InvalidName(#[from] DomainError),
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error("World error: {0}")]
    World(#[from] WorldError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl JoinGameError {
    /// Text shown at the name prompt.
    pub fn player_message(&self) -> String {
        match self {
            Self::InvalidName(DomainError::Validation(reason)) => format!("{reason}."),
            Self::InvalidName(_) => "That name is not allowed.".to_string(),
            Self::Session(SessionError::AlreadyConnected(name)) => {
                format!("{name} is already playing.")
            }
            _ => "The world is unavailable right now. Try again later.".to_string(),
        }
    }
}
