//! Move player use case.
//!
//! Moves a player along an exit, handing them off to the destination room (and area)
//! atomically with respect to both rooms.

use std::sync::Arc;

use async_trait::async_trait;
use tickmud_domain::{AreaId, Direction, RoomId};

use crate::api::connections::{Session, SessionRegistry};
use crate::api::notify::Broadcaster;
use crate::entities::{World, WorldError};
use crate::infrastructure::ports::{PlayerStore, RepoError};
use crate::use_cases::commands::capability::capability_slots;
use crate::use_cases::commands::{
    CommandContext, CommandError, CommandHandler, CommandOutcome, Notifiable, UsesPlayerStore,
    UsesSessions, UsesWorld, Wired,
};
use crate::use_cases::look::describe_room;

/// Result of a completed move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveResult {
    pub from_room: RoomId,
    pub to_room: RoomId,
    pub from_area: AreaId,
    pub to_area: AreaId,
}

impl MoveResult {
    pub fn area_changed(&self) -> bool {
        self.from_area != self.to_area
    }
}

/// Movement command, registered once per direction.
pub struct MovePlayer {
    world: Wired<World>,
    players: Wired<dyn PlayerStore>,
    sessions: Wired<SessionRegistry>,
    broadcaster: Wired<Broadcaster>,
}

impl MovePlayer {
    pub fn new() -> Self {
        Self {
            world: Wired::new("world"),
            players: Wired::new("player store"),
            sessions: Wired::new("sessions"),
            broadcaster: Wired::new("broadcaster"),
        }
    }

    /// Execute the move.
    ///
    /// # Returns
    /// * `Ok(MoveResult)` - The player now occupies the destination room
    /// * `Err(MoveError::NoExit | MoveError::Nowhere)` - Nothing changed
    pub async fn move_session(
        &self,
        session: &Session,
        direction: Direction,
    ) -> Result<MoveResult, MoveError> {
        let world = wired(&self.world)?;
        let players = wired(&self.players)?;
        let broadcaster = wired(&self.broadcaster)?;
        let sessions = wired(&self.sessions)?;
        let player_id = session.player_id();

        // 1. Resolve the exit
        let (room_id, area_id) = session.location().await;
        let from = world.room(room_id).await?;
        let to = match world.resolve_exit(&from, direction).await {
            Ok(Some(room)) => room,
            Ok(None) => return Err(MoveError::NoExit),
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    room_id = %room_id,
                    direction = %direction,
                    error = %e,
                    "Exit points at a missing room"
                );
                return Err(MoveError::Nowhere);
            }
            Err(e) => return Err(e.into()),
        };

        // 2. Hand off between the two rooms
        if to.id() != from.id() {
            let (mut old_room, mut new_room) = World::lock_pair(&from, &to).await?;
            players
                .set_player_location(player_id, to.id(), to.area_id())
                .await?;
            if !old_room.players.remove(&player_id) {
                tracing::warn!(
                    player_id = %player_id,
                    room_id = %from.id(),
                    "Mover was missing from their room's occupants"
                );
            }
            new_room.players.insert(player_id);
            session.relocate(to.id(), to.area_id()).await;
        }

        let result = MoveResult {
            from_room: from.id(),
            to_room: to.id(),
            from_area: area_id,
            to_area: to.area_id(),
        };

        tracing::debug!(
            player_id = %player_id,
            direction = %direction,
            from = %result.from_room,
            to = %result.to_room,
            area_changed = result.area_changed(),
            "Player moved"
        );

        // 3. Tell everyone
        broadcaster
            .notify_location(
                result.from_room,
                Some(player_id),
                &format!("{} goes {}.", session.name(), direction),
            )
            .await;
        broadcaster
            .notify_location(
                result.to_room,
                Some(player_id),
                &format!("{} has arrived.", session.name()),
            )
            .await;
        let view = describe_room(&to, player_id, sessions).await;
        broadcaster.notify_player(player_id, &view).await;

        Ok(result)
    }
}

fn wired<T: ?Sized>(slot: &Wired<T>) -> Result<&Arc<T>, MoveError> {
    slot.try_get().ok_or(MoveError::Unwired(slot.name()))
}

impl Default for MovePlayer {
    fn default() -> Self {
        Self::new()
    }
}

capability_slots!(MovePlayer {
    world => world,
    players => players,
    sessions => sessions,
    notify => broadcaster,
});

#[async_trait]
impl CommandHandler for MovePlayer {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
        let direction: Direction = ctx
            .command
            .parse()
            .map_err(|_| CommandError::rejected("You cannot go that way."))?;
        let session: Arc<Session> = self.sessions.get()?.require(ctx.player_id).await?;

        let result = self.move_session(&session, direction).await?;
        if result.area_changed() {
            return Ok(CommandOutcome::AreaChanged(result.to_area));
        }
        Ok(CommandOutcome::Done)
    }

    fn as_notifiable(&self) -> Option<&dyn Notifiable> {
        Some(self)
    }

    fn as_world_user(&self) -> Option<&dyn UsesWorld> {
        Some(self)
    }

    fn as_player_store_user(&self) -> Option<&dyn UsesPlayerStore> {
        Some(self)
    }

    fn as_session_user(&self) -> Option<&dyn UsesSessions> {
        Some(self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MoveError {
    #[error("No exit in that direction")]
    NoExit,
    #[error("Exit leads to a missing room")]
    Nowhere,
    #[error("Collaborator not wired: {0}")]
    Unwired(&'static str),
    #[error("World error: {0}")]
    World(#[from] WorldError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl From<MoveError> for CommandError {
    fn from(err: MoveError) -> Self {
        match err {
            MoveError::NoExit => CommandError::rejected("You cannot go that way."),
            MoveError::Nowhere => CommandError::rejected("That way leads nowhere."),
            MoveError::Unwired(name) => CommandError::Unwired(name),
            MoveError::World(e) => CommandError::World(e),
            MoveError::Repo(e) => CommandError::Repo(e),
        }
    }
}
