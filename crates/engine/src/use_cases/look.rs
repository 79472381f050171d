//! Look and exits commands, plus the room view shared with movement.

use std::sync::Arc;

use async_trait::async_trait;
use tickmud_domain::{Direction, PlayerId};

use crate::api::connections::SessionRegistry;
use crate::api::notify::Broadcaster;
use crate::entities::{RoomNode, World};
use crate::use_cases::commands::capability::capability_slots;
use crate::use_cases::commands::{
    CommandContext, CommandError, CommandHandler, CommandOutcome, Notifiable, UsesSessions,
    UsesWorld, Wired,
};

/// Render what `viewer` sees standing in `room`.
pub async fn describe_room(room: &RoomNode, viewer: PlayerId, sessions: &SessionRegistry) -> String {
    let (mut lines, others) = {
        let state = room.lock().await;
        let mut lines = vec![state.name.clone()];
        if !state.description.is_empty() {
            lines.push(state.description.clone());
        }
        let exits: Vec<&str> = state.exits.keys().map(|dir| dir.as_str()).collect();
        if exits.is_empty() {
            lines.push("[Exits: none]".to_string());
        } else {
            lines.push(format!("[Exits: {}]", exits.join(" ")));
        }
        for item in &state.items {
            lines.push(format!("{} lies here.", capitalise(&item.name)));
        }
        for mob in &state.mobs {
            lines.push(format!("{} is here.", capitalise(&mob.name)));
        }
        let others: Vec<PlayerId> = state
            .players
            .iter()
            .copied()
            .filter(|id| *id != viewer)
            .collect();
        (lines, others)
    };

    let mut names = Vec::new();
    for id in others {
        if let Some(session) = sessions.get(id).await {
            names.push(session.name().to_string());
        }
    }
    names.sort();
    lines.extend(names.into_iter().map(|name| format!("{name} is here.")));

    lines.join("\n")
}

fn capitalise(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// `look [direction]`
pub struct LookCommand {
    world: Wired<World>,
    sessions: Wired<SessionRegistry>,
    broadcaster: Wired<Broadcaster>,
}

impl LookCommand {
    pub fn new() -> Self {
        Self {
            world: Wired::new("world"),
            sessions: Wired::new("sessions"),
            broadcaster: Wired::new("broadcaster"),
        }
    }
}

impl Default for LookCommand {
    fn default() -> Self {
        Self::new()
    }
}

capability_slots!(LookCommand { world => world, sessions => sessions, notify => broadcaster });

#[async_trait]
impl CommandHandler for LookCommand {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
        let world = self.world.get()?;
        let sessions = self.sessions.get()?;
        let session = sessions.require(ctx.player_id).await?;
        let (room_id, _) = session.location().await;
        let room = world.room(room_id).await?;

        let view = match ctx.arg(0) {
            None => describe_room(&room, ctx.player_id, sessions).await,
            Some(word) => {
                let direction: Direction = word
                    .parse()
                    .map_err(|_| CommandError::rejected("Look where?"))?;
                match world.resolve_exit(&room, direction).await {
                    Ok(Some(target)) => {
                        let name = target.lock().await.name.clone();
                        format!("To the {direction} you see: {name}")
                    }
                    Ok(None) => "You see nothing in that direction.".to_string(),
                    Err(e) if e.is_not_found() => "That way leads nowhere.".to_string(),
                    Err(e) => return Err(e.into()),
                }
            }
        };

        self.broadcaster.get()?.notify_player(ctx.player_id, &view).await;
        Ok(CommandOutcome::Done)
    }

    fn as_notifiable(&self) -> Option<&dyn Notifiable> {
        Some(self)
    }

    fn as_world_user(&self) -> Option<&dyn UsesWorld> {
        Some(self)
    }

    fn as_session_user(&self) -> Option<&dyn UsesSessions> {
        Some(self)
    }
}

/// `exits`: every exit with the name of the room it leads to.
pub struct ExitsCommand {
    world: Wired<World>,
    sessions: Wired<SessionRegistry>,
    broadcaster: Wired<Broadcaster>,
}

impl ExitsCommand {
    pub fn new() -> Self {
        Self {
            world: Wired::new("world"),
            sessions: Wired::new("sessions"),
            broadcaster: Wired::new("broadcaster"),
        }
    }

    async fn exit_line(
        world: &World,
        room: &RoomNode,
        direction: Direction,
    ) -> Result<String, CommandError> {
        let line = match world.resolve_exit(room, direction).await {
            Ok(Some(target)) => format!("{:<6} - {}", direction.as_str(), target.lock().await.name),
            Ok(None) => return Err(CommandError::rejected("The exits shifted. Look again.")),
            Err(e) if e.is_not_found() => format!("{:<6} - (nowhere)", direction.as_str()),
            Err(e) => return Err(e.into()),
        };
        Ok(line)
    }
}

impl Default for ExitsCommand {
    fn default() -> Self {
        Self::new()
    }
}

capability_slots!(ExitsCommand { world => world, sessions => sessions, notify => broadcaster });

#[async_trait]
impl CommandHandler for ExitsCommand {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
        let world = self.world.get()?;
        let session = self.sessions.get()?.require(ctx.player_id).await?;
        let (room_id, _) = session.location().await;
        let room: Arc<RoomNode> = world.room(room_id).await?;

        let directions = room.lock().await.exit_directions();
        let mut lines = vec!["Obvious exits:".to_string()];
        if directions.is_empty() {
            lines.push("None.".to_string());
        }
        for direction in directions {
            lines.push(Self::exit_line(world, &room, direction).await?);
        }

        self.broadcaster
            .get()?
            .notify_player(ctx.player_id, &lines.join("\n"))
            .await;
        Ok(CommandOutcome::Done)
    }

    fn as_notifiable(&self) -> Option<&dyn Notifiable> {
        Some(self)
    }

    fn as_world_user(&self) -> Option<&dyn UsesWorld> {
        Some(self)
    }

    fn as_session_user(&self) -> Option<&dyn UsesSessions> {
        Some(self)
    }
}
