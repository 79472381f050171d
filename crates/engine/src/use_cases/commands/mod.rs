//! Command pipeline: parsing, routing and the handler contract.

pub mod capability;
pub mod parser;
pub mod queued;
pub mod router;

use async_trait::async_trait;
use tickmud_domain::{Action, AreaId, PlayerId};

use crate::entities::WorldError;
use crate::infrastructure::ports::{RepoError, SessionError};

pub use capability::{
    Capability, Notifiable, UsesItemStore, UsesPlayerStore, UsesSessions, UsesWorld, Wired,
};
pub use parser::{parse_segment, resolve_name, split_line, CommandIndex, ParsedCommand};
pub use queued::QueuedCommand;
pub use router::{CommandRouter, LineOutcome, RegisteredCommand, RouterError};

/// What the connection should do after a handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Done,
    /// The player now stands in a different area; the connection must re-route its queue.
    AreaChanged(AreaId),
    Quit,
}

/// The connection's handle onto its current area actor.
///
/// Owned by the connection task; handlers only borrow it for the duration of a command.
pub trait AreaRoute: Send {
    fn area(&self) -> AreaId;
    /// Enqueue a tick-scheduled action without waiting.
    fn submit(&mut self, action: Action) -> Result<(), RouteError>;
    fn switch_area(&mut self, area_id: AreaId) -> Result<(), RouteError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RouteError {
    #[error("No actor running for area {0}")]
    NoActor(AreaId),
    #[error("Action queue full for area {0}")]
    QueueFull(AreaId),
    #[error("Action queue closed for area {0}")]
    Closed(AreaId),
}

/// Everything a handler needs to know about the command being run.
pub struct CommandContext<'a> {
    pub player_id: PlayerId,
    /// Resolved command name.
    pub command: &'a str,
    pub args: &'a [String],
    pub route: &'a mut dyn AreaRoute,
}

impl CommandContext<'_> {
    /// All arguments joined back into free text.
    pub fn rest(&self) -> String {
        self.args.join(" ")
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

/// A registered command.
///
/// Capability accessors default to `None`; a handler returns `Some(self)` for each
/// collaborator it needs and the router wires it at registration.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError>;

    fn as_notifiable(&self) -> Option<&dyn Notifiable> {
        None
    }

    fn as_world_user(&self) -> Option<&dyn UsesWorld> {
        None
    }

    fn as_player_store_user(&self) -> Option<&dyn UsesPlayerStore> {
        None
    }

    fn as_item_store_user(&self) -> Option<&dyn UsesItemStore> {
        None
    }

    fn as_session_user(&self) -> Option<&dyn UsesSessions> {
        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// A refusal that is shown to the player verbatim.
    #[error("{0}")]
    Rejected(String),
    #[error("Collaborator not wired: {0}")]
    Unwired(&'static str),
    #[error("World error: {0}")]
    World(#[from] WorldError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error("Route error: {0}")]
    Route(#[from] RouteError),
}

impl CommandError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Text reported back to the player who issued the command.
    pub fn player_message(&self) -> String {
        match self {
            Self::Rejected(message) => message.clone(),
            Self::World(err) if err.is_not_found() => "That place does not exist.".to_string(),
            Self::Route(RouteError::QueueFull(_)) => {
                "You are already doing too much. Wait a moment.".to_string()
            }
            _ => "Something went wrong. Try again.".to_string(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tickmud_domain::RoomId;

    #[test]
    fn rejected_message_is_shown_verbatim() {
        let err = CommandError::rejected("You cannot go that way.");
        assert_eq!(err.player_message(), "You cannot go that way.");
    }

    #[test]
    fn missing_room_maps_to_friendly_text() {
        let err = CommandError::from(WorldError::RoomNotFound(RoomId::new()));
        assert_eq!(err.player_message(), "That place does not exist.");
    }

    #[test]
    fn internal_errors_are_not_leaked() {
        let err = CommandError::from(RepoError::database("save_vitals", "disk I/O error"));
        assert!(!err.player_message().contains("disk"));
    }
}
