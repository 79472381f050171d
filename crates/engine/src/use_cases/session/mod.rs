//! Session use cases.
//!
//! Logging in and out, plus the commands that act on the session itself.

use async_trait::async_trait;

mod join_game;

pub use join_game::{JoinGame, JoinGameError};

use crate::api::notify::Broadcaster;
use crate::use_cases::commands::capability::capability_slots;
use crate::use_cases::commands::{
    CommandContext, CommandError, CommandHandler, CommandOutcome, Notifiable, Wired,
};

/// `quit`: ends the session after the current command. Cleanup runs in the connection.
pub struct QuitCommand {
    broadcaster: Wired<Broadcaster>,
}

impl QuitCommand {
    pub fn new() -> Self {
        Self {
            broadcaster: Wired::new("broadcaster"),
        }
    }
}

impl Default for QuitCommand {
    fn default() -> Self {
        Self::new()
    }
}

capability_slots!(QuitCommand { notify => broadcaster });

#[async_trait]
impl CommandHandler for QuitCommand {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
        self.broadcaster
            .get()?
            .notify_player(ctx.player_id, "Goodbye.")
            .await;
        Ok(CommandOutcome::Quit)
    }

    fn as_notifiable(&self) -> Option<&dyn Notifiable> {
        Some(self)
    }
}

const HELP_TEXT: &str = "\
Commands (most can be abbreviated):
  north south east west up down   move
  look [direction]                 look around or along an exit
  exits                            list exits and where they go
  inventory                        list what you carry
  say <message>                    talk to the room
  tell <name> <message>            talk to one player
  shout <message>                  talk to the whole area
  take <item> / drop <item>        pick up or put down
  give <item> <name>               hand an item to someone here
  equip <item> / remove <item>     wear or take off
  rest                             recover faster
  who                              list players online
  quit                             leave the game
Separate several commands with ';'.";

/// `help`
pub struct HelpCommand {
    broadcaster: Wired<Broadcaster>,
}

impl HelpCommand {
    pub fn new() -> Self {
        Self {
            broadcaster: Wired::new("broadcaster"),
        }
    }
}

impl Default for HelpCommand {
    fn default() -> Self {
        Self::new()
    }
}

capability_slots!(HelpCommand { notify => broadcaster });

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
        self.broadcaster
            .get()?
            .notify_player(ctx.player_id, HELP_TEXT)
            .await;
        Ok(CommandOutcome::Done)
    }

    fn as_notifiable(&self) -> Option<&dyn Notifiable> {
        Some(self)
    }
}
