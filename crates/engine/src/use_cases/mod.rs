//! Use cases - player commands and the session lifecycle.
//!
//! Each module holds the handlers for one kind of player activity. Handlers declare the
//! collaborators they need and the router injects them at registration.

pub mod admin;
pub mod commands;
pub mod communication;
pub mod items;
pub mod look;
pub mod movement;
pub mod session;

use std::sync::Arc;

use tickmud_domain::Direction;

use commands::{CommandHandler, CommandRouter, QueuedCommand, RouterError};

pub use admin::SetHealthCommand;
pub use communication::{SayCommand, TellCommand, WhoCommand};
pub use items::ItemCommands;
pub use look::{describe_room, ExitsCommand, LookCommand};
pub use movement::{MoveError, MovePlayer, MoveResult};
pub use session::{HelpCommand, JoinGame, JoinGameError, QuitCommand};

/// Register the built-in command set.
///
/// Lower priorities win abbreviation ties, so `n` is north and `l` is look.
pub fn register_commands(router: &CommandRouter) -> Result<(), RouterError> {
    let movement: Arc<dyn CommandHandler> = Arc::new(MovePlayer::new());
    for direction in Direction::ALL {
        router.register(direction.as_str(), 1, movement.clone())?;
    }

    router.register("look", 2, Arc::new(LookCommand::new()))?;
    router.register("exits", 3, Arc::new(ExitsCommand::new()))?;

    let items: Arc<dyn CommandHandler> = Arc::new(ItemCommands::new());
    for (verb, priority) in ItemCommands::VERBS.into_iter().zip([4, 6, 6, 7, 7, 8]) {
        router.register(verb, priority, items.clone())?;
    }

    router.register("say", 5, Arc::new(SayCommand::new()))?;
    router.register("tell", 5, Arc::new(TellCommand::new()))?;
    router.register("who", 9, Arc::new(WhoCommand::new()))?;

    // Tick-scheduled
    let queued: Arc<dyn CommandHandler> = Arc::new(QueuedCommand);
    router.register("shout", 10, queued.clone())?;
    router.register("rest", 10, queued)?;

    router.register("help", 20, Arc::new(HelpCommand::new()))?;
    router.register("quit", 50, Arc::new(QuitCommand::new()))?;
    router.register("/sethealth", 100, Arc::new(SetHealthCommand::new()))?;
    Ok(())
}
