//! Talking: say, tell and who.

use async_trait::async_trait;

use crate::api::connections::SessionRegistry;
use crate::api::notify::Broadcaster;
use crate::use_cases::commands::capability::capability_slots;
use crate::use_cases::commands::{
    CommandContext, CommandError, CommandHandler, CommandOutcome, Notifiable, UsesSessions, Wired,
};

/// `say <message>`: heard by everyone in the room.
pub struct SayCommand {
    sessions: Wired<SessionRegistry>,
    broadcaster: Wired<Broadcaster>,
}

impl SayCommand {
    pub fn new() -> Self {
        Self {
            sessions: Wired::new("sessions"),
            broadcaster: Wired::new("broadcaster"),
        }
    }
}

impl Default for SayCommand {
    fn default() -> Self {
        Self::new()
    }
}

capability_slots!(SayCommand { sessions => sessions, notify => broadcaster });

#[async_trait]
impl CommandHandler for SayCommand {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
        let message = ctx.rest();
        if message.is_empty() {
            return Err(CommandError::rejected("Say what?"));
        }
        let session = self.sessions.get()?.require(ctx.player_id).await?;
        let broadcaster = self.broadcaster.get()?;
        let (room_id, _) = session.location().await;

        broadcaster
            .notify_player(ctx.player_id, &format!("You say '{message}'"))
            .await;
        broadcaster
            .notify_location(
                room_id,
                Some(ctx.player_id),
                &format!("{} says '{message}'", session.name()),
            )
            .await;
        Ok(CommandOutcome::Done)
    }

    fn as_notifiable(&self) -> Option<&dyn Notifiable> {
        Some(self)
    }

    fn as_session_user(&self) -> Option<&dyn UsesSessions> {
        Some(self)
    }
}

/// `tell <name> <message>`: private message to any connected player.
pub struct TellCommand {
    sessions: Wired<SessionRegistry>,
    broadcaster: Wired<Broadcaster>,
}

impl TellCommand {
    pub fn new() -> Self {
        Self {
            sessions: Wired::new("sessions"),
            broadcaster: Wired::new("broadcaster"),
        }
    }
}

impl Default for TellCommand {
    fn default() -> Self {
        Self::new()
    }
}

capability_slots!(TellCommand { sessions => sessions, notify => broadcaster });

#[async_trait]
impl CommandHandler for TellCommand {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
        let (Some(target), true) = (ctx.arg(0), ctx.args.len() > 1) else {
            return Err(CommandError::rejected("Tell whom what?"));
        };
        let message = ctx.args[1..].join(" ");
        let sessions = self.sessions.get()?;
        let broadcaster = self.broadcaster.get()?;

        let sender = sessions.require(ctx.player_id).await?;
        let recipient = sessions
            .find_by_name(target)
            .await
            .ok_or_else(|| CommandError::rejected(format!("Nobody called '{target}' is playing.")))?;
        if recipient.player_id() == ctx.player_id {
            return Err(CommandError::rejected("Talking to yourself again?"));
        }

        broadcaster
            .notify_player(
                recipient.player_id(),
                &format!("{} tells you '{message}'", sender.name()),
            )
            .await;
        broadcaster
            .notify_player(
                ctx.player_id,
                &format!("You tell {} '{message}'", recipient.name()),
            )
            .await;
        Ok(CommandOutcome::Done)
    }

    fn as_notifiable(&self) -> Option<&dyn Notifiable> {
        Some(self)
    }

    fn as_session_user(&self) -> Option<&dyn UsesSessions> {
        Some(self)
    }
}

/// `who`
pub struct WhoCommand {
    sessions: Wired<SessionRegistry>,
    broadcaster: Wired<Broadcaster>,
}

impl WhoCommand {
    pub fn new() -> Self {
        Self {
            sessions: Wired::new("sessions"),
            broadcaster: Wired::new("broadcaster"),
        }
    }
}

impl Default for WhoCommand {
    fn default() -> Self {
        Self::new()
    }
}

capability_slots!(WhoCommand { sessions => sessions, notify => broadcaster });

#[async_trait]
impl CommandHandler for WhoCommand {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
        let everyone = self.sessions.get()?.all().await;
        let mut lines = vec!["Players online:".to_string()];
        for session in &everyone {
            let admin = if session.is_admin().await { " (admin)" } else { "" };
            lines.push(format!("  {}{admin}", session.name()));
        }
        lines.push(match everyone.len() {
            1 => "1 player.".to_string(),
            n => format!("{n} players."),
        });

        self.broadcaster
            .get()?
            .notify_player(ctx.player_id, &lines.join("\n"))
            .await;
        Ok(CommandOutcome::Done)
    }

    fn as_notifiable(&self) -> Option<&dyn Notifiable> {
        Some(self)
    }

    fn as_session_user(&self) -> Option<&dyn UsesSessions> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_fixtures::{Harness, WorldBuilder};
    use tickmud_domain::Direction;

    #[tokio::test]
    async fn say_reaches_the_room_but_not_neighbours() {
        let mut builder = WorldBuilder::new();
        let area = builder.area("Town");
        let square = builder.room(area, "Square");
        let gate = builder.room(area, "Gate");
        builder.exit(square, Direction::North, gate);
        let harness = Harness::new(builder).await;
        let mut ann = harness.login("Ann", square).await;
        let mut bob = harness.login("Bob", square).await;
        let mut cat = harness.login("Cat", gate).await;
        ann.drain();
        bob.drain();
        cat.drain();

        harness.run(&mut ann, "say Hello There").await;

        assert_eq!(ann.drain(), vec!["You say 'Hello There'".to_string()]);
        assert_eq!(bob.drain(), vec!["Ann says 'Hello There'".to_string()]);
        assert!(cat.drain().is_empty());
    }

    #[tokio::test]
    async fn tell_finds_players_anywhere_by_name() {
        let mut builder = WorldBuilder::new();
        let town = builder.area("Town");
        let forest = builder.area("Forest");
        let square = builder.room(town, "Square");
        let glade = builder.room(forest, "Glade");
        let harness = Harness::new(builder).await;
        let mut ann = harness.login("Ann", square).await;
        let mut bob = harness.login("Bob", glade).await;
        ann.drain();
        bob.drain();

        harness.run(&mut ann, "tell bob meet me; tell zed hi").await;

        assert_eq!(bob.drain(), vec!["Ann tells you 'meet me'".to_string()]);
        assert_eq!(
            ann.drain(),
            vec![
                "You tell Bob 'meet me'".to_string(),
                "Nobody called 'zed' is playing.".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn who_lists_everyone() {
        let mut builder = WorldBuilder::new();
        let area = builder.area("Town");
        let square = builder.room(area, "Square");
        let harness = Harness::new(builder).await;
        let mut ann = harness.login("Ann", square).await;
        let _bob = harness.login("Bob", square).await;
        ann.drain();

        harness.run(&mut ann, "who").await;

        assert_eq!(ann.drain()[0], "Players online:\n  Ann\n  Bob\n2 players.");
    }
}
