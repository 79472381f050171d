//! Commands that run on the area's next tick instead of immediately.

use async_trait::async_trait;
use tickmud_domain::Action;

use super::{CommandContext, CommandError, CommandHandler, CommandOutcome};

/// Forwards the command to the player's current area actor.
#[derive(Debug, Default)]
pub struct QueuedCommand;

#[async_trait]
impl CommandHandler for QueuedCommand {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
        let action = Action::new(ctx.player_id, ctx.command, ctx.args.to_vec());
        ctx.route.submit(action)?;
        Ok(CommandOutcome::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::commands::testing::RecordingRoute;
    use tickmud_domain::{AreaId, PlayerId};

    #[tokio::test]
    async fn forwards_name_and_args_to_the_route() {
        let player = PlayerId::new();
        let args = vec!["Hello".to_string(), "all".to_string()];
        let mut route = RecordingRoute::new(AreaId::new());
        let mut ctx = CommandContext {
            player_id: player,
            command: "shout",
            args: &args,
            route: &mut route,
        };

        let outcome = QueuedCommand.execute(&mut ctx).await.unwrap();

        assert_eq!(outcome, CommandOutcome::Done);
        assert_eq!(route.submitted, vec![Action::new(player, "shout", args.clone())]);
    }
}
