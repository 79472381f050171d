//! Admin-only commands.

use async_trait::async_trait;

use crate::api::connections::SessionRegistry;
use crate::api::notify::Broadcaster;
use crate::infrastructure::ports::PlayerStore;
use crate::use_cases::commands::capability::capability_slots;
use crate::use_cases::commands::{
    CommandContext, CommandError, CommandHandler, CommandOutcome, Notifiable, UsesPlayerStore,
    UsesSessions, Wired,
};

/// `/sethealth <amount> [name]`
pub struct SetHealthCommand {
    players: Wired<dyn PlayerStore>,
    sessions: Wired<SessionRegistry>,
    broadcaster: Wired<Broadcaster>,
}

impl SetHealthCommand {
    pub fn new() -> Self {
        Self {
            players: Wired::new("player store"),
            sessions: Wired::new("sessions"),
            broadcaster: Wired::new("broadcaster"),
        }
    }
}

impl Default for SetHealthCommand {
    fn default() -> Self {
        Self::new()
    }
}

capability_slots!(SetHealthCommand {
    players => players,
    sessions => sessions,
    notify => broadcaster,
});

#[async_trait]
impl CommandHandler for SetHealthCommand {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
        let sessions = self.sessions.get()?;
        let broadcaster = self.broadcaster.get()?;
        let admin = sessions.require(ctx.player_id).await?;
        if !admin.is_admin().await {
            tracing::info!(player_id = %ctx.player_id, "Non-admin tried /sethealth");
            return Err(CommandError::rejected("You are not allowed to do that."));
        }

        let amount: i32 = ctx
            .arg(0)
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| CommandError::rejected("Usage: /sethealth <amount> [name]"))?;
        let target = match ctx.arg(1) {
            Some(name) => sessions
                .find_by_name(name)
                .await
                .ok_or_else(|| CommandError::rejected(format!("Nobody called '{name}' is playing.")))?,
            None => admin.clone(),
        };

        let vitals = target
            .update(|player| {
                player.vitals.set_health(amount);
                player.vitals
            })
            .await;
        self.players.get()?.save_vitals(target.player_id(), &vitals).await?;

        tracing::info!(
            admin = %admin.name(),
            target = %target.name(),
            health = vitals.health,
            "Health set by admin"
        );

        if target.player_id() != admin.player_id() {
            broadcaster
                .notify_player(
                    target.player_id(),
                    &format!("Your health has been set to {}.", vitals.health),
                )
                .await;
        }
        broadcaster
            .notify_player(
                admin.player_id(),
                &format!("{}'s health is now {}.", target.name(), vitals.health),
            )
            .await;
        Ok(CommandOutcome::Done)
    }

    fn as_notifiable(&self) -> Option<&dyn Notifiable> {
        Some(self)
    }

    fn as_player_store_user(&self) -> Option<&dyn UsesPlayerStore> {
        Some(self)
    }

    fn as_session_user(&self) -> Option<&dyn UsesSessions> {
        Some(self)
    }
}
