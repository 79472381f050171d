//! Tick-scheduled action handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tickmud_domain::{Action, AreaId};

use crate::api::connections::SessionRegistry;
use crate::api::notify::Broadcaster;
use crate::infrastructure::ports::{PlayerStore, RepoError, SessionError};

/// Collaborators available to actions run by an area actor.
#[derive(Clone)]
pub struct AreaContext {
    pub area_id: AreaId,
    pub broadcaster: Arc<Broadcaster>,
    pub sessions: Arc<SessionRegistry>,
    pub players: Arc<dyn PlayerStore>,
}

#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn perform(&self, action: &Action, ctx: &AreaContext) -> Result<(), ActionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("{0}")]
    Rejected(String),
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl ActionError {
    pub fn player_message(&self) -> String {
        match self {
            Self::Rejected(message) => message.clone(),
            _ => "Something went wrong. Try again.".to_string(),
        }
    }
}

/// Action handlers by command name.
#[derive(Default)]
pub struct ActionRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in queued action.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.insert("rest", Arc::new(RestAction));
        registry.insert("shout", Arc::new(ShoutAction));
        registry
    }

    pub fn insert(&mut self, name: &str, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(name.to_lowercase(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(name).cloned()
    }

    #[cfg(test)]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Multiplier applied to a heartbeat's regen when resting.
const REST_MULTIPLIER: i32 = 2;

/// `rest`: an immediate extra regeneration.
pub struct RestAction;

#[async_trait]
impl ActionHandler for RestAction {
    async fn perform(&self, action: &Action, ctx: &AreaContext) -> Result<(), ActionError> {
        let session = ctx.sessions.require(action.player_id).await?;
        let (changed, vitals) = session
            .update(|player| (player.vitals.regenerate(REST_MULTIPLIER), player.vitals))
            .await;

        if !changed {
            return Err(ActionError::Rejected(
                "You are already fully rested.".to_string(),
            ));
        }

        ctx.players.save_vitals(action.player_id, &vitals).await?;
        ctx.broadcaster
            .notify_player(action.player_id, "You rest a moment and feel refreshed.")
            .await;
        Ok(())
    }
}

/// `shout <msg>`: heard by everyone in the area.
pub struct ShoutAction;

#[async_trait]
impl ActionHandler for ShoutAction {
    async fn perform(&self, action: &Action, ctx: &AreaContext) -> Result<(), ActionError> {
        let message = action.args.join(" ");
        if message.is_empty() {
            return Err(ActionError::Rejected("Shout what?".to_string()));
        }
        let session = ctx.sessions.require(action.player_id).await?;

        ctx.broadcaster
            .notify_player(action.player_id, &format!("You shout '{message}'"))
            .await;
        ctx.broadcaster
            .notify_area(
                ctx.area_id,
                Some(action.player_id),
                &format!("{} shouts '{message}'", session.name()),
            )
            .await;
        Ok(())
    }
}
