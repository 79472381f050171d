//! Area actors and the directory connections use to reach them.
//!
//! Each area runs exactly one actor task. Connections hold an [`AreaRouteHandle`] for the
//! area their player stands in and re-point it after a cross-area move.

pub mod actions;
pub mod actor;
pub mod queue;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use tickmud_domain::{Action, AreaId, PlayerId};

use crate::api::connections::SessionRegistry;
use crate::api::notify::Broadcaster;
use crate::infrastructure::ports::PlayerStore;
use crate::use_cases::commands::{AreaRoute, RouteError};

pub use actions::{ActionError, ActionHandler, ActionRegistry, AreaContext};
pub use actor::{AreaActor, AreaMessage, TickConfig};
pub use queue::ActionQueue;

/// Everything needed to start an area actor.
#[derive(Clone)]
pub struct AreaSpawner {
    pub broadcaster: Arc<Broadcaster>,
    pub sessions: Arc<SessionRegistry>,
    pub players: Arc<dyn PlayerStore>,
    pub registry: Arc<ActionRegistry>,
    pub config: TickConfig,
    pub queue_capacity: usize,
}

impl AreaSpawner {
    fn spawn(&self, area_id: AreaId) -> mpsc::Sender<AreaMessage> {
        let (tx, rx) = mpsc::channel(self.queue_capacity.max(1));
        let ctx = AreaContext {
            area_id,
            broadcaster: self.broadcaster.clone(),
            sessions: self.sessions.clone(),
            players: self.players.clone(),
        };
        let actor = AreaActor::new(ctx, rx, self.registry.clone(), self.config);
        tokio::spawn(actor.run());
        tx
    }
}

/// Intake channels of every running area actor.
pub struct AreaDirectory {
    senders: DashMap<AreaId, mpsc::Sender<AreaMessage>>,
    spawner: Option<AreaSpawner>,
}

impl AreaDirectory {
    /// A directory that starts actors on demand.
    pub fn new(spawner: AreaSpawner) -> Self {
        Self {
            senders: DashMap::new(),
            spawner: Some(spawner),
        }
    }

    /// A directory over fixed, externally created channels.
    #[cfg(test)]
    pub fn fixed() -> Self {
        Self {
            senders: DashMap::new(),
            spawner: None,
        }
    }

    #[cfg(test)]
    pub fn insert(&self, area_id: AreaId, sender: mpsc::Sender<AreaMessage>) {
        self.senders.insert(area_id, sender);
    }

    /// Intake for an area, starting its actor if needed.
    pub fn sender(&self, area_id: AreaId) -> Option<mpsc::Sender<AreaMessage>> {
        if let Some(sender) = self.senders.get(&area_id) {
            return Some(sender.value().clone());
        }
        let spawner = self.spawner.as_ref()?;
        let sender = self
            .senders
            .entry(area_id)
            .or_insert_with(|| {
                tracing::debug!(area_id = %area_id, "Starting area actor");
                spawner.spawn(area_id)
            })
            .value()
            .clone();
        Some(sender)
    }

    /// Route for a connection whose player stands in `area_id`.
    pub fn route(self: &Arc<Self>, area_id: AreaId) -> Result<AreaRouteHandle, RouteError> {
        let sender = self.sender(area_id).ok_or(RouteError::NoActor(area_id))?;
        Ok(AreaRouteHandle {
            directory: self.clone(),
            area_id,
            sender,
        })
    }

    /// Drop a player's queued actions in every running area. Returns how many areas were told.
    pub async fn forget(&self, player_id: PlayerId) -> usize {
        let senders: Vec<_> = self
            .senders
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        let mut told = 0;
        for sender in senders {
            if sender.send(AreaMessage::Forget(player_id)).await.is_ok() {
                told += 1;
            }
        }
        told
    }
}

/// A connection's current area route.
pub struct AreaRouteHandle {
    directory: Arc<AreaDirectory>,
    area_id: AreaId,
    sender: mpsc::Sender<AreaMessage>,
}

impl AreaRoute for AreaRouteHandle {
    fn area(&self) -> AreaId {
        self.area_id
    }

    fn submit(&mut self, action: Action) -> Result<(), RouteError> {
        self.sender.try_send(AreaMessage::Act(action)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => RouteError::QueueFull(self.area_id),
            mpsc::error::TrySendError::Closed(_) => RouteError::Closed(self.area_id),
        })
    }

    fn switch_area(&mut self, area_id: AreaId) -> Result<(), RouteError> {
        if area_id == self.area_id {
            return Ok(());
        }
        self.sender = self
            .directory
            .sender(area_id)
            .ok_or(RouteError::NoActor(area_id))?;
        tracing::debug!(from = %self.area_id, to = %area_id, "Area route switched");
        self.area_id = area_id;
        Ok(())
    }
}
