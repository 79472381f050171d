//! Session management for connected players.
//!
//! Tracks every logged-in player, their live character state and the outbox their
//! connection's writer task drains.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use tickmud_domain::{AreaId, Player, PlayerId, RoomId};

use crate::infrastructure::ports::SessionError;

/// A connected player.
pub struct Session {
    player_id: PlayerId,
    name: String,
    outbox: mpsc::Sender<String>,
    player: RwLock<Player>,
}

impl Session {
    pub fn new(player: Player, outbox: mpsc::Sender<String>) -> Self {
        Self {
            player_id: player.id,
            name: player.name.clone(),
            outbox,
            player: RwLock::new(player),
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a line for the writer task without waiting.
    pub fn send(&self, line: impl Into<String>) -> Result<(), mpsc::error::TrySendError<String>> {
        self.outbox.try_send(line.into())
    }

    /// Resolves once the writer side has gone away.
    pub async fn closed(&self) {
        self.outbox.closed().await
    }

    /// Current `(room, area)`.
    pub async fn location(&self) -> (RoomId, AreaId) {
        let player = self.player.read().await;
        (player.room_id, player.area_id)
    }

    pub async fn relocate(&self, room_id: RoomId, area_id: AreaId) {
        let mut player = self.player.write().await;
        player.room_id = room_id;
        player.area_id = area_id;
    }

    pub async fn status_line(&self) -> String {
        self.player.read().await.vitals.status_line()
    }

    pub async fn is_admin(&self) -> bool {
        self.player.read().await.is_admin
    }

    /// Snapshot of the player record.
    pub async fn snapshot(&self) -> Player {
        self.player.read().await.clone()
    }

    /// Mutate the player record in place.
    pub async fn update<R>(&self, f: impl FnOnce(&mut Player) -> R) -> R {
        let mut player = self.player.write().await;
        f(&mut player)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("player_id", &self.player_id)
            .field("name", &self.name)
            .finish()
    }
}

/// Registry of all active sessions, keyed by player id.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<PlayerId, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a session. A player may only be connected once.
    pub async fn register(&self, session: Arc<Session>) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.player_id()) {
            return Err(SessionError::AlreadyConnected(session.name().to_string()));
        }
        tracing::debug!(player_id = %session.player_id(), name = %session.name(), "Session registered");
        sessions.insert(session.player_id(), session);
        Ok(())
    }

    pub async fn unregister(&self, player_id: PlayerId) -> Option<Arc<Session>> {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(&player_id);
        if removed.is_some() {
            tracing::debug!(player_id = %player_id, "Session unregistered");
        }
        removed
    }

    pub async fn get(&self, player_id: PlayerId) -> Option<Arc<Session>> {
        self.sessions.read().await.get(&player_id).cloned()
    }

    pub async fn require(&self, player_id: PlayerId) -> Result<Arc<Session>, SessionError> {
        self.get(player_id)
            .await
            .ok_or_else(|| SessionError::NotFound(player_id.to_string()))
    }

    /// Case-insensitive lookup by name.
    pub async fn find_by_name(&self, name: &str) -> Option<Arc<Session>> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .find(|session| session.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    pub async fn all(&self) -> Vec<Arc<Session>> {
        let mut all: Vec<_> = self.sessions.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    pub async fn in_room(&self, room_id: RoomId) -> Vec<Arc<Session>> {
        let mut found = Vec::new();
        for session in self.all().await {
            if session.location().await.0 == room_id {
                found.push(session);
            }
        }
        found
    }

    pub async fn in_area(&self, area_id: AreaId) -> Vec<Arc<Session>> {
        let mut found = Vec::new();
        for session in self.all().await {
            if session.location().await.1 == area_id {
                found.push(session);
            }
        }
        found
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
