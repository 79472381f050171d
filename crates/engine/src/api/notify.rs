//! Notification broadcaster.
//!
//! Fans text out to sessions by player, room, area or server-wide. Every delivered message
//! is followed by the recipient's status line so their prompt is redrawn. Delivery never
//! blocks: a full or closed outbox is logged and skipped.

use std::sync::Arc;

use tickmud_domain::{AreaId, PlayerId, RoomId};

use super::connections::{Session, SessionRegistry};

#[derive(Clone)]
pub struct Broadcaster {
    sessions: Arc<SessionRegistry>,
}

impl Broadcaster {
    pub fn new(sessions: Arc<SessionRegistry>) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Send to one player. Returns `false` if they are not connected.
    pub async fn notify_player(&self, player_id: PlayerId, message: &str) -> bool {
        match self.sessions.get(player_id).await {
            Some(session) => {
                Self::deliver(&session, message).await;
                true
            }
            None => false,
        }
    }

    /// Send to everyone whose current room is `room_id`, optionally excluding one player.
    pub async fn notify_location(
        &self,
        room_id: RoomId,
        excluding: Option<PlayerId>,
        message: &str,
    ) -> usize {
        let recipients = self.sessions.in_room(room_id).await;
        Self::fan_out(recipients, excluding, message).await
    }

    /// Send to everyone in an area.
    pub async fn notify_area(
        &self,
        area_id: AreaId,
        excluding: Option<PlayerId>,
        message: &str,
    ) -> usize {
        let recipients = self.sessions.in_area(area_id).await;
        Self::fan_out(recipients, excluding, message).await
    }

    pub async fn notify_all(&self, message: &str) -> usize {
        let recipients = self.sessions.all().await;
        Self::fan_out(recipients, None, message).await
    }

    async fn fan_out(
        recipients: Vec<Arc<Session>>,
        excluding: Option<PlayerId>,
        message: &str,
    ) -> usize {
        let mut sent = 0;
        for session in recipients {
            if Some(session.player_id()) == excluding {
                continue;
            }
            if Self::deliver(&session, message).await {
                sent += 1;
            }
        }
        sent
    }

    async fn deliver(session: &Session, message: &str) -> bool {
        if let Err(e) = session.send(message) {
            tracing::warn!(
                player_id = %session.player_id(),
                error = %e,
                "Failed to deliver message"
            );
            return false;
        }
        let status = session.status_line().await;
        if let Err(e) = session.send(status) {
            tracing::warn!(
                player_id = %session.player_id(),
                error = %e,
                "Failed to deliver status line"
            );
        }
        true
    }
}
