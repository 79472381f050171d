//! Area actor: the single task that owns an area's tick loop.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};

use tickmud_domain::{Action, PlayerId};

use super::actions::{ActionRegistry, AreaContext};
use super::queue::ActionQueue;

/// Regen multiplier applied on a plain heartbeat.
const HEARTBEAT_MULTIPLIER: i32 = 1;

const BUSY_MESSAGE: &str = "You are already doing too much. Wait a moment.";

/// What an area actor receives on its intake channel.
#[derive(Debug)]
pub enum AreaMessage {
    /// Queue a tick-scheduled action.
    Act(Action),
    /// Drop everything still queued for a player.
    Forget(PlayerId),
}

/// Timing and limits for an area's loop.
#[derive(Debug, Clone, Copy)]
pub struct TickConfig {
    pub interval: Duration,
    /// Ticks between heartbeats.
    pub heartbeat_ticks: u64,
    /// Actions one player may have waiting in the area.
    pub max_pending: usize,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            heartbeat_ticks: 15,
            max_pending: 32,
        }
    }
}

pub struct AreaActor {
    ctx: AreaContext,
    inbox: mpsc::Receiver<AreaMessage>,
    queue: ActionQueue,
    registry: Arc<ActionRegistry>,
    config: TickConfig,
    ticks: u64,
}

impl AreaActor {
    pub fn new(
        ctx: AreaContext,
        inbox: mpsc::Receiver<AreaMessage>,
        registry: Arc<ActionRegistry>,
        config: TickConfig,
    ) -> Self {
        Self {
            ctx,
            inbox,
            queue: ActionQueue::new(config.max_pending),
            registry,
            config,
            ticks: 0,
        }
    }

    /// Run until every sender for this area has been dropped.
    pub async fn run(mut self) {
        let period = self.config.interval;
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            area_id = %self.ctx.area_id,
            interval_ms = period.as_millis() as u64,
            heartbeat_ticks = self.config.heartbeat_ticks,
            "Area actor started"
        );

        loop {
            tokio::select! {
                received = self.inbox.recv() => {
                    match received {
                        Some(AreaMessage::Act(action)) => self.enqueue(action).await,
                        Some(AreaMessage::Forget(player_id)) => self.forget(player_id),
                        None => break,
                    }
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }

        tracing::info!(
            area_id = %self.ctx.area_id,
            dropped = self.queue.len(),
            "Area actor stopped"
        );
    }

    async fn enqueue(&mut self, action: Action) {
        tracing::trace!(
            area_id = %self.ctx.area_id,
            player_id = %action.player_id,
            command = %action.command,
            "Action queued"
        );
        if let Err(action) = self.queue.push(action) {
            tracing::debug!(
                area_id = %self.ctx.area_id,
                player_id = %action.player_id,
                command = %action.command,
                limit = self.config.max_pending,
                "Player action queue full, rejecting"
            );
            self.ctx
                .broadcaster
                .notify_player(action.player_id, BUSY_MESSAGE)
                .await;
        }
    }

    fn forget(&mut self, player_id: PlayerId) {
        let dropped = self.queue.forget(player_id);
        if dropped > 0 {
            tracing::debug!(
                area_id = %self.ctx.area_id,
                player_id = %player_id,
                dropped,
                "Discarded queued actions"
            );
        }
    }

    /// One tick: heartbeat when due, then one round of queued actions.
    pub(crate) async fn tick(&mut self) {
        self.ticks += 1;
        if self.config.heartbeat_ticks > 0 && self.ticks % self.config.heartbeat_ticks == 0 {
            self.heartbeat().await;
        }

        for action in self.queue.drain_round() {
            self.dispatch(action).await;
        }
    }

    async fn heartbeat(&self) {
        let sessions = self.ctx.sessions.in_area(self.ctx.area_id).await;
        tracing::trace!(area_id = %self.ctx.area_id, players = sessions.len(), "Heartbeat");

        for session in sessions {
            let (changed, vitals) = session
                .update(|player| {
                    (
                        player.vitals.regenerate(HEARTBEAT_MULTIPLIER),
                        player.vitals,
                    )
                })
                .await;
            if changed {
                if let Err(e) = self
                    .ctx
                    .players
                    .save_vitals(session.player_id(), &vitals)
                    .await
                {
                    tracing::warn!(
                        player_id = %session.player_id(),
                        error = %e,
                        "Failed to persist vitals on heartbeat"
                    );
                }
            }

            let message = if changed {
                "You feel a little better."
            } else {
                "You feel well rested."
            };
            self.ctx
                .broadcaster
                .notify_player(session.player_id(), message)
                .await;
        }
    }

    async fn dispatch(&self, action: Action) {
        let Some(handler) = self.registry.get(&action.command) else {
            tracing::warn!(
                area_id = %self.ctx.area_id,
                player_id = %action.player_id,
                command = %action.command,
                "No handler for queued action, dropping"
            );
            return;
        };

        let outcome = AssertUnwindSafe(handler.perform(&action, &self.ctx))
            .catch_unwind()
            .await;

        let message = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => {
                tracing::warn!(
                    area_id = %self.ctx.area_id,
                    player_id = %action.player_id,
                    command = %action.command,
                    error = %e,
                    "Queued action failed"
                );
                e.player_message()
            }
            Err(_) => {
                tracing::error!(
                    area_id = %self.ctx.area_id,
                    player_id = %action.player_id,
                    command = %action.command,
                    "Queued action panicked"
                );
                "Something went wrong. Try again.".to_string()
            }
        };
        self.ctx
            .broadcaster
            .notify_player(action.player_id, &message)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::connections::{Session, SessionRegistry};
    use crate::api::notify::Broadcaster;
    use crate::areas::actions::{ActionError, ActionHandler};
    use crate::infrastructure::ports::MockPlayerStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tickmud_domain::{AreaId, Player, PlayerId, RoomId, Vitals};

    #[derive(Default)]
    struct Log {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ActionHandler for Log {
        async fn perform(&self, action: &Action, _ctx: &AreaContext) -> Result<(), ActionError> {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:{}", action.command, action.args.join(" ")));
            Ok(())
        }
    }

    struct Explodes;

    #[async_trait]
    impl ActionHandler for Explodes {
        async fn perform(&self, _action: &Action, _ctx: &AreaContext) -> Result<(), ActionError> {
            panic!("boom");
        }
    }

    fn context(players: MockPlayerStore) -> AreaContext {
        let sessions = Arc::new(SessionRegistry::new());
        AreaContext {
            area_id: AreaId::new(),
            broadcaster: Arc::new(Broadcaster::new(sessions.clone())),
            sessions,
            players: Arc::new(players),
        }
    }

    async fn join(ctx: &AreaContext, name: &str, vitals: Vitals) -> (PlayerId, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(32);
        let player = Player::new(name, RoomId::new(), ctx.area_id)
            .unwrap()
            .with_vitals(vitals);
        let id = player.id;
        ctx.sessions
            .register(Arc::new(Session::new(player, tx)))
            .await
            .unwrap();
        (id, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(line) = rx.try_recv() {
            out.push(line);
        }
        out
    }

    fn actor_with(
        ctx: AreaContext,
        registry: ActionRegistry,
        heartbeat_ticks: u64,
    ) -> (AreaActor, mpsc::Sender<AreaMessage>) {
        let (tx, rx) = mpsc::channel(16);
        let actor = AreaActor::new(
            ctx,
            rx,
            Arc::new(registry),
            TickConfig {
                interval: Duration::from_millis(10),
                heartbeat_ticks,
                max_pending: 4,
            },
        );
        (actor, tx)
    }

    #[tokio::test]
    async fn tick_runs_one_action_per_player_in_order() {
        let log = Arc::new(Log::default());
        let mut registry = ActionRegistry::new();
        registry.insert("emote", log.clone());
        let (mut actor, _tx) = actor_with(context(MockPlayerStore::new()), registry, 0);

        let ann = PlayerId::new();
        let bob = PlayerId::new();
        actor.enqueue(Action::new(ann, "emote", vec!["a1".into()])).await;
        actor.enqueue(Action::new(ann, "emote", vec!["a2".into()])).await;
        actor.enqueue(Action::new(bob, "emote", vec!["b1".into()])).await;

        actor.tick().await;
        assert_eq!(*log.seen.lock().unwrap(), vec!["emote:a1", "emote:b1"]);
        actor.tick().await;
        assert_eq!(log.seen.lock().unwrap().last().map(String::as_str), Some("emote:a2"));
        assert!(actor.queue.is_empty());
    }

    #[tokio::test]
    async fn unknown_actions_are_dropped() {
        let (mut actor, _tx) = actor_with(context(MockPlayerStore::new()), ActionRegistry::new(), 0);
        actor.enqueue(Action::new(PlayerId::new(), "dance", vec![])).await;
        actor.tick().await;
        assert!(actor.queue.is_empty());
    }

    #[tokio::test]
    async fn panicking_action_does_not_kill_the_area() {
        let log = Arc::new(Log::default());
        let mut registry = ActionRegistry::new();
        registry.insert("explode", Arc::new(Explodes));
        registry.insert("emote", log.clone());
        let ctx = context(MockPlayerStore::new());
        let (ann, mut rx) = join(&ctx, "Ann", Vitals::default()).await;
        let (mut actor, _tx) = actor_with(ctx, registry, 0);

        actor.enqueue(Action::new(ann, "explode", vec![])).await;
        actor.enqueue(Action::new(ann, "emote", vec!["after".into()])).await;
        actor.tick().await;
        actor.tick().await;

        assert_eq!(drain(&mut rx)[0], "Something went wrong. Try again.");
        assert_eq!(*log.seen.lock().unwrap(), vec!["emote:after"]);
    }

    #[tokio::test]
    async fn heartbeat_regenerates_on_schedule() {
        let mut players = MockPlayerStore::new();
        players.expect_save_vitals().times(1).returning(|_, _| Ok(()));
        let ctx = context(players);
        let hurt = Vitals {
            health: 40,
            max_health: 100,
            movement: 30,
            max_movement: 30,
        };
        let (_ann, mut rx) = join(&ctx, "Ann", hurt).await;
        let (mut actor, _tx) = actor_with(ctx, ActionRegistry::new(), 3);

        actor.tick().await;
        actor.tick().await;
        assert!(drain(&mut rx).is_empty());

        actor.tick().await;
        assert_eq!(
            drain(&mut rx),
            vec![
                "You feel a little better.".to_string(),
                "<50/100hp 30/30mv> ".to_string()
            ]
        );
        assert_eq!(actor.ticks, 3);
    }

    #[tokio::test]
    async fn run_processes_queued_actions_and_stops_when_senders_drop() {
        let log = Arc::new(Log::default());
        let mut registry = ActionRegistry::new();
        registry.insert("emote", log.clone());
        let (actor, tx) = actor_with(context(MockPlayerStore::new()), registry, 0);
        let handle = tokio::spawn(actor.run());

        tx.send(AreaMessage::Act(Action::new(PlayerId::new(), "emote", vec!["hi".into()])))
            .await
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while log.seen.lock().unwrap().is_empty() && Instant::now() < deadline {
            time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(*log.seen.lock().unwrap(), vec!["emote:hi"]);

        drop(tx);
        time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn heartbeat_reaches_players_with_full_vitals() {
        let mut players = MockPlayerStore::new();
        players.expect_save_vitals().never();
        let ctx = context(players);
        let (_ann, mut rx) = join(&ctx, "Ann", Vitals::default()).await;
        let status = Vitals::default().status_line();
        let (mut actor, _tx) = actor_with(ctx, ActionRegistry::new(), 1);

        actor.tick().await;

        assert_eq!(
            drain(&mut rx),
            vec!["You feel well rested.".to_string(), status]
        );
    }

    #[tokio::test]
    async fn a_flooding_player_is_told_to_wait() {
        let log = Arc::new(Log::default());
        let mut registry = ActionRegistry::new();
        registry.insert("emote", log.clone());
        let ctx = context(MockPlayerStore::new());
        let (ann, mut rx) = join(&ctx, "Ann", Vitals::default()).await;
        let (mut actor, _tx) = actor_with(ctx, registry, 0);

        for n in 0..10 {
            actor
                .enqueue(Action::new(ann, "emote", vec![n.to_string()]))
                .await;
        }

        assert_eq!(actor.queue.len(), 4);
        let lines = drain(&mut rx);
        assert_eq!(
            lines.iter().filter(|l| *l == BUSY_MESSAGE).count(),
            6
        );
        for _ in 0..4 {
            actor.tick().await;
        }
        assert_eq!(
            *log.seen.lock().unwrap(),
            vec!["emote:0", "emote:1", "emote:2", "emote:3"]
        );
    }

    #[tokio::test]
    async fn forgotten_players_lose_their_queued_actions() {
        let log = Arc::new(Log::default());
        let mut registry = ActionRegistry::new();
        registry.insert("emote", log.clone());
        let (actor, tx) = actor_with(context(MockPlayerStore::new()), registry, 0);
        let ann = PlayerId::new();
        let bob = PlayerId::new();

        for n in 0..3 {
            tx.send(AreaMessage::Act(Action::new(ann, "emote", vec![n.to_string()])))
                .await
                .unwrap();
        }
        tx.send(AreaMessage::Act(Action::new(bob, "emote", vec!["stays".into()])))
            .await
            .unwrap();
        tx.send(AreaMessage::Forget(ann)).await.unwrap();
        let handle = tokio::spawn(actor.run());

        let deadline = Instant::now() + Duration::from_secs(2);
        while log.seen.lock().unwrap().is_empty() && Instant::now() < deadline {
            time::sleep(Duration::from_millis(5)).await;
        }
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*log.seen.lock().unwrap(), vec!["emote:stays"]);

        drop(tx);
        time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
