//! Command router: registry, capability wiring and per-line dispatch.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tickmud_domain::PlayerId;

use crate::api::connections::SessionRegistry;
use crate::api::notify::Broadcaster;
use crate::entities::World;
use crate::infrastructure::ports::{ItemStore, PlayerStore};

use super::parser::{parse_segment, split_line, CommandIndex};
use super::{AreaRoute, Capability, CommandContext, CommandHandler, CommandOutcome};

/// A command as held by the router.
#[derive(Clone)]
pub struct RegisteredCommand {
    pub name: String,
    pub priority: u32,
    pub handler: Arc<dyn CommandHandler>,
}

/// How the connection should continue after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    #[error("Invalid command name: '{0}'")]
    InvalidName(String),
    #[error("Command already registered: {0}")]
    Duplicate(String),
    #[error("Command '{command}' needs the {capability} capability but the router has none")]
    MissingCapability {
        command: String,
        capability: Capability,
    },
}

/// Routes parsed commands to their handlers.
#[derive(Default)]
pub struct CommandRouter {
    commands: DashMap<String, RegisteredCommand>,
    broadcaster: Option<Arc<Broadcaster>>,
    world: Option<Arc<World>>,
    players: Option<Arc<dyn PlayerStore>>,
    items: Option<Arc<dyn ItemStore>>,
    sessions: Option<Arc<SessionRegistry>>,
}

impl CommandRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_broadcaster(mut self, broadcaster: Arc<Broadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn with_world(mut self, world: Arc<World>) -> Self {
        self.world = Some(world);
        self
    }

    pub fn with_player_store(mut self, players: Arc<dyn PlayerStore>) -> Self {
        self.players = Some(players);
        self
    }

    pub fn with_item_store(mut self, items: Arc<dyn ItemStore>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_sessions(mut self, sessions: Arc<SessionRegistry>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Register a handler under `name`, wiring every capability it asks for.
    pub fn register(
        &self,
        name: &str,
        priority: u32,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<(), RouterError> {
        let name = name.trim().to_lowercase();
        if name.is_empty() || name.contains(char::is_whitespace) || name.contains(';') {
            return Err(RouterError::InvalidName(name));
        }

        match self.commands.entry(name.clone()) {
            Entry::Occupied(_) => Err(RouterError::Duplicate(name)),
            Entry::Vacant(slot) => {
                self.wire(&name, handler.as_ref())?;
                tracing::debug!(command = %name, priority, "Command registered");
                slot.insert(RegisteredCommand {
                    name,
                    priority,
                    handler,
                });
                Ok(())
            }
        }
    }

    fn wire(&self, name: &str, handler: &dyn CommandHandler) -> Result<(), RouterError> {
        let missing = |capability| RouterError::MissingCapability {
            command: name.to_string(),
            capability,
        };

        if let Some(target) = handler.as_notifiable() {
            let broadcaster = self.broadcaster.clone().ok_or_else(|| missing(Capability::Notifiable))?;
            target.broadcaster_slot().wire(broadcaster);
        }
        if let Some(target) = handler.as_world_user() {
            let world = self.world.clone().ok_or_else(|| missing(Capability::World))?;
            target.world_slot().wire(world);
        }
        if let Some(target) = handler.as_player_store_user() {
            let players = self.players.clone().ok_or_else(|| missing(Capability::PlayerStore))?;
            target.player_store_slot().wire(players);
        }
        if let Some(target) = handler.as_item_store_user() {
            let items = self.items.clone().ok_or_else(|| missing(Capability::ItemStore))?;
            target.item_store_slot().wire(items);
        }
        if let Some(target) = handler.as_session_user() {
            let sessions = self.sessions.clone().ok_or_else(|| missing(Capability::Sessions))?;
            target.sessions_slot().wire(sessions);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<RegisteredCommand> {
        self.commands.get(name).map(|entry| entry.value().clone())
    }

    /// Registered `(name, priority)` pairs ordered by priority, then name.
    pub fn listing(&self) -> Vec<(String, u32)> {
        let mut all: Vec<_> = self
            .commands
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().priority))
            .collect();
        all.sort_by(|(a_name, a_pri), (b_name, b_pri)| a_pri.cmp(b_pri).then_with(|| a_name.cmp(b_name)));
        all
    }

    /// Run every command on a raw input line in order.
    ///
    /// An unknown command stops the rest of the line. A failing command is reported and the
    /// next one still runs.
    pub async fn handle_command(
        &self,
        player_id: PlayerId,
        raw_line: &str,
        route: &mut dyn AreaRoute,
    ) -> LineOutcome {
        for segment in split_line(raw_line) {
            let Some(parsed) = parse_segment(segment, self) else {
                continue;
            };

            let handler = match self.get(&parsed.name) {
                Some(command) if parsed.known => command.handler,
                _ => {
                    tracing::debug!(player_id = %player_id, command = %parsed.name, "Unknown command");
                    self.reply(player_id, &format!("Huh? Unknown command '{}'.", parsed.name))
                        .await;
                    return LineOutcome::Continue;
                }
            };

            let mut ctx = CommandContext {
                player_id,
                command: &parsed.name,
                args: &parsed.args,
                route: &mut *route,
            };

            match handler.execute(&mut ctx).await {
                Ok(CommandOutcome::Done) => {}
                Ok(CommandOutcome::AreaChanged(area_id)) => {
                    if let Err(e) = route.switch_area(area_id) {
                        tracing::error!(
                            player_id = %player_id,
                            area_id = %area_id,
                            error = %e,
                            "Failed to switch area route"
                        );
                    }
                }
                Ok(CommandOutcome::Quit) => return LineOutcome::Quit,
                Err(e) => {
                    tracing::warn!(
                        player_id = %player_id,
                        command = %parsed.name,
                        error = %e,
                        "Command failed"
                    );
                    self.reply(player_id, &e.player_message()).await;
                }
            }
        }
        LineOutcome::Continue
    }

    async fn reply(&self, player_id: PlayerId, message: &str) {
        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.notify_player(player_id, message).await;
        }
    }
}

impl CommandIndex for CommandRouter {
    fn priority_of(&self, name: &str) -> Option<u32> {
        self.commands.get(name).map(|entry| entry.value().priority)
    }

    fn names_with_prefix(&self, prefix: &str) -> Vec<(String, u32)> {
        self.commands
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| (entry.key().clone(), entry.value().priority))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::connections::Session;
    use crate::use_cases::commands::testing::RecordingRoute;
    use crate::use_cases::commands::{CommandError, UsesWorld, Wired};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tickmud_domain::{AreaId, Player, RoomId};
    use tokio::sync::mpsc;

    /// Records every invocation as `name args...`.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        fail: bool,
        outcome: Option<CommandOutcome>,
    }

    #[async_trait]
    impl CommandHandler for Recorder {
        async fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
            let mut entry = ctx.command.to_string();
            for arg in ctx.args {
                entry.push(' ');
                entry.push_str(arg);
            }
            self.calls.lock().unwrap().push(entry);
            if self.fail {
                return Err(CommandError::rejected("You fumble."));
            }
            Ok(self.outcome.unwrap_or(CommandOutcome::Done))
        }
    }

    struct NeedsWorld {
        world: Wired<World>,
    }

    #[async_trait]
    impl CommandHandler for NeedsWorld {
        async fn execute(&self, _ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
            self.world.get()?;
            Ok(CommandOutcome::Done)
        }

        fn as_world_user(&self) -> Option<&dyn UsesWorld> {
            Some(self)
        }
    }

    impl UsesWorld for NeedsWorld {
        fn world_slot(&self) -> &Wired<World> {
            &self.world
        }
    }

    async fn connected() -> (Arc<Broadcaster>, PlayerId, mpsc::Receiver<String>) {
        let registry = Arc::new(SessionRegistry::new());
        let (tx, rx) = mpsc::channel(32);
        let player = Player::new("Ann", RoomId::new(), AreaId::new()).unwrap();
        let id = player.id;
        registry.register(Arc::new(Session::new(player, tx))).await.unwrap();
        (Arc::new(Broadcaster::new(registry)), id, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(line) = rx.try_recv() {
            out.push(line);
        }
        out
    }

    #[tokio::test]
    async fn abbreviations_dispatch_to_resolved_command() {
        let router = CommandRouter::new();
        let north = Arc::new(Recorder::default());
        router.register("north", 1, north.clone()).unwrap();
        router.register("northeast", 2, Arc::new(Recorder::default())).unwrap();

        let mut route = RecordingRoute::new(AreaId::new());
        router.handle_command(PlayerId::new(), "n", &mut route).await;

        assert_eq!(*north.calls.lock().unwrap(), vec!["north".to_string()]);
    }

    #[tokio::test]
    async fn unknown_command_stops_the_rest_of_the_line() {
        let (broadcaster, player, mut rx) = connected().await;
        let router = CommandRouter::new().with_broadcaster(broadcaster);
        let say = Arc::new(Recorder::default());
        router.register("say", 5, say.clone()).unwrap();

        let mut route = RecordingRoute::new(AreaId::new());
        let outcome = router
            .handle_command(player, "say hi; dance; say bye", &mut route)
            .await;

        assert_eq!(outcome, LineOutcome::Continue);
        assert_eq!(*say.calls.lock().unwrap(), vec!["say hi".to_string()]);
        assert_eq!(drain(&mut rx)[0], "Huh? Unknown command 'dance'.");
    }

    #[tokio::test]
    async fn failing_command_does_not_stop_the_line() {
        let (broadcaster, player, mut rx) = connected().await;
        let router = CommandRouter::new().with_broadcaster(broadcaster);
        let grab = Arc::new(Recorder {
            fail: true,
            ..Recorder::default()
        });
        let say = Arc::new(Recorder::default());
        router.register("grab", 6, grab.clone()).unwrap();
        router.register("say", 5, say.clone()).unwrap();

        let mut route = RecordingRoute::new(AreaId::new());
        router.handle_command(player, "grab lamp; say oops", &mut route).await;

        assert_eq!(grab.calls.lock().unwrap().len(), 1);
        assert_eq!(*say.calls.lock().unwrap(), vec!["say oops".to_string()]);
        assert_eq!(drain(&mut rx)[0], "You fumble.");
    }

    #[tokio::test]
    async fn quit_ends_the_line() {
        let router = CommandRouter::new();
        let quit = Arc::new(Recorder {
            outcome: Some(CommandOutcome::Quit),
            ..Recorder::default()
        });
        let say = Arc::new(Recorder::default());
        router.register("quit", 50, quit).unwrap();
        router.register("say", 5, say.clone()).unwrap();

        let mut route = RecordingRoute::new(AreaId::new());
        let outcome = router
            .handle_command(PlayerId::new(), "quit; say still here", &mut route)
            .await;

        assert_eq!(outcome, LineOutcome::Quit);
        assert!(say.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn area_change_switches_the_route() {
        let target = AreaId::new();
        let router = CommandRouter::new();
        router
            .register(
                "east",
                1,
                Arc::new(Recorder {
                    outcome: Some(CommandOutcome::AreaChanged(target)),
                    ..Recorder::default()
                }),
            )
            .unwrap();

        let mut route = RecordingRoute::new(AreaId::new());
        router.handle_command(PlayerId::new(), "e", &mut route).await;

        assert_eq!(route.area, target);
        assert_eq!(route.switches, vec![target]);
    }

    #[test]
    fn missing_capability_fails_registration() {
        let router = CommandRouter::new();
        let err = router
            .register(
                "survey",
                30,
                Arc::new(NeedsWorld {
                    world: Wired::new("world"),
                }),
            )
            .unwrap_err();

        assert_eq!(
            err,
            RouterError::MissingCapability {
                command: "survey".into(),
                capability: Capability::World,
            }
        );
        assert!(router.get("survey").is_none());
    }

    #[test]
    fn duplicate_and_invalid_names_are_rejected() {
        let router = CommandRouter::new();
        router.register("look", 2, Arc::new(Recorder::default())).unwrap();
        assert_eq!(
            router.register("LOOK", 2, Arc::new(Recorder::default())),
            Err(RouterError::Duplicate("look".into()))
        );
        assert!(matches!(
            router.register("two words", 2, Arc::new(Recorder::default())),
            Err(RouterError::InvalidName(_))
        ));
    }

    #[test]
    fn racing_registrations_of_one_name_admit_exactly_one() {
        let router = CommandRouter::new();
        let accepted: usize = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| router.register("look", 2, Arc::new(Recorder::default()))))
                .collect();
            workers
                .into_iter()
                .map(|worker| worker.join())
                .filter(|joined| matches!(joined, Ok(Ok(()))))
                .count()
        });

        assert_eq!(accepted, 1);
        assert_eq!(router.listing(), vec![("look".to_string(), 2)]);
    }

    #[test]
    fn listing_is_ordered_by_priority() {
        let router = CommandRouter::new();
        router.register("quit", 50, Arc::new(Recorder::default())).unwrap();
        router.register("look", 2, Arc::new(Recorder::default())).unwrap();
        router.register("exits", 3, Arc::new(Recorder::default())).unwrap();

        let names: Vec<_> = router.listing().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["look", "exits", "quit"]);
    }
}
