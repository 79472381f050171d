//! Item handling: inventory, take, drop, give, equip and remove.
//!
//! Every ownership change is persisted while the room's lock is held, so two players
//! grabbing the same item cannot both end up with it.

use std::sync::Arc;

use async_trait::async_trait;
use tickmud_domain::{Item, PlayerId};

use crate::api::connections::{Session, SessionRegistry};
use crate::api::notify::Broadcaster;
use crate::entities::World;
use crate::infrastructure::ports::ItemStore;
use crate::use_cases::commands::capability::capability_slots;
use crate::use_cases::commands::{
    CommandContext, CommandError, CommandHandler, CommandOutcome, Notifiable, UsesItemStore,
    UsesSessions, UsesWorld, Wired,
};

/// Item commands, registered once per verb.
pub struct ItemCommands {
    world: Wired<World>,
    items: Wired<dyn ItemStore>,
    sessions: Wired<SessionRegistry>,
    broadcaster: Wired<Broadcaster>,
}

impl ItemCommands {
    pub const VERBS: [&'static str; 6] = ["inventory", "take", "drop", "give", "equip", "remove"];

    pub fn new() -> Self {
        Self {
            world: Wired::new("world"),
            items: Wired::new("item store"),
            sessions: Wired::new("sessions"),
            broadcaster: Wired::new("broadcaster"),
        }
    }

    async fn inventory(&self, session: &Session) -> Result<(), CommandError> {
        let carried = session.snapshot().await.inventory;
        let text = if carried.is_empty() {
            "You are carrying nothing.".to_string()
        } else {
            let mut lines = vec!["You are carrying:".to_string()];
            for item in &carried {
                let worn = if item.equipped { " (equipped)" } else { "" };
                lines.push(format!("  {}{worn}", item.name));
            }
            lines.join("\n")
        };
        self.tell(session.player_id(), &text).await
    }

    async fn take(&self, session: &Session, token: &str) -> Result<(), CommandError> {
        let items = self.items.get()?;
        let (room_id, _) = session.location().await;
        let room = self.world.get()?.room(room_id).await?;

        let item = {
            let mut state = room.lock().await;
            let Some(mut item) = state.take_item(token) else {
                return Err(CommandError::rejected("You don't see that here."));
            };
            if let Err(e) = items.move_item_to_player(item.id, session.player_id()).await {
                state.items.push(item);
                return Err(e.into());
            }
            item.equipped = false;
            session.update(|player| player.inventory.push(item.clone())).await;
            item
        };

        self.tell(session.player_id(), &format!("You take {}.", item.name))
            .await?;
        self.broadcaster
            .get()?
            .notify_location(
                room_id,
                Some(session.player_id()),
                &format!("{} takes {}.", session.name(), item.name),
            )
            .await;
        Ok(())
    }

    async fn drop_item(&self, session: &Session, token: &str) -> Result<(), CommandError> {
        let items = self.items.get()?;
        let (room_id, _) = session.location().await;
        let room = self.world.get()?.room(room_id).await?;
        let item = Self::carried(session, token).await?;

        {
            let mut state = room.lock().await;
            items.move_item_to_room(item.id, room_id).await?;
            if let Some(mut dropped) = session.update(|player| player.take_item(item.id)).await {
                dropped.equipped = false;
                state.items.push(dropped);
            }
        }

        self.tell(session.player_id(), &format!("You drop {}.", item.name))
            .await?;
        self.broadcaster
            .get()?
            .notify_location(
                room_id,
                Some(session.player_id()),
                &format!("{} drops {}.", session.name(), item.name),
            )
            .await;
        Ok(())
    }

    async fn give(&self, session: &Session, token: &str, target: &str) -> Result<(), CommandError> {
        let items = self.items.get()?;
        let (room_id, _) = session.location().await;
        let room = self.world.get()?.room(room_id).await?;

        let recipient = match self.sessions.get()?.find_by_name(target).await {
            Some(recipient) if recipient.player_id() == session.player_id() => {
                return Err(CommandError::rejected("You already have it."));
            }
            Some(recipient) if recipient.location().await.0 == room_id => recipient,
            _ => return Err(CommandError::rejected("They aren't here.")),
        };
        let item = Self::carried(session, token).await?;

        {
            // Serialises with other item changes in this room.
            let _state = room.lock().await;
            items
                .move_item_to_player(item.id, recipient.player_id())
                .await?;
            if let Some(mut given) = session.update(|player| player.take_item(item.id)).await {
                given.equipped = false;
                recipient.update(|player| player.inventory.push(given)).await;
            }
        }

        self.tell(
            session.player_id(),
            &format!("You give {} to {}.", item.name, recipient.name()),
        )
        .await?;
        self.tell(
            recipient.player_id(),
            &format!("{} gives you {}.", session.name(), item.name),
        )
        .await
    }

    async fn set_equipped(
        &self,
        session: &Session,
        token: &str,
        equipped: bool,
    ) -> Result<(), CommandError> {
        let item = Self::carried(session, token).await?;
        if item.equipped == equipped {
            let refusal = if equipped {
                "You are already using that."
            } else {
                "You are not using that."
            };
            return Err(CommandError::rejected(refusal));
        }

        self.items.get()?.set_equipped(item.id, equipped).await?;
        session
            .update(|player| {
                if let Some(carried) = player.item_mut(item.id) {
                    carried.equipped = equipped;
                }
            })
            .await;

        let verb = if equipped { "equip" } else { "remove" };
        self.tell(session.player_id(), &format!("You {verb} {}.", item.name))
            .await
    }

    async fn carried(session: &Session, token: &str) -> Result<Item, CommandError> {
        session
            .snapshot()
            .await
            .find_item(token)
            .cloned()
            .ok_or_else(|| CommandError::rejected("You aren't carrying that."))
    }

    async fn tell(&self, player_id: PlayerId, message: &str) -> Result<(), CommandError> {
        self.broadcaster.get()?.notify_player(player_id, message).await;
        Ok(())
    }
}

impl Default for ItemCommands {
    fn default() -> Self {
        Self::new()
    }
}

capability_slots!(ItemCommands {
    world => world,
    items => items,
    sessions => sessions,
    notify => broadcaster,
});

#[async_trait]
impl CommandHandler for ItemCommands {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
        let session: Arc<Session> = self.sessions.get()?.require(ctx.player_id).await?;

        match (ctx.command, ctx.arg(0), ctx.arg(1)) {
            ("inventory", _, _) => self.inventory(&session).await?,
            ("take", Some(token), _) => self.take(&session, token).await?,
            ("drop", Some(token), _) => self.drop_item(&session, token).await?,
            ("give", Some(token), Some(target)) => self.give(&session, token, target).await?,
            ("equip", Some(token), _) => self.set_equipped(&session, token, true).await?,
            ("remove", Some(token), _) => self.set_equipped(&session, token, false).await?,
            ("give", _, _) => return Err(CommandError::rejected("Give what to whom?")),
            (verb, _, _) => {
                let mut verb = verb.to_string();
                if let Some(first) = verb.get_mut(..1) {
                    first.make_ascii_uppercase();
                }
                return Err(CommandError::rejected(format!("{verb} what?")));
            }
        }
        Ok(CommandOutcome::Done)
    }

    fn as_notifiable(&self) -> Option<&dyn Notifiable> {
        Some(self)
    }

    fn as_world_user(&self) -> Option<&dyn UsesWorld> {
        Some(self)
    }

    fn as_item_store_user(&self) -> Option<&dyn UsesItemStore> {
        Some(self)
    }

    fn as_session_user(&self) -> Option<&dyn UsesSessions> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_fixtures::{Harness, WorldBuilder};
    use tickmud_domain::Item;

    #[tokio::test]
    async fn take_then_drop_moves_ownership_both_ways() {
        let mut builder = WorldBuilder::new();
        let area = builder.area("Town");
        let square = builder.room(area, "Square");
        let lamp = builder.item_in_room(square, Item::new("a brass lamp"));
        let harness = Harness::new(builder).await;
        let mut ann = harness.login("Ann", square).await;
        let mut bob = harness.login("Bob", square).await;
        ann.drain();
        bob.drain();

        harness.run(&mut ann, "take lamp; inventory").await;
        assert_eq!(
            ann.drain(),
            vec![
                "You take a brass lamp.".to_string(),
                "You are carrying:\n  a brass lamp".to_string()
            ]
        );
        assert_eq!(bob.drain(), vec!["Ann takes a brass lamp.".to_string()]);
        assert_eq!(harness.store.item_holder(lamp), Some(ann.player_id.to_string()));

        harness.run(&mut ann, "drop brass").await;
        assert_eq!(ann.drain(), vec!["You drop a brass lamp.".to_string()]);
        assert_eq!(harness.store.item_holder(lamp), Some(square.to_string()));
    }

    #[tokio::test]
    async fn only_one_player_gets_a_contested_item() {
        let mut builder = WorldBuilder::new();
        let area = builder.area("Town");
        let square = builder.room(area, "Square");
        builder.item_in_room(square, Item::new("a gold coin"));
        let harness = Harness::new(builder).await;
        let mut ann = harness.login("Ann", square).await;
        let mut bob = harness.login("Bob", square).await;

        let (a, b) = tokio::join!(
            harness.run_detached(ann.player_id, "take coin"),
            harness.run_detached(bob.player_id, "take coin"),
        );
        let _ = (a, b);

        let lines: Vec<String> = ann.drain().into_iter().chain(bob.drain()).collect();
        assert_eq!(lines.iter().filter(|l| *l == "You take a gold coin.").count(), 1);
        assert_eq!(lines.iter().filter(|l| *l == "You don't see that here.").count(), 1);
    }

    #[tokio::test]
    async fn give_requires_recipient_in_the_room() {
        let mut builder = WorldBuilder::new();
        let area = builder.area("Town");
        let square = builder.room(area, "Square");
        let gate = builder.room(area, "Gate");
        let rope = builder.item_in_room(square, Item::new("a coil of rope"));
        let harness = Harness::new(builder).await;
        let mut ann = harness.login("Ann", square).await;
        let mut bob = harness.login("Bob", square).await;
        let _cat = harness.login("Cat", gate).await;
        harness.run(&mut ann, "take rope").await;
        ann.drain();
        bob.drain();

        harness.run(&mut ann, "give rope cat; give rope bob").await;

        assert_eq!(
            ann.drain(),
            vec![
                "They aren't here.".to_string(),
                "You give a coil of rope to Bob.".to_string()
            ]
        );
        assert_eq!(bob.drain(), vec!["Ann gives you a coil of rope.".to_string()]);
        assert_eq!(harness.store.item_holder(rope), Some(bob.player_id.to_string()));
    }

    #[tokio::test]
    async fn equip_and_remove_toggle_the_flag() {
        let mut builder = WorldBuilder::new();
        let area = builder.area("Town");
        let square = builder.room(area, "Square");
        let cloak = builder.item_in_room(square, Item::new("a wool cloak"));
        let harness = Harness::new(builder).await;
        let mut ann = harness.login("Ann", square).await;
        harness.run(&mut ann, "take cloak").await;
        ann.drain();

        harness.run(&mut ann, "equip cloak; equip cloak; i").await;
        assert_eq!(
            ann.drain(),
            vec![
                "You equip a wool cloak.".to_string(),
                "You are already using that.".to_string(),
                "You are carrying:\n  a wool cloak (equipped)".to_string()
            ]
        );
        assert!(harness.store.is_equipped(cloak));

        harness.run(&mut ann, "remove cloak").await;
        assert_eq!(ann.drain(), vec!["You remove a wool cloak.".to_string()]);
        assert!(!harness.store.is_equipped(cloak));
    }

    #[tokio::test]
    async fn missing_arguments_are_refused() {
        let mut builder = WorldBuilder::new();
        let area = builder.area("Town");
        let square = builder.room(area, "Square");
        let harness = Harness::new(builder).await;
        let mut ann = harness.login("Ann", square).await;
        ann.drain();

        harness.run(&mut ann, "take; give sword; drop sword").await;
        assert_eq!(
            ann.drain(),
            vec![
                "Take what?".to_string(),
                "Give what to whom?".to_string(),
                "You aren't carrying that.".to_string()
            ]
        );
    }
}
