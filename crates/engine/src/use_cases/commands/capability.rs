//! Capability injection for command handlers.
//!
//! A handler opts into a collaborator by implementing the matching capability trait and
//! returning itself from the accessor on [`CommandHandler`](super::CommandHandler). The
//! router wires every requested collaborator once, at registration.

use std::sync::{Arc, OnceLock};

use crate::api::connections::SessionRegistry;
use crate::api::notify::Broadcaster;
use crate::entities::World;
use crate::infrastructure::ports::{ItemStore, PlayerStore};

use super::CommandError;

/// A collaborator slot filled in by the router.
pub struct Wired<T: ?Sized> {
    name: &'static str,
    slot: OnceLock<Arc<T>>,
}

impl<T: ?Sized> Wired<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: OnceLock::new(),
        }
    }

    /// Fill the slot. A handler registered under several names is wired once; later
    /// calls keep the first collaborator.
    pub fn wire(&self, value: Arc<T>) {
        let _ = self.slot.set(value);
    }

    pub fn is_wired(&self) -> bool {
        self.slot.get().is_some()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn try_get(&self) -> Option<&Arc<T>> {
        self.slot.get()
    }

    pub fn get(&self) -> Result<&Arc<T>, CommandError> {
        self.slot.get().ok_or(CommandError::Unwired(self.name))
    }
}

impl<T: ?Sized> std::fmt::Debug for Wired<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wired")
            .field("name", &self.name)
            .field("wired", &self.is_wired())
            .finish()
    }
}

pub trait Notifiable: Send + Sync {
    fn broadcaster_slot(&self) -> &Wired<Broadcaster>;
}

pub trait UsesWorld: Send + Sync {
    fn world_slot(&self) -> &Wired<World>;
}

pub trait UsesPlayerStore: Send + Sync {
    fn player_store_slot(&self) -> &Wired<dyn PlayerStore>;
}

pub trait UsesItemStore: Send + Sync {
    fn item_store_slot(&self) -> &Wired<dyn ItemStore>;
}

pub trait UsesSessions: Send + Sync {
    fn sessions_slot(&self) -> &Wired<SessionRegistry>;
}

/// Implement capability traits for a handler from its `Wired` fields.
///
/// ```ignore
/// capability_slots!(LookCommand { world => world, sessions => sessions, notify => broadcaster });
/// ```
macro_rules! capability_slots {
    ($handler:ty { $($cap:ident => $field:ident),+ $(,)? }) => {
        $( $crate::use_cases::commands::capability::capability_slots!(@slot $handler, $cap, $field); )+
    };
    (@slot $handler:ty, notify, $field:ident) => {
        impl $crate::use_cases::commands::Notifiable for $handler {
            fn broadcaster_slot(
                &self,
            ) -> &$crate::use_cases::commands::Wired<$crate::api::notify::Broadcaster> {
                &self.$field
            }
        }
    };
    (@slot $handler:ty, world, $field:ident) => {
        impl $crate::use_cases::commands::UsesWorld for $handler {
            fn world_slot(&self) -> &$crate::use_cases::commands::Wired<$crate::entities::World> {
                &self.$field
            }
        }
    };
    (@slot $handler:ty, players, $field:ident) => {
        impl $crate::use_cases::commands::UsesPlayerStore for $handler {
            fn player_store_slot(
                &self,
            ) -> &$crate::use_cases::commands::Wired<dyn $crate::infrastructure::ports::PlayerStore> {
                &self.$field
            }
        }
    };
    (@slot $handler:ty, items, $field:ident) => {
        impl $crate::use_cases::commands::UsesItemStore for $handler {
            fn item_store_slot(
                &self,
            ) -> &$crate::use_cases::commands::Wired<dyn $crate::infrastructure::ports::ItemStore> {
                &self.$field
            }
        }
    };
    (@slot $handler:ty, sessions, $field:ident) => {
        impl $crate::use_cases::commands::UsesSessions for $handler {
            fn sessions_slot(
                &self,
            ) -> &$crate::use_cases::commands::Wired<$crate::api::connections::SessionRegistry> {
                &self.$field
            }
        }
    };
}
pub(crate) use capability_slots;

/// Capability names, as reported by mis-wiring errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Notifiable,
    World,
    PlayerStore,
    ItemStore,
    Sessions,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Notifiable => "notifiable",
            Self::World => "world",
            Self::PlayerStore => "player store",
            Self::ItemStore => "item store",
            Self::Sessions => "sessions",
        };
        f.write_str(name)
    }
}
