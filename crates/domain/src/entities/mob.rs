//! Mob entity - non-player creatures present in a room.

use serde::{Deserialize, Serialize};

use crate::MobId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mob {
    pub id: MobId,
    pub name: String,
}

impl Mob {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: MobId::new(),
            name: name.into(),
        }
    }
}
