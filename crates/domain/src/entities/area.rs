//! Area entity - the unit of concurrent ownership of rooms.

use serde::{Deserialize, Serialize};

use crate::AreaId;

/// An area record as stored in the backing store.
///
/// The live rooms of an area are owned by the engine's world graph; this is only the
/// descriptive part that never changes at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub id: AreaId,
    pub name: String,
    pub description: String,
}

impl Area {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: AreaId::new(),
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn with_id(mut self, id: AreaId) -> Self {
        self.id = id;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
