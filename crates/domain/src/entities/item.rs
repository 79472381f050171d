//! Item entity - objects lying in rooms or carried by players.

use serde::{Deserialize, Serialize};

use crate::ItemId;

/// A carried or dropped object.
///
/// Plain data struct: any combination of values is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// Only meaningful while carried.
    pub equipped: bool,
}

impl Item {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            equipped: false,
        }
    }

    pub fn with_id(mut self, id: ItemId) -> Self {
        self.id = id;
        self
    }

    /// Case-insensitive match of a player-typed token against the item name.
    ///
    /// Matches the whole name, a prefix of it, or a prefix of any word in it, so
    /// "sword" and "rus" both find "a rusty sword".
    pub fn matches(&self, token: &str) -> bool {
        let token = token.trim().to_lowercase();
        if token.is_empty() {
            return false;
        }
        let name = self.name.to_lowercase();
        name.starts_with(&token) || name.split_whitespace().any(|word| word.starts_with(&token))
    }
}

/// Find the first item in `items` that matches `token`.
pub fn find_item<'a>(items: &'a [Item], token: &str) -> Option<&'a Item> {
    items.iter().find(|item| item.matches(token))
}
