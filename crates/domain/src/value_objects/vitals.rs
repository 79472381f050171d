//! Player vitals: health and movement points with their maxima.

use serde::{Deserialize, Serialize};

/// Health and movement pools.
///
/// Current values are always kept within `0..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vitals {
    pub health: i32,
    pub max_health: i32,
    pub movement: i32,
    pub max_movement: i32,
}

impl Vitals {
    pub fn new(max_health: i32, max_movement: i32) -> Self {
        Self {
            health: max_health,
            max_health,
            movement: max_movement,
            max_movement,
        }
    }

    /// Points restored per heartbeat for a pool with the given maximum.
    pub fn regen_rate(max: i32) -> i32 {
        (max / 10).max(1)
    }

    /// Move both pools toward their maxima by `multiplier` heartbeats' worth of regen.
    ///
    /// Returns true if anything changed.
    pub fn regenerate(&mut self, multiplier: i32) -> bool {
        let before = *self;
        self.health = (self.health + Self::regen_rate(self.max_health) * multiplier)
            .min(self.max_health);
        self.movement = (self.movement + Self::regen_rate(self.max_movement) * multiplier)
            .min(self.max_movement);
        before != *self
    }

    /// Set health directly, clamped to the valid range.
    pub fn set_health(&mut self, amount: i32) {
        self.health = amount.clamp(0, self.max_health);
    }

    /// Prompt shown after every delivered message.
    pub fn status_line(&self) -> String {
        format!(
            "<{}/{}hp {}/{}mv> ",
            self.health, self.max_health, self.movement, self.max_movement
        )
    }

    pub fn is_full(&self) -> bool {
        self.health >= self.max_health && self.movement >= self.max_movement
    }
}

impl Default for Vitals {
    fn default() -> Self {
        Self::new(100, 100)
    }
}
