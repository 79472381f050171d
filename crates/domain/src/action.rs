//! Queued units of work for an area's tick processing.

use serde::{Deserialize, Serialize};

use crate::PlayerId;

/// A command deferred to an area's tick: who issued it, what, and with which arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub player_id: PlayerId,
    pub command: String,
    pub args: Vec<String>,
}

impl Action {
    pub fn new(player_id: PlayerId, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            player_id,
            command: command.into(),
            args,
        }
    }
}
