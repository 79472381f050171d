//! Per-player FIFO queues drained round-robin.

use std::collections::{HashMap, VecDeque};

use tickmud_domain::{Action, PlayerId};

/// Pending actions for one area.
///
/// Each player has their own FIFO holding at most `limit` actions. A round takes at most
/// one action from every player who has something queued, visiting players in the order
/// they first queued.
#[derive(Debug)]
pub struct ActionQueue {
    queues: HashMap<PlayerId, VecDeque<Action>>,
    order: Vec<PlayerId>,
    limit: usize,
}

impl ActionQueue {
    pub fn new(limit: usize) -> Self {
        Self {
            queues: HashMap::new(),
            order: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Append to the player's FIFO. A full FIFO hands the action back.
    pub fn push(&mut self, action: Action) -> Result<(), Action> {
        let player_id = action.player_id;
        let queue = self.queues.entry(player_id).or_default();
        if queue.len() >= self.limit {
            return Err(action);
        }
        queue.push_back(action);
        if !self.order.contains(&player_id) {
            self.order.push(player_id);
        }
        Ok(())
    }

    /// Take the next action from each player with pending work.
    pub fn drain_round(&mut self) -> Vec<Action> {
        let mut round = Vec::with_capacity(self.order.len());
        for player_id in &self.order {
            if let Some(action) = self.queues.get_mut(player_id).and_then(VecDeque::pop_front) {
                round.push(action);
            }
        }
        self.queues.retain(|_, queue| !queue.is_empty());
        let queues = &self.queues;
        self.order.retain(|player_id| queues.contains_key(player_id));
        round
    }

    /// Drop everything queued for a player.
    pub fn forget(&mut self, player_id: PlayerId) -> usize {
        self.order.retain(|id| *id != player_id);
        self.queues
            .remove(&player_id)
            .map(|queue| queue.len())
            .unwrap_or(0)
    }

    pub fn pending(&self, player_id: PlayerId) -> usize {
        self.queues.get(&player_id).map(VecDeque::len).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}
