//! Keys and the completion gate

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::connector::Connector;

/// A collectible the player must hold before the door opens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Key {
    pub pos: Vec2,
    pub collected: bool,
}

impl Key {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            collected: false,
        }
    }

    /// Collect if `player_pos` is within `radius`. Returns true on pickup.
    pub fn try_collect(&mut self, player_pos: Vec2, radius: f32) -> bool {
        if self.collected || player_pos.distance_squared(self.pos) > radius * radius {
            return false;
        }
        self.collected = true;
        true
    }
}

/// Decides whether reaching a door ends the level
pub struct CompletionGate;

impl CompletionGate {
    /// True iff `door` is a door and every key is collected.
    ///
    /// An empty key set is vacuously satisfied; level validation rejects
    /// keyless levels unless they opt in.
    pub fn evaluate(door: &Connector, keys: &[Key]) -> bool {
        door.is_door && keys.iter().all(|k| k.collected)
    }
}
