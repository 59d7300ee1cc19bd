//! The player agent and its traversal bookkeeping
//!
//! The per-tick traversal logic lives in `tick.rs`; this module holds the
//! player's own state and the small transitions that only touch it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::clock::{SimulationClock, Timer, TimerStatus};
use super::connector::ConnectorId;
use crate::heading;

/// Two-zone orientation settled on arrival
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    /// Arrived from below (or level): hangs upright
    #[default]
    Up,
    /// Arrived from above: hangs upside down
    Down,
}

impl Facing {
    /// Rotation (radians) a renderer should apply at rest
    pub fn rest_rotation(self) -> f32 {
        match self {
            Facing::Up => 0.0,
            Facing::Down => std::f32::consts::PI,
        }
    }
}

/// Coarse movement state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementState {
    Idle,
    Moving,
    Dead,
}

/// One in-flight traversal toward the head of the path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Traversal {
    /// Generation this routine was started under
    pub generation: u64,
    /// Connector being travelled to
    pub target: ConnectorId,
    /// Where this leg started
    pub departure: Vec2,
    /// Whether the player has left `departure` on this leg
    pub moved: bool,
    /// Inter-node pause before this leg starts
    pub delay: Option<Timer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Movement {
    Idle,
    Moving(Traversal),
    /// Respawn sequence in progress
    Dead { respawn: Timer },
}

/// The player entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerAgent {
    pub pos: Vec2,
    pub spawn: Vec2,
    /// Current rotation (radians); heading while moving, settled at rest
    pub rotation: f32,
    pub facing: Facing,
    pub movement: Movement,
    /// Connector the player physically occupies
    pub current_connector: Option<ConnectorId>,
    /// Committed moves this life
    pub total_moves: u32,
    invulnerable: Option<Timer>,
}

impl PlayerAgent {
    pub fn new(spawn: Vec2) -> Self {
        Self {
            pos: spawn,
            spawn,
            rotation: 0.0,
            facing: Facing::Up,
            movement: Movement::Idle,
            current_connector: None,
            total_moves: 0,
            invulnerable: None,
        }
    }

    pub fn state(&self) -> MovementState {
        match self.movement {
            Movement::Idle => MovementState::Idle,
            Movement::Moving(_) => MovementState::Moving,
            Movement::Dead { .. } => MovementState::Dead,
        }
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.movement == Movement::Idle
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        matches!(self.movement, Movement::Dead { .. })
    }

    /// Start a traversal toward `target`. Counts as one move.
    pub fn begin_move(&mut self, target: ConnectorId, clock: &SimulationClock) {
        self.total_moves += 1;
        self.movement = Movement::Moving(Traversal {
            generation: clock.generation(),
            target,
            departure: self.pos,
            moved: false,
            delay: None,
        });
    }

    /// Turn to face `to` while travelling
    pub fn face_towards(&mut self, to: Vec2) {
        if to != self.pos {
            self.rotation = heading(self.pos, to);
        }
    }

    /// Two-zone rule: upper row if the anchor is at or above the departure
    pub fn settle_facing(&mut self, departure: Vec2, anchor: Vec2) {
        if departure != anchor {
            self.facing = if anchor.y >= departure.y {
                Facing::Up
            } else {
                Facing::Down
            };
        }
        self.rotation = self.facing.rest_rotation();
    }

    /// Enter the respawn sequence
    pub fn die(&mut self, clock: &SimulationClock, respawn_secs: f32) {
        self.movement = Movement::Dead {
            respawn: clock.schedule(respawn_secs),
        };
        self.current_connector = None;
        self.total_moves = 0;
    }

    /// Shrink progress of the death animation, 0 while alive
    pub fn death_progress(&self, clock: &SimulationClock, respawn_secs: f32) -> f32 {
        match &self.movement {
            Movement::Dead { respawn } => clock.progress(respawn, respawn_secs),
            _ => 0.0,
        }
    }

    /// Back to spawn, idle, briefly immune to hazards
    pub fn respawn(&mut self, clock: &SimulationClock, invulnerable_secs: f32) {
        self.pos = self.spawn;
        self.rotation = 0.0;
        self.facing = Facing::Up;
        self.movement = Movement::Idle;
        self.current_connector = None;
        self.invulnerable = (invulnerable_secs > 0.0).then(|| clock.schedule(invulnerable_secs));
    }

    /// Full reset for a level restart
    pub fn reset(&mut self) {
        *self = Self::new(self.spawn);
    }

    pub fn is_invulnerable(&self, clock: &SimulationClock) -> bool {
        self.invulnerable
            .is_some_and(|t| clock.poll(&t) == TimerStatus::Pending)
    }
}
