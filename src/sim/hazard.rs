//! Moving hazards that follow a waypoint track
//!
//! Touching one kills the player. Hazards keep moving across player deaths;
//! only a level restart puts them back at the start of their track.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::clock::{SimulationClock, Timer, TimerStatus};
use crate::step_towards;

/// How a hazard walks its track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementType {
    /// Back and forth, reversing at the ends
    #[default]
    PingPong,
    /// Wraps from the last waypoint to the first
    Loop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hazard {
    pub radius: f32,
    pub track: Vec<Vec2>,
    pub movement: MovementType,
    /// Units per second
    pub speed: f32,
    /// Seconds to wait on each waypoint
    pub dwell: f32,
    pub pos: Vec2,
    /// Index of the waypoint being approached
    target: usize,
    #[serde(skip)]
    dwell_timer: Option<Timer>,
}

impl Hazard {
    /// Create a hazard sitting on the first waypoint of `track`
    pub fn new(track: Vec<Vec2>, radius: f32, movement: MovementType, speed: f32, dwell: f32) -> Self {
        let pos = track.first().copied().unwrap_or(Vec2::ZERO);
        Self {
            radius,
            movement,
            speed,
            dwell,
            pos,
            target: if track.len() > 1 { 1 } else { 0 },
            track,
            dwell_timer: None,
        }
    }

    /// Current waypoint target
    pub fn target(&self) -> Option<Vec2> {
        self.track.get(self.target).copied()
    }

    /// Advance one tick
    pub fn update(&mut self, clock: &SimulationClock) {
        if self.track.len() < 2 {
            return;
        }

        if let Some(timer) = self.dwell_timer {
            match clock.poll(&timer) {
                TimerStatus::Pending => return,
                // A reset generation only matters to the player; keep walking
                TimerStatus::Due | TimerStatus::Stale => {
                    self.dwell_timer = None;
                    self.next_target();
                }
            }
        }

        let Some(target) = self.target() else {
            return;
        };
        self.pos = step_towards(self.pos, target, self.speed * clock.dt());

        if self.pos == target {
            if self.dwell > 0.0 {
                self.dwell_timer = Some(clock.schedule(self.dwell));
            } else {
                self.next_target();
            }
        }
    }

    fn next_target(&mut self) {
        self.target += 1;
        if self.target >= self.track.len() {
            match self.movement {
                MovementType::Loop => self.target = 0,
                MovementType::PingPong => {
                    self.track.reverse();
                    self.target = 1;
                }
            }
        }
    }

    /// Does a circle of `radius` at `pos` overlap this hazard?
    pub fn touches(&self, pos: Vec2, radius: f32) -> bool {
        let reach = self.radius + radius;
        self.pos.distance_squared(pos) < reach * reach
    }
}
