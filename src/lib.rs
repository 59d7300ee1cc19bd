//! Tether Path - anchor-chaining puzzle core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (connectors, tether path, traversal, timers)
//! - `settings`: Data-driven tuning and policy switches
//! - `persistence`: Level progress save data
//! - `error`: Configuration error types

pub mod error;
pub mod persistence;
pub mod settings;
pub mod sim;

pub use error::{ConfigError, LevelError};
pub use persistence::{LevelProgress, SaveData};
pub use settings::{Settings, TerminalPolicy};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Largest frame delta accepted by the accumulator (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Connector defaults
    pub const DEFAULT_TIME_TO_RETRACT: f32 = 2.0;
    pub const DEFAULT_TIME_TO_RESET: f32 = 3.0;

    /// Player defaults (world units)
    pub const PLAYER_RADIUS: f32 = 0.25;
    pub const PLAYER_MOVE_SPEED: f32 = 5.0;
    pub const ARRIVE_EPSILON: f32 = 0.01;

    /// Key pickup radius
    pub const KEY_PICKUP_RADIUS: f32 = 0.4;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Heading angle of the direction from `from` to `to` (radians)
#[inline]
pub fn heading(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    normalize_angle(d.y.atan2(d.x))
}

/// Move `from` toward `to` by at most `max_step`, never overshooting
#[inline]
pub fn step_towards(from: Vec2, to: Vec2, max_step: f32) -> Vec2 {
    let delta = to - from;
    let dist = delta.length();
    if dist <= max_step || dist <= f32::EPSILON {
        to
    } else {
        from + delta / dist * max_step
    }
}

/// Convert a duration in seconds to a whole number of fixed ticks (at least one)
#[inline]
pub fn secs_to_ticks(secs: f32, dt: f32) -> u64 {
    if secs <= 0.0 {
        return 0;
    }
    ((secs / dt).round() as u64).max(1)
}
