//! Game settings and tuning
//!
//! Loaded from a JSON file next to the save data. Missing fields fall back
//! to defaults so older settings files keep working.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;

/// What happens to the last node of a path once the player lands on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TerminalPolicy {
    /// Keep it as the targeted terminal so the tether stays visible
    #[default]
    Retain,
    /// Pop it like every other node, leaving the path empty
    Pop,
}

impl TerminalPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalPolicy::Retain => "Retain",
            TerminalPolicy::Pop => "Pop",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "retain" | "keep" => Some(TerminalPolicy::Retain),
            "pop" | "remove" => Some(TerminalPolicy::Pop),
            _ => None,
        }
    }
}

/// Tuning values and policy switches for the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Path policy ===
    /// A connector may appear at most once in the path
    pub single_connection_mode: bool,
    /// Whether the last node is kept after arrival
    pub terminal_policy: TerminalPolicy,

    // === Traversal ===
    /// Player speed along the tether (units/sec)
    pub move_speed: f32,
    /// Distance at which the player counts as arrived
    pub arrive_epsilon: f32,
    /// Pause between consecutive nodes (seconds)
    pub inter_node_delay: f32,
    /// Collision radius of the player
    pub player_radius: f32,
    /// Distance at which keys are picked up
    pub key_pickup_radius: f32,

    // === Sequences ===
    /// Death shrink + reposition duration (seconds)
    pub respawn_duration: f32,
    /// Hazard immunity after respawning (seconds)
    pub invulnerability: f32,
    /// Door-open choreography before completion is reported (seconds)
    pub door_open_delay: f32,
    /// Fade-in before the level accepts input (seconds)
    pub ready_delay: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            single_connection_mode: true,
            terminal_policy: TerminalPolicy::Retain,

            move_speed: PLAYER_MOVE_SPEED,
            arrive_epsilon: ARRIVE_EPSILON,
            inter_node_delay: 0.15,
            player_radius: PLAYER_RADIUS,
            key_pickup_radius: KEY_PICKUP_RADIUS,

            respawn_duration: 1.0,
            invulnerability: 0.5,
            door_open_delay: 0.25,
            ready_delay: 1.0,
        }
    }
}

impl Settings {
    /// Settings with no fades or pauses, for scripted runs
    pub fn instant() -> Self {
        Self {
            inter_node_delay: 0.0,
            door_open_delay: 0.0,
            ready_delay: 0.0,
            ..Self::default()
        }
    }

    /// Parse settings from JSON
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read settings from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Read settings, falling back to defaults if the file is absent or broken
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Using default settings: {e}");
                Self::default()
            }
        }
    }

    /// Write settings to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| ConfigError::write(path, e))?;
        log::info!("Settings saved");
        Ok(())
    }
}
