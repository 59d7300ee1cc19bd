//! Level definitions
//!
//! A level is plain data: connectors, keys, obstacles and hazards. The
//! loader hands a validated [`LevelDef`] to `GameState::new`; restarting a
//! level rebuilds every entity from the same definition.

use std::collections::HashSet;
use std::path::Path;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::connector::{Connector, ConnectorId, ConnectorKind};
use super::gate::Key;
use super::hazard::{Hazard, MovementType};
use super::obstacle::{Obstacle, ObstacleMask};
use crate::consts::{DEFAULT_TIME_TO_RESET, DEFAULT_TIME_TO_RETRACT};
use crate::error::{ConfigError, LevelError};

fn default_time_to_retract() -> f32 {
    DEFAULT_TIME_TO_RETRACT
}

fn default_time_to_reset() -> f32 {
    DEFAULT_TIME_TO_RESET
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorDef {
    pub id: ConnectorId,
    pub pos: Vec2,
    #[serde(default)]
    pub kind: ConnectorKind,
    #[serde(default)]
    pub door: bool,
    #[serde(default = "default_time_to_retract")]
    pub time_to_retract: f32,
    #[serde(default = "default_time_to_reset")]
    pub time_to_reset: f32,
}

impl ConnectorDef {
    pub fn normal(id: u32, x: f32, y: f32) -> Self {
        Self {
            id: ConnectorId(id),
            pos: Vec2::new(x, y),
            kind: ConnectorKind::Normal,
            door: false,
            time_to_retract: DEFAULT_TIME_TO_RETRACT,
            time_to_reset: DEFAULT_TIME_TO_RESET,
        }
    }

    pub fn retractable(id: u32, x: f32, y: f32, time_to_retract: f32, time_to_reset: f32) -> Self {
        Self {
            kind: ConnectorKind::Retractable,
            time_to_retract,
            time_to_reset,
            ..Self::normal(id, x, y)
        }
    }

    pub fn door(id: u32, x: f32, y: f32) -> Self {
        Self {
            door: true,
            ..Self::normal(id, x, y)
        }
    }

    fn build(&self) -> Connector {
        let mut c = Connector::new(self.id, self.pos);
        c.kind = self.kind;
        c.is_door = self.door;
        c.time_to_retract = self.time_to_retract;
        c.time_to_reset = self.time_to_reset;
        c
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardDef {
    pub track: Vec<Vec2>,
    pub radius: f32,
    #[serde(default)]
    pub movement: MovementType,
    pub speed: f32,
    #[serde(default)]
    pub dwell: f32,
}

/// Everything the loader supplies for one level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDef {
    pub number: u32,
    /// Moves allowed for a perfect score
    #[serde(default)]
    pub par_moves: u32,
    #[serde(default)]
    pub spawn: Vec2,
    pub connectors: Vec<ConnectorDef>,
    #[serde(default)]
    pub keys: Vec<Vec2>,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    #[serde(default)]
    pub hazards: Vec<HazardDef>,
    /// Permit a level with no keys (the door is always open)
    #[serde(default)]
    pub allow_keyless: bool,
}

impl LevelDef {
    /// Parse a level from JSON (not yet validated)
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a level file (not yet validated)
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
        Self::from_json(&json)
    }

    /// Check the level for configuration errors
    pub fn validate(&self) -> Result<(), LevelError> {
        let level = self.number;

        if !self.spawn.is_finite() {
            return Err(LevelError::NonFinitePosition {
                what: "spawn".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for c in &self.connectors {
            if !seen.insert(c.id) {
                return Err(LevelError::DuplicateConnector { level, id: c.id });
            }
            if !c.pos.is_finite() {
                return Err(LevelError::NonFinitePosition {
                    what: format!("connector {}", c.id),
                });
            }
            if c.kind == ConnectorKind::Retractable {
                if c.time_to_retract.is_nan() || c.time_to_retract <= 0.0 {
                    return Err(LevelError::InvalidTiming {
                        id: c.id,
                        field: "time_to_retract",
                        value: c.time_to_retract,
                    });
                }
                if c.time_to_reset.is_nan() || c.time_to_reset <= 0.0 {
                    return Err(LevelError::InvalidTiming {
                        id: c.id,
                        field: "time_to_reset",
                        value: c.time_to_reset,
                    });
                }
            }
        }

        if !self.connectors.iter().any(|c| c.door) {
            return Err(LevelError::MissingDoor { level });
        }

        if self.keys.is_empty() && !self.allow_keyless {
            return Err(LevelError::NoKeys { level });
        }
        if let Some(i) = self.keys.iter().position(|k| !k.is_finite()) {
            return Err(LevelError::NonFinitePosition {
                what: format!("key {i}"),
            });
        }

        for (index, h) in self.hazards.iter().enumerate() {
            if h.track.is_empty() {
                return Err(LevelError::EmptyHazardTrack { index });
            }
            if h.track.iter().any(|p| !p.is_finite()) {
                return Err(LevelError::NonFinitePosition {
                    what: format!("hazard {index} waypoint"),
                });
            }
            let checks = [
                ("radius", h.radius, h.radius > 0.0),
                ("speed", h.speed, h.speed >= 0.0),
                ("dwell", h.dwell, h.dwell >= 0.0),
            ];
            for (field, value, ok) in checks {
                if !ok || !value.is_finite() {
                    return Err(LevelError::InvalidHazard { index, field, value });
                }
            }
        }

        Ok(())
    }

    pub fn build_connectors(&self) -> Vec<Connector> {
        let mut connectors: Vec<Connector> = self.connectors.iter().map(ConnectorDef::build).collect();
        connectors.sort_by_key(|c| c.id);
        connectors
    }

    pub fn build_keys(&self) -> Vec<Key> {
        self.keys.iter().copied().map(Key::new).collect()
    }

    pub fn build_hazards(&self) -> Vec<Hazard> {
        self.hazards
            .iter()
            .map(|h| Hazard::new(h.track.clone(), h.radius, h.movement, h.speed, h.dwell))
            .collect()
    }

    pub fn obstacle_mask(&self) -> ObstacleMask {
        ObstacleMask::new(self.obstacles.clone())
    }
}

/// Build a procedural level from a seed.
///
/// Connectors sit on a jittered grid of three rows running right from the
/// spawn point, with the door past the last column. One key rides on a
/// connector in the middle of the grid so any route through it collects it.
pub fn generate(seed: u64, number: u32) -> LevelDef {
    let mut rng = Pcg32::seed_from_u64(seed);

    let columns = 3 + (number.min(6) as usize);
    let rows = [-2.0_f32, 0.0, 2.0];
    let retract_chance = (0.1 + number as f64 * 0.05).min(0.4);

    let mut connectors = Vec::new();
    let mut next_id = 1;
    for col in 0..columns {
        let x = 2.0 + col as f32 * 2.0;
        for &y in &rows {
            let jitter = Vec2::new(rng.random_range(-0.3..0.3), rng.random_range(-0.3..0.3));
            let pos = Vec2::new(x, y) + jitter;
            let def = if col > 0 && rng.random_bool(retract_chance) {
                ConnectorDef::retractable(next_id, pos.x, pos.y, rng.random_range(1.0..2.5), 3.0)
            } else {
                ConnectorDef::normal(next_id, pos.x, pos.y)
            };
            connectors.push(def);
            next_id += 1;
        }
    }
    let door_x = 2.0 + columns as f32 * 2.0;
    connectors.push(ConnectorDef::door(next_id, door_x, 0.0));

    // Key sits on a normal connector in a middle column
    let key_col = columns / 2;
    let key_row = rng.random_range(0..rows.len());
    let key_index = key_col * rows.len() + key_row;
    connectors[key_index].kind = ConnectorKind::Normal;
    let key = connectors[key_index].pos;

    // A wall blocking one row between two columns
    let wall_col = rng.random_range(0..columns.saturating_sub(1).max(1));
    let wall_row = rows[rng.random_range(0..rows.len())];
    let wall_x = 3.0 + wall_col as f32 * 2.0;
    let obstacles = vec![Obstacle::Rect {
        min: Vec2::new(wall_x - 0.2, wall_row - 0.6),
        max: Vec2::new(wall_x + 0.2, wall_row + 0.6),
    }];

    let hazards = if number >= 3 {
        let hx = 3.0 + rng.random_range(1..columns) as f32 * 2.0;
        vec![HazardDef {
            track: vec![Vec2::new(hx, -3.0), Vec2::new(hx, 3.0)],
            radius: 0.3,
            movement: MovementType::PingPong,
            speed: 1.5,
            dwell: 0.5,
        }]
    } else {
        Vec::new()
    };

    LevelDef {
        number,
        par_moves: 3,
        spawn: Vec2::ZERO,
        connectors,
        keys: vec![key],
        obstacles,
        hazards,
        allow_keyless: false,
    }
}
