//! Error types for level loading and configuration.

use std::path::PathBuf;

use thiserror::Error;

use crate::sim::ConnectorId;

/// Problems with a level definition, reported to the level loader.
#[derive(Debug, Error, PartialEq)]
pub enum LevelError {
    /// No connector is marked as the door
    #[error("level {level} has no door connector")]
    MissingDoor { level: u32 },

    /// Two connectors share an identifier
    #[error("level {level} defines connector {id} more than once")]
    DuplicateConnector { level: u32, id: ConnectorId },

    /// The level has no keys and does not opt into keyless completion
    #[error("level {level} has no keys; set allow_keyless to permit this")]
    NoKeys { level: u32 },

    /// Retraction timings must be positive
    #[error("connector {id} has invalid retraction timing ({field} = {value})")]
    InvalidTiming {
        id: ConnectorId,
        field: &'static str,
        value: f32,
    },

    /// Position is NaN or infinite
    #[error("{what} has a non-finite position")]
    NonFinitePosition { what: String },

    /// Hazard track is empty
    #[error("hazard {index} has no waypoints")]
    EmptyHazardTrack { index: usize },

    /// Hazard radius, speed or dwell is negative or not finite
    #[error("hazard {index} has invalid {field} ({value})")]
    InvalidHazard {
        index: usize,
        field: &'static str,
        value: f32,
    },
}

/// Failures reading or writing settings and save data.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a read error for `path`.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a write error for `path`.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
