//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (connectors sorted by ID)
//! - No rendering or platform dependencies

pub mod autoplay;
pub mod clock;
pub mod connector;
pub mod gate;
pub mod hazard;
pub mod level;
pub mod obstacle;
pub mod path;
pub mod player;
pub mod state;
pub mod tick;

pub use autoplay::Autoplay;
pub use clock::{SimulationClock, Timer, TimerStatus};
pub use connector::{Connector, ConnectorId, ConnectorKind, ConnectorRole, RetractState};
pub use gate::{CompletionGate, Key};
pub use hazard::{Hazard, MovementType};
pub use level::{ConnectorDef, HazardDef, LevelDef, generate};
pub use obstacle::{NoObstacles, Obstacle, ObstacleMask, ObstacleQuery, line_of_sight};
pub use path::{RejectReason, SelectOutcome, TetherPath};
pub use player::{Facing, MovementState, PlayerAgent};
pub use state::{CompletionReport, DeathCause, GameEvent, GameState, LevelPhase};
pub use tick::{TickInput, run_frame, tick};
