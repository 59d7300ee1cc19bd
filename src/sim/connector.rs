//! Connectors: the anchor points a player tethers to
//!
//! Retractable connectors run a small timed cycle once the player lands on
//! them: `Idle -> Retracting -> Retracted -> Idle`. The cycle is driven by
//! [`Connector::update`] from the main tick; nothing else advances it.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::clock::{SimulationClock, Timer, TimerStatus};
use crate::consts::{DEFAULT_TIME_TO_RESET, DEFAULT_TIME_TO_RETRACT};

/// Stable connector identity, unique within a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorId(pub u32);

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Connector types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectorKind {
    #[default]
    Normal,
    /// Breaks a while after being landed on, then grows back
    Retractable,
}

/// Retraction cycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RetractState {
    #[default]
    Idle,
    Retracting,
    Retracted,
}

/// Presentation role, recomputed after every path mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectorRole {
    #[default]
    Disconnected,
    /// In the path, but not the last node
    Tethered,
    /// Last node of the path (the next commit destination)
    Targeted,
}

/// A transition produced by [`Connector::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetractTransition {
    /// Just became unusable; paths must drop it, an occupant dies
    Retracted,
    /// Usable again
    Reset,
}

/// An anchor entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connector {
    pub id: ConnectorId,
    /// Where the player anchors to
    pub pos: Vec2,
    pub kind: ConnectorKind,
    pub is_door: bool,
    /// Seconds between landing and retracting
    pub time_to_retract: f32,
    /// Seconds spent retracted before resetting
    pub time_to_reset: f32,
    pub role: ConnectorRole,
    state: RetractState,
    timer: Option<Timer>,
}

impl Connector {
    pub fn new(id: ConnectorId, pos: Vec2) -> Self {
        Self {
            id,
            pos,
            kind: ConnectorKind::Normal,
            is_door: false,
            time_to_retract: DEFAULT_TIME_TO_RETRACT,
            time_to_reset: DEFAULT_TIME_TO_RESET,
            role: ConnectorRole::Disconnected,
            state: RetractState::Idle,
            timer: None,
        }
    }

    pub fn retractable(id: ConnectorId, pos: Vec2, time_to_retract: f32, time_to_reset: f32) -> Self {
        Self {
            kind: ConnectorKind::Retractable,
            time_to_retract,
            time_to_reset,
            ..Self::new(id, pos)
        }
    }

    pub fn door(id: ConnectorId, pos: Vec2) -> Self {
        Self {
            is_door: true,
            ..Self::new(id, pos)
        }
    }

    #[inline]
    pub fn retract_state(&self) -> RetractState {
        self.state
    }

    #[inline]
    pub fn is_retracted(&self) -> bool {
        self.state == RetractState::Retracted
    }

    /// True while a retraction or reset timer is pending
    pub fn has_active_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Generation of the pending timer, if any
    pub fn timer_generation(&self) -> Option<u64> {
        self.timer.map(|t| t.generation())
    }

    /// The player landed on this connector. Returns true if retraction started.
    pub fn land(&mut self, clock: &SimulationClock) -> bool {
        if self.kind != ConnectorKind::Retractable || self.state != RetractState::Idle {
            return false;
        }
        self.state = RetractState::Retracting;
        self.timer = Some(clock.schedule(self.time_to_retract));
        true
    }

    /// Advance the retraction cycle. Call once per tick.
    pub fn update(&mut self, clock: &SimulationClock) -> Option<RetractTransition> {
        let timer = self.timer?;
        match clock.poll(&timer) {
            TimerStatus::Pending => None,
            TimerStatus::Stale => {
                log::debug!("Connector {} discarded stale timer", self.id);
                self.force_idle();
                None
            }
            TimerStatus::Due => match self.state {
                RetractState::Retracting => {
                    self.state = RetractState::Retracted;
                    self.timer = Some(clock.schedule(self.time_to_reset));
                    Some(RetractTransition::Retracted)
                }
                RetractState::Retracted => {
                    self.force_idle();
                    Some(RetractTransition::Reset)
                }
                RetractState::Idle => {
                    self.timer = None;
                    None
                }
            },
        }
    }

    /// Drop any pending timer and return to `Idle` (level restart)
    pub fn force_idle(&mut self) {
        self.state = RetractState::Idle;
        self.timer = None;
    }

    /// Player death: cancel a retraction that still counts the player as
    /// connected, keep a visual reset that is already underway.
    ///
    /// Must be called after the clock's generation has been bumped.
    /// Returns true if the connector was forced back to `Idle`.
    pub fn on_player_death(&mut self, clock: &SimulationClock) -> bool {
        match self.state {
            RetractState::Idle => {
                self.timer = None;
                false
            }
            RetractState::Retracting => {
                self.force_idle();
                true
            }
            RetractState::Retracted => {
                self.timer = self.timer.map(|t| clock.adopt(t));
                false
            }
        }
    }
}

/// Find a connector by id
pub fn lookup(connectors: &[Connector], id: ConnectorId) -> Option<&Connector> {
    connectors.iter().find(|c| c.id == id)
}

pub fn lookup_mut(connectors: &mut [Connector], id: ConnectorId) -> Option<&mut Connector> {
    connectors.iter_mut().find(|c| c.id == id)
}
