//! The tether path: an ordered chain of connector references
//!
//! All edits are expressed by identity (append, truncate-from,
//! truncate-after, pop-head), never by index arithmetic.

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::connector::{Connector, ConnectorId, ConnectorRole, lookup};
use super::obstacle::{ObstacleQuery, line_of_sight};

/// What a selection did to the path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Connector added as the new terminal
    Appended,
    /// The terminal was selected again: the player should move
    Commit,
    /// Path cut back so the connector is the terminal again
    Truncated { removed: Vec<ConnectorId> },
    /// Nothing changed
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Obstacle between the path end and the connector
    Blocked,
    /// Unknown or retracted connector
    Unavailable,
    /// Input is not accepted right now (loading, moving, dead, paused)
    Locked,
    /// The path ends on a door; doors have no outgoing links
    DeadEnd,
}

/// Everything a selection needs to look at besides the path itself
pub struct SelectContext<'a> {
    pub connectors: &'a [Connector],
    /// Origin of the chain when the path is empty
    pub player_pos: Vec2,
    pub obstacles: &'a dyn ObstacleQuery,
}

/// Ordered chain of connectors the player will traverse
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TetherPath {
    nodes: VecDeque<ConnectorId>,
    /// A connector may appear at most once
    pub single_connection_mode: bool,
}

impl TetherPath {
    pub fn new(single_connection_mode: bool) -> Self {
        Self {
            nodes: VecDeque::new(),
            single_connection_mode,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Next node to travel to
    pub fn head(&self) -> Option<ConnectorId> {
        self.nodes.front().copied()
    }

    /// Terminal (targeted) node
    pub fn last(&self) -> Option<ConnectorId> {
        self.nodes.back().copied()
    }

    pub fn contains(&self, id: ConnectorId) -> bool {
        self.nodes.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = ConnectorId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<ConnectorId> {
        self.iter().collect()
    }

    /// Add a connector to the end, no validation
    pub fn push(&mut self, id: ConnectorId) {
        self.nodes.push_back(id);
    }

    /// Consume the head node
    pub fn pop_head(&mut self) -> Option<ConnectorId> {
        self.nodes.pop_front()
    }

    /// Remove everything, returning what was removed in order
    pub fn clear(&mut self) -> Vec<ConnectorId> {
        self.nodes.drain(..).collect()
    }

    /// Remove `id` and every node after it. Empty if `id` is absent.
    pub fn truncate_from(&mut self, id: ConnectorId) -> Vec<ConnectorId> {
        match self.nodes.iter().position(|n| *n == id) {
            Some(index) => self.nodes.drain(index..).collect(),
            None => Vec::new(),
        }
    }

    /// Remove every node after `id`, keeping `id` as the terminal
    pub fn truncate_after(&mut self, id: ConnectorId) -> Vec<ConnectorId> {
        match self.nodes.iter().position(|n| *n == id) {
            Some(index) => self.nodes.drain(index + 1..).collect(),
            None => Vec::new(),
        }
    }

    /// Handle a click on a connector
    pub fn select(&mut self, id: ConnectorId, ctx: &SelectContext<'_>) -> SelectOutcome {
        let Some(target) = lookup(ctx.connectors, id) else {
            return SelectOutcome::Rejected(RejectReason::Unavailable);
        };
        if target.is_retracted() {
            return SelectOutcome::Rejected(RejectReason::Unavailable);
        }

        if self.last() == Some(id) {
            return SelectOutcome::Commit;
        }

        if self.single_connection_mode && self.contains(id) {
            return SelectOutcome::Truncated {
                removed: self.truncate_after(id),
            };
        }

        let last = self.last().and_then(|last| lookup(ctx.connectors, last));
        if last.is_some_and(|c| c.is_door) {
            return SelectOutcome::Rejected(RejectReason::DeadEnd);
        }
        let origin = last.map(|c| c.pos).unwrap_or(ctx.player_pos);

        if !line_of_sight(ctx.obstacles, origin, target.pos) {
            return SelectOutcome::Rejected(RejectReason::Blocked);
        }

        self.push(id);
        SelectOutcome::Appended
    }

    /// Remove a connector and everything after it. Idempotent.
    pub fn deselect(&mut self, id: ConnectorId) -> Vec<ConnectorId> {
        self.truncate_from(id)
    }

    /// Role of `id` given the connector the player currently rests on
    pub fn role_of(&self, id: ConnectorId, resting: Option<ConnectorId>) -> ConnectorRole {
        if self.last() == Some(id) {
            ConnectorRole::Targeted
        } else if self.contains(id) {
            ConnectorRole::Tethered
        } else if resting == Some(id) {
            if self.is_empty() {
                ConnectorRole::Targeted
            } else {
                ConnectorRole::Tethered
            }
        } else {
            ConnectorRole::Disconnected
        }
    }
}
