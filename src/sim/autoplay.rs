//! Demo/idle mode: a seeded agent that plays the level
//!
//! Produces the same `TickInput`s a player would. It is deliberately not
//! clever: head for the nearest uncollected key, then the door, with some
//! random wandering mixed in.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::connector::{ConnectorId, RetractState};
use super::state::GameState;
use super::tick::TickInput;

/// Ticks to wait between decisions
const THINK_TICKS: std::ops::Range<u32> = 10..40;
/// Chance of heading straight for the goal instead of wandering
const FOCUS_CHANCE: f64 = 0.7;
/// Chance of committing a path that does not end on an open door
const COMMIT_CHANCE: f64 = 0.5;

pub struct Autoplay {
    rng: Pcg32,
    cooldown: u32,
}

impl Autoplay {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            cooldown: 0,
        }
    }

    /// Decide what to press this tick
    pub fn next_input(&mut self, state: &GameState) -> TickInput {
        if self.cooldown > 0 {
            self.cooldown -= 1;
            return TickInput::default();
        }
        if !state.accepts_input() {
            return TickInput::default();
        }
        self.cooldown = self.rng.random_range(THINK_TICKS);

        let keys_done = state.keys.iter().all(|k| k.collected);
        let ends_on_door = state
            .path
            .last()
            .and_then(|id| state.connector(id))
            .is_some_and(|c| c.is_door);
        // A lone terminal we are already resting on is not worth a move
        let resting_only = state.path.len() == 1 && state.path.last() == state.player.current_connector;

        if ends_on_door {
            if keys_done || !resting_only {
                return commit();
            }
            // Stuck on a locked door; start a fresh chain from here
            return TickInput {
                clear: true,
                ..Default::default()
            };
        }

        if !state.path.is_empty() && !resting_only && self.rng.random_bool(COMMIT_CHANCE) {
            return commit();
        }

        let candidates = self.candidates(state);
        if candidates.is_empty() {
            return if state.path.is_empty() || resting_only {
                TickInput::default()
            } else {
                commit()
            };
        }

        let goal = self.goal(state, keys_done);
        let pick = match goal {
            Some(goal) if keys_done || self.rng.random_bool(FOCUS_CHANCE) => candidates
                .iter()
                .min_by(|a, b| a.1.distance(goal).total_cmp(&b.1.distance(goal)))
                .map(|c| c.0),
            _ => Some(candidates[self.rng.random_range(0..candidates.len())].0),
        };

        TickInput {
            select: pick,
            ..Default::default()
        }
    }

    /// Usable connectors not yet in the path with a clear line from its end
    fn candidates(&self, state: &GameState) -> Vec<(ConnectorId, Vec2)> {
        let origin = state.path_origin();
        state
            .connectors
            .iter()
            .filter(|c| c.retract_state() == RetractState::Idle)
            .filter(|c| !state.path.contains(c.id))
            .filter(|c| Some(c.id) != state.player.current_connector || state.path.is_empty())
            .filter(|c| state.line_of_sight(origin, c.pos))
            .map(|c| (c.id, c.pos))
            .collect()
    }

    fn goal(&self, state: &GameState, keys_done: bool) -> Option<Vec2> {
        if keys_done {
            state.connectors.iter().find(|c| c.is_door).map(|c| c.pos)
        } else {
            let pos = state.player.pos;
            state
                .keys
                .iter()
                .filter(|k| !k.collected)
                .map(|k| k.pos)
                .min_by(|a, b| a.distance(pos).total_cmp(&b.distance(pos)))
        }
    }
}

fn commit() -> TickInput {
    TickInput {
        commit: true,
        ..Default::default()
    }
}
