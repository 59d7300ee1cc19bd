//! Simulation clock and generation-tagged timers
//!
//! Every wait in the simulation is a [`Timer`] scheduled against the clock.
//! A timer remembers the generation it was created under; bumping the
//! generation (level restart, player death) turns every older timer stale.

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};
use crate::secs_to_ticks;

/// Monotonic tick source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationClock {
    /// Fixed timestep (seconds)
    dt: f32,
    /// Ticks elapsed since the level started
    tick: u64,
    /// Bumped on every reset; older timers become stale
    generation: u64,
    /// Unconsumed frame time
    #[serde(skip)]
    accumulator: f32,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(SIM_DT)
    }
}

/// A pending wait, due at a fixed tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    generation: u64,
    due_tick: u64,
}

/// Result of polling a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Pending,
    Due,
    /// Created under an older generation; must be discarded
    Stale,
}

impl SimulationClock {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            tick: 0,
            generation: 0,
            accumulator: 0.0,
        }
    }

    #[inline]
    pub fn dt(&self) -> f32 {
        self.dt
    }

    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Elapsed simulated time in seconds
    pub fn now_secs(&self) -> f64 {
        self.tick as f64 * self.dt as f64
    }

    /// Advance by one fixed step
    pub fn advance(&mut self) {
        self.tick += 1;
    }

    /// Invalidate every outstanding timer. Returns the new generation.
    pub fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Schedule a timer `secs` from now under the current generation
    pub fn schedule(&self, secs: f32) -> Timer {
        Timer {
            generation: self.generation,
            due_tick: self.tick + secs_to_ticks(secs, self.dt),
        }
    }

    /// Poll a timer against the current tick and generation
    pub fn poll(&self, timer: &Timer) -> TimerStatus {
        if timer.generation != self.generation {
            TimerStatus::Stale
        } else if self.tick >= timer.due_tick {
            TimerStatus::Due
        } else {
            TimerStatus::Pending
        }
    }

    /// Carry a timer into the current generation, keeping its due tick
    pub fn adopt(&self, timer: Timer) -> Timer {
        Timer {
            generation: self.generation,
            ..timer
        }
    }

    /// Fraction of the wait already elapsed, for timers started `total_secs` before due
    pub fn progress(&self, timer: &Timer, total_secs: f32) -> f32 {
        let total = secs_to_ticks(total_secs, self.dt);
        if total == 0 {
            return 1.0;
        }
        let remaining = timer.due_tick.saturating_sub(self.tick);
        1.0 - (remaining as f32 / total as f32).clamp(0.0, 1.0)
    }

    /// Accumulate frame time and return how many fixed steps to run
    pub fn substeps_for(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.min(MAX_FRAME_DT);

        let mut substeps = 0;
        while self.accumulator >= self.dt && substeps < MAX_SUBSTEPS {
            self.accumulator -= self.dt;
            substeps += 1;
        }
        substeps
    }
}

impl Timer {
    #[inline]
    pub fn due_tick(&self) -> u64 {
        self.due_tick
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
