//! Game state and the operations input drives
//!
//! `GameState` owns every entity of the running level. Presentation code
//! reads it and drains [`GameEvent`]s; it never mutates it directly.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::clock::{SimulationClock, Timer};
use super::connector::{Connector, ConnectorId, ConnectorRole, lookup};
use super::gate::Key;
use super::hazard::Hazard;
use super::level::LevelDef;
use super::obstacle::{ObstacleQuery, line_of_sight};
use super::path::{RejectReason, SelectContext, SelectOutcome, TetherPath};
use super::player::PlayerAgent;
use crate::error::LevelError;
use crate::settings::Settings;

/// Level lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LevelPhase {
    /// Fading in; input is not accepted yet
    Loading { ready: Timer },
    /// Normal play
    Ready,
    /// Door is opening; edits are frozen
    Completing { door: ConnectorId, done: Timer },
    /// Report emitted; waiting for the next level
    Completed,
}

/// Why the player died
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    /// Touched a moving hazard
    Hazard,
    /// Was resting on a connector as it retracted
    Retracted(ConnectorId),
    /// Destination retracted before arrival
    RetractedInTransit(ConnectorId),
}

/// Result handed to the persistence collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub level: u32,
    pub total_moves: u32,
    pub par_moves: u32,
}

impl CompletionReport {
    pub fn perfect(&self) -> bool {
        self.total_moves <= self.par_moves
    }
}

/// State-change notifications for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    LevelReady,
    LevelRestarted,
    /// Connector appended to the path
    Connected(ConnectorId),
    RoleChanged {
        id: ConnectorId,
        role: ConnectorRole,
    },
    ConnectorRetracting(ConnectorId),
    ConnectorRetracted(ConnectorId),
    ConnectorReset(ConnectorId),
    PlayerStartedMoving,
    PlayerArrived(ConnectorId),
    KeyCollected(usize),
    PlayerDied(DeathCause),
    PlayerRespawned,
    DoorOpening(ConnectorId),
    LevelCompleted(CompletionReport),
}

/// Complete state of one running level
pub struct GameState {
    pub level: LevelDef,
    pub settings: Settings,
    pub clock: SimulationClock,
    pub phase: LevelPhase,
    pub paused: bool,
    /// Sorted by id
    pub connectors: Vec<Connector>,
    pub path: TetherPath,
    pub player: PlayerAgent,
    pub keys: Vec<Key>,
    pub hazards: Vec<Hazard>,
    obstacles: Box<dyn ObstacleQuery>,
    events: Vec<GameEvent>,
    report: Option<CompletionReport>,
}

impl GameState {
    /// Validate `level` and spawn everything in it
    pub fn new(level: LevelDef, settings: Settings) -> Result<Self, LevelError> {
        level.validate()?;

        let clock = SimulationClock::default();
        let ready = clock.schedule(settings.ready_delay);
        let obstacles: Box<dyn ObstacleQuery> = Box::new(level.obstacle_mask());

        log::info!(
            "Level {} loaded: {} connectors, {} keys, {} hazards",
            level.number,
            level.connectors.len(),
            level.keys.len(),
            level.hazards.len()
        );

        Ok(Self {
            connectors: level.build_connectors(),
            keys: level.build_keys(),
            hazards: level.build_hazards(),
            player: PlayerAgent::new(level.spawn),
            path: TetherPath::new(settings.single_connection_mode),
            phase: LevelPhase::Loading { ready },
            paused: false,
            clock,
            obstacles,
            events: Vec::new(),
            report: None,
            level,
            settings,
        })
    }

    /// Replace the level's own obstacle mask with an external collaborator
    pub fn with_obstacle_query(mut self, query: impl ObstacleQuery + 'static) -> Self {
        self.obstacles = Box::new(query);
        self
    }

    /// Restart the level from its definition
    pub fn restart(&mut self) {
        self.clock.bump_generation();
        self.connectors = self.level.build_connectors();
        self.keys = self.level.build_keys();
        self.hazards = self.level.build_hazards();
        self.path.clear();
        self.player.reset();
        self.paused = false;
        self.report = None;
        self.phase = LevelPhase::Loading {
            ready: self.clock.schedule(self.settings.ready_delay),
        };
        self.push_event(GameEvent::LevelRestarted);
        log::info!("Level {} restarted", self.level.number);
    }

    /// Loader signal: gameplay may begin now
    pub fn mark_ready(&mut self) {
        if matches!(self.phase, LevelPhase::Loading { .. }) {
            self.phase = LevelPhase::Ready;
            self.push_event(GameEvent::LevelReady);
            log::info!("Level {} ready", self.level.number);
        }
    }

    /// True when selection and commits are legal
    pub fn accepts_input(&self) -> bool {
        self.phase == LevelPhase::Ready && !self.paused && self.player.is_idle()
    }

    pub fn is_completed(&self) -> bool {
        self.phase == LevelPhase::Completed
    }

    pub fn completion_report(&self) -> Option<&CompletionReport> {
        self.report.as_ref()
    }

    pub fn connector(&self, id: ConnectorId) -> Option<&Connector> {
        lookup(&self.connectors, id)
    }

    /// Line-of-sight check through the active obstacle query
    pub fn line_of_sight(&self, a: Vec2, b: Vec2) -> bool {
        line_of_sight(self.obstacles.as_ref(), a, b)
    }

    /// Where a newly selected connector would be linked from
    pub fn path_origin(&self) -> Vec2 {
        self.path
            .last()
            .and_then(|id| self.connector(id))
            .map(|c| c.pos)
            .unwrap_or(self.player.pos)
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Take all pending notifications
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Click on a connector
    pub fn select(&mut self, id: ConnectorId) -> SelectOutcome {
        if !self.accepts_input() {
            log::debug!("Selection of {id} ignored: input locked");
            return SelectOutcome::Rejected(RejectReason::Locked);
        }

        let ctx = SelectContext {
            connectors: &self.connectors,
            player_pos: self.player.pos,
            obstacles: self.obstacles.as_ref(),
        };
        let outcome = self.path.select(id, &ctx);

        match &outcome {
            SelectOutcome::Appended => {
                self.push_event(GameEvent::Connected(id));
                self.reconcile_roles();
            }
            SelectOutcome::Truncated { .. } => self.reconcile_roles(),
            SelectOutcome::Commit => {
                self.commit_move();
            }
            SelectOutcome::Rejected(reason) => {
                log::debug!("Selection of {id} rejected: {reason:?}");
            }
        }
        outcome
    }

    /// Remove a connector and everything after it from the path
    pub fn deselect(&mut self, id: ConnectorId) -> Vec<ConnectorId> {
        let removed = self.path.deselect(id);
        self.reconcile_roles();
        removed
    }

    /// Drop the whole path
    pub fn clear_path(&mut self) {
        if !self.accepts_input() {
            return;
        }
        self.path.clear();
        self.reconcile_roles();
    }

    /// Start travelling along the path. Returns false if nothing happened.
    pub fn commit_move(&mut self) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let Some(head) = self.path.head() else {
            return false;
        };
        // Already resting on the only node: nothing to travel
        if self.path.len() == 1 && self.player.current_connector == Some(head) {
            log::debug!("Commit ignored: already resting on {head}");
            return false;
        }
        self.player.begin_move(head, &self.clock);
        self.push_event(GameEvent::PlayerStartedMoving);
        log::debug!(
            "Move {} along {} nodes",
            self.player.total_moves,
            self.path.len()
        );
        true
    }

    /// Kill the player and reset everything that belongs to this life
    pub fn kill_player(&mut self, cause: DeathCause) {
        if self.player.is_dead()
            || matches!(
                self.phase,
                LevelPhase::Completing { .. } | LevelPhase::Completed
            )
        {
            return;
        }

        self.clock.bump_generation();
        let mut forced = Vec::new();
        for c in &mut self.connectors {
            if c.on_player_death(&self.clock) {
                forced.push(c.id);
            }
        }
        for id in forced {
            self.push_event(GameEvent::ConnectorReset(id));
        }

        self.path.clear();
        for key in &mut self.keys {
            key.collected = false;
        }
        self.player.die(&self.clock, self.settings.respawn_duration);
        self.push_event(GameEvent::PlayerDied(cause));
        self.reconcile_roles();
        log::info!("Player died: {cause:?}");
    }

    /// Recompute every connector's role and emit changes
    pub fn reconcile_roles(&mut self) {
        let resting = self.player.current_connector;
        let mut changed = Vec::new();
        for c in &mut self.connectors {
            let role = self.path.role_of(c.id, resting);
            if c.role != role {
                c.role = role;
                changed.push(GameEvent::RoleChanged { id: c.id, role });
            }
        }
        self.events.extend(changed);
    }

    pub(crate) fn finish(&mut self) {
        let report = CompletionReport {
            level: self.level.number,
            total_moves: self.player.total_moves,
            par_moves: self.level.par_moves,
        };
        self.report = Some(report);
        self.phase = LevelPhase::Completed;
        self.push_event(GameEvent::LevelCompleted(report));
        log::info!(
            "Level {} completed in {} moves (par {}){}",
            report.level,
            report.total_moves,
            report.par_moves,
            if report.perfect() { " - perfect!" } else { "" }
        );
    }
}
