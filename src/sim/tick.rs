//! Fixed timestep simulation tick
//!
//! Advances a [`GameState`] by exactly one `SIM_DT`. The order of the steps
//! below is part of the game rules: connector timers run before player
//! motion, so a retraction that expires on the tick the player would have
//! arrived kills the player.

use glam::Vec2;

use super::clock::TimerStatus;
use super::connector::{ConnectorId, RetractTransition, lookup_mut};
use super::gate::CompletionGate;
use super::player::{Movement, Traversal};
use super::state::{DeathCause, GameEvent, GameState, LevelPhase};
use crate::settings::TerminalPolicy;
use crate::step_towards;

/// Input commands for a single tick (one discrete event per press)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Connector clicked this tick
    pub select: Option<ConnectorId>,
    /// Start moving along the current path
    pub commit: bool,
    /// Drop the whole path (clicking the player)
    pub clear: bool,
    /// Pause toggle
    pub pause: bool,
}

impl TickInput {
    pub fn is_empty(&self) -> bool {
        self.select.is_none() && !self.commit && !self.clear && !self.pause
    }
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput) {
    // Handle pause toggle
    if input.pause && state.phase != LevelPhase::Completed {
        state.paused = !state.paused;
        log::info!("{}", if state.paused { "Paused" } else { "Resumed" });
    }

    // Nothing advances while paused or after completion
    if state.paused || state.phase == LevelPhase::Completed {
        return;
    }

    state.clock.advance();

    // Level fade-in
    if let LevelPhase::Loading { ready } = state.phase
        && state.clock.poll(&ready) != TimerStatus::Pending
    {
        state.mark_ready();
    }

    // Player input (each call checks whether input is accepted)
    if input.clear {
        state.clear_path();
    }
    if let Some(id) = input.select {
        state.select(id);
    }
    if input.commit {
        state.commit_move();
    }

    update_connectors(state);

    if matches!(state.phase, LevelPhase::Ready | LevelPhase::Completing { .. }) {
        for hazard in &mut state.hazards {
            hazard.update(&state.clock);
        }
    }

    update_player(state);
    check_hazard_contact(state);

    // Door choreography
    if let LevelPhase::Completing { done, .. } = state.phase
        && state.clock.poll(&done) != TimerStatus::Pending
    {
        state.finish();
    }
}

/// Feed one rendered frame into the simulation.
///
/// Runs as many fixed ticks as the clock's accumulator allows. One-shot
/// input is applied on the first tick only. Returns the number of ticks run;
/// when it is zero the input was not consumed and should be offered again.
pub fn run_frame(state: &mut GameState, input: &TickInput, frame_dt: f32) -> u32 {
    let substeps = state.clock.substeps_for(frame_dt);
    let idle = TickInput::default();
    for i in 0..substeps {
        tick(state, if i == 0 { input } else { &idle });
    }
    substeps
}

fn update_connectors(state: &mut GameState) {
    let mut transitions = Vec::new();
    for c in &mut state.connectors {
        if let Some(t) = c.update(&state.clock) {
            transitions.push((c.id, t));
        }
    }

    for (id, transition) in transitions {
        match transition {
            RetractTransition::Retracted => {
                log::debug!("Connector {id} retracted");
                state.push_event(GameEvent::ConnectorRetracted(id));
                state.deselect(id);
                if state.player.current_connector == Some(id) {
                    state.kill_player(DeathCause::Retracted(id));
                }
            }
            RetractTransition::Reset => {
                state.push_event(GameEvent::ConnectorReset(id));
            }
        }
    }
}

fn update_player(state: &mut GameState) {
    match state.player.movement {
        Movement::Idle => {}
        Movement::Dead { respawn } => {
            if state.clock.poll(&respawn) != TimerStatus::Pending {
                state
                    .player
                    .respawn(&state.clock, state.settings.invulnerability);
                state.push_event(GameEvent::PlayerRespawned);
                state.reconcile_roles();
                collect_keys(state);
            }
        }
        Movement::Moving(traversal) => step_traversal(state, traversal),
    }
}

fn step_traversal(state: &mut GameState, mut traversal: Traversal) {
    if traversal.generation != state.clock.generation() {
        log::debug!("Dropping traversal from an old generation");
        state.player.movement = Movement::Idle;
        return;
    }

    if let Some(delay) = traversal.delay {
        if state.clock.poll(&delay) == TimerStatus::Pending {
            return;
        }
        traversal.delay = None;
    }

    let target = traversal.target;
    let Some((anchor, retracted)) = state.connector(target).map(|c| (c.pos, c.is_retracted()))
    else {
        state.player.movement = Movement::Idle;
        return;
    };

    if retracted {
        state.kill_player(DeathCause::RetractedInTransit(target));
        return;
    }

    // Leaving a connector disconnects it
    if state
        .player
        .current_connector
        .is_some_and(|c| c != target)
    {
        state.player.current_connector = None;
        state.reconcile_roles();
    }

    state.player.face_towards(anchor);
    let next = step_towards(
        state.player.pos,
        anchor,
        state.settings.move_speed * state.clock.dt(),
    );
    if next != state.player.pos {
        traversal.moved = true;
    }
    state.player.pos = next;
    state.player.movement = Movement::Moving(traversal);

    collect_keys(state);

    if state.player.pos.distance(anchor) <= state.settings.arrive_epsilon {
        arrive(state, traversal, anchor);
    }
}

fn arrive(state: &mut GameState, traversal: Traversal, anchor: Vec2) {
    let id = traversal.target;
    state.player.pos = anchor;
    state.player.settle_facing(traversal.departure, anchor);
    state.player.current_connector = Some(id);
    state.push_event(GameEvent::PlayerArrived(id));

    let landed = lookup_mut(&mut state.connectors, id).is_some_and(|c| c.land(&state.clock));
    if landed {
        log::debug!("Connector {id} retracting");
        state.push_event(GameEvent::ConnectorRetracting(id));
    }

    let unlocked = state
        .connector(id)
        .is_some_and(|c| CompletionGate::evaluate(c, &state.keys));
    if unlocked {
        state.player.movement = Movement::Idle;
        state.phase = LevelPhase::Completing {
            door: id,
            done: state.clock.schedule(state.settings.door_open_delay),
        };
        state.push_event(GameEvent::DoorOpening(id));
        state.reconcile_roles();
        log::info!("Door {id} opening");
        return;
    }

    if state.path.head() != Some(id) {
        // Path was cut underneath us; rest here
        state.player.movement = Movement::Idle;
        state.reconcile_roles();
        return;
    }

    // A locked door is a dead end: the journey stops here
    if state.connector(id).is_some_and(|c| c.is_door) {
        let dropped = state.path.truncate_after(id);
        if !dropped.is_empty() {
            log::debug!("Door {id} is locked, dropping {} nodes past it", dropped.len());
        }
    }

    if state.path.len() == 1 {
        if state.settings.terminal_policy == TerminalPolicy::Pop {
            state.path.pop_head();
        }
        state.player.movement = Movement::Idle;
        state.reconcile_roles();
        return;
    }

    state.path.pop_head();
    state.reconcile_roles();

    let Some(next) = state.path.head() else {
        state.player.movement = Movement::Idle;
        return;
    };
    let delay_secs = state.settings.inter_node_delay;
    state.player.movement = Movement::Moving(Traversal {
        generation: traversal.generation,
        target: next,
        departure: anchor,
        moved: false,
        delay: (traversal.moved && delay_secs > 0.0).then(|| state.clock.schedule(delay_secs)),
    });
}

fn collect_keys(state: &mut GameState) {
    let pos = state.player.pos;
    let radius = state.settings.key_pickup_radius;
    let picked: Vec<usize> = state
        .keys
        .iter_mut()
        .enumerate()
        .filter_map(|(i, key)| key.try_collect(pos, radius).then_some(i))
        .collect();
    for i in picked {
        log::debug!("Key {i} collected");
        state.push_event(GameEvent::KeyCollected(i));
    }
}

fn check_hazard_contact(state: &mut GameState) {
    if state.phase != LevelPhase::Ready
        || state.player.is_dead()
        || state.player.is_invulnerable(&state.clock)
    {
        return;
    }
    let pos = state.player.pos;
    let radius = state.settings.player_radius;
    if state.hazards.iter().any(|h| h.touches(pos, radius)) {
        state.kill_player(DeathCause::Hazard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::settings::Settings;
    use crate::sim::connector::{ConnectorRole, RetractState};
    use crate::sim::hazard::MovementType;
    use crate::sim::level::{ConnectorDef, HazardDef, LevelDef};
    use crate::sim::obstacle::Obstacle;
    use crate::sim::path::{RejectReason, SelectOutcome};
    use crate::sim::player::MovementState;

    const A: ConnectorId = ConnectorId(1);
    const B: ConnectorId = ConnectorId(2);
    const C: ConnectorId = ConnectorId(3);
    const D: ConnectorId = ConnectorId(4);

    fn level(connectors: Vec<ConnectorDef>, keys: Vec<Vec2>) -> LevelDef {
        LevelDef {
            number: 1,
            par_moves: 2,
            spawn: Vec2::ZERO,
            connectors,
            keys,
            obstacles: Vec::new(),
            hazards: Vec::new(),
            allow_keyless: false,
        }
    }

    fn start(level: LevelDef, settings: Settings) -> GameState {
        let mut state = GameState::new(level, settings).unwrap();
        state.mark_ready();
        state.drain_events();
        state
    }

    fn idle_ticks(state: &mut GameState, ticks: u32) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for _ in 0..ticks {
            tick(state, &TickInput::default());
            events.extend(state.drain_events());
        }
        events
    }

    /// Tick until an event matches; returns the tick it happened on
    fn run_until(
        state: &mut GameState,
        max_ticks: u32,
        pred: impl Fn(&GameEvent) -> bool,
    ) -> Option<u64> {
        for _ in 0..max_ticks {
            tick(state, &TickInput::default());
            if state.drain_events().iter().any(&pred) {
                return Some(state.clock.tick());
            }
        }
        None
    }

    fn assert_no_stale_timers(state: &GameState) {
        let generation = state.clock.generation();
        for c in &state.connectors {
            assert!(
                c.timer_generation().is_none_or(|g| g == generation),
                "connector {} holds a timer from generation {:?}",
                c.id,
                c.timer_generation()
            );
        }
    }

    /// Land on a retractable connector sitting on the spawn point
    fn land_on_spawn_connector(state: &mut GameState) -> u64 {
        assert_eq!(state.select(A), SelectOutcome::Appended);
        assert_eq!(state.select(A), SelectOutcome::Commit);
        tick(state, &TickInput::default());
        assert!(state.drain_events().contains(&GameEvent::PlayerArrived(A)));
        state.clock.tick()
    }

    #[test]
    fn test_blocked_selection_leaves_path_unchanged() {
        let mut def = level(
            vec![
                ConnectorDef::normal(1, 1.0, 0.0),
                ConnectorDef::normal(2, 1.0, 5.0),
                ConnectorDef::door(4, 6.0, 0.0),
            ],
            vec![Vec2::new(1.0, 0.0)],
        );
        def.obstacles.push(Obstacle::Rect {
            min: Vec2::new(0.0, 2.0),
            max: Vec2::new(2.0, 3.0),
        });
        let mut state = start(def, Settings::instant());

        assert_eq!(state.select(A), SelectOutcome::Appended);
        assert_eq!(
            state.select(B),
            SelectOutcome::Rejected(RejectReason::Blocked)
        );
        assert_eq!(state.path.to_vec(), vec![A]);
        assert!(!state.line_of_sight(Vec2::new(1.0, 0.0), Vec2::new(1.0, 5.0)));
    }

    #[test]
    fn test_single_connection_commit() {
        let def = level(
            vec![ConnectorDef::normal(1, 1.0, 0.0), ConnectorDef::door(4, 6.0, 0.0)],
            vec![Vec2::new(9.0, 9.0)],
        );
        let mut state = start(def, Settings::instant());

        tick(&mut state, &TickInput { select: Some(A), ..Default::default() });
        tick(&mut state, &TickInput { select: Some(A), ..Default::default() });
        assert_eq!(state.player.state(), MovementState::Moving);
        assert_eq!(state.player.total_moves, 1);
        assert_eq!(state.path.to_vec(), vec![A]);

        // Selecting again while moving is ignored
        assert_eq!(
            state.select(A),
            SelectOutcome::Rejected(RejectReason::Locked)
        );
        assert_eq!(state.player.total_moves, 1);

        let arrived = run_until(&mut state, 100, |e| *e == GameEvent::PlayerArrived(A));
        assert!(arrived.is_some());
        assert!(state.player.is_idle());
        assert_eq!(state.player.pos, Vec2::new(1.0, 0.0));
        assert_eq!(state.player.current_connector, Some(A));
        // Terminal kept as the targeted node
        assert_eq!(state.path.to_vec(), vec![A]);
        assert_eq!(state.connector(A).unwrap().role, ConnectorRole::Targeted);
    }

    #[test]
    fn test_terminal_pop_policy() {
        let def = level(
            vec![ConnectorDef::normal(1, 1.0, 0.0), ConnectorDef::door(4, 6.0, 0.0)],
            vec![Vec2::new(9.0, 9.0)],
        );
        let settings = Settings {
            terminal_policy: TerminalPolicy::Pop,
            ..Settings::instant()
        };
        let mut state = start(def, settings);
        state.select(A);
        state.select(A);
        run_until(&mut state, 100, |e| *e == GameEvent::PlayerArrived(A)).unwrap();
        assert!(state.path.is_empty());
        // Resting connector is still the target while the path is empty
        assert_eq!(state.connector(A).unwrap().role, ConnectorRole::Targeted);
    }

    #[test]
    fn test_retraction_kills_resting_player_then_resets() {
        let def = level(
            vec![
                ConnectorDef::retractable(1, 0.0, 0.0, 1.0, 2.0),
                ConnectorDef::door(4, 5.0, 0.0),
            ],
            vec![Vec2::new(9.0, 9.0)],
        );
        let mut state = start(def, Settings::instant());
        let landed = land_on_spawn_connector(&mut state);
        assert_eq!(
            state.connector(A).unwrap().retract_state(),
            RetractState::Retracting
        );

        let died = run_until(&mut state, 400, |e| {
            *e == GameEvent::PlayerDied(DeathCause::Retracted(A))
        });
        assert_eq!(died, Some(landed + 120));
        assert!(state.path.is_empty());
        assert_eq!(state.player.total_moves, 0);
        assert!(state.connector(A).unwrap().is_retracted());
        assert_no_stale_timers(&state);

        let reset = run_until(&mut state, 400, |e| *e == GameEvent::ConnectorReset(A));
        assert_eq!(reset, Some(landed + 120 + 240));
        assert_eq!(
            state.connector(A).unwrap().retract_state(),
            RetractState::Idle
        );
    }

    #[test]
    fn test_normal_connector_never_retracts() {
        let def = level(
            vec![ConnectorDef::normal(1, 0.0, 0.0), ConnectorDef::door(4, 5.0, 0.0)],
            vec![Vec2::new(9.0, 9.0)],
        );
        let mut state = start(def, Settings::instant());
        land_on_spawn_connector(&mut state);

        let events = idle_ticks(&mut state, 2000);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::PlayerDied(_))));
        assert_eq!(
            state.connector(A).unwrap().retract_state(),
            RetractState::Idle
        );
        assert_eq!(state.player.current_connector, Some(A));
    }

    #[test]
    fn test_door_with_missing_key_is_dead_end() {
        let def = level(
            vec![ConnectorDef::normal(1, 2.0, 0.0), ConnectorDef::door(4, 4.0, 0.0)],
            vec![Vec2::new(2.0, 0.0), Vec2::new(0.0, 8.0)],
        );
        let mut state = start(def, Settings::instant());
        state.select(A);
        state.select(D);
        assert_eq!(state.select(D), SelectOutcome::Commit);

        let events = idle_ticks(&mut state, 200);
        assert!(events.contains(&GameEvent::KeyCollected(0)));
        assert!(events.contains(&GameEvent::PlayerArrived(D)));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::DoorOpening(_))));
        assert_eq!(state.phase, LevelPhase::Ready);
        assert!(state.player.is_idle());
        assert_eq!(state.player.current_connector, Some(D));
        assert_eq!(state.path.to_vec(), vec![D]);
        assert!(state.keys[0].collected && !state.keys[1].collected);
        assert!(state.completion_report().is_none());
    }

    #[test]
    fn test_door_completion_report() {
        let def = level(
            vec![ConnectorDef::normal(1, 2.0, 0.0), ConnectorDef::door(4, 4.0, 0.0)],
            vec![Vec2::new(2.0, 0.0)],
        );
        let settings = Settings {
            door_open_delay: 0.25,
            ..Settings::instant()
        };
        let mut state = start(def, settings);
        state.select(A);
        state.select(D);
        state.select(D);

        let opened = run_until(&mut state, 200, |e| *e == GameEvent::DoorOpening(D)).unwrap();
        assert!(matches!(state.phase, LevelPhase::Completing { door: D, .. }));
        assert_eq!(
            state.select(A),
            SelectOutcome::Rejected(RejectReason::Locked)
        );

        let done = run_until(&mut state, 100, |e| {
            matches!(e, GameEvent::LevelCompleted(_))
        });
        assert_eq!(done, Some(opened + 30));
        assert!(state.is_completed());

        let report = state.completion_report().copied().unwrap();
        assert_eq!(report.level, 1);
        assert_eq!(report.total_moves, 1);
        assert_eq!(report.par_moves, 2);
        assert!(report.perfect());

        // Simulation is frozen once complete
        let before = state.clock.tick();
        idle_ticks(&mut state, 10);
        assert_eq!(state.clock.tick(), before);
    }

    #[test]
    fn test_death_mid_transit_resets_life() {
        let mut def = level(
            vec![
                ConnectorDef::retractable(1, 1.0, 0.0, 5.0, 3.0),
                ConnectorDef::normal(2, 2.0, 0.0),
                ConnectorDef::normal(3, 3.0, 0.0),
                ConnectorDef::door(4, 4.0, 0.0),
            ],
            vec![Vec2::new(1.0, 0.0)],
        );
        def.hazards.push(HazardDef {
            track: vec![Vec2::new(2.5, 0.0)],
            radius: 0.1,
            movement: MovementType::PingPong,
            speed: 0.0,
            dwell: 0.0,
        });
        let mut state = start(def, Settings::instant());
        for id in [A, B, C, D] {
            assert_eq!(state.select(id), SelectOutcome::Appended);
        }
        state.select(D);

        let mut events = Vec::new();
        for _ in 0..200 {
            tick(&mut state, &TickInput::default());
            events.extend(state.drain_events());
            if state.player.is_dead() {
                break;
            }
        }

        assert!(events.contains(&GameEvent::KeyCollected(0)));
        assert!(events.contains(&GameEvent::PlayerDied(DeathCause::Hazard)));
        // A was still counting down and is released
        assert!(events.contains(&GameEvent::ConnectorReset(A)));
        assert!(state.path.is_empty());
        assert!(state.keys.iter().all(|k| !k.collected));
        assert_eq!(state.player.total_moves, 0);
        assert_eq!(
            state.connector(A).unwrap().retract_state(),
            RetractState::Idle
        );
        assert!(
            state
                .connectors
                .iter()
                .all(|c| c.role == ConnectorRole::Disconnected)
        );
        assert_no_stale_timers(&state);

        // Respawn puts the player back at spawn, alive
        let respawned = run_until(&mut state, 200, |e| *e == GameEvent::PlayerRespawned);
        assert!(respawned.is_some());
        assert_eq!(state.player.pos, Vec2::ZERO);
        assert!(state.player.is_idle());
    }

    #[test]
    fn test_traversal_follows_insertion_order() {
        let def = level(
            vec![
                ConnectorDef::normal(1, 1.0, 0.0),
                ConnectorDef::normal(2, 2.0, 1.0),
                ConnectorDef::normal(3, 3.0, -1.0),
                ConnectorDef::door(4, 4.0, 0.0),
            ],
            vec![Vec2::new(0.0, 9.0)],
        );
        let settings = Settings {
            inter_node_delay: 0.1,
            ..Settings::instant()
        };
        let mut state = start(def, settings);
        for id in [A, B, C, D] {
            state.select(id);
        }
        state.select(D);

        let arrivals: Vec<ConnectorId> = idle_ticks(&mut state, 400)
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::PlayerArrived(id) => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(arrivals, vec![A, B, C, D]);
        assert_eq!(state.player.total_moves, 1);
        // Arrived at D from C, which sits below it
        assert_eq!(state.player.facing, crate::sim::player::Facing::Up);
    }

    #[test]
    fn test_retraction_in_transit_kills() {
        let def = level(
            vec![
                ConnectorDef::retractable(1, 0.0, 0.0, 1.0, 2.0),
                ConnectorDef::normal(2, 3.0, 0.0),
                ConnectorDef::door(4, 9.0, 9.0),
            ],
            vec![Vec2::new(0.0, 9.0)],
        );
        let settings = Settings {
            single_connection_mode: false,
            ..Settings::instant()
        };
        let mut state = start(def, settings);
        let landed = land_on_spawn_connector(&mut state);

        state.select(B);
        state.select(B);
        run_until(&mut state, 200, |e| *e == GameEvent::PlayerArrived(B)).unwrap();

        // Head back to A while it is still counting down
        assert_eq!(state.select(A), SelectOutcome::Appended);
        state.select(A);
        let died = run_until(&mut state, 200, |e| {
            *e == GameEvent::PlayerDied(DeathCause::RetractedInTransit(A))
        });
        assert_eq!(died, Some(landed + 120));
        assert!(state.player.pos.x > 0.0 && state.player.pos.x < 3.0);
        assert!(state.path.is_empty());
    }

    #[test]
    fn test_hazard_kills_and_respawn_is_invulnerable() {
        let mut def = level(
            vec![ConnectorDef::normal(1, 5.0, 0.0), ConnectorDef::door(4, 6.0, 0.0)],
            vec![Vec2::new(5.0, 0.0)],
        );
        def.hazards.push(HazardDef {
            track: vec![Vec2::ZERO],
            radius: 0.2,
            movement: MovementType::Loop,
            speed: 0.0,
            dwell: 0.0,
        });
        let mut state = start(def, Settings::instant());

        tick(&mut state, &TickInput::default());
        assert!(
            state
                .drain_events()
                .contains(&GameEvent::PlayerDied(DeathCause::Hazard))
        );
        assert_eq!(
            state.select(A),
            SelectOutcome::Rejected(RejectReason::Locked)
        );

        let respawned = run_until(&mut state, 200, |e| *e == GameEvent::PlayerRespawned).unwrap();
        let events = idle_ticks(&mut state, 59);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::PlayerDied(_))));

        let died_again = run_until(&mut state, 5, |e| matches!(e, GameEvent::PlayerDied(_)));
        assert_eq!(died_again, Some(respawned + 60));
    }

    #[test]
    fn test_pause_freezes_timers() {
        let def = level(
            vec![
                ConnectorDef::retractable(1, 0.0, 0.0, 1.0, 2.0),
                ConnectorDef::door(4, 5.0, 0.0),
            ],
            vec![Vec2::new(9.0, 9.0)],
        );
        let mut state = start(def, Settings::instant());
        let landed = land_on_spawn_connector(&mut state);

        tick(&mut state, &TickInput { pause: true, ..Default::default() });
        assert!(state.paused);
        let events = idle_ticks(&mut state, 500);
        assert!(events.is_empty());
        assert_eq!(state.clock.tick(), landed);
        assert_eq!(
            state.select(A),
            SelectOutcome::Rejected(RejectReason::Locked)
        );

        tick(&mut state, &TickInput { pause: true, ..Default::default() });
        assert!(!state.paused);
        let died = run_until(&mut state, 200, |e| matches!(e, GameEvent::PlayerDied(_)));
        assert_eq!(died, Some(landed + 120));
    }

    #[test]
    fn test_input_locked_while_loading() {
        let def = level(
            vec![ConnectorDef::normal(1, 1.0, 0.0), ConnectorDef::door(4, 5.0, 0.0)],
            vec![Vec2::new(9.0, 9.0)],
        );
        let mut state = GameState::new(def, Settings::default()).unwrap();
        assert_eq!(
            state.select(A),
            SelectOutcome::Rejected(RejectReason::Locked)
        );
        let ready = run_until(&mut state, 200, |e| *e == GameEvent::LevelReady);
        assert_eq!(ready, Some(120));
        assert_eq!(state.select(A), SelectOutcome::Appended);
    }

    #[test]
    fn test_clear_path_input() {
        let def = level(
            vec![
                ConnectorDef::normal(1, 1.0, 0.0),
                ConnectorDef::normal(2, 2.0, 0.0),
                ConnectorDef::door(4, 5.0, 0.0),
            ],
            vec![Vec2::new(9.0, 9.0)],
        );
        let mut state = start(def, Settings::instant());
        state.select(A);
        state.select(B);
        assert_eq!(state.connector(A).unwrap().role, ConnectorRole::Tethered);

        tick(&mut state, &TickInput { clear: true, ..Default::default() });
        assert!(state.path.is_empty());
        assert!(
            state
                .drain_events()
                .contains(&GameEvent::RoleChanged {
                    id: B,
                    role: ConnectorRole::Disconnected
                })
        );
    }

    #[test]
    fn test_restart_rebuilds_level() {
        let def = level(
            vec![
                ConnectorDef::retractable(1, 0.0, 0.0, 0.5, 2.0),
                ConnectorDef::door(4, 5.0, 0.0),
            ],
            vec![Vec2::new(9.0, 9.0)],
        );
        let mut state = start(def, Settings::instant());
        land_on_spawn_connector(&mut state);
        run_until(&mut state, 200, |e| matches!(e, GameEvent::PlayerDied(_))).unwrap();
        assert!(state.connector(A).unwrap().is_retracted());

        state.restart();
        assert!(matches!(state.phase, LevelPhase::Loading { .. }));
        assert!(state.connectors.iter().all(|c| !c.has_active_timer()));
        assert_eq!(
            state.connector(A).unwrap().retract_state(),
            RetractState::Idle
        );
        assert!(state.player.is_idle());
        assert_eq!(state.player.pos, Vec2::ZERO);

        let ready = run_until(&mut state, 5, |e| *e == GameEvent::LevelReady);
        assert!(ready.is_some());
    }

    #[test]
    fn test_run_frame_applies_input_once() {
        let def = level(
            vec![ConnectorDef::normal(1, 1.0, 0.0), ConnectorDef::door(4, 5.0, 0.0)],
            vec![Vec2::new(9.0, 9.0)],
        );
        let mut state = start(def, Settings::instant());
        let input = TickInput {
            select: Some(A),
            ..Default::default()
        };
        let ran = run_frame(&mut state, &input, SIM_DT * 2.5);
        assert_eq!(ran, 2);
        // A second application would have committed a move
        assert_eq!(state.path.to_vec(), vec![A]);
        assert!(state.player.is_idle());
    }

    fn arrivals(events: &[GameEvent]) -> Vec<ConnectorId> {
        events
            .iter()
            .filter_map(|e| match e {
                GameEvent::PlayerArrived(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_locked_door_is_dead_end() {
        let def = level(
            vec![ConnectorDef::normal(1, 4.0, 0.0), ConnectorDef::door(4, 2.0, 0.0)],
            vec![Vec2::new(0.0, 9.0)],
        );
        let mut state = start(def, Settings::instant());

        assert_eq!(state.select(D), SelectOutcome::Appended);
        assert_eq!(
            state.select(A),
            SelectOutcome::Rejected(RejectReason::DeadEnd)
        );
        assert_eq!(state.select(D), SelectOutcome::Commit);

        let events = idle_ticks(&mut state, 200);
        assert_eq!(arrivals(&events), vec![D]);
        assert_eq!(state.phase, LevelPhase::Ready);
        assert!(state.player.is_idle());
        assert_eq!(state.player.pos, Vec2::new(2.0, 0.0));
        assert_eq!(state.path.to_vec(), vec![D]);

        // Still stuck behind the door until the path is cleared
        assert_eq!(
            state.select(A),
            SelectOutcome::Rejected(RejectReason::DeadEnd)
        );
        state.clear_path();
        assert_eq!(state.select(A), SelectOutcome::Appended);
    }

    #[test]
    fn test_arrival_at_locked_door_drops_the_rest() {
        let def = level(
            vec![ConnectorDef::normal(1, 4.0, 0.0), ConnectorDef::door(4, 2.0, 0.0)],
            vec![Vec2::new(0.0, 9.0)],
        );
        let mut state = start(def, Settings::instant());
        // Loaded path that runs through the door
        state.path.push(D);
        state.path.push(A);
        assert!(state.commit_move());

        let events = idle_ticks(&mut state, 200);
        assert_eq!(arrivals(&events), vec![D]);
        assert!(state.player.is_idle());
        assert_eq!(state.player.current_connector, Some(D));
        assert_eq!(state.path.to_vec(), vec![D]);
    }

    #[test]
    fn test_select_elsewhere_while_retracting() {
        let def = level(
            vec![
                ConnectorDef::retractable(1, 0.0, 0.0, 1.0, 2.0),
                ConnectorDef::normal(2, 3.0, 0.0),
                ConnectorDef::door(4, 6.0, 0.0),
            ],
            vec![Vec2::new(0.0, 9.0)],
        );
        let mut state = start(def, Settings::instant());
        let landed = land_on_spawn_connector(&mut state);

        idle_ticks(&mut state, 60);
        assert_eq!(
            state.connector(A).unwrap().retract_state(),
            RetractState::Retracting
        );
        let due = state.connector(A).unwrap().timer_generation();

        assert_eq!(state.select(B), SelectOutcome::Appended);
        assert_eq!(state.path.to_vec(), vec![A, B]);
        assert_eq!(
            state.connector(A).unwrap().retract_state(),
            RetractState::Retracting
        );
        assert_eq!(state.connector(A).unwrap().timer_generation(), due);

        // The countdown is untouched by the selection
        let died = run_until(&mut state, 200, |e| {
            *e == GameEvent::PlayerDied(DeathCause::Retracted(A))
        });
        assert_eq!(died, Some(landed + 120));
        assert!(state.path.is_empty());
    }

    #[test]
    fn test_death_mid_transit_resets_every_key() {
        let mut def = level(
            vec![
                ConnectorDef::normal(1, 1.0, 0.0),
                ConnectorDef::normal(2, 2.0, 0.0),
                ConnectorDef::normal(3, 3.0, 0.0),
                ConnectorDef::door(4, 4.0, 0.0),
            ],
            vec![Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)],
        );
        def.hazards.push(HazardDef {
            track: vec![Vec2::new(2.5, 0.0)],
            radius: 0.1,
            movement: MovementType::Loop,
            speed: 0.0,
            dwell: 0.0,
        });
        let mut state = start(def, Settings::instant());
        for id in [A, B, C, D] {
            state.select(id);
        }
        assert_eq!(state.select(D), SelectOutcome::Commit);

        let mut events = Vec::new();
        for _ in 0..200 {
            tick(&mut state, &TickInput::default());
            events.extend(state.drain_events());
            if state.player.is_dead() {
                break;
            }
        }

        assert!(events.contains(&GameEvent::KeyCollected(0)));
        assert!(events.contains(&GameEvent::KeyCollected(1)));
        assert!(events.contains(&GameEvent::PlayerDied(DeathCause::Hazard)));
        assert!(state.keys.iter().all(|k| !k.collected));
        assert!(state.path.is_empty());
        assert_eq!(state.player.total_moves, 0);
    }

    #[test]
    fn test_recommit_on_resting_terminal_is_free() {
        let def = level(
            vec![ConnectorDef::normal(1, 1.0, 0.0), ConnectorDef::door(4, 5.0, 0.0)],
            vec![Vec2::new(9.0, 9.0)],
        );
        let mut state = start(def, Settings::instant());
        state.select(A);
        state.select(A);
        run_until(&mut state, 100, |e| *e == GameEvent::PlayerArrived(A)).unwrap();
        assert_eq!(state.player.total_moves, 1);

        for _ in 0..5 {
            assert_eq!(state.select(A), SelectOutcome::Commit);
            assert!(!state.commit_move());
            tick(&mut state, &TickInput::default());
            assert!(state.player.is_idle());
        }
        assert_eq!(state.player.total_moves, 1);
        assert_eq!(state.player.pos, Vec2::new(1.0, 0.0));
    }
}
