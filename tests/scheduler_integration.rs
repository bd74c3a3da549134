//! Entity Thinking System integration tests

use std::sync::Arc;

use necro_village::behavior::{ActionOutcome, ActionSource, CommandKind};
use necro_village::content::ContentRegistry;
use necro_village::core::config::SimulationConfig;
use necro_village::core::error::SimError;
use necro_village::core::types::{BeingId, GridPos};
use necro_village::entity::movement::BlockedMove;
use necro_village::entity::{BeingSpec, Needs};
use necro_village::scenario::demo_village;
use necro_village::simulation::{EntityThinkingSystem, TickReport};
use necro_village::world::{Detectability, NavGrid, World};

fn config(workers: usize) -> SimulationConfig {
    SimulationConfig {
        worker_threads: Some(workers),
        ..SimulationConfig::default()
    }
}

fn open_field(rows: &[&str]) -> World {
    World::new(NavGrid::from_ascii(rows), Arc::new(ContentRegistry::with_defaults()), config(2))
}

fn run_demo(workers: usize, ticks: u64) -> (Vec<TickReport>, Vec<(String, GridPos)>) {
    let village = demo_village(config(workers), Arc::new(ContentRegistry::with_defaults())).unwrap();
    let system = EntityThinkingSystem::new(village.world).unwrap();
    let reports = (0..ticks).map(|_| system.process_game_tick().unwrap()).collect();
    let world = system.into_world().unwrap();
    let positions = world.beings().iter().map(|b| (b.name.clone(), b.position())).collect();
    (reports, positions)
}

#[test]
fn test_tick_is_not_reentrant() {
    let system = EntityThinkingSystem::new(open_field(&["....."])).unwrap();
    let guard = system.try_begin_tick().unwrap();

    std::thread::scope(|scope| {
        let attempts: Vec<_> = (0..6).map(|_| scope.spawn(|| system.process_game_tick())).collect();
        for attempt in attempts {
            assert!(matches!(attempt.join().unwrap(), Err(SimError::TickInProgress)));
        }
    });
    assert_eq!(system.world().unwrap().tick(), 0);

    drop(guard);
    assert!(system.process_game_tick().is_ok());
    assert_eq!(system.world().unwrap().tick(), 1);
}

#[test]
fn test_racing_callers_never_overlap() {
    let system = EntityThinkingSystem::new(open_field(&["....."])).unwrap();
    system
        .world()
        .unwrap()
        .spawn_being(BeingSpec::new("Ada", GridPos::new(2, 0)))
        .unwrap();

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| system.process_game_tick())).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let completed = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(SimError::TickInProgress)))
        .count();
    assert!(completed >= 1);
    assert_eq!(completed + refused, 8);
    assert_eq!(system.world().unwrap().tick(), completed as u64);
}

#[test]
fn test_identical_runs_are_identical() {
    let (reports_a, positions_a) = run_demo(1, 150);
    let (reports_b, positions_b) = run_demo(4, 150);

    assert_eq!(positions_a, positions_b);
    assert_eq!(
        serde_json::to_string(&reports_a).unwrap(),
        serde_json::to_string(&reports_b).unwrap()
    );
    assert!(reports_a.iter().all(|r| r.failed_thinks.is_empty()));
}

#[test]
fn test_contested_cell_goes_to_first_proposer() {
    let mut world = open_field(&["..."]);
    let first = world.spawn_being(BeingSpec::new("First", GridPos::new(0, 0))).unwrap();
    let second = world.spawn_being(BeingSpec::new("Second", GridPos::new(2, 0))).unwrap();
    let goal = GridPos::new(1, 0);
    world.issue_command(first, CommandKind::MoveTo(goal), None).unwrap();
    world.issue_command(second, CommandKind::MoveTo(goal), None).unwrap();

    let system = EntityThinkingSystem::new(world).unwrap();
    let report = system.process_game_tick().unwrap();

    let moves: Vec<_> = report.applied.iter().filter(|a| a.action == "move").collect();
    assert_eq!(moves.len(), 2);
    assert_eq!(moves[0].being, first);
    assert_eq!(moves[0].outcome, ActionOutcome::Applied);
    assert_eq!(moves[1].being, second);
    assert!(matches!(moves[1].outcome, ActionOutcome::Rejected(_)));
    assert!(matches!(moves[1].source, ActionSource::Command(_)));

    let world = system.world().unwrap();
    assert_eq!(world.being(first).unwrap().position(), goal);
    assert_eq!(world.being(second).unwrap().position(), GridPos::new(2, 0));
    assert_eq!(
        world.being(second).unwrap().movement.blocked(),
        Some(BlockedMove { target: goal, by: first })
    );
}

#[test]
fn test_moving_beings_wait_for_their_step() {
    let mut world = open_field(&["......"]);
    let walker = world.spawn_being(BeingSpec::new("Walker", GridPos::new(0, 0))).unwrap();
    world.issue_command(walker, CommandKind::MoveTo(GridPos::new(5, 0)), None).unwrap();
    let system = EntityThinkingSystem::new(world).unwrap();

    // Half a step of budget per tick: one move, then one tick in transit
    let first = system.process_game_tick().unwrap();
    assert_eq!(first.applied[0].action, "move");
    let second = system.process_game_tick().unwrap();
    assert_eq!(second.applied[0].action, "idle");
    let third = system.process_game_tick().unwrap();
    assert_eq!(third.applied[0].action, "move");

    for _ in 0..20 {
        system.process_game_tick().unwrap();
    }
    let world = system.world().unwrap();
    assert_eq!(world.being(walker).unwrap().position(), GridPos::new(5, 0));
    assert!(world.being(walker).unwrap().assigned_command().is_none());
}

#[test]
fn test_dead_are_reported_and_removed() {
    let mut settings = config(2);
    settings.starvation_damage_per_tick = 1000.0;
    let mut world = World::new(NavGrid::from_ascii(&["...."]), Arc::new(ContentRegistry::with_defaults()), settings);
    let doomed = world
        .spawn_being(BeingSpec::new("Doomed", GridPos::new(0, 0)).with_needs(Needs::new(1.0, 0.0)))
        .unwrap();
    world.spawn_being(BeingSpec::new("Witness", GridPos::new(3, 0))).unwrap();

    let system = EntityThinkingSystem::new(world).unwrap();
    let report = system.process_game_tick().unwrap();
    assert_eq!(report.deaths, vec![doomed]);

    let world = system.world().unwrap();
    assert_eq!(world.being_count(), 1);
    assert!(world.being(doomed).is_none());
}

/// Never seen, heard or smelled
fn unnoticeable() -> Detectability {
    Detectability {
        visibility: 100.0,
        noise: 0.0,
        scent: 0.0,
    }
}

fn rejected_moves(reports: &[TickReport], being: BeingId) -> usize {
    reports
        .iter()
        .flat_map(|r| r.applied.iter())
        .filter(|a| a.being == being && a.action == "move" && matches!(a.outcome, ActionOutcome::Rejected(_)))
        .count()
}

#[test]
fn test_walks_around_unnoticed_blocker() {
    let mut world = open_field(&["......", "......", "......"]);
    let walker = world.spawn_being(BeingSpec::new("Walker", GridPos::new(0, 1))).unwrap();
    world
        .spawn_being(BeingSpec::new("Shade", GridPos::new(2, 1)).with_detectability(unnoticeable()))
        .unwrap();
    let target = GridPos::new(5, 1);
    world.issue_command(walker, CommandKind::MoveTo(target), None).unwrap();
    let system = EntityThinkingSystem::new(world).unwrap();

    let reports: Vec<_> = (0..30).map(|_| system.process_game_tick().unwrap()).collect();

    let world = system.world().unwrap();
    assert_eq!(world.being(walker).unwrap().position(), target);
    assert!(world.being(walker).unwrap().assigned_command().is_none());
    assert_eq!(rejected_moves(&reports, walker), 1);
}

#[test]
fn test_order_blocked_in_corridor_gives_up() {
    let mut world = open_field(&["......"]);
    let walker = world.spawn_being(BeingSpec::new("Walker", GridPos::new(0, 0))).unwrap();
    world
        .spawn_being(BeingSpec::new("Shade", GridPos::new(2, 0)).with_detectability(unnoticeable()))
        .unwrap();
    world.issue_command(walker, CommandKind::MoveTo(GridPos::new(5, 0)), None).unwrap();
    let system = EntityThinkingSystem::new(world).unwrap();
    let threshold = system.world().unwrap().config().stuck_threshold_ticks as usize;

    let reports: Vec<_> = (0..threshold + 20).map(|_| system.process_game_tick().unwrap()).collect();

    let world = system.world().unwrap();
    let walker_state = world.being(walker).unwrap();
    assert_eq!(walker_state.position(), GridPos::new(1, 0));
    assert!(walker_state.assigned_command().is_none());
    let rejected = rejected_moves(&reports, walker);
    assert!(rejected > 0 && rejected <= threshold, "{rejected} refused moves");
}

#[test]
fn test_order_onto_wall_stops_at_closest_cell() {
    let mut world = open_field(&["....#"]);
    let walker = world.spawn_being(BeingSpec::new("Walker", GridPos::new(0, 0))).unwrap();
    world.issue_command(walker, CommandKind::MoveTo(GridPos::new(4, 0)), None).unwrap();
    let system = EntityThinkingSystem::new(world).unwrap();

    for _ in 0..10 {
        system.process_game_tick().unwrap();
    }
    assert_eq!(system.world().unwrap().being(walker).unwrap().position(), GridPos::new(3, 0));

    let threshold = system.world().unwrap().config().stuck_threshold_ticks;
    for _ in 0..threshold {
        system.process_game_tick().unwrap();
    }
    let world = system.world().unwrap();
    assert_eq!(world.being(walker).unwrap().position(), GridPos::new(3, 0));
    assert!(world.being(walker).unwrap().assigned_command().is_none());
}
