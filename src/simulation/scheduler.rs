//! Entity Thinking System - the per-tick fan-out / fan-in
//!
//! One tick runs in four steps:
//! snapshot -> parallel think -> sorted single-threaded apply -> end of tick
//!
//! Positions and observation data for every being are captured before any
//! think starts, so nobody sees a half-updated world. Thinks run on a rayon
//! pool whose fixed thread count bounds how many run at once. Actions are
//! collected in registration order, stably sorted by priority and applied on
//! the calling thread.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use ahash::AHashSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::behavior::action::{sort_for_apply, Action, ActionOutcome, ActionSource};
use crate::core::error::{Result, SimError};
use crate::core::types::{BeingId, GridPos, Tick};
use crate::world::{ObservationData, World};

/// One applied action, in apply order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedAction {
    pub being: BeingId,
    pub action: String,
    pub source: ActionSource,
    pub priority: i32,
    pub outcome: ActionOutcome,
}

/// What happened during one tick
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: Tick,
    pub applied: Vec<AppliedAction>,
    /// Beings whose think returned an error or panicked
    pub failed_thinks: Vec<BeingId>,
    pub deaths: Vec<BeingId>,
}

impl TickReport {
    pub fn rejected(&self) -> usize {
        self.applied.iter().filter(|a| !a.outcome.is_applied()).count()
    }
}

/// Held for the duration of a tick; releases the in-progress flag on drop
pub struct TickGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

enum ThinkOutcome {
    Proposed(Action),
    Nothing,
    Failed,
}

pub struct EntityThinkingSystem {
    world: Mutex<World>,
    pool: rayon::ThreadPool,
    in_progress: AtomicBool,
}

impl EntityThinkingSystem {
    pub fn new(world: World) -> Result<Self> {
        let workers = world.config().think_workers();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("think-{i}"))
            .build()
            .map_err(|e| SimError::InvalidConfig(format!("think pool: {e}")))?;
        debug!(workers, "think pool ready");
        Ok(Self {
            world: Mutex::new(world),
            pool,
            in_progress: AtomicBool::new(false),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Lock the world between ticks
    pub fn world(&self) -> Result<MutexGuard<'_, World>> {
        self.world.lock().map_err(|_| SimError::WorldPoisoned)
    }

    pub fn into_world(self) -> Result<World> {
        self.world.into_inner().map_err(|_| SimError::WorldPoisoned)
    }

    /// Claim the tick slot; a second claim fails until the guard drops
    pub fn try_begin_tick(&self) -> Result<TickGuard<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                error!("game tick requested while another is in progress, dropping it");
                SimError::TickInProgress
            })?;
        Ok(TickGuard {
            flag: &self.in_progress,
        })
    }

    /// Run one full tick
    pub fn process_game_tick(&self) -> Result<TickReport> {
        let _guard = self.try_begin_tick()?;
        let mut world = self.world()?;
        self.run_tick(&mut world)
    }

    fn run_tick(&self, world: &mut World) -> Result<TickReport> {
        let tick = world.tick();
        let snapshots = world
            .beings()
            .iter()
            .map(|b| -> Result<(GridPos, ObservationData)> { Ok((b.position(), world.observation_for(b.id)?)) })
            .collect::<Result<Vec<_>>>()?;

        let outcomes = self.think_all(world, &snapshots);

        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };
        let mut actions = Vec::with_capacity(outcomes.len());
        for (id, outcome) in outcomes {
            match outcome {
                ThinkOutcome::Proposed(action) => actions.push(action),
                ThinkOutcome::Nothing => {}
                ThinkOutcome::Failed => report.failed_thinks.push(id),
            }
        }
        sort_for_apply(&mut actions);

        let mut advanced = AHashSet::with_capacity(actions.len());
        for action in actions {
            let being = action.owner;
            let name = action.kind.name().to_string();
            let source = action.source.clone();
            let priority = action.priority;

            let outcome = world.apply_action(action);
            if advanced.insert(being) {
                world.advance_movement(being);
            }
            report.applied.push(AppliedAction {
                being,
                action: name,
                source,
                priority,
                outcome,
            });
        }
        let idle: Vec<BeingId> = world
            .beings()
            .iter()
            .map(|b| b.id)
            .filter(|id| !advanced.contains(id))
            .collect();
        for id in idle {
            world.advance_movement(id);
        }

        report.deaths = world.end_tick();
        debug!(
            tick,
            actions = report.applied.len(),
            rejected = report.rejected(),
            failed = report.failed_thinks.len(),
            "tick complete"
        );
        Ok(report)
    }

    /// Parallel think over every being; results in registration order
    fn think_all(&self, world: &mut World, snapshots: &[(GridPos, ObservationData)]) -> Vec<(BeingId, ThinkOutcome)> {
        let (view, beings) = world.think_split();
        self.pool.install(|| {
            beings
                .par_iter_mut()
                .zip(snapshots.par_iter())
                .map(|(being, (pos, observation))| {
                    let id = being.id;
                    let result = panic::catch_unwind(AssertUnwindSafe(|| being.think(*pos, observation, &view)));
                    let outcome = match result {
                        Ok(Ok(Some(action))) => ThinkOutcome::Proposed(action),
                        Ok(Ok(None)) => ThinkOutcome::Nothing,
                        Ok(Err(e)) => {
                            error!(being = ?id, error = %e, "think failed");
                            ThinkOutcome::Failed
                        }
                        Err(_) => {
                            error!(error = %SimError::ThinkPanicked(id), "think panicked");
                            ThinkOutcome::Failed
                        }
                    };
                    (id, outcome)
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentRegistry;
    use crate::core::config::SimulationConfig;
    use crate::entity::being::BeingSpec;
    use crate::world::NavGrid;
    use std::sync::Arc;

    fn system(rows: &[&str]) -> EntityThinkingSystem {
        let config = SimulationConfig {
            worker_threads: Some(2),
            ..SimulationConfig::default()
        };
        let world = World::new(NavGrid::from_ascii(rows), Arc::new(ContentRegistry::with_defaults()), config);
        EntityThinkingSystem::new(world).unwrap()
    }

    #[test]
    fn test_guard_blocks_second_tick() {
        let sys = system(&["..."]);
        let guard = sys.try_begin_tick().unwrap();
        assert!(matches!(sys.process_game_tick(), Err(SimError::TickInProgress)));
        drop(guard);
        assert!(sys.process_game_tick().is_ok());
    }

    #[test]
    fn test_tick_advances_clock() {
        let sys = system(&["....."]);
        sys.world()
            .unwrap()
            .spawn_being(BeingSpec::new("A", GridPos::new(0, 0)))
            .unwrap();
        let report = sys.process_game_tick().unwrap();
        assert_eq!(report.tick, 0);
        assert!(report.failed_thinks.is_empty());
        assert_eq!(sys.world().unwrap().tick(), 1);
        assert_eq!(sys.worker_count(), 2);
    }

    #[test]
    fn test_failing_think_is_isolated() {
        use crate::behavior::traits::Crafter;
        use crate::core::types::FacilityId;

        let sys = system(&["....."]);
        {
            let mut world = sys.world().unwrap();
            world
                .spawn_being(BeingSpec::new("Broken", GridPos::new(0, 0)).with_trait(Crafter::new(
                    FacilityId(0),
                    "philosophers_stone",
                    None,
                )))
                .unwrap();
            world.spawn_being(BeingSpec::new("Fine", GridPos::new(4, 0))).unwrap();
        }
        let report = sys.process_game_tick().unwrap();
        assert_eq!(report.failed_thinks, vec![BeingId(0)]);
    }
}
