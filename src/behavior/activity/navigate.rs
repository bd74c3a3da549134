use serde::{Deserialize, Serialize};

use crate::behavior::action::ActionKind;
use crate::behavior::activity::Step;
use crate::behavior::BehaviorContext;
use crate::pathfinding::{PathGoal, Pathfinder, StepDecision};

/// Walk to a goal one step per move, giving up once stuck for too long
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Navigate {
    pathfinder: Pathfinder,
}

impl Navigate {
    pub fn new(goal: PathGoal) -> Self {
        Self {
            pathfinder: Pathfinder::with_goal(goal),
        }
    }

    pub fn goal(&self) -> Option<PathGoal> {
        self.pathfinder.goal()
    }

    pub fn pathfinder(&self) -> &Pathfinder {
        &self.pathfinder
    }

    pub(crate) fn invalidate(&mut self) {
        self.pathfinder.invalidate();
    }

    pub(crate) fn step(&mut self, ctx: &mut BehaviorContext<'_>) -> Step {
        if ctx.is_moving {
            return Step::Wait;
        }
        let decision = ctx.next_step(&mut self.pathfinder);
        if decision != StepDecision::Arrived && self.pathfinder.is_stuck(ctx.view.config.stuck_threshold_ticks) {
            return Step::Fail(format!("stuck after {} attempts", self.pathfinder.failed_plans()));
        }
        match decision {
            StepDecision::Arrived => Step::Done,
            StepDecision::Step(to) => Step::Act(ActionKind::Move { to }),
            StepDecision::Blocked => Step::Wait,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::behavior::ThinkScratch;
    use crate::content::ContentRegistry;
    use crate::core::config::SimulationConfig;
    use crate::core::types::GridPos;
    use crate::world::{NavGrid, World};

    /// Boxed in at (1,0) with the goal past a wall
    fn walled_off() -> World {
        World::new(
            NavGrid::from_ascii(&["..#.."]),
            Arc::new(ContentRegistry::with_defaults()),
            SimulationConfig::default(),
        )
    }

    #[test]
    fn test_fails_on_threshold_attempt() {
        let world = walled_off();
        let view = world.view();
        let threshold = view.config.stuck_threshold_ticks;
        let mut scratch = ThinkScratch::at(GridPos::new(1, 0));
        let mut ctx = scratch.context(&view);
        let mut walk = Navigate::new(PathGoal::Position(GridPos::new(4, 0)));

        for attempt in 1..threshold {
            assert!(matches!(walk.step(&mut ctx), Step::Wait), "gave up early on attempt {attempt}");
        }
        assert!(matches!(walk.step(&mut ctx), Step::Fail(_)));
        assert_eq!(walk.pathfinder().failed_plans(), threshold);
    }

    #[test]
    fn test_waits_while_step_in_progress() {
        let world = walled_off();
        let view = world.view();
        let mut scratch = ThinkScratch::at(GridPos::new(1, 0));
        let mut ctx = scratch.context(&view);
        ctx.is_moving = true;
        let mut walk = Navigate::new(PathGoal::Position(GridPos::new(4, 0)));

        for _ in 0..100 {
            assert!(matches!(walk.step(&mut ctx), Step::Wait));
        }
        assert_eq!(walk.pathfinder().failed_plans(), 0);
    }
}
