//! Per-being path follower with a cached plan
//!
//! A `Pathfinder` owns a goal and the last computed path. Each call to
//! [`Pathfinder::next_step`] hands out the next cell to move into and only
//! re-plans when the cached path can no longer be trusted.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::types::GridPos;
use crate::pathfinding::astar::{find_path_to_any, PathRequest, DEFAULT_MAX_EXPANSIONS};
use crate::pathfinding::goal::{GoalContext, PathGoal};

/// What the owner should do this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDecision {
    /// Already standing on a goal cell
    Arrived,
    /// Move into this adjacent cell
    Step(GridPos),
    /// No usable plan this tick
    Blocked,
}

/// Why the cached path was thrown away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplanReason {
    NoPath,
    Invalidated,
    Diverged,
    Exhausted,
    Obstructed,
    GoalMoved,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pathfinder {
    goal: Option<PathGoal>,
    path: Vec<GridPos>,
    /// Index of the path cell the owner currently stands on
    cursor: usize,
    dirty: bool,
    allow_partial: bool,
    /// Consecutive step requests that made no progress
    failed_plans: u32,
    /// Where the owner stood at the previous step request
    last_from: Option<GridPos>,
    replans: u32,
}

impl Pathfinder {
    pub fn new() -> Self {
        Self {
            allow_partial: true,
            ..Self::default()
        }
    }

    pub fn with_goal(goal: PathGoal) -> Self {
        let mut finder = Self::new();
        finder.goal = Some(goal);
        finder
    }

    /// Only follow complete paths
    pub fn require_complete_path(mut self) -> Self {
        self.allow_partial = false;
        self
    }

    /// Change the goal; a different goal drops the cached path
    pub fn set_goal(&mut self, goal: PathGoal) {
        if self.goal != Some(goal) {
            self.goal = Some(goal);
            self.clear_path();
            self.failed_plans = 0;
            self.last_from = None;
        }
    }

    pub fn clear_goal(&mut self) {
        self.goal = None;
        self.clear_path();
    }

    pub fn goal(&self) -> Option<PathGoal> {
        self.goal
    }

    /// Force a re-plan on the next step request
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn path(&self) -> &[GridPos] {
        &self.path
    }

    /// Cells still ahead of the owner
    pub fn remaining(&self) -> &[GridPos] {
        self.path.get(self.cursor + 1..).unwrap_or(&[])
    }

    pub fn failed_plans(&self) -> u32 {
        self.failed_plans
    }

    /// No progress for at least `threshold` consecutive step requests
    pub fn is_stuck(&self, threshold: u32) -> bool {
        self.failed_plans >= threshold
    }

    pub fn replans(&self) -> u32 {
        self.replans
    }

    fn clear_path(&mut self) {
        self.path.clear();
        self.cursor = 0;
        self.dirty = false;
    }

    /// Decide the next cell to move into from `from`
    ///
    /// `obstacles` are cells temporarily blocked by other beings. The cached
    /// path is reused unless it is missing, invalidated, no longer starts at
    /// `from`, exhausted, obstructed, or its end no longer satisfies the goal.
    ///
    /// Every request made from the same cell as the previous one counts as a
    /// failed plan, whether or not a step is handed out: a step that keeps
    /// being refused is no progress either. Moving to a new cell or arriving
    /// resets the count.
    pub fn next_step(
        &mut self,
        ctx: &GoalContext<'_>,
        from: GridPos,
        obstacles: &AHashSet<GridPos>,
        max_expansions: usize,
    ) -> StepDecision {
        let progressed = self.last_from != Some(from);
        self.last_from = Some(from);
        if progressed {
            self.failed_plans = 0;
        }

        let Some(goal) = self.goal else {
            self.failed_plans += 1;
            return StepDecision::Blocked;
        };

        if goal.is_satisfied(from, ctx) {
            self.clear_path();
            self.failed_plans = 0;
            return StepDecision::Arrived;
        }

        // The previous step may have completed since the last call
        if self.path.get(self.cursor + 1) == Some(&from) {
            self.cursor += 1;
        }

        if let Some(reason) = self.replan_reason(goal, ctx, from, obstacles) {
            trace!(?reason, %from, "replanning path");
            if !self.plan(goal, ctx, from, obstacles, max_expansions) {
                self.failed_plans += 1;
                return StepDecision::Blocked;
            }
        }

        match self.path.get(self.cursor + 1) {
            Some(next) => {
                if !progressed {
                    self.failed_plans += 1;
                }
                StepDecision::Step(*next)
            }
            None => {
                self.failed_plans += 1;
                StepDecision::Blocked
            }
        }
    }

    fn replan_reason(
        &self,
        goal: PathGoal,
        ctx: &GoalContext<'_>,
        from: GridPos,
        obstacles: &AHashSet<GridPos>,
    ) -> Option<ReplanReason> {
        if self.path.is_empty() {
            return Some(ReplanReason::NoPath);
        }
        if self.dirty {
            return Some(ReplanReason::Invalidated);
        }
        if self.path.get(self.cursor) != Some(&from) {
            return Some(ReplanReason::Diverged);
        }
        if self.cursor + 1 >= self.path.len() {
            return Some(ReplanReason::Exhausted);
        }
        if self.remaining().iter().any(|p| obstacles.contains(p)) {
            return Some(ReplanReason::Obstructed);
        }
        if goal.is_dynamic() {
            let end = self.path[self.path.len() - 1];
            if !goal.is_satisfied(end, ctx) {
                return Some(ReplanReason::GoalMoved);
            }
        }
        None
    }

    /// Compute a fresh path, returns false when there is nowhere to go
    fn plan(
        &mut self,
        goal: PathGoal,
        ctx: &GoalContext<'_>,
        from: GridPos,
        obstacles: &AHashSet<GridPos>,
        max_expansions: usize,
    ) -> bool {
        self.clear_path();
        self.replans += 1;

        let Some(targets) = goal.candidates(ctx) else {
            return false;
        };
        let request = PathRequest::new(from, &targets)
            .partial(self.allow_partial)
            .blocking(obstacles)
            .max_expansions(if max_expansions == 0 { DEFAULT_MAX_EXPANSIONS } else { max_expansions });
        let result = find_path_to_any(ctx.grid, &request);

        if result.path.len() < 2 {
            return false;
        }
        self.path = result.path;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BeingId;
    use crate::world::grid::NavGrid;
    use crate::world::structures::Structures;

    fn no_beings(_: BeingId) -> Option<GridPos> {
        None
    }

    #[test]
    fn test_reuses_cached_path() {
        let grid = NavGrid::new(10, 3);
        let structures = Structures::new();
        let ctx = GoalContext { grid: &grid, structures: &structures, locate_being: &no_beings };
        let obstacles = AHashSet::new();
        let mut finder = Pathfinder::with_goal(PathGoal::Position(GridPos::new(4, 1)));

        let mut pos = GridPos::new(0, 1);
        while let StepDecision::Step(next) = finder.next_step(&ctx, pos, &obstacles, 0) {
            pos = next;
        }

        assert_eq!(pos, GridPos::new(4, 1));
        assert_eq!(finder.replans(), 1);
        assert_eq!(finder.next_step(&ctx, pos, &obstacles, 0), StepDecision::Arrived);
    }

    #[test]
    fn test_failed_move_keeps_same_step() {
        let grid = NavGrid::new(10, 3);
        let structures = Structures::new();
        let ctx = GoalContext { grid: &grid, structures: &structures, locate_being: &no_beings };
        let obstacles = AHashSet::new();
        let mut finder = Pathfinder::with_goal(PathGoal::Position(GridPos::new(5, 1)));

        let from = GridPos::new(0, 1);
        let first = finder.next_step(&ctx, from, &obstacles, 0);
        let again = finder.next_step(&ctx, from, &obstacles, 0);

        assert_eq!(first, again);
        assert_eq!(finder.replans(), 1);
    }

    #[test]
    fn test_replans_around_new_obstacle() {
        let grid = NavGrid::new(10, 5);
        let structures = Structures::new();
        let ctx = GoalContext { grid: &grid, structures: &structures, locate_being: &no_beings };
        let mut finder = Pathfinder::with_goal(PathGoal::Position(GridPos::new(6, 2)));
        let from = GridPos::new(0, 2);

        let StepDecision::Step(_) = finder.next_step(&ctx, from, &AHashSet::new(), 0) else {
            panic!("expected a step");
        };
        let blocker = finder.remaining()[1];
        let obstacles: AHashSet<GridPos> = [blocker].into_iter().collect();

        let _ = finder.next_step(&ctx, from, &obstacles, 0);
        assert_eq!(finder.replans(), 2);
        assert!(!finder.remaining().contains(&blocker));
    }

    #[test]
    fn test_unreachable_counts_failures() {
        let grid = NavGrid::from_ascii(&["..#..", "..#..", "..#.."]);
        let structures = Structures::new();
        let ctx = GoalContext { grid: &grid, structures: &structures, locate_being: &no_beings };
        let obstacles = AHashSet::new();
        let mut finder = Pathfinder::with_goal(PathGoal::Position(GridPos::new(4, 1))).require_complete_path();

        for _ in 0..3 {
            assert_eq!(finder.next_step(&ctx, GridPos::new(0, 1), &obstacles, 0), StepDecision::Blocked);
        }
        assert_eq!(finder.failed_plans(), 3);
    }

    #[test]
    fn test_only_progress_clears_failures() {
        let grid = NavGrid::new(10, 3);
        let structures = Structures::new();
        let ctx = GoalContext { grid: &grid, structures: &structures, locate_being: &no_beings };
        let obstacles = AHashSet::new();
        let mut finder = Pathfinder::with_goal(PathGoal::Position(GridPos::new(6, 1)));
        let from = GridPos::new(0, 1);

        // Same step handed out while the owner stays put
        for _ in 0..4 {
            assert_eq!(finder.next_step(&ctx, from, &obstacles, 0), StepDecision::Step(GridPos::new(1, 1)));
        }
        assert_eq!(finder.failed_plans(), 3);
        assert!(finder.is_stuck(3));

        let _ = finder.next_step(&ctx, GridPos::new(1, 1), &obstacles, 0);
        assert_eq!(finder.failed_plans(), 0);
        assert!(!finder.is_stuck(1));
    }

    #[test]
    fn test_goal_change_resets_plan() {
        let grid = NavGrid::new(10, 10);
        let structures = Structures::new();
        let ctx = GoalContext { grid: &grid, structures: &structures, locate_being: &no_beings };
        let obstacles = AHashSet::new();
        let mut finder = Pathfinder::with_goal(PathGoal::Position(GridPos::new(9, 0)));

        let _ = finder.next_step(&ctx, GridPos::new(0, 0), &obstacles, 0);
        finder.set_goal(PathGoal::Position(GridPos::new(0, 9)));
        assert!(finder.path().is_empty());

        let StepDecision::Step(next) = finder.next_step(&ctx, GridPos::new(0, 0), &obstacles, 0) else {
            panic!("expected a step");
        };
        assert_eq!(next, GridPos::new(0, 1));
    }
}
