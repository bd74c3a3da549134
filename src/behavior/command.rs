//! Commands - directives issued from outside a being's own logic
//!
//! Commands sit above activities: while one is active it is polled first and
//! its action wins. Each command owns its pathfinder.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::behavior::action::{priority, ActionKind};
use crate::behavior::BehaviorContext;
use crate::core::types::{BeingId, CommandId, GridPos, Tick};
use crate::pathfinding::{PathGoal, Pathfinder, StepDecision};

/// Chance per tick that an idle guard takes a patrol step
const PATROL_CHANCE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    MoveTo(GridPos),
    /// Stay within `distance` cells of another being
    Follow { target: BeingId, distance: i32 },
    /// Hold position near an anchor, patrolling within `radius`
    Guard { anchor: GridPos, radius: i32 },
    /// Drop the active command and everything queued
    Cancel,
}

impl CommandKind {
    /// Complex commands need a mind to carry out
    pub fn is_complex(&self) -> bool {
        matches!(self, CommandKind::Follow { .. } | CommandKind::Guard { .. })
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CommandKind::MoveTo(_) => "Moving (ordered)",
            CommandKind::Follow { .. } => "Following",
            CommandKind::Guard { .. } => "Guarding",
            CommandKind::Cancel => "Cancelling",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandState {
    Pending,
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub id: CommandId,
    pub kind: CommandKind,
    pub commander: Option<BeingId>,
    pub issued_at: Tick,
    state: CommandState,
    pathfinder: Pathfinder,
}

impl Command {
    pub fn new(id: CommandId, kind: CommandKind, commander: Option<BeingId>, issued_at: Tick) -> Self {
        Self {
            id,
            kind,
            commander,
            issued_at,
            state: CommandState::Pending,
            pathfinder: Pathfinder::new(),
        }
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    pub fn is_complex(&self) -> bool {
        self.kind.is_complex()
    }

    pub fn display_name(&self) -> &'static str {
        self.kind.display_name()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, CommandState::Completed | CommandState::Failed)
    }

    /// Poll for this tick's action and its priority
    ///
    /// `None` means the command finished (or failed) this tick and the layers
    /// below get the turn.
    pub fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Option<(ActionKind, i32)> {
        if self.is_finished() {
            return None;
        }
        self.state = CommandState::Active;

        match self.kind {
            CommandKind::MoveTo(target) => {
                self.pathfinder.set_goal(PathGoal::Position(target));
                self.walk(ctx, true)
            }
            CommandKind::Follow { target, distance } => {
                if ctx.locate_being(target).is_none() {
                    debug!(being = ?ctx.me, ?target, "lost track of follow target");
                    self.state = CommandState::Failed;
                    return None;
                }
                self.pathfinder.set_goal(PathGoal::NearBeing { being: target, range: distance });
                self.walk(ctx, false)
            }
            CommandKind::Guard { anchor, radius } => {
                if ctx.pos.chebyshev(&anchor) > radius.max(0) {
                    self.pathfinder.set_goal(PathGoal::Position(anchor));
                    return self.walk(ctx, false);
                }
                Some(self.patrol(ctx, anchor, radius))
            }
            CommandKind::Cancel => {
                self.state = CommandState::Completed;
                None
            }
        }
    }

    /// Follow the pathfinder; `finish_on_arrival` ends the command on arrival
    fn walk(&mut self, ctx: &mut BehaviorContext<'_>, finish_on_arrival: bool) -> Option<(ActionKind, i32)> {
        if ctx.is_moving {
            return Some((ActionKind::Idle, priority::DEFAULT));
        }
        let decision = ctx.next_step(&mut self.pathfinder);
        if decision != StepDecision::Arrived && self.pathfinder.is_stuck(ctx.view.config.stuck_threshold_ticks) {
            debug!(being = ?ctx.me, command = ?self.id, attempts = self.pathfinder.failed_plans(), "command gave up, stuck");
            self.state = CommandState::Failed;
            return None;
        }
        match decision {
            StepDecision::Step(to) => Some((ActionKind::Move { to }, priority::COMMAND)),
            StepDecision::Arrived if finish_on_arrival => {
                self.state = CommandState::Completed;
                None
            }
            StepDecision::Arrived | StepDecision::Blocked => Some((ActionKind::Idle, priority::DEFAULT)),
        }
    }

    fn patrol(&mut self, ctx: &mut BehaviorContext<'_>, anchor: GridPos, radius: i32) -> (ActionKind, i32) {
        if ctx.is_moving || !ctx.rng.gen_bool(PATROL_CHANCE) {
            return (ActionKind::Idle, priority::DEFAULT);
        }
        let options: Vec<GridPos> = ctx
            .pos
            .neighbors()
            .into_iter()
            .filter(|p| {
                p.chebyshev(&anchor) <= radius
                    && ctx.view.env.grid.is_walkable(*p)
                    && !ctx.obstacles.contains(p)
            })
            .collect();
        if options.is_empty() {
            return (ActionKind::Idle, priority::DEFAULT);
        }
        let to = options[ctx.rng.gen_range(0..options.len())];
        (ActionKind::Move { to }, priority::COMMAND)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::behavior::ThinkScratch;
    use crate::content::ContentRegistry;
    use crate::core::config::SimulationConfig;
    use crate::world::{NavGrid, World};

    fn world(rows: &[&str]) -> World {
        World::new(
            NavGrid::from_ascii(rows),
            Arc::new(ContentRegistry::with_defaults()),
            SimulationConfig::default(),
        )
    }

    fn move_to(target: GridPos) -> Command {
        Command::new(CommandId(1), CommandKind::MoveTo(target), None, 0)
    }

    #[test]
    fn test_move_to_fails_on_threshold_attempt() {
        let world = world(&["..#.."]);
        let view = world.view();
        let threshold = view.config.stuck_threshold_ticks;
        let mut scratch = ThinkScratch::at(GridPos::new(1, 0));
        let mut ctx = scratch.context(&view);
        let mut command = move_to(GridPos::new(4, 0));

        for _ in 1..threshold {
            assert!(matches!(command.update(&mut ctx), Some((ActionKind::Idle, priority::DEFAULT))));
            assert_eq!(command.state(), CommandState::Active);
        }
        assert!(command.update(&mut ctx).is_none());
        assert_eq!(command.state(), CommandState::Failed);
        assert!(command.is_finished());
    }

    #[test]
    fn test_refused_step_counts_as_stuck() {
        // The step is handed out every time but the owner never gets anywhere
        let world = world(&["......"]);
        let view = world.view();
        let threshold = view.config.stuck_threshold_ticks;
        let mut scratch = ThinkScratch::at(GridPos::new(0, 0));
        let mut ctx = scratch.context(&view);
        let mut command = move_to(GridPos::new(5, 0));

        let mut steps = 0;
        while let Some((kind, _)) = command.update(&mut ctx) {
            assert!(matches!(kind, ActionKind::Move { to } if to == GridPos::new(1, 0)));
            steps += 1;
            assert!(steps <= threshold, "never gave up");
        }
        assert_eq!(command.state(), CommandState::Failed);
        assert_eq!(steps, threshold);
    }

    #[test]
    fn test_move_to_completes_on_arrival() {
        let world = world(&["...."]);
        let view = world.view();
        let mut scratch = ThinkScratch::at(GridPos::new(2, 0));
        let mut ctx = scratch.context(&view);
        let mut command = move_to(GridPos::new(2, 0));

        assert!(command.update(&mut ctx).is_none());
        assert_eq!(command.state(), CommandState::Completed);
    }
}
