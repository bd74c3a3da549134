//! Movement controller - one grid step at a time, interpolated
//!
//! The grid position is authoritative and changes the moment a step is
//! accepted; the world position trails behind, catching up as movement
//! points accumulate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{BeingId, Facing, GridPos, Vec2};
use crate::world::CellOccupancy;

/// Why a step was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MoveRejection {
    #[error("{to} is not adjacent to {from}")]
    NotAdjacent { from: GridPos, to: GridPos },

    #[error("previous step still in progress")]
    InProgress,

    #[error("{0} is not walkable")]
    NotWalkable(GridPos),

    #[error("{pos} is occupied by {by:?}")]
    Occupied { pos: GridPos, by: BeingId },
}

/// Last step refused because another being stood in the way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedMove {
    pub target: GridPos,
    pub by: BeingId,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct StepInProgress {
    from: Vec2,
    to: GridPos,
    cost: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementController {
    grid_pos: GridPos,
    world_pos: Vec2,
    step: Option<StepInProgress>,
    /// Accumulated budget; overflow past a step's cost carries over
    points: f32,
    facing: Facing,
    blocked: Option<BlockedMove>,
}

impl MovementController {
    pub fn new(pos: GridPos) -> Self {
        Self {
            grid_pos: pos,
            world_pos: pos.to_vec2(),
            step: None,
            points: 0.0,
            facing: Facing::default(),
            blocked: None,
        }
    }

    pub fn grid_pos(&self) -> GridPos {
        self.grid_pos
    }

    pub fn world_pos(&self) -> Vec2 {
        self.world_pos
    }

    pub fn is_moving(&self) -> bool {
        self.step.is_some()
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn blocked(&self) -> Option<BlockedMove> {
        self.blocked
    }

    /// Hand the blocker record to the decision layer, once
    pub fn take_blocked(&mut self) -> Option<BlockedMove> {
        self.blocked.take()
    }

    /// Fraction of the current step covered, 1.0 when standing still
    pub fn progress(&self) -> f32 {
        match self.step {
            Some(step) => (self.points / step.cost).min(1.0),
            None => 1.0,
        }
    }

    /// Base step cost times the average difficulty of both cells
    pub fn step_cost<O: CellOccupancy + ?Sized>(cells: &O, from: GridPos, to: GridPos) -> f32 {
        let base = if from.is_diagonal_to(&to) {
            std::f32::consts::SQRT_2
        } else {
            1.0
        };
        base * (cells.terrain_difficulty(from) + cells.terrain_difficulty(to)) * 0.5
    }

    /// Start a step into an adjacent cell
    ///
    /// On success the occupancy is moved right away and the step cost is
    /// returned. A step into a cell held by another being records the blocker
    /// for the next think instead of retrying.
    pub fn try_step<O: CellOccupancy + ?Sized>(
        &mut self,
        owner: BeingId,
        target: GridPos,
        cells: &mut O,
    ) -> Result<f32, MoveRejection> {
        let from = self.grid_pos;
        if from.chebyshev(&target) != 1 {
            return Err(MoveRejection::NotAdjacent { from, to: target });
        }
        if self.step.is_some() {
            return Err(MoveRejection::InProgress);
        }
        if let Some(other) = cells.occupant_at(target).filter(|b| *b != owner) {
            self.blocked = Some(BlockedMove { target, by: other });
            return Err(MoveRejection::Occupied { pos: target, by: other });
        }
        if !cells.is_cell_walkable(target) {
            return Err(MoveRejection::NotWalkable(target));
        }

        let cost = Self::step_cost(cells, from, target);
        cells.remove_entity(from, owner);
        cells.add_entity(target, owner);

        if target.x > from.x {
            self.facing = Facing::Right;
        } else if target.x < from.x {
            self.facing = Facing::Left;
        }
        self.step = Some(StepInProgress {
            from: self.world_pos,
            to: target,
            cost,
        });
        self.grid_pos = target;
        self.blocked = None;
        Ok(cost)
    }

    /// Add one tick's movement budget, returns true when a step finished
    pub fn advance(&mut self, points_per_tick: f32) -> bool {
        let Some(step) = self.step else {
            return false;
        };
        self.points += points_per_tick;

        if self.points >= step.cost {
            self.points -= step.cost;
            self.world_pos = step.to.to_vec2();
            self.step = None;
            true
        } else {
            self.world_pos = step.from.lerp(&step.to.to_vec2(), self.points / step.cost);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::grid::NavGrid;
    use crate::world::occupancy::{Occupancy, Occupant};
    use proptest::prelude::*;

    /// Grid plus occupancy, as the world provides it
    struct Cells {
        grid: NavGrid,
        occupancy: Occupancy,
    }

    impl CellOccupancy for Cells {
        fn is_cell_walkable(&self, pos: GridPos) -> bool {
            self.grid.is_walkable(pos) && self.occupancy.being_at(pos).is_none()
        }
        fn terrain_difficulty(&self, pos: GridPos) -> f32 {
            self.grid.weight(pos)
        }
        fn occupant_at(&self, pos: GridPos) -> Option<BeingId> {
            self.occupancy.being_at(pos)
        }
        fn add_entity(&mut self, pos: GridPos, being: BeingId) {
            self.occupancy.add(pos, Occupant::Being(being));
        }
        fn remove_entity(&mut self, pos: GridPos, being: BeingId) -> bool {
            self.occupancy.remove(pos, &Occupant::Being(being))
        }
    }

    fn cells(rows: &[&str]) -> Cells {
        Cells {
            grid: NavGrid::from_ascii(rows),
            occupancy: Occupancy::new(),
        }
    }

    #[test]
    fn test_step_claims_cell_immediately() {
        let mut world = cells(&["...."]);
        let me = BeingId(1);
        world.add_entity(GridPos::new(0, 0), me);
        let mut mover = MovementController::new(GridPos::new(0, 0));

        let cost = mover.try_step(me, GridPos::new(1, 0), &mut world).unwrap();

        assert_eq!(cost, 1.0);
        assert_eq!(mover.grid_pos(), GridPos::new(1, 0));
        assert_eq!(world.occupant_at(GridPos::new(1, 0)), Some(me));
        assert_eq!(world.occupant_at(GridPos::new(0, 0)), None);
        assert!(mover.is_moving());
        assert_eq!(mover.world_pos(), Vec2::new(0.0, 0.0));
    }

    #[test]
    fn test_interpolation_and_overflow() {
        let mut world = cells(&["....."]);
        let me = BeingId(1);
        let mut mover = MovementController::new(GridPos::new(0, 0));
        mover.try_step(me, GridPos::new(1, 0), &mut world).unwrap();

        assert!(!mover.advance(0.4));
        assert!((mover.world_pos().x - 0.4).abs() < 1e-6);
        assert!(!mover.advance(0.4));
        assert!(mover.advance(0.4));
        assert_eq!(mover.world_pos(), Vec2::new(1.0, 0.0));

        // 0.2 carried into the next step
        mover.try_step(me, GridPos::new(2, 0), &mut world).unwrap();
        assert!(!mover.advance(0.4));
        assert!((mover.world_pos().x - 1.6).abs() < 1e-5);
    }

    #[test]
    fn test_rejects_long_jump_and_busy_mover() {
        let mut world = cells(&["....."]);
        let me = BeingId(1);
        let mut mover = MovementController::new(GridPos::new(0, 0));

        assert!(matches!(
            mover.try_step(me, GridPos::new(2, 0), &mut world),
            Err(MoveRejection::NotAdjacent { .. })
        ));
        assert!(matches!(
            mover.try_step(me, GridPos::new(0, 0), &mut world),
            Err(MoveRejection::NotAdjacent { .. })
        ));

        mover.try_step(me, GridPos::new(1, 0), &mut world).unwrap();
        assert_eq!(mover.try_step(me, GridPos::new(2, 0), &mut world), Err(MoveRejection::InProgress));
    }

    #[test]
    fn test_records_blocking_being() {
        let mut world = cells(&["..#"]);
        let me = BeingId(1);
        let other = BeingId(2);
        world.add_entity(GridPos::new(1, 0), other);
        let mut mover = MovementController::new(GridPos::new(0, 0));

        let err = mover.try_step(me, GridPos::new(1, 0), &mut world).unwrap_err();
        assert_eq!(err, MoveRejection::Occupied { pos: GridPos::new(1, 0), by: other });
        assert_eq!(mover.blocked(), Some(BlockedMove { target: GridPos::new(1, 0), by: other }));
        assert_eq!(mover.grid_pos(), GridPos::new(0, 0));
        assert_eq!(world.occupancy.total_beings(), 1);
    }

    #[test]
    fn test_rejects_wall_and_tracks_facing() {
        let mut world = cells(&["#..", "..."]);
        let me = BeingId(1);
        let mut mover = MovementController::new(GridPos::new(1, 0));

        assert_eq!(
            mover.try_step(me, GridPos::new(0, 0), &mut world),
            Err(MoveRejection::NotWalkable(GridPos::new(0, 0)))
        );

        mover.try_step(me, GridPos::new(0, 1), &mut world).unwrap();
        assert_eq!(mover.facing(), Facing::Left);
    }

    #[test]
    fn test_diagonal_mud_cost() {
        let mut world = cells(&[".~", ".."]);
        let mut mover = MovementController::new(GridPos::new(0, 1));
        let cost = mover.try_step(BeingId(1), GridPos::new(1, 0), &mut world).unwrap();
        assert!((cost - std::f32::consts::SQRT_2 * 1.5).abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn prop_only_adjacent_steps_are_accepted(dx in -4i32..=4, dy in -4i32..=4) {
            let mut world = cells(&["........."; 9]);
            let me = BeingId(1);
            let start = GridPos::new(4, 4);
            world.add_entity(start, me);
            let mut mover = MovementController::new(start);
            let target = start.offset(dx, dy);

            let result = mover.try_step(me, target, &mut world);
            if start.chebyshev(&target) == 1 {
                prop_assert!(result.is_ok());
                prop_assert_eq!(world.occupant_at(target), Some(me));
            } else {
                prop_assert!(matches!(result, Err(MoveRejection::NotAdjacent { .. })), "jump was not rejected");
                prop_assert_eq!(mover.grid_pos(), start);
                prop_assert_eq!(world.occupant_at(start), Some(me));
            }
        }
    }
}
