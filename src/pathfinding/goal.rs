//! Navigation goals and their resolution to candidate cells

use serde::{Deserialize, Serialize};

use crate::core::types::{BeingId, BuildingId, FacilityId, GridPos, RoomId};
use crate::world::grid::NavGrid;
use crate::world::structures::Structures;

/// Where a being wants to go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathGoal {
    /// A specific cell
    Position(GridPos),
    /// Any cell within `range` (Chebyshev) of another being, excluding its own
    NearBeing { being: BeingId, range: i32 },
    /// Inside a building; falls back to the ring around it when the interior
    /// has no walkable cell
    Building(BuildingId),
    /// Any walkable cell of a room
    Room(RoomId),
    /// Next to a facility; `strict` allows only the four cardinal neighbours
    Facility { facility: FacilityId, strict: bool },
}

/// Read-only world view needed to resolve goals
pub struct GoalContext<'a> {
    pub grid: &'a NavGrid,
    pub structures: &'a Structures,
    pub locate_being: &'a dyn Fn(BeingId) -> Option<GridPos>,
}

impl PathGoal {
    /// Cells that satisfy the goal
    ///
    /// `None` when the goal refers to something that no longer exists; an
    /// empty list when it exists but has no walkable cell next to it. A
    /// `Position` is kept even when unwalkable so a partial search can still
    /// head for the closest reachable cell.
    pub fn candidates(&self, ctx: &GoalContext<'_>) -> Option<Vec<GridPos>> {
        let walkable = |cells: Vec<GridPos>| -> Vec<GridPos> {
            cells.into_iter().filter(|p| ctx.grid.is_walkable(*p)).collect()
        };

        match *self {
            PathGoal::Position(pos) => Some(vec![pos]),
            PathGoal::NearBeing { being, range } => {
                let target = (ctx.locate_being)(being)?;
                let range = range.max(1);
                let mut cells = Vec::new();
                for dy in -range..=range {
                    for dx in -range..=range {
                        if dx != 0 || dy != 0 {
                            cells.push(target.offset(dx, dy));
                        }
                    }
                }
                Some(walkable(cells))
            }
            PathGoal::Building(id) => {
                let building = ctx.structures.building(id)?;
                let interior = walkable(building.interior());
                if interior.is_empty() {
                    Some(walkable(building.perimeter()))
                } else {
                    Some(interior)
                }
            }
            PathGoal::Room(id) => {
                let room = ctx.structures.room(id)?;
                Some(walkable(room.cells.clone()))
            }
            PathGoal::Facility { facility, strict } => {
                let pos = ctx.structures.facility(facility)?.pos;
                let cells = if strict {
                    pos.cardinal_neighbors().to_vec()
                } else {
                    pos.neighbors().to_vec()
                };
                Some(walkable(cells))
            }
        }
    }

    /// Whether standing on `pos` satisfies the goal
    pub fn is_satisfied(&self, pos: GridPos, ctx: &GoalContext<'_>) -> bool {
        match *self {
            PathGoal::Position(target) => pos == target,
            PathGoal::NearBeing { being, range } => (ctx.locate_being)(being)
                .map(|t| t != pos && t.chebyshev(&pos) <= range.max(1))
                .unwrap_or(false),
            PathGoal::Facility { facility, strict } => {
                ctx.structures.facility(facility).is_some_and(|f| {
                    let d = (f.pos.x - pos.x).abs() + (f.pos.y - pos.y).abs();
                    if strict {
                        d == 1
                    } else {
                        f.pos.chebyshev(&pos) == 1
                    }
                })
            }
            PathGoal::Building(_) | PathGoal::Room(_) => self
                .candidates(ctx)
                .map(|cells| cells.contains(&pos))
                .unwrap_or(false),
        }
    }

    /// Whether the goal moves on its own and its cells must be re-resolved
    pub fn is_dynamic(&self) -> bool {
        matches!(self, PathGoal::NearBeing { .. })
    }
}
