//! Decision layers: actions, activities, commands and traits
//!
//! Everything here runs inside a being's think on a worker thread. It reads
//! the shared world through [`WorldView`] and the being's own state through
//! [`BehaviorContext`], and expresses every change as an [`Action`].

pub mod action;
pub mod activity;
pub mod command;
pub mod traits;

use ahash::AHashSet;
use rand_chacha::ChaCha8Rng;

use crate::content::ItemStack;
use crate::core::types::{BeingId, FacilityId, GridPos};
use crate::entity::inventory::Inventory;
use crate::entity::needs::Needs;
use crate::pathfinding::{GoalContext, Pathfinder, StepDecision};
use crate::perception::{Memory, Perception};
use crate::world::observation::Subject;
use crate::world::structures::Facility;
use crate::world::WorldView;

pub use action::{priority, Action, ActionKind, ActionOutcome, ActionSource};
pub use activity::{Activity, ActivityState, ActivityTag};
pub use command::{Command, CommandKind, CommandState};
pub use traits::{BeingTrait, Urgency};

/// What one being knows and owns while deciding
pub struct BehaviorContext<'a> {
    pub me: BeingId,
    /// Position snapshot taken before the think fan-out
    pub pos: GridPos,
    /// A step is still being interpolated; new moves would be refused
    pub is_moving: bool,
    pub view: &'a WorldView<'a>,
    pub perception: &'a Perception,
    pub memory: &'a Memory,
    pub inventory: &'a Inventory,
    pub needs: &'a Needs,
    /// Cells held by sensed beings, plus the cell a refused step ran into
    pub obstacles: &'a AHashSet<GridPos>,
    pub current_activity: Option<ActivityTag>,
    pub rng: &'a mut ChaCha8Rng,
}

impl<'a> BehaviorContext<'a> {
    /// Where a being is now, or where it was last sensed
    pub fn locate_being(&self, id: BeingId) -> Option<GridPos> {
        self.perception
            .locate_being(id)
            .or_else(|| self.memory.last_known(Subject::Being(id)).map(|r| r.pos))
    }

    /// Advance a pathfinder from the current position
    pub fn next_step(&self, pathfinder: &mut Pathfinder) -> StepDecision {
        let locate = |id: BeingId| self.locate_being(id);
        let goals = GoalContext {
            grid: &self.view.env.grid,
            structures: &self.view.env.structures,
            locate_being: &locate,
        };
        pathfinder.next_step(&goals, self.pos, self.obstacles, self.view.config.max_path_expansions)
    }

    pub fn facility(&self, id: FacilityId) -> Option<&'a Facility> {
        self.view.env.structures.facility(id)
    }

    pub fn is_next_to(&self, facility: FacilityId) -> bool {
        self.facility(facility)
            .is_some_and(|f| f.pos.chebyshev(&self.pos) <= 1)
    }

    /// Storage contents as currently seen, else as remembered
    pub fn known_contents(&self, facility: FacilityId) -> Option<&'a [ItemStack]> {
        let seen = self
            .perception
            .facilities()
            .find(|(id, _)| *id == facility)
            .and_then(|(_, obj)| obj.contents.as_deref());
        seen.or_else(|| self.memory.storage(facility).map(|r| r.contents.as_slice()))
    }

    pub fn known_count(&self, facility: FacilityId, item: &str) -> u32 {
        self.known_contents(facility)
            .map(|stacks| stacks.iter().filter(|s| s.item == item).map(|s| s.quantity).sum())
            .unwrap_or(0)
    }
}

/// Owned pieces of a think for driving plans directly in tests
#[cfg(test)]
pub(crate) struct ThinkScratch {
    pub pos: GridPos,
    pub perception: Perception,
    pub memory: Memory,
    pub inventory: Inventory,
    pub needs: Needs,
    pub obstacles: AHashSet<GridPos>,
    pub rng: ChaCha8Rng,
}

#[cfg(test)]
impl ThinkScratch {
    pub fn at(pos: GridPos) -> Self {
        use rand::SeedableRng;
        Self {
            pos,
            perception: Perception::empty(BeingId(0), pos, 0),
            memory: Memory::new(1000),
            inventory: Inventory::new(),
            needs: Needs::default(),
            obstacles: AHashSet::new(),
            rng: ChaCha8Rng::seed_from_u64(7),
        }
    }

    pub fn context<'a>(&'a mut self, view: &'a WorldView<'a>) -> BehaviorContext<'a> {
        BehaviorContext {
            me: BeingId(0),
            pos: self.pos,
            is_moving: false,
            view,
            perception: &self.perception,
            memory: &self.memory,
            inventory: &self.inventory,
            needs: &self.needs,
            obstacles: &self.obstacles,
            current_activity: None,
            rng: &mut self.rng,
        }
    }
}
