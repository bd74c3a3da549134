use serde::{Deserialize, Serialize};

use crate::behavior::action::ActionKind;
use crate::behavior::activity::{drive_nav, Activity, Step};
use crate::behavior::BehaviorContext;
use crate::content::{ItemStack, RecipeDef};
use crate::core::types::FacilityId;
use crate::pathfinding::PathGoal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CraftPhase {
    /// Fetch missing inputs from the source storage
    Gather,
    ToWorkshop,
    /// Hand the inputs over (the point of no return)
    Commit,
    Crafting,
}

/// Gather inputs, carry them to a workshop, work the recipe, produce
///
/// Once inputs are committed they are gone from the inventory; an
/// interrupted craft then resumes by walking back to the workshop and
/// continuing its progress instead of gathering again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Craft {
    recipe: String,
    inputs: Vec<ItemStack>,
    outputs: Vec<ItemStack>,
    work_ticks: u32,
    workshop: FacilityId,
    source: Option<FacilityId>,
    phase: CraftPhase,
    committed: bool,
    produced: bool,
    progress: u32,
    /// Item requested from the source on the previous tick
    pending_take: Option<String>,
    nav: Option<Box<Activity>>,
}

impl Craft {
    pub fn new(recipe: &RecipeDef, workshop: FacilityId, source: Option<FacilityId>) -> Self {
        Self {
            recipe: recipe.id.clone(),
            inputs: recipe.inputs.clone(),
            outputs: recipe.outputs.clone(),
            work_ticks: recipe.work_ticks,
            workshop,
            source,
            phase: CraftPhase::Gather,
            committed: false,
            produced: false,
            progress: 0,
            pending_take: None,
            nav: None,
        }
    }

    pub fn recipe(&self) -> &str {
        &self.recipe
    }

    pub fn phase(&self) -> CraftPhase {
        self.phase
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub(crate) fn holds_committed_inputs(&self) -> bool {
        self.committed && !self.produced
    }

    pub(crate) fn on_interrupt(&mut self) {
        self.nav = None;
        self.pending_take = None;
        self.phase = if self.committed {
            CraftPhase::ToWorkshop
        } else {
            CraftPhase::Gather
        };
    }

    pub(crate) fn step(&mut self, ctx: &mut BehaviorContext<'_>) -> Step {
        // Phase changes that need no action fall through to the next phase
        for _ in 0..4 {
            match self.phase {
                CraftPhase::Gather => {
                    if self.committed || ctx.inventory.has_all(&self.inputs) {
                        self.pending_take = None;
                        self.phase = CraftPhase::ToWorkshop;
                        continue;
                    }
                    return self.gather(ctx);
                }
                CraftPhase::ToWorkshop => {
                    if ctx.facility(self.workshop).is_none() {
                        return Step::Fail(format!("workshop {:?} is gone", self.workshop));
                    }
                    if ctx.is_next_to(self.workshop) {
                        self.phase = if self.committed {
                            CraftPhase::Crafting
                        } else {
                            CraftPhase::Commit
                        };
                        continue;
                    }
                    let goal = PathGoal::Facility { facility: self.workshop, strict: false };
                    return drive_nav(&mut self.nav, goal, ctx).into_step(|| {});
                }
                CraftPhase::Commit => {
                    if !ctx.inventory.has_all(&self.inputs) {
                        self.phase = CraftPhase::Gather;
                        continue;
                    }
                    // Only this being's own actions touch its inventory, and
                    // this is its only action this tick
                    self.committed = true;
                    self.phase = CraftPhase::Crafting;
                    return Step::Act(ActionKind::CommitInputs { inputs: self.inputs.clone() });
                }
                CraftPhase::Crafting => {
                    if !ctx.is_next_to(self.workshop) {
                        self.phase = CraftPhase::ToWorkshop;
                        continue;
                    }
                    if self.progress < self.work_ticks {
                        self.progress += 1;
                        return Step::Act(ActionKind::Work { facility: self.workshop });
                    }
                    if self.produced {
                        return Step::Done;
                    }
                    self.produced = true;
                    return Step::Act(ActionKind::Produce {
                        facility: Some(self.workshop),
                        outputs: self.outputs.clone(),
                    });
                }
            }
        }
        Step::Wait
    }

    fn gather(&mut self, ctx: &mut BehaviorContext<'_>) -> Step {
        let Some(source) = self.source else {
            return Step::Fail(format!("missing inputs for {}", self.recipe));
        };
        let Some(missing) = self
            .inputs
            .iter()
            .find(|s| ctx.inventory.count(&s.item) < s.quantity)
            .cloned()
        else {
            return Step::Wait;
        };

        if !ctx.is_next_to(source) {
            let goal = PathGoal::Facility { facility: source, strict: false };
            return drive_nav(&mut self.nav, goal, ctx).into_step(|| {});
        }
        if self.pending_take.as_deref() == Some(missing.item.as_str()) {
            return Step::Fail(format!("{:?} is out of {}", source, missing.item));
        }

        let quantity = missing.quantity - ctx.inventory.count(&missing.item);
        self.pending_take = Some(missing.item.clone());
        Step::Act(ActionKind::TakeItem { facility: source, item: missing.item, quantity })
    }
}
