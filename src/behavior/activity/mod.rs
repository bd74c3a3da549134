//! Activities - multi-tick behavior state machines
//!
//! An activity is polled once per think and answers with the next action.
//! Each kind keeps its phase in a plain enum with phase-local fields, so the
//! whole thing serializes and can be inspected between ticks. Composite
//! activities drive a nested navigation activity as one of their phases.

mod craft;
mod eat;
mod farm;
mod haul;
mod navigate;
mod sleep;
mod work;

pub use craft::{Craft, CraftPhase};
pub use eat::Eat;
pub use farm::{FarmCycle, FarmPhase};
pub use haul::{Haul, HaulPhase};
pub use navigate::Navigate;
pub use sleep::Sleep;
pub use work::WorkShift;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::behavior::action::{priority, ActionKind};
use crate::behavior::BehaviorContext;
use crate::content::RecipeDef;
use crate::core::types::{BuildingId, FacilityId};
use crate::entity::needs::NeedMultipliers;
use crate::pathfinding::PathGoal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityState {
    Running,
    Completed,
    Failed,
    /// Preempted and waiting on the suspended stack
    Interrupted,
}

/// Kind of an activity, for decisions that only care what is going on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityTag {
    Navigate,
    Work,
    Eat,
    Sleep,
    Craft,
    Haul,
    Farm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Plan {
    Navigate(Navigate),
    Work(WorkShift),
    Eat(Eat),
    Sleep(Sleep),
    Craft(Craft),
    Haul(Haul),
    Farm(FarmCycle),
}

/// What a plan wants this tick
pub(crate) enum Step {
    Act(ActionKind),
    /// Nothing to do but hold the turn (becomes an Idle action)
    Wait,
    Done,
    Fail(String),
}

/// Result of polling a nested activity
pub(crate) enum SubStep {
    Running(ActionKind),
    Finished,
    Failed(String),
}

impl SubStep {
    /// Map onto the parent's step; `on_finish` advances the parent's phase.
    ///
    /// A nested activity that finishes without an action still holds the
    /// parent's turn with an Idle, so lower layers cannot take it.
    pub(crate) fn into_step(self, on_finish: impl FnOnce()) -> Step {
        match self {
            SubStep::Running(kind) => Step::Act(kind),
            SubStep::Finished => {
                on_finish();
                Step::Wait
            }
            SubStep::Failed(reason) => Step::Fail(reason),
        }
    }
}

/// Poll a navigation sub-activity, creating it on first use
///
/// The slot is emptied once the sub-activity ends so the next leg starts
/// with a fresh path.
pub(crate) fn drive_nav(
    slot: &mut Option<Box<Activity>>,
    goal: PathGoal,
    ctx: &mut BehaviorContext<'_>,
) -> SubStep {
    let sub = slot.get_or_insert_with(|| Box::new(Activity::navigate(goal)));
    let result = match sub.update(ctx) {
        Some(kind) => SubStep::Running(kind),
        None if sub.state() == ActivityState::Completed => SubStep::Finished,
        None => SubStep::Failed(sub.failure().unwrap_or("navigation failed").to_string()),
    };
    if !matches!(result, SubStep::Running(_)) {
        *slot = None;
    }
    result
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    state: ActivityState,
    priority: i32,
    plan: Plan,
    failure: Option<String>,
}

impl Activity {
    fn from_plan(plan: Plan) -> Self {
        Self {
            state: ActivityState::Running,
            priority: priority::DEFAULT,
            plan,
            failure: None,
        }
    }

    pub fn navigate(goal: PathGoal) -> Self {
        Self::from_plan(Plan::Navigate(Navigate::new(goal)))
    }

    pub fn work(facility: FacilityId, ticks: u32) -> Self {
        Self::from_plan(Plan::Work(WorkShift::new(facility, ticks)))
    }

    pub fn eat(source: Option<FacilityId>, item: impl Into<String>) -> Self {
        Self::from_plan(Plan::Eat(Eat::new(source, item)))
    }

    pub fn sleep(bed: Option<BuildingId>) -> Self {
        Self::from_plan(Plan::Sleep(Sleep::new(bed)))
    }

    pub fn craft(recipe: &RecipeDef, workshop: FacilityId, source: Option<FacilityId>) -> Self {
        Self::from_plan(Plan::Craft(Craft::new(recipe, workshop, source)))
    }

    pub fn haul(item: impl Into<String>, quantity: u32, from: FacilityId, to: FacilityId) -> Self {
        Self::from_plan(Plan::Haul(Haul::new(item, quantity, from, to)))
    }

    pub fn farm_cycle(field: FacilityId, home: FacilityId, shift_ticks: u32) -> Self {
        Self::from_plan(Plan::Farm(FarmCycle::new(field, home, shift_ticks)))
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn state(&self) -> ActivityState {
        self.state
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, ActivityState::Completed | ActivityState::Failed)
    }

    pub fn tag(&self) -> ActivityTag {
        match self.plan {
            Plan::Navigate(_) => ActivityTag::Navigate,
            Plan::Work(_) => ActivityTag::Work,
            Plan::Eat(_) => ActivityTag::Eat,
            Plan::Sleep(_) => ActivityTag::Sleep,
            Plan::Craft(_) => ActivityTag::Craft,
            Plan::Haul(_) => ActivityTag::Haul,
            Plan::Farm(_) => ActivityTag::Farm,
        }
    }

    /// Text for the HUD
    pub fn display_name(&self) -> String {
        match &self.plan {
            Plan::Navigate(_) => "Walking".to_string(),
            Plan::Work(_) => "Working".to_string(),
            Plan::Eat(eat) => format!("Eating {}", eat.item()),
            Plan::Sleep(_) => "Sleeping".to_string(),
            Plan::Craft(craft) => format!("Crafting {}", craft.recipe()),
            Plan::Haul(haul) => format!("Hauling {}", haul.item()),
            Plan::Farm(farm) => format!("Farming ({})", farm.phase().label()),
        }
    }

    pub fn need_decay_multiplier(&self) -> NeedMultipliers {
        match &self.plan {
            Plan::Navigate(_) | Plan::Eat(_) => NeedMultipliers::NORMAL,
            Plan::Work(_) | Plan::Farm(_) => NeedMultipliers::new(1.5, 1.5),
            Plan::Craft(_) => NeedMultipliers::new(1.2, 1.2),
            Plan::Haul(_) => NeedMultipliers::new(1.0, 1.3),
            Plan::Sleep(_) => NeedMultipliers::new(0.5, 0.0),
        }
    }

    /// Whether an interruption can be resumed later instead of dropped
    pub fn is_resumable(&self) -> bool {
        !matches!(self.plan, Plan::Navigate(_))
    }

    /// Poll for this tick's action; `None` once the activity has ended
    pub fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Option<ActionKind> {
        if self.state != ActivityState::Running {
            return None;
        }

        let step = match &mut self.plan {
            Plan::Navigate(p) => p.step(ctx),
            Plan::Work(p) => p.step(ctx),
            Plan::Eat(p) => p.step(ctx),
            Plan::Sleep(p) => p.step(ctx),
            Plan::Craft(p) => p.step(ctx),
            Plan::Haul(p) => p.step(ctx),
            Plan::Farm(p) => p.step(ctx),
        };

        match step {
            Step::Act(kind) => Some(kind),
            Step::Wait => Some(ActionKind::Idle),
            Step::Done => {
                debug!(being = ?ctx.me, activity = %self.display_name(), "activity completed");
                self.state = ActivityState::Completed;
                None
            }
            Step::Fail(reason) => {
                warn!(being = ?ctx.me, activity = %self.display_name(), %reason, "activity failed");
                self.state = ActivityState::Failed;
                self.failure = Some(reason);
                None
            }
        }
    }

    /// Suspend in favour of something more urgent
    pub fn interrupt(&mut self) {
        if self.state != ActivityState::Running {
            return;
        }
        self.state = ActivityState::Interrupted;
        match &mut self.plan {
            Plan::Navigate(p) => p.invalidate(),
            Plan::Work(p) => p.on_interrupt(),
            Plan::Eat(p) => p.on_interrupt(),
            Plan::Sleep(p) => p.on_interrupt(),
            Plan::Craft(p) => p.on_interrupt(),
            Plan::Haul(p) => p.on_interrupt(),
            Plan::Farm(p) => p.on_interrupt(),
        }
    }

    /// Continue after an interruption
    ///
    /// Each kind regresses to a phase whose preconditions are re-checked.
    pub fn resume(&mut self) {
        if self.state != ActivityState::Interrupted {
            return;
        }
        self.state = ActivityState::Running;
    }

    /// Release anything held before the activity is dropped
    pub fn cleanup(&mut self) {
        if let Plan::Craft(craft) = &self.plan {
            if craft.holds_committed_inputs() {
                warn!(recipe = %craft.recipe(), "craft dropped after inputs were committed");
            }
        }
        match &mut self.plan {
            Plan::Navigate(p) => p.invalidate(),
            Plan::Work(p) => p.on_interrupt(),
            Plan::Eat(p) => p.on_interrupt(),
            Plan::Sleep(p) => p.on_interrupt(),
            Plan::Craft(p) => p.on_interrupt(),
            Plan::Haul(p) => p.on_interrupt(),
            Plan::Farm(p) => p.on_interrupt(),
        }
        if self.state == ActivityState::Running || self.state == ActivityState::Interrupted {
            self.state = ActivityState::Failed;
        }
    }
}
