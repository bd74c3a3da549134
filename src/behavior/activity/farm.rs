use serde::{Deserialize, Serialize};

use crate::behavior::action::ActionKind;
use crate::behavior::activity::{drive_nav, Activity, Step};
use crate::behavior::BehaviorContext;
use crate::core::types::FacilityId;
use crate::pathfinding::PathGoal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FarmPhase {
    GoToWorkplace,
    Working,
    TakeHarvest,
    GoHome,
    Deposit,
}

impl FarmPhase {
    pub fn label(&self) -> &'static str {
        match self {
            FarmPhase::GoToWorkplace => "going to the field",
            FarmPhase::Working => "working",
            FarmPhase::TakeHarvest => "harvesting",
            FarmPhase::GoHome => "going home",
            FarmPhase::Deposit => "storing the harvest",
        }
    }
}

/// Go to the field, work it until it yields, bring the harvest home
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmCycle {
    field: FacilityId,
    home: FacilityId,
    shift_ticks: u32,
    phase: FarmPhase,
    worked: u32,
    take_attempted: bool,
    deposit_attempted: bool,
    nav: Option<Box<Activity>>,
}

impl FarmCycle {
    pub fn new(field: FacilityId, home: FacilityId, shift_ticks: u32) -> Self {
        Self {
            field,
            home,
            shift_ticks,
            phase: FarmPhase::GoToWorkplace,
            worked: 0,
            take_attempted: false,
            deposit_attempted: false,
            nav: None,
        }
    }

    pub fn phase(&self) -> FarmPhase {
        self.phase
    }

    pub fn ticks_worked(&self) -> u32 {
        self.worked
    }

    /// Harvest carried or in flight: resume heading home. Otherwise start
    /// over from the walk to the field with a fresh path.
    pub(crate) fn on_interrupt(&mut self) {
        self.nav = None;
        self.take_attempted = false;
        self.deposit_attempted = false;
        self.phase = match self.phase {
            FarmPhase::GoToWorkplace | FarmPhase::Working | FarmPhase::TakeHarvest => FarmPhase::GoToWorkplace,
            FarmPhase::GoHome | FarmPhase::Deposit => FarmPhase::GoHome,
        };
    }

    pub(crate) fn step(&mut self, ctx: &mut BehaviorContext<'_>) -> Step {
        let Some(crop) = ctx
            .facility(self.field)
            .and_then(|f| f.work_site.as_ref())
            .map(|site| site.yield_item.clone())
        else {
            return Step::Fail(format!("{:?} is not a field", self.field));
        };
        if ctx.facility(self.home).is_none() {
            return Step::Fail(format!("home storage {:?} is gone", self.home));
        }

        for _ in 0..5 {
            let carried = ctx.inventory.count(&crop);
            match self.phase {
                FarmPhase::GoToWorkplace => {
                    if ctx.is_next_to(self.field) {
                        self.phase = FarmPhase::Working;
                        continue;
                    }
                    let goal = PathGoal::Facility { facility: self.field, strict: false };
                    return drive_nav(&mut self.nav, goal, ctx).into_step(|| {});
                }
                FarmPhase::Working => {
                    if !ctx.is_next_to(self.field) {
                        self.phase = FarmPhase::GoToWorkplace;
                        continue;
                    }
                    if ctx.known_count(self.field, &crop) > 0 {
                        self.phase = FarmPhase::TakeHarvest;
                        continue;
                    }
                    if self.worked >= self.shift_ticks {
                        return Step::Done;
                    }
                    self.worked += 1;
                    return Step::Act(ActionKind::Work { facility: self.field });
                }
                FarmPhase::TakeHarvest => {
                    if carried > 0 {
                        self.take_attempted = false;
                        self.phase = FarmPhase::GoHome;
                        continue;
                    }
                    if self.take_attempted {
                        // Someone else got there first
                        self.take_attempted = false;
                        self.phase = FarmPhase::Working;
                        return Step::Wait;
                    }
                    self.take_attempted = true;
                    let quantity = ctx.known_count(self.field, &crop).max(1);
                    return Step::Act(ActionKind::TakeItem { facility: self.field, item: crop, quantity });
                }
                FarmPhase::GoHome => {
                    if ctx.is_next_to(self.home) {
                        self.phase = FarmPhase::Deposit;
                        continue;
                    }
                    let goal = PathGoal::Facility { facility: self.home, strict: false };
                    return drive_nav(&mut self.nav, goal, ctx).into_step(|| {});
                }
                FarmPhase::Deposit => {
                    if carried == 0 {
                        return Step::Done;
                    }
                    if self.deposit_attempted {
                        return Step::Fail(format!("{:?} has no room for the {}", self.home, crop));
                    }
                    self.deposit_attempted = true;
                    return Step::Act(ActionKind::DepositItem { facility: self.home, item: crop, quantity: carried });
                }
            }
        }
        Step::Wait
    }
}
