use serde::{Deserialize, Serialize};

use crate::behavior::action::ActionKind;
use crate::behavior::activity::{drive_nav, Activity, Step};
use crate::behavior::BehaviorContext;
use crate::core::types::FacilityId;
use crate::pathfinding::PathGoal;

/// Walk to a facility and labour there for a number of ticks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkShift {
    facility: FacilityId,
    ticks: u32,
    done: u32,
    nav: Option<Box<Activity>>,
}

impl WorkShift {
    pub fn new(facility: FacilityId, ticks: u32) -> Self {
        Self {
            facility,
            ticks,
            done: 0,
            nav: None,
        }
    }

    pub fn facility(&self) -> FacilityId {
        self.facility
    }

    pub fn ticks_worked(&self) -> u32 {
        self.done
    }

    pub(crate) fn on_interrupt(&mut self) {
        self.nav = None;
    }

    pub(crate) fn step(&mut self, ctx: &mut BehaviorContext<'_>) -> Step {
        if ctx.facility(self.facility).is_none() {
            return Step::Fail(format!("facility {:?} is gone", self.facility));
        }
        if !ctx.is_next_to(self.facility) {
            let goal = PathGoal::Facility { facility: self.facility, strict: false };
            return drive_nav(&mut self.nav, goal, ctx).into_step(|| {});
        }
        if self.done >= self.ticks {
            return Step::Done;
        }
        self.done += 1;
        Step::Act(ActionKind::Work { facility: self.facility })
    }
}
