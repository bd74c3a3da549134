use serde::{Deserialize, Serialize};

use crate::behavior::action::ActionKind;
use crate::behavior::activity::{drive_nav, Activity, Step};
use crate::behavior::BehaviorContext;
use crate::core::types::FacilityId;
use crate::pathfinding::PathGoal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaulPhase {
    ToSource,
    Take,
    ToDestination,
    Deposit,
}

/// Carry items from one storage to another
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Haul {
    item: String,
    quantity: u32,
    from: FacilityId,
    to: FacilityId,
    phase: HaulPhase,
    take_attempted: bool,
    deposited: bool,
    nav: Option<Box<Activity>>,
}

impl Haul {
    pub fn new(item: impl Into<String>, quantity: u32, from: FacilityId, to: FacilityId) -> Self {
        Self {
            item: item.into(),
            quantity: quantity.max(1),
            from,
            to,
            phase: HaulPhase::ToSource,
            take_attempted: false,
            deposited: false,
            nav: None,
        }
    }

    pub fn item(&self) -> &str {
        &self.item
    }

    pub fn phase(&self) -> HaulPhase {
        self.phase
    }

    pub(crate) fn on_interrupt(&mut self) {
        self.nav = None;
        self.phase = match self.phase {
            HaulPhase::ToSource | HaulPhase::Take => HaulPhase::ToSource,
            HaulPhase::ToDestination | HaulPhase::Deposit => HaulPhase::ToDestination,
        };
    }

    pub(crate) fn step(&mut self, ctx: &mut BehaviorContext<'_>) -> Step {
        for _ in 0..4 {
            let carried = ctx.inventory.count(&self.item);
            match self.phase {
                HaulPhase::ToSource => {
                    if carried > 0 {
                        self.phase = HaulPhase::ToDestination;
                        continue;
                    }
                    if ctx.is_next_to(self.from) {
                        self.phase = HaulPhase::Take;
                        continue;
                    }
                    let goal = PathGoal::Facility { facility: self.from, strict: false };
                    return drive_nav(&mut self.nav, goal, ctx).into_step(|| {});
                }
                HaulPhase::Take => {
                    if self.take_attempted {
                        if carried == 0 {
                            return Step::Fail(format!("no {} at {:?}", self.item, self.from));
                        }
                        self.phase = HaulPhase::ToDestination;
                        continue;
                    }
                    self.take_attempted = true;
                    return Step::Act(ActionKind::TakeItem {
                        facility: self.from,
                        item: self.item.clone(),
                        quantity: self.quantity,
                    });
                }
                HaulPhase::ToDestination => {
                    if carried == 0 {
                        return Step::Fail(format!("lost the {}", self.item));
                    }
                    if ctx.is_next_to(self.to) {
                        self.phase = HaulPhase::Deposit;
                        continue;
                    }
                    let goal = PathGoal::Facility { facility: self.to, strict: false };
                    return drive_nav(&mut self.nav, goal, ctx).into_step(|| {});
                }
                HaulPhase::Deposit => {
                    if self.deposited {
                        return Step::Done;
                    }
                    self.deposited = true;
                    return Step::Act(ActionKind::DepositItem {
                        facility: self.to,
                        item: self.item.clone(),
                        quantity: carried,
                    });
                }
            }
        }
        Step::Wait
    }
}
