use serde::{Deserialize, Serialize};

use crate::behavior::action::ActionKind;
use crate::behavior::activity::{drive_nav, Activity, Step};
use crate::behavior::BehaviorContext;
use crate::core::types::FacilityId;
use crate::pathfinding::PathGoal;

/// Eat one portion, fetching it from a storage first when not carried
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Eat {
    source: Option<FacilityId>,
    item: String,
    take_attempted: bool,
    eaten: bool,
    nav: Option<Box<Activity>>,
}

impl Eat {
    pub fn new(source: Option<FacilityId>, item: impl Into<String>) -> Self {
        Self {
            source,
            item: item.into(),
            take_attempted: false,
            eaten: false,
            nav: None,
        }
    }

    pub fn item(&self) -> &str {
        &self.item
    }

    pub fn source(&self) -> Option<FacilityId> {
        self.source
    }

    pub(crate) fn on_interrupt(&mut self) {
        self.nav = None;
        self.take_attempted = false;
    }

    pub(crate) fn step(&mut self, ctx: &mut BehaviorContext<'_>) -> Step {
        if self.eaten {
            return Step::Done;
        }
        if ctx.inventory.count(&self.item) > 0 {
            self.eaten = true;
            return Step::Act(ActionKind::Consume { item: self.item.clone(), quantity: 1 });
        }

        let Some(source) = self.source else {
            return Step::Fail(format!("no {} to eat", self.item));
        };
        if !ctx.is_next_to(source) {
            let goal = PathGoal::Facility { facility: source, strict: false };
            return drive_nav(&mut self.nav, goal, ctx).into_step(|| {});
        }
        if self.take_attempted {
            return Step::Fail(format!("{} ran out at {:?}", self.item, source));
        }
        self.take_attempted = true;
        Step::Act(ActionKind::TakeItem { facility: source, item: self.item.clone(), quantity: 1 })
    }
}
