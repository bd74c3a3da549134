use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::behavior::action::ActionKind;
use crate::behavior::activity::{drive_nav, Activity, Step, SubStep};
use crate::behavior::BehaviorContext;
use crate::core::types::BuildingId;
use crate::pathfinding::PathGoal;

/// Fatigue at which a sleeper wakes up
const RESTED: f32 = 0.05;

/// Go home (if there is one) and rest until rested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sleep {
    bed: Option<BuildingId>,
    /// Reached the bed's goal cells (the perimeter, for buildings without
    /// a free interior cell)
    settled: bool,
    nav: Option<Box<Activity>>,
}

impl Sleep {
    pub fn new(bed: Option<BuildingId>) -> Self {
        Self { bed, settled: false, nav: None }
    }

    pub fn bed(&self) -> Option<BuildingId> {
        self.bed
    }

    pub(crate) fn on_interrupt(&mut self) {
        self.nav = None;
        self.settled = false;
    }

    pub(crate) fn step(&mut self, ctx: &mut BehaviorContext<'_>) -> Step {
        if let Some(bed) = self.bed {
            let at_home = ctx
                .view
                .env
                .structures
                .building(bed)
                .is_some_and(|b| b.contains(ctx.pos));
            if !at_home && !self.settled {
                match drive_nav(&mut self.nav, PathGoal::Building(bed), ctx) {
                    SubStep::Running(kind) => return Step::Act(kind),
                    SubStep::Finished => {
                        self.settled = true;
                        return Step::Wait;
                    }
                    SubStep::Failed(reason) => {
                        // Too tired to care: sleep where we stand
                        debug!(being = ?ctx.me, %reason, "cannot reach bed, sleeping rough");
                        self.bed = None;
                    }
                }
            }
        }

        if ctx.needs.fatigue <= RESTED {
            return Step::Done;
        }
        Step::Act(ActionKind::Rest)
    }
}
