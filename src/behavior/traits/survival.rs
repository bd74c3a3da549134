use ordered_float::OrderedFloat;

use crate::behavior::action::ActionKind;
use crate::behavior::activity::{Activity, ActivityTag};
use crate::behavior::traits::{BeingTrait, Urgency};
use crate::behavior::BehaviorContext;
use crate::core::error::Result;
use crate::core::types::{BuildingId, GridPos};
use crate::world::observation::EventKind;

/// Extra cells beyond a fire's radius that still count as danger
const FLEE_MARGIN: f32 = 3.0;

/// Eat when starving, sleep when exhausted
#[derive(Debug, Clone, Copy, Default)]
pub struct Survival {
    pub home: Option<BuildingId>,
}

impl Survival {
    pub fn new(home: Option<BuildingId>) -> Self {
        Self { home }
    }
}

impl BeingTrait for Survival {
    fn name(&self) -> &'static str {
        "survival"
    }

    fn urgency(&self) -> Urgency {
        Urgency::Interrupt
    }

    fn suggest_action(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<Option<ActionKind>> {
        let critical = ctx.view.config.critical_need;
        let busy_with = ctx.current_activity;

        if ctx.needs.hunger >= critical && busy_with != Some(ActivityTag::Eat) {
            let content = ctx.view.content;
            if let Some((item, _)) = ctx.inventory.find(|id| content.is_edible(id)) {
                return Ok(Some(start(Activity::eat(None, item))));
            }
            if let Some((facility, item)) = ctx.memory.nearest_food(content, ctx.pos) {
                return Ok(Some(start(Activity::eat(Some(facility), item))));
            }
        }

        if ctx.needs.fatigue >= critical && !matches!(busy_with, Some(ActivityTag::Sleep | ActivityTag::Eat)) {
            return Ok(Some(start(Activity::sleep(self.home))));
        }

        Ok(None)
    }
}

/// Run from fire, overriding even direct orders
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfPreservation;

impl BeingTrait for SelfPreservation {
    fn name(&self) -> &'static str {
        "self_preservation"
    }

    fn urgency(&self) -> Urgency {
        Urgency::Crucial
    }

    fn suggest_action(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<Option<ActionKind>> {
        let Some(fire) = ctx
            .perception
            .events()
            .iter()
            .filter(|e| e.event.kind == EventKind::Fire && e.distance <= e.event.radius + FLEE_MARGIN)
            .min_by_key(|e| OrderedFloat(e.distance))
        else {
            return Ok(None);
        };
        if ctx.is_moving {
            return Ok(None);
        }

        let danger = fire.event.pos;
        let here = ctx.pos.euclidean(&danger);
        let grid = &ctx.view.env.grid;
        let escape = ctx
            .pos
            .neighbors()
            .into_iter()
            .filter(|p| grid.is_walkable(*p) && !ctx.obstacles.contains(p))
            .map(|p| (p, p.euclidean(&danger)))
            .filter(|(_, d)| *d > here)
            .fold(None::<(GridPos, f32)>, |best, (p, d)| match best {
                Some((_, bd)) if bd >= d => best,
                _ => Some((p, d)),
            });

        Ok(escape.map(|(to, _)| ActionKind::Move { to }))
    }
}

fn start(activity: Activity) -> ActionKind {
    ActionKind::StartActivity(Box::new(activity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_tiers() {
        assert_eq!(SelfPreservation.urgency(), Urgency::Crucial);
        assert_eq!(Survival::new(None).urgency(), Urgency::Interrupt);
        assert_eq!(Urgency::Crucial.priority(), -10);
        assert!(Urgency::Interrupt.priority() < Urgency::Routine.priority());
    }
}
