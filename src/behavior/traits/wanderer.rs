use rand::Rng;

use crate::behavior::action::ActionKind;
use crate::behavior::traits::BeingTrait;
use crate::behavior::BehaviorContext;
use crate::core::error::Result;
use crate::core::types::GridPos;

/// Drifts around aimlessly when there is nothing better to do
#[derive(Debug, Clone, Copy)]
pub struct Wanderer {
    /// Chance per idle tick of taking a step
    pub chance: f64,
}

impl Default for Wanderer {
    fn default() -> Self {
        Self { chance: 0.25 }
    }
}

impl BeingTrait for Wanderer {
    fn name(&self) -> &'static str {
        "wanderer"
    }

    fn suggest_action(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<Option<ActionKind>> {
        if ctx.current_activity.is_some() || ctx.is_moving || !ctx.rng.gen_bool(self.chance.clamp(0.0, 1.0)) {
            return Ok(None);
        }
        let grid = &ctx.view.env.grid;
        let options: Vec<GridPos> = ctx
            .pos
            .neighbors()
            .into_iter()
            .filter(|p| grid.is_walkable(*p) && !ctx.obstacles.contains(p))
            .collect();
        if options.is_empty() {
            return Ok(None);
        }
        let to = options[ctx.rng.gen_range(0..options.len())];
        Ok(Some(ActionKind::Move { to }))
    }
}
