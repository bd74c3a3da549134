use crate::behavior::action::ActionKind;
use crate::behavior::traits::BeingTrait;
use crate::behavior::BehaviorContext;
use crate::core::error::Result;
use crate::entity::needs::NeedMultipliers;

/// Neither hungers nor tires
#[derive(Debug, Clone, Copy, Default)]
pub struct Undead;

impl BeingTrait for Undead {
    fn name(&self) -> &'static str {
        "undead"
    }

    fn suggest_action(&mut self, _ctx: &mut BehaviorContext<'_>) -> Result<Option<ActionKind>> {
        Ok(None)
    }

    fn need_multipliers(&self) -> NeedMultipliers {
        NeedMultipliers::NONE
    }
}

/// Follows simple orders only
#[derive(Debug, Clone, Copy, Default)]
pub struct Mindless;

impl BeingTrait for Mindless {
    fn name(&self) -> &'static str {
        "mindless"
    }

    fn suggest_action(&mut self, _ctx: &mut BehaviorContext<'_>) -> Result<Option<ActionKind>> {
        Ok(None)
    }

    fn forbids_complex_commands(&self) -> bool {
        true
    }
}
