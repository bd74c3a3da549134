use crate::behavior::action::ActionKind;
use crate::behavior::activity::Activity;
use crate::behavior::traits::BeingTrait;
use crate::behavior::BehaviorContext;
use crate::core::error::{Result, SimError};
use crate::core::types::FacilityId;

/// Works a field during working hours and stores the harvest at home
#[derive(Debug, Clone, Copy)]
pub struct Farmer {
    pub field: FacilityId,
    pub home: FacilityId,
    pub shift_ticks: u32,
}

impl Farmer {
    pub fn new(field: FacilityId, home: FacilityId) -> Self {
        Self {
            field,
            home,
            shift_ticks: 60,
        }
    }
}

impl BeingTrait for Farmer {
    fn name(&self) -> &'static str {
        "farmer"
    }

    fn suggest_action(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<Option<ActionKind>> {
        if ctx.current_activity.is_some() || !ctx.view.period.is_working_hours() {
            return Ok(None);
        }
        let activity = Activity::farm_cycle(self.field, self.home, self.shift_ticks);
        Ok(Some(ActionKind::StartActivity(Box::new(activity))))
    }
}

/// Crafts one recipe at a workshop whenever the inputs are known to exist
#[derive(Debug, Clone)]
pub struct Crafter {
    pub workshop: FacilityId,
    pub recipe: String,
    /// Storage the inputs are fetched from
    pub source: Option<FacilityId>,
}

impl Crafter {
    pub fn new(workshop: FacilityId, recipe: impl Into<String>, source: Option<FacilityId>) -> Self {
        Self {
            workshop,
            recipe: recipe.into(),
            source,
        }
    }
}

impl BeingTrait for Crafter {
    fn name(&self) -> &'static str {
        "crafter"
    }

    fn suggest_action(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<Option<ActionKind>> {
        if ctx.current_activity.is_some() {
            return Ok(None);
        }
        let recipe = ctx
            .view
            .content
            .recipe(&self.recipe)
            .ok_or_else(|| SimError::Content(format!("unknown recipe '{}'", self.recipe)))?;

        let available = recipe.inputs.iter().all(|input| {
            let stored = self.source.map(|s| ctx.known_count(s, &input.item)).unwrap_or(0);
            ctx.inventory.count(&input.item) + stored >= input.quantity
        });
        if !available {
            return Ok(None);
        }

        let activity = Activity::craft(recipe, self.workshop, self.source);
        Ok(Some(ActionKind::StartActivity(Box::new(activity))))
    }
}

/// Moves an item from one storage to another whenever some is known
#[derive(Debug, Clone)]
pub struct Hauler {
    pub from: FacilityId,
    pub to: FacilityId,
    pub item: String,
    /// Most items carried per trip
    pub load: u32,
}

impl Hauler {
    pub fn new(from: FacilityId, to: FacilityId, item: impl Into<String>) -> Self {
        Self {
            from,
            to,
            item: item.into(),
            load: 5,
        }
    }
}

impl BeingTrait for Hauler {
    fn name(&self) -> &'static str {
        "hauler"
    }

    fn suggest_action(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<Option<ActionKind>> {
        if ctx.current_activity.is_some() {
            return Ok(None);
        }
        let known = ctx.known_count(self.from, &self.item);
        if known == 0 {
            return Ok(None);
        }
        let activity = Activity::haul(self.item.clone(), known.min(self.load), self.from, self.to);
        Ok(Some(ActionKind::StartActivity(Box::new(activity))))
    }
}
