//! Being - an autonomous agent and its per-tick think
//!
//! A being owns everything it decides with: needs, body, inventory, memory,
//! its trait list, the running activity (plus the stack of interrupted ones)
//! and the command queue. `think` runs on a worker thread against a shared
//! read-only [`WorldView`] and returns at most one [`Action`]; every change to
//! the world happens later when the scheduler applies that action.

use std::collections::VecDeque;

use ahash::AHashSet;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use crate::behavior::action::{Action, ActionSource};
use crate::behavior::activity::Activity;
use crate::behavior::command::Command;
use crate::behavior::traits::{BeingTrait, Urgency};
use crate::behavior::BehaviorContext;
use crate::content::ItemStack;
use crate::core::error::Result;
use crate::core::types::{BeingId, GridPos, Tick};
use crate::entity::body::Body;
use crate::entity::inventory::Inventory;
use crate::entity::movement::MovementController;
use crate::entity::needs::{NeedMultipliers, Needs};
use crate::perception::{Memory, PerceptionFilter, Senses};
use crate::world::observation::{Detectability, ObservationData};
use crate::world::WorldView;

/// Everything needed to spawn a being
#[derive(Debug)]
pub struct BeingSpec {
    pub name: String,
    pub pos: GridPos,
    /// Body template id in the content registry
    pub body: String,
    pub senses: Senses,
    pub needs: Needs,
    pub detectability: Detectability,
    pub carry_capacity: u32,
    pub items: Vec<ItemStack>,
    pub traits: Vec<Box<dyn BeingTrait>>,
}

impl BeingSpec {
    pub fn new(name: impl Into<String>, pos: GridPos) -> Self {
        Self {
            name: name.into(),
            pos,
            body: "humanoid".to_string(),
            senses: Senses::default(),
            needs: Needs::default(),
            detectability: Detectability::default(),
            carry_capacity: 20,
            items: Vec::new(),
            traits: Vec::new(),
        }
    }

    pub fn with_body(mut self, template: impl Into<String>) -> Self {
        self.body = template.into();
        self
    }

    pub fn with_senses(mut self, senses: Senses) -> Self {
        self.senses = senses;
        self
    }

    pub fn with_needs(mut self, needs: Needs) -> Self {
        self.needs = needs;
        self
    }

    pub fn with_detectability(mut self, detectability: Detectability) -> Self {
        self.detectability = detectability;
        self
    }

    pub fn with_carry_capacity(mut self, capacity: u32) -> Self {
        self.carry_capacity = capacity;
        self
    }

    pub fn with_item(mut self, item: impl Into<String>, quantity: u32) -> Self {
        self.items.push(ItemStack::new(item, quantity));
        self
    }

    pub fn with_trait(mut self, t: impl BeingTrait + 'static) -> Self {
        self.traits.push(Box::new(t));
        self
    }
}

#[derive(Debug)]
pub struct Being {
    pub id: BeingId,
    pub name: String,
    pub movement: MovementController,
    pub needs: Needs,
    pub body: Body,
    pub inventory: Inventory,
    pub memory: Memory,
    pub senses: Senses,
    pub detectability: Detectability,
    traits: Vec<Box<dyn BeingTrait>>,
    activity: Option<Activity>,
    /// Interrupted activities, most recent last
    suspended: Vec<Activity>,
    command: Option<Command>,
    command_queue: VecDeque<Command>,
}

impl Being {
    pub fn new(id: BeingId, spec: BeingSpec, body: Body, memory_retention: Tick) -> Self {
        let mut inventory = Inventory::with_capacity(spec.carry_capacity);
        for stack in &spec.items {
            inventory.add(&stack.item, stack.quantity);
        }
        Self {
            id,
            name: spec.name,
            movement: MovementController::new(spec.pos),
            needs: spec.needs,
            body,
            inventory,
            memory: Memory::new(memory_retention),
            senses: spec.senses,
            detectability: spec.detectability,
            traits: spec.traits,
            activity: None,
            suspended: Vec::new(),
            command: None,
            command_queue: VecDeque::new(),
        }
    }

    pub fn position(&self) -> GridPos {
        self.movement.grid_pos()
    }

    pub fn is_alive(&self) -> bool {
        !self.body.is_dead()
    }

    pub fn trait_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.traits.iter().map(|t| t.name())
    }

    pub fn add_trait(&mut self, t: Box<dyn BeingTrait>) {
        self.traits.push(t);
    }

    /// Whether any trait forbids complex commands
    pub fn is_mindless(&self) -> bool {
        self.traits.iter().any(|t| t.forbids_complex_commands())
    }

    /// Need decay scaling from traits and the running activity
    pub fn need_multipliers(&self) -> NeedMultipliers {
        let from_traits = self
            .traits
            .iter()
            .fold(NeedMultipliers::NORMAL, |acc, t| acc.combine(t.need_multipliers()));
        match &self.activity {
            Some(activity) => from_traits.combine(activity.need_decay_multiplier()),
            None => from_traits,
        }
    }

    // === Presentation queries ===

    /// HUD text: the command's name wins over the activity's
    pub fn display_name_of_current(&self) -> Option<String> {
        if let Some(command) = &self.command {
            return Some(command.display_name().to_string());
        }
        self.activity.as_ref().map(|a| a.display_name())
    }

    pub fn current_activity(&self) -> Option<&Activity> {
        self.activity.as_ref()
    }

    pub fn assigned_command(&self) -> Option<&Command> {
        self.command.as_ref()
    }

    pub fn command_queue(&self) -> impl Iterator<Item = &Command> {
        self.command_queue.iter()
    }

    pub fn suspended_activities(&self) -> &[Activity] {
        &self.suspended
    }

    // === Mutation, apply phase only ===

    /// Queue a command; it becomes active at once when nothing else is
    pub fn assign_command(&mut self, command: Command) {
        if self.command.is_none() {
            self.command = Some(command);
        } else {
            self.command_queue.push_back(command);
        }
    }

    /// Drop the active command and everything queued behind it
    pub fn clear_commands(&mut self) {
        self.command = None;
        self.command_queue.clear();
    }

    /// Make `next` the current activity
    ///
    /// A resumable running activity is interrupted and pushed on the
    /// suspended stack; anything else is cleaned up and dropped. The stack is
    /// bounded by `max_suspended`, oldest first out.
    pub fn start_activity(&mut self, next: Activity, max_suspended: usize) {
        if let Some(mut current) = self.activity.take() {
            if current.is_resumable() && !current.is_terminal() && max_suspended > 0 {
                current.interrupt();
                debug!(being = ?self.id, suspended = %current.display_name(), "activity suspended");
                self.suspended.push(current);
                if self.suspended.len() > max_suspended {
                    let mut dropped = self.suspended.remove(0);
                    warn!(being = ?self.id, dropped = %dropped.display_name(), "suspended stack full");
                    dropped.cleanup();
                }
            } else {
                current.cleanup();
            }
        }
        debug!(being = ?self.id, activity = %next.display_name(), "activity started");
        self.activity = Some(next);
    }

    /// Decide this tick's action
    ///
    /// Order: crucial traits, the command, interrupt traits, the activity,
    /// routine traits. The first layer with an action wins.
    pub fn think(
        &mut self,
        position: GridPos,
        observation: &ObservationData,
        view: &WorldView<'_>,
    ) -> Result<Option<Action>> {
        let mut rng = ChaCha8Rng::seed_from_u64(think_seed(view.config.seed, view.tick, self.id));
        let perception = PerceptionFilter::new(&view.env.grid, self.senses).filter(observation, view.tick, &mut rng);
        self.memory.update(&perception);

        // A refused step is felt even when the blocker was never sensed
        let bumped = self.movement.take_blocked().map(|b| b.target);
        let obstacles: AHashSet<GridPos> = perception
            .being_cells()
            .chain(bumped)
            .filter(|p| *p != position)
            .collect();

        let Being {
            id,
            movement,
            needs,
            inventory,
            memory,
            traits,
            activity,
            suspended,
            command,
            command_queue,
            ..
        } = self;
        let me = *id;

        let mut ctx = BehaviorContext {
            me,
            pos: position,
            is_moving: movement.is_moving(),
            view,
            perception: &perception,
            memory,
            inventory,
            needs,
            obstacles: &obstacles,
            current_activity: activity.as_ref().map(|a| a.tag()),
            rng: &mut rng,
        };

        if let Some(action) = poll_traits(traits, Urgency::Crucial, &mut ctx)? {
            return Ok(Some(action));
        }

        if command.is_none() {
            *command = command_queue.pop_front();
        }
        while let Some(current) = command.as_mut() {
            if let Some((kind, priority)) = current.update(&mut ctx) {
                let source = ActionSource::Command(current.id);
                return Ok(Some(Action::new(me, source, priority, kind)));
            }
            debug!(being = ?me, command = ?current.id, state = ?current.state(), "command ended");
            *command = command_queue.pop_front();
        }

        if let Some(action) = poll_traits(traits, Urgency::Interrupt, &mut ctx)? {
            return Ok(Some(action));
        }

        while let Some(current) = activity.as_mut() {
            if let Some(kind) = current.update(&mut ctx) {
                let source = ActionSource::Activity(current.display_name());
                return Ok(Some(Action::new(me, source, current.priority(), kind)));
            }
            current.cleanup();
            *activity = suspended.pop().map(|mut resumed| {
                resumed.resume();
                debug!(being = ?me, activity = %resumed.display_name(), "activity resumed");
                resumed
            });
            ctx.current_activity = activity.as_ref().map(|a| a.tag());
        }

        poll_traits(traits, Urgency::Routine, &mut ctx)
    }
}

/// First action proposed by a trait of the given tier, in registration order
fn poll_traits(
    traits: &mut [Box<dyn BeingTrait>],
    tier: Urgency,
    ctx: &mut BehaviorContext<'_>,
) -> Result<Option<Action>> {
    for t in traits.iter_mut().filter(|t| t.urgency() == tier) {
        if let Some(kind) = t.suggest_action(ctx)? {
            let source = ActionSource::Trait(t.name().to_string());
            return Ok(Some(Action::new(ctx.me, source, tier.priority(), kind)));
        }
    }
    Ok(None)
}

/// Seed of one being's random stream for one tick
fn think_seed(seed: u64, tick: Tick, being: BeingId) -> u64 {
    // splitmix64 finaliser
    let mut z = seed
        ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ u64::from(being.0).wrapping_mul(0xD1B5_4A32_D192_ED03);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::activity::{ActivityState, ActivityTag};
    use crate::behavior::command::CommandKind;
    use crate::behavior::traits::{Mindless, Undead, Wanderer};
    use crate::content::ContentRegistry;
    use crate::core::types::{CommandId, FacilityId};

    fn being(spec: BeingSpec) -> Being {
        let content = ContentRegistry::with_defaults();
        let body = Body::from_template(content.body(&spec.body).unwrap());
        Being::new(BeingId(1), spec, body, 3000)
    }

    #[test]
    fn test_spec_builder_fills_inventory() {
        let b = being(BeingSpec::new("Ada", GridPos::new(2, 3)).with_item("bread", 2));
        assert_eq!(b.position(), GridPos::new(2, 3));
        assert_eq!(b.inventory.count("bread"), 2);
        assert!(b.is_alive());
    }

    #[test]
    fn test_start_activity_suspends_resumable() {
        let mut b = being(BeingSpec::new("Ada", GridPos::new(0, 0)));
        b.start_activity(Activity::farm_cycle(FacilityId(0), FacilityId(1), 10), 4);
        b.start_activity(Activity::eat(None, "bread"), 4);

        assert_eq!(b.current_activity().map(|a| a.tag()), Some(ActivityTag::Eat));
        assert_eq!(b.suspended_activities().len(), 1);
        assert_eq!(b.suspended_activities()[0].state(), ActivityState::Interrupted);
    }

    #[test]
    fn test_start_activity_drops_navigation() {
        let mut b = being(BeingSpec::new("Ada", GridPos::new(0, 0)));
        b.start_activity(Activity::navigate(crate::pathfinding::PathGoal::Position(GridPos::new(3, 3))), 4);
        b.start_activity(Activity::eat(None, "bread"), 4);
        assert!(b.suspended_activities().is_empty());
    }

    #[test]
    fn test_suspended_stack_is_bounded() {
        let mut b = being(BeingSpec::new("Ada", GridPos::new(0, 0)));
        for i in 0..5 {
            b.start_activity(Activity::work(FacilityId(i), 10), 2);
        }
        assert_eq!(b.suspended_activities().len(), 2);
    }

    #[test]
    fn test_command_name_wins_display() {
        let mut b = being(BeingSpec::new("Ada", GridPos::new(0, 0)));
        b.start_activity(Activity::work(FacilityId(0), 10), 4);
        assert_eq!(b.display_name_of_current().as_deref(), Some("Working"));

        b.assign_command(Command::new(CommandId(1), CommandKind::MoveTo(GridPos::new(4, 0)), None, 0));
        b.assign_command(Command::new(CommandId(2), CommandKind::MoveTo(GridPos::new(0, 4)), None, 0));
        assert_eq!(b.display_name_of_current().as_deref(), Some("Moving (ordered)"));
        assert_eq!(b.command_queue().count(), 1);

        b.clear_commands();
        assert!(b.assigned_command().is_none());
        assert_eq!(b.command_queue().count(), 0);
    }

    #[test]
    fn test_trait_capabilities() {
        let b = being(
            BeingSpec::new("Bones", GridPos::new(0, 0))
                .with_body("skeleton")
                .with_trait(Undead)
                .with_trait(Mindless)
                .with_trait(Wanderer::default()),
        );
        assert!(b.is_mindless());
        assert_eq!(b.need_multipliers(), NeedMultipliers::NONE);
        assert_eq!(b.trait_names().collect::<Vec<_>>(), vec!["undead", "mindless", "wanderer"]);
    }

    #[test]
    fn test_think_seed_varies() {
        let a = think_seed(42, 1, BeingId(1));
        assert_eq!(a, think_seed(42, 1, BeingId(1)));
        assert_ne!(a, think_seed(42, 2, BeingId(1)));
        assert_ne!(a, think_seed(42, 1, BeingId(2)));
    }
}
