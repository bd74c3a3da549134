//! World state and the engine boundary
//!
//! [`Environment`] is the spatial part (terrain, occupancy, structures and
//! pending events). [`World`] adds the beings, content, config and calendar.
//! During the think fan-out the world is only reachable through a shared
//! [`WorldView`]; all mutation happens in the apply phase through
//! [`World::apply_action`], [`World::advance_movement`] and [`World::end_tick`].

pub mod grid;
pub mod observation;
pub mod occupancy;
pub mod structures;

pub use grid::{DiagonalMode, NavGrid, TerrainCell};
pub use observation::{
    Detectability, EventChannel, EventKind, ObservationData, RawObservation, Subject, WorldEvent,
};
pub use occupancy::{Occupancy, Occupant};
pub use structures::{Building, Facility, FacilitySpec, Room, Structures, WorkSite};

use std::sync::Arc;

use ahash::AHashMap;
use tracing::{debug, info, warn};

use crate::behavior::action::{Action, ActionKind, ActionOutcome};
use crate::behavior::command::{Command, CommandKind};
use crate::content::{ContentRegistry, ItemStack};
use crate::core::calendar::{Calendar, TimePeriod};
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{BeingId, CommandId, FacilityId, GridPos, Tick};
use crate::entity::being::{Being, BeingSpec};
use crate::entity::body::Body;
use crate::entity::inventory::Inventory;
use crate::entity::needs::NeedKind;

/// Cell queries and occupancy mutators the movement controller relies on
pub trait CellOccupancy {
    /// Walkable terrain with no being standing on it
    fn is_cell_walkable(&self, pos: GridPos) -> bool;
    /// Movement cost multiplier of a cell (1.0 = plain ground)
    fn terrain_difficulty(&self, pos: GridPos) -> f32;
    fn occupant_at(&self, pos: GridPos) -> Option<BeingId>;
    fn add_entity(&mut self, pos: GridPos, being: BeingId);
    fn remove_entity(&mut self, pos: GridPos, being: BeingId) -> bool;
}

#[derive(Debug, Clone)]
pub struct Environment {
    pub grid: NavGrid,
    pub occupancy: Occupancy,
    pub structures: Structures,
    /// Events raised since the last tick ended
    pub events: Vec<WorldEvent>,
}

impl Environment {
    pub fn new(grid: NavGrid) -> Self {
        Self {
            grid,
            occupancy: Occupancy::new(),
            structures: Structures::new(),
            events: Vec::new(),
        }
    }
}

impl CellOccupancy for Environment {
    fn is_cell_walkable(&self, pos: GridPos) -> bool {
        self.grid.is_walkable(pos) && self.occupancy.being_at(pos).is_none()
    }

    fn terrain_difficulty(&self, pos: GridPos) -> f32 {
        self.grid.weight(pos)
    }

    fn occupant_at(&self, pos: GridPos) -> Option<BeingId> {
        self.occupancy.being_at(pos)
    }

    fn add_entity(&mut self, pos: GridPos, being: BeingId) {
        self.occupancy.add(pos, Occupant::Being(being));
    }

    fn remove_entity(&mut self, pos: GridPos, being: BeingId) -> bool {
        self.occupancy.remove(pos, &Occupant::Being(being))
    }
}

/// Read-only snapshot shared by every think of one tick
#[derive(Debug, Clone, Copy)]
pub struct WorldView<'a> {
    pub env: &'a Environment,
    pub content: &'a ContentRegistry,
    pub config: &'a SimulationConfig,
    pub tick: Tick,
    pub period: TimePeriod,
}

/// Scent given off by a storage holding food
const FOOD_SCENT: f32 = 0.6;

pub struct World {
    pub env: Environment,
    /// Registration order; doubles as the proposal order of a tick
    beings: Vec<Being>,
    index: AHashMap<BeingId, usize>,
    content: Arc<ContentRegistry>,
    config: SimulationConfig,
    calendar: Calendar,
    next_being: u32,
    next_command: u64,
}

impl World {
    pub fn new(grid: NavGrid, content: Arc<ContentRegistry>, config: SimulationConfig) -> Self {
        let calendar = Calendar::new(config.ticks_per_day);
        Self {
            env: Environment::new(grid),
            beings: Vec::new(),
            index: AHashMap::new(),
            content,
            config,
            calendar,
            next_being: 0,
            next_command: 0,
        }
    }

    pub fn tick(&self) -> Tick {
        self.calendar.current_tick()
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn content(&self) -> &ContentRegistry {
        &self.content
    }

    pub fn beings(&self) -> &[Being] {
        &self.beings
    }

    pub fn being(&self, id: BeingId) -> Option<&Being> {
        self.index.get(&id).map(|&i| &self.beings[i])
    }

    pub fn being_mut(&mut self, id: BeingId) -> Option<&mut Being> {
        self.index.get(&id).map(|&i| &mut self.beings[i])
    }

    pub fn being_count(&self) -> usize {
        self.beings.len()
    }

    pub fn view(&self) -> WorldView<'_> {
        WorldView {
            env: &self.env,
            content: &self.content,
            config: &self.config,
            tick: self.calendar.current_tick(),
            period: self.calendar.current_time_period(),
        }
    }

    /// Shared view plus exclusive access to the beings, for the think fan-out
    pub fn think_split(&mut self) -> (WorldView<'_>, &mut [Being]) {
        let view = WorldView {
            env: &self.env,
            content: &self.content,
            config: &self.config,
            tick: self.calendar.current_tick(),
            period: self.calendar.current_time_period(),
        };
        (view, &mut self.beings)
    }

    pub fn spawn_being(&mut self, spec: BeingSpec) -> Result<BeingId> {
        let pos = spec.pos;
        if !self.env.grid.is_walkable(pos) {
            return Err(SimError::CellNotWalkable(pos));
        }
        if let Some(other) = self.env.occupancy.being_at(pos) {
            return Err(SimError::CellOccupied(pos, other));
        }
        let template = self
            .content
            .body(&spec.body)
            .ok_or_else(|| SimError::Content(format!("unknown body template '{}'", spec.body)))?;
        let body = Body::from_template(template);

        let id = BeingId(self.next_being);
        self.next_being += 1;
        let being = Being::new(id, spec, body, self.config.memory_retention_ticks);
        info!(being = ?id, name = %being.name, %pos, "spawned being");

        self.env.add_entity(pos, id);
        self.index.insert(id, self.beings.len());
        self.beings.push(being);
        Ok(id)
    }

    /// Take a being out of the simulation, leaving its corpse behind
    pub fn remove_being(&mut self, id: BeingId) -> Result<Being> {
        let slot = self.index.remove(&id).ok_or(SimError::BeingNotFound(id))?;
        let being = self.beings.remove(slot);
        for (i, b) in self.beings.iter().enumerate().skip(slot) {
            self.index.insert(b.id, i);
        }

        let pos = being.position();
        self.env.remove_entity(pos, id);
        self.env.occupancy.add(pos, Occupant::Decoration(format!("corpse of {}", being.name)));
        Ok(being)
    }

    /// Hand a command to a being
    ///
    /// `Cancel` takes effect immediately, clearing the active command and the
    /// queue. Anything else is queued behind the active command.
    pub fn issue_command(
        &mut self,
        being: BeingId,
        kind: CommandKind,
        commander: Option<BeingId>,
    ) -> Result<CommandId> {
        let tick = self.tick();
        let id = CommandId(self.next_command);
        let target = self.being_mut(being).ok_or(SimError::BeingNotFound(being))?;

        if kind.is_complex() && target.is_mindless() {
            return Err(SimError::CommandRejected {
                being,
                reason: format!("'{}' is too complex for a mindless being", kind.display_name()),
            });
        }
        if matches!(kind, CommandKind::Cancel) {
            target.clear_commands();
        } else {
            target.assign_command(Command::new(id, kind, commander, tick));
        }
        debug!(?being, command = ?id, "command issued");
        self.next_command += 1;
        Ok(id)
    }

    /// Raise an event; it is observable during the next tick
    pub fn emit_event(&mut self, mut event: WorldEvent) {
        event.tick = self.tick();
        self.env.events.push(event);
    }

    /// Raw observation data for one being
    ///
    /// Everything inside the Chebyshev observation radius, in a fixed order:
    /// other beings by registration, then facilities by id, then events.
    pub fn observation_for(&self, id: BeingId) -> Result<ObservationData> {
        let observer = self.being(id).ok_or(SimError::BeingNotFound(id))?;
        let origin = observer.position();
        let radius = self.config.observation_radius;
        let mut data = ObservationData::empty(id, origin);

        for other in self.beings.iter().filter(|b| b.id != id) {
            let pos = other.position();
            if pos.chebyshev(&origin) <= radius {
                data.objects.push(RawObservation {
                    subject: Subject::Being(other.id),
                    label: other.name.clone(),
                    pos,
                    detectability: other.detectability,
                    contents: None,
                });
            }
        }

        for facility in self.env.structures.facilities() {
            if facility.pos.chebyshev(&origin) > radius {
                continue;
            }
            let contents = facility.storage.as_ref().map(|s| s.stacks());
            let smells_of_food = facility
                .storage
                .as_ref()
                .is_some_and(|s| s.iter().any(|(item, n)| n > 0 && self.content.is_edible(item)));
            data.objects.push(RawObservation {
                subject: Subject::Facility(facility.id),
                label: facility.name.clone(),
                pos: facility.pos,
                detectability: Detectability {
                    scent: if smells_of_food { FOOD_SCENT } else { 0.0 },
                    ..Detectability::default()
                },
                contents,
            });
        }

        data.events = self
            .env
            .events
            .iter()
            .filter(|e| e.pos.chebyshev(&origin) <= radius + e.radius.ceil() as i32)
            .cloned()
            .collect();

        Ok(data)
    }

    /// Execute one action on the apply thread
    pub fn apply_action(&mut self, action: Action) -> ActionOutcome {
        let Some(&slot) = self.index.get(&action.owner) else {
            return ActionOutcome::Rejected(format!("{:?} is not registered", action.owner));
        };
        let World {
            env,
            beings,
            content,
            config,
            ..
        } = self;
        let being = &mut beings[slot];
        let name = action.kind.name();

        let result = match action.kind {
            ActionKind::Idle => Ok(()),
            ActionKind::Move { to } => being
                .movement
                .try_step(being.id, to, env)
                .map(|_| ())
                .map_err(|e| {
                    warn!(being = ?being.id, %to, reason = %e, "move rejected");
                    e.to_string()
                }),
            ActionKind::StartActivity(activity) => {
                being.start_activity(*activity, config.max_suspended_activities);
                Ok(())
            }
            ActionKind::TakeItem { facility, item, quantity } => take_item(env, being, facility, &item, quantity),
            ActionKind::DepositItem { facility, item, quantity } => {
                deposit_item(env, being, facility, &item, quantity)
            }
            ActionKind::Consume { item, quantity } => match content.nutrition(&item).filter(|n| *n > 0.0) {
                None => Err(format!("{item} is not edible")),
                Some(nutrition) => match being.inventory.remove(&item, quantity) {
                    0 => Err(format!("no {item} to eat")),
                    eaten => {
                        being.needs.satisfy(NeedKind::Hunger, nutrition * eaten as f32);
                        Ok(())
                    }
                },
            },
            ActionKind::Rest => {
                being.needs.satisfy(NeedKind::Fatigue, config.rest_per_tick);
                Ok(())
            }
            ActionKind::Work { facility } => work_at(env, being.position(), facility),
            ActionKind::CommitInputs { inputs } => {
                if being.inventory.remove_all(&inputs) {
                    Ok(())
                } else {
                    Err("recipe inputs missing".to_string())
                }
            }
            ActionKind::Produce { facility, outputs } => {
                produce(env, being, facility, &outputs);
                Ok(())
            }
        };

        match result {
            Ok(()) => ActionOutcome::Applied,
            Err(reason) => {
                debug!(being = ?action.owner, action = name, %reason, "action rejected");
                ActionOutcome::Rejected(reason)
            }
        }
    }

    /// Add one tick of movement budget to a being
    pub fn advance_movement(&mut self, id: BeingId) {
        let points = self.config.movement_points_per_tick;
        if let Some(being) = self.being_mut(id) {
            being.movement.advance(points);
        }
    }

    /// Needs, starvation and deaths, then advance the clock
    ///
    /// Events raised during the tick are cleared; deaths raise new ones for
    /// the next tick. Returns the beings that died.
    pub fn end_tick(&mut self) -> Vec<BeingId> {
        let config = &self.config;
        let mut dead = Vec::new();
        for being in &mut self.beings {
            let multipliers = being.need_multipliers();
            being
                .needs
                .decay(config.hunger_per_tick, config.fatigue_per_tick, multipliers);
            if being.needs.is_starving() {
                being.body.damage_vitals(config.starvation_damage_per_tick);
            }
            if !being.is_alive() {
                dead.push(being.id);
            }
        }

        self.env.events.clear();
        for &id in &dead {
            if let Ok(corpse) = self.remove_being(id) {
                info!(being = ?id, name = %corpse.name, "being died");
                let event = WorldEvent::new(
                    EventKind::Death,
                    corpse.position(),
                    EventChannel::Environmental,
                )
                .with_intensity(0.5);
                self.emit_event(event);
            }
        }

        self.calendar.advance();
        dead
    }
}

fn storage_next_to<'a>(
    env: &'a mut Environment,
    facility: FacilityId,
    pos: GridPos,
) -> std::result::Result<&'a mut Inventory, String> {
    let found = env
        .structures
        .facility_mut(facility)
        .ok_or_else(|| format!("{facility:?} does not exist"))?;
    if found.pos.chebyshev(&pos) > 1 {
        return Err(format!("not next to {}", found.name));
    }
    found
        .storage
        .as_mut()
        .ok_or_else(|| format!("{} has no storage", found.name))
}

fn take_item(
    env: &mut Environment,
    being: &mut Being,
    facility: FacilityId,
    item: &str,
    quantity: u32,
) -> std::result::Result<(), String> {
    let storage = storage_next_to(env, facility, being.position())?;
    let wanted = quantity.min(being.inventory.free_space());
    if wanted == 0 {
        return Err("hands are full".to_string());
    }
    let taken = storage.remove(item, wanted);
    if taken == 0 {
        being.memory.note_missing(facility, item);
        return Err(format!("no {item} left in {facility:?}"));
    }
    being.inventory.add(item, taken);
    Ok(())
}

fn deposit_item(
    env: &mut Environment,
    being: &mut Being,
    facility: FacilityId,
    item: &str,
    quantity: u32,
) -> std::result::Result<(), String> {
    let storage = storage_next_to(env, facility, being.position())?;
    let carried = being.inventory.count(item).min(quantity);
    if carried == 0 {
        return Err(format!("not carrying {item}"));
    }
    let stored = storage.add(item, carried);
    if stored == 0 {
        return Err(format!("{facility:?} is full"));
    }
    being.inventory.remove(item, stored);
    Ok(())
}

fn work_at(env: &mut Environment, pos: GridPos, facility: FacilityId) -> std::result::Result<(), String> {
    let found = env
        .structures
        .facility_mut(facility)
        .ok_or_else(|| format!("{facility:?} does not exist"))?;
    if found.pos.chebyshev(&pos) > 1 {
        return Err(format!("not next to {}", found.name));
    }
    let Some(site) = found.work_site.as_mut() else {
        return Ok(());
    };
    if let Some(yielded) = site.apply_work(1) {
        let stored = found
            .storage
            .as_mut()
            .map(|s| s.add(&yielded.item, yielded.quantity))
            .unwrap_or(0);
        if stored < yielded.quantity {
            debug!(facility = %found.name, lost = yielded.quantity - stored, "yield did not fit");
        }
    }
    Ok(())
}

/// Outputs go to the facility's storage, overflow into the crafter's hands
fn produce(env: &mut Environment, being: &mut Being, facility: Option<FacilityId>, outputs: &[ItemStack]) {
    let mut storage = facility
        .and_then(|id| env.structures.facility_mut(id))
        .and_then(|f| f.storage.as_mut());
    for output in outputs {
        let stored = storage.as_mut().map(|s| s.add(&output.item, output.quantity)).unwrap_or(0);
        let rest = output.quantity - stored;
        if rest > 0 && being.inventory.add(&output.item, rest) < rest {
            warn!(being = ?being.id, item = %output.item, "crafted output lost");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::action::{priority, ActionSource};
    use crate::behavior::traits::Mindless;

    fn world(rows: &[&str]) -> World {
        World::new(
            NavGrid::from_ascii(rows),
            Arc::new(ContentRegistry::with_defaults()),
            SimulationConfig::default(),
        )
    }

    fn act(owner: BeingId, kind: ActionKind) -> Action {
        Action::new(owner, ActionSource::Trait("test".into()), priority::DEFAULT, kind)
    }

    #[test]
    fn test_spawn_rejects_wall_and_occupied() {
        let mut w = world(&["..#"]);
        let a = w.spawn_being(BeingSpec::new("A", GridPos::new(0, 0))).unwrap();
        assert!(matches!(
            w.spawn_being(BeingSpec::new("B", GridPos::new(0, 0))),
            Err(SimError::CellOccupied(_, id)) if id == a
        ));
        assert!(matches!(
            w.spawn_being(BeingSpec::new("C", GridPos::new(2, 0))),
            Err(SimError::CellNotWalkable(_))
        ));
        assert!(matches!(
            w.spawn_being(BeingSpec::new("D", GridPos::new(1, 0)).with_body("slime")),
            Err(SimError::Content(_))
        ));
    }

    #[test]
    fn test_remove_leaves_corpse_and_reindexes() {
        let mut w = world(&["...."]);
        let a = w.spawn_being(BeingSpec::new("A", GridPos::new(0, 0))).unwrap();
        let b = w.spawn_being(BeingSpec::new("B", GridPos::new(2, 0))).unwrap();

        w.remove_being(a).unwrap();
        assert!(w.being(a).is_none());
        assert_eq!(w.being(b).map(|x| x.name.as_str()), Some("B"));
        assert!(w.env.is_cell_walkable(GridPos::new(0, 0)));
        assert_eq!(w.env.occupancy.at(GridPos::new(0, 0)).len(), 1);
    }

    #[test]
    fn test_mindless_rejects_complex_command() {
        let mut w = world(&["....."]);
        let zombie = w
            .spawn_being(BeingSpec::new("Z", GridPos::new(0, 0)).with_trait(Mindless))
            .unwrap();
        let err = w
            .issue_command(zombie, CommandKind::Guard { anchor: GridPos::new(2, 0), radius: 1 }, None)
            .unwrap_err();
        assert!(matches!(err, SimError::CommandRejected { .. }));

        w.issue_command(zombie, CommandKind::MoveTo(GridPos::new(4, 0)), None).unwrap();
        w.issue_command(zombie, CommandKind::MoveTo(GridPos::new(1, 0)), None).unwrap();
        assert_eq!(w.being(zombie).unwrap().command_queue().count(), 1);

        w.issue_command(zombie, CommandKind::Cancel, None).unwrap();
        assert!(w.being(zombie).unwrap().assigned_command().is_none());
        assert_eq!(w.being(zombie).unwrap().command_queue().count(), 0);
    }

    #[test]
    fn test_take_and_deposit_need_adjacency() {
        let mut w = world(&["....."]);
        let larder = w
            .env
            .structures
            .add_facility(FacilitySpec::new("larder", "Larder", GridPos::new(4, 0)).with_storage(10))
            .unwrap();
        w.env.structures.facility_mut(larder).unwrap().storage.as_mut().unwrap().add("bread", 1);
        let far_away = w.spawn_being(BeingSpec::new("B", GridPos::new(0, 0))).unwrap();
        let a = w.spawn_being(BeingSpec::new("A", GridPos::new(3, 0))).unwrap();

        let far = w.apply_action(act(far_away, ActionKind::TakeItem { facility: larder, item: "bread".into(), quantity: 1 }));
        assert!(!far.is_applied());

        let took = w.apply_action(act(a, ActionKind::TakeItem { facility: larder, item: "bread".into(), quantity: 3 }));
        assert!(took.is_applied());
        assert_eq!(w.being(a).unwrap().inventory.count("bread"), 1);

        let empty = w.apply_action(act(a, ActionKind::TakeItem { facility: larder, item: "bread".into(), quantity: 1 }));
        assert!(!empty.is_applied());

        let back = w.apply_action(act(a, ActionKind::DepositItem { facility: larder, item: "bread".into(), quantity: 1 }));
        assert!(back.is_applied());
        assert_eq!(w.env.structures.facility(larder).unwrap().item_count("bread"), 1);
    }

    #[test]
    fn test_consume_satisfies_hunger() {
        let mut w = world(&["..."]);
        let a = w
            .spawn_being(
                BeingSpec::new("A", GridPos::new(0, 0))
                    .with_needs(crate::entity::needs::Needs::new(0.9, 0.1))
                    .with_item("bread", 1)
                    .with_item("bone", 1),
            )
            .unwrap();

        assert!(!w.apply_action(act(a, ActionKind::Consume { item: "bone".into(), quantity: 1 })).is_applied());
        assert!(w.apply_action(act(a, ActionKind::Consume { item: "bread".into(), quantity: 1 })).is_applied());
        assert!((w.being(a).unwrap().needs.hunger - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_work_site_yields_into_storage() {
        let mut w = world(&["..."]);
        let field = w
            .env
            .structures
            .add_facility(
                FacilitySpec::new("field", "Field", GridPos::new(1, 0))
                    .with_storage(10)
                    .with_work_site(WorkSite::new(2, "wheat", 3)),
            )
            .unwrap();
        let a = w.spawn_being(BeingSpec::new("A", GridPos::new(0, 0))).unwrap();
        w.apply_action(act(a, ActionKind::Work { facility: field }));
        assert_eq!(w.env.structures.facility(field).unwrap().item_count("wheat"), 0);
        w.apply_action(act(a, ActionKind::Work { facility: field }));
        assert_eq!(w.env.structures.facility(field).unwrap().item_count("wheat"), 3);
    }

    #[test]
    fn test_starvation_kills_and_raises_death_event() {
        let mut w = world(&["..."]);
        let mut config = SimulationConfig::default();
        config.starvation_damage_per_tick = 1000.0;
        w.config = config;
        let a = w
            .spawn_being(BeingSpec::new("A", GridPos::new(1, 0)).with_needs(crate::entity::needs::Needs::new(1.0, 0.0)))
            .unwrap();

        let dead = w.end_tick();
        assert_eq!(dead, vec![a]);
        assert_eq!(w.being_count(), 0);
        assert_eq!(w.env.events.len(), 1);
        assert_eq!(w.env.events[0].kind, EventKind::Death);
        assert_eq!(w.tick(), 1);
    }

    #[test]
    fn test_observation_is_bounded_by_radius() {
        let mut w = world(&[&".".repeat(40)]);
        let a = w.spawn_being(BeingSpec::new("A", GridPos::new(0, 0))).unwrap();
        w.spawn_being(BeingSpec::new("Near", GridPos::new(5, 0))).unwrap();
        w.spawn_being(BeingSpec::new("Far", GridPos::new(30, 0))).unwrap();

        let data = w.observation_for(a).unwrap();
        let labels: Vec<&str> = data.objects.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["Near"]);
    }
}
