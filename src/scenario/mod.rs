//! Demo village used by the headless binary and the integration tests
//!
//! A farmhouse with a pantry, a bakery with an oven and a granary, a wheat
//! field, two living villagers and two undead servants.

use std::sync::Arc;

use crate::behavior::traits::{Crafter, Farmer, Hauler, Mindless, SelfPreservation, Survival, Undead, Wanderer};
use crate::content::ContentRegistry;
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::{BeingId, BuildingId, FacilityId, GridPos};
use crate::entity::being::BeingSpec;
use crate::perception::Senses;
use crate::world::{FacilitySpec, NavGrid, TerrainCell, WorkSite, World};

pub const WIDTH: i32 = 24;
pub const HEIGHT: i32 = 14;

/// The built world plus handles to everything in it
pub struct DemoVillage {
    pub world: World,
    pub farmhouse: BuildingId,
    pub bakery: BuildingId,
    pub pantry: FacilityId,
    pub oven: FacilityId,
    pub granary: FacilityId,
    pub field: FacilityId,
    pub farmer: BeingId,
    pub baker: BeingId,
    pub hauler: BeingId,
    pub wanderer: BeingId,
}

/// Wall a rectangle, leaving one door cell open
fn wall_in(grid: &mut NavGrid, min: GridPos, max: GridPos, door: GridPos) {
    for x in min.x..=max.x {
        for y in min.y..=max.y {
            let pos = GridPos::new(x, y);
            let on_edge = x == min.x || x == max.x || y == min.y || y == max.y;
            if on_edge && pos != door {
                grid.set_cell(pos, TerrainCell::wall());
            }
        }
    }
}

fn village_grid() -> NavGrid {
    let mut grid = NavGrid::new(WIDTH, HEIGHT);
    wall_in(&mut grid, GridPos::new(1, 1), GridPos::new(6, 5), GridPos::new(3, 5));
    wall_in(&mut grid, GridPos::new(10, 1), GridPos::new(15, 5), GridPos::new(12, 5));
    // Muddy track and a patch of tall grass
    for x in 2..20 {
        grid.set_weight(GridPos::new(x, 7), 2.0);
    }
    for x in 17..21 {
        for y in 9..12 {
            grid.set_blocks_sight(GridPos::new(x, y), true);
        }
    }
    grid
}

/// Facility cells are solid; beings work from the cells around them
fn add_facility(world: &mut World, spec: FacilitySpec) -> Result<FacilityId> {
    let pos = spec.pos;
    let id = world.env.structures.add_facility(spec)?;
    world.env.grid.set_walkable(pos, false);
    Ok(id)
}

pub fn demo_village(config: SimulationConfig, content: Arc<ContentRegistry>) -> Result<DemoVillage> {
    let mut world = World::new(village_grid(), content, config);

    let structures = &mut world.env.structures;
    let farmhouse = structures.add_building("Farmhouse", GridPos::new(1, 1), GridPos::new(6, 5));
    let bakery = structures.add_building("Bakery", GridPos::new(10, 1), GridPos::new(15, 5));
    let kitchen = structures.add_room(farmhouse, "Kitchen", vec![GridPos::new(2, 2), GridPos::new(3, 2)])?;
    let bakehouse = structures.add_room(bakery, "Bakehouse", vec![GridPos::new(11, 2), GridPos::new(14, 2)])?;

    let pantry = add_facility(
        &mut world,
        FacilitySpec::new("larder", "Pantry", GridPos::new(2, 2)).in_room(kitchen).with_storage(20),
    )?;
    let oven = add_facility(
        &mut world,
        FacilitySpec::new("oven", "Oven", GridPos::new(11, 2)).in_room(bakehouse).with_storage(10),
    )?;
    let granary = add_facility(
        &mut world,
        FacilitySpec::new("granary", "Granary", GridPos::new(14, 2)).in_room(bakehouse).with_storage(40),
    )?;
    let field = add_facility(
        &mut world,
        FacilitySpec::new("field", "Wheat Field", GridPos::new(4, 10))
            .with_storage(20)
            .with_work_site(WorkSite::new(20, "wheat", 2)),
    )?;

    for (facility, item, quantity) in [(pantry, "bread", 4), (granary, "flour", 4)] {
        if let Some(storage) = world.env.structures.facility_mut(facility).and_then(|f| f.storage.as_mut()) {
            storage.add(item, quantity);
        }
    }

    let farmer = world.spawn_being(
        BeingSpec::new("Marta", GridPos::new(3, 3))
            .with_trait(SelfPreservation)
            .with_trait(Survival::new(Some(farmhouse)))
            .with_trait(Farmer::new(field, pantry)),
    )?;
    let baker = world.spawn_being(
        BeingSpec::new("Tobin", GridPos::new(12, 3))
            .with_trait(SelfPreservation)
            .with_trait(Survival::new(Some(bakery)))
            .with_trait(Crafter::new(oven, "bake_bread", Some(granary))),
    )?;
    let hauler = world.spawn_being(
        BeingSpec::new("Rattle", GridPos::new(8, 8))
            .with_body("skeleton")
            .with_senses(Senses::undead())
            .with_trait(Undead)
            .with_trait(Mindless)
            .with_trait(Hauler::new(field, granary, "wheat")),
    )?;
    let wanderer = world.spawn_being(
        BeingSpec::new("Shamble", GridPos::new(18, 12))
            .with_senses(Senses::undead())
            .with_trait(Undead)
            .with_trait(Mindless)
            .with_trait(Wanderer::default()),
    )?;

    Ok(DemoVillage {
        world,
        farmhouse,
        bakery,
        pantry,
        oven,
        granary,
        field,
        farmer,
        baker,
        hauler,
        wanderer,
    })
}
