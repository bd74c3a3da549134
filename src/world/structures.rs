//! Buildings, rooms and facilities
//!
//! Buildings group rooms, rooms group facilities. Back-references are plain
//! ids (a room knows its building id, a facility its room id); nothing here
//! owns anything else through a reference cycle.

use serde::{Deserialize, Serialize};

use crate::content::ItemStack;
use crate::core::error::{Result, SimError};
use crate::core::types::{BuildingId, FacilityId, GridPos, RoomId};
use crate::entity::inventory::Inventory;

/// Rectangular building; the footprint includes its walls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub name: String,
    /// Inclusive footprint corners
    pub min: GridPos,
    pub max: GridPos,
    pub rooms: Vec<RoomId>,
}

impl Building {
    pub fn contains(&self, pos: GridPos) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }

    /// Cells strictly inside the walls
    pub fn interior(&self) -> Vec<GridPos> {
        let mut cells = Vec::new();
        for y in (self.min.y + 1)..self.max.y {
            for x in (self.min.x + 1)..self.max.x {
                cells.push(GridPos::new(x, y));
            }
        }
        cells
    }

    /// Ring of cells just outside the footprint
    pub fn perimeter(&self) -> Vec<GridPos> {
        let (x0, y0, x1, y1) = (self.min.x - 1, self.min.y - 1, self.max.x + 1, self.max.y + 1);
        let mut cells = Vec::new();
        for x in x0..=x1 {
            cells.push(GridPos::new(x, y0));
            cells.push(GridPos::new(x, y1));
        }
        for y in (y0 + 1)..y1 {
            cells.push(GridPos::new(x0, y));
            cells.push(GridPos::new(x1, y));
        }
        cells
    }
}

/// A room inside a building
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub building: BuildingId,
    pub name: String,
    pub cells: Vec<GridPos>,
    pub facilities: Vec<FacilityId>,
}

/// Work site that turns labor into items (a field, a bone pit)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkSite {
    pub work_per_yield: u32,
    pub progress: u32,
    pub yield_item: String,
    pub yield_quantity: u32,
}

impl WorkSite {
    pub fn new(work_per_yield: u32, yield_item: impl Into<String>, yield_quantity: u32) -> Self {
        Self {
            work_per_yield: work_per_yield.max(1),
            progress: 0,
            yield_item: yield_item.into(),
            yield_quantity,
        }
    }

    /// Add work units, returning the yield when a cycle completes
    pub fn apply_work(&mut self, units: u32) -> Option<ItemStack> {
        self.progress += units;
        if self.progress >= self.work_per_yield {
            self.progress -= self.work_per_yield;
            Some(ItemStack::new(self.yield_item.clone(), self.yield_quantity))
        } else {
            None
        }
    }
}

/// Interactable object a being stands next to (oven, larder, field)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub kind: String,
    pub name: String,
    pub pos: GridPos,
    pub room: Option<RoomId>,
    pub storage: Option<Inventory>,
    pub work_site: Option<WorkSite>,
}

impl Facility {
    pub fn item_count(&self, item: &str) -> u32 {
        self.storage.as_ref().map(|s| s.count(item)).unwrap_or(0)
    }
}

/// Blueprint for adding a facility
#[derive(Debug, Clone)]
pub struct FacilitySpec {
    pub kind: String,
    pub name: String,
    pub pos: GridPos,
    pub room: Option<RoomId>,
    pub storage_capacity: Option<u32>,
    pub work_site: Option<WorkSite>,
}

impl FacilitySpec {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, pos: GridPos) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            pos,
            room: None,
            storage_capacity: None,
            work_site: None,
        }
    }

    pub fn in_room(mut self, room: RoomId) -> Self {
        self.room = Some(room);
        self
    }

    pub fn with_storage(mut self, capacity: u32) -> Self {
        self.storage_capacity = Some(capacity);
        self
    }

    pub fn with_work_site(mut self, site: WorkSite) -> Self {
        self.work_site = Some(site);
        self
    }
}

/// All spatial containers of the village
///
/// Ids are indices into the vectors; they are allocated here and never
/// reused.
#[derive(Debug, Clone, Default)]
pub struct Structures {
    buildings: Vec<Building>,
    rooms: Vec<Room>,
    facilities: Vec<Facility>,
}

impl Structures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_building(&mut self, name: impl Into<String>, min: GridPos, max: GridPos) -> BuildingId {
        let id = BuildingId(self.buildings.len() as u32);
        self.buildings.push(Building {
            id,
            name: name.into(),
            min,
            max,
            rooms: Vec::new(),
        });
        id
    }

    pub fn add_room(
        &mut self,
        building: BuildingId,
        name: impl Into<String>,
        cells: Vec<GridPos>,
    ) -> Result<RoomId> {
        let id = RoomId(self.rooms.len() as u32);
        let parent = self
            .buildings
            .get_mut(building.0 as usize)
            .ok_or(SimError::BuildingNotFound(building))?;
        parent.rooms.push(id);
        self.rooms.push(Room {
            id,
            building,
            name: name.into(),
            cells,
            facilities: Vec::new(),
        });
        Ok(id)
    }

    pub fn add_facility(&mut self, spec: FacilitySpec) -> Result<FacilityId> {
        let id = FacilityId(self.facilities.len() as u32);
        if let Some(room) = spec.room {
            self.rooms
                .get_mut(room.0 as usize)
                .ok_or(SimError::RoomNotFound(room))?
                .facilities
                .push(id);
        }
        self.facilities.push(Facility {
            id,
            kind: spec.kind,
            name: spec.name,
            pos: spec.pos,
            room: spec.room,
            storage: spec.storage_capacity.map(Inventory::with_capacity),
            work_site: spec.work_site,
        });
        Ok(id)
    }

    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(id.0 as usize)
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id.0 as usize)
    }

    pub fn facility(&self, id: FacilityId) -> Option<&Facility> {
        self.facilities.get(id.0 as usize)
    }

    pub fn facility_mut(&mut self, id: FacilityId) -> Option<&mut Facility> {
        self.facilities.get_mut(id.0 as usize)
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    /// Facilities of a kind, in id order
    pub fn facilities_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Facility> + 'a {
        self.facilities.iter().filter(move |f| f.kind == kind)
    }

    /// Building whose footprint contains a cell
    pub fn building_at(&self, pos: GridPos) -> Option<&Building> {
        self.buildings.iter().find(|b| b.contains(pos))
    }
}
