//! Grid occupancy - who stands where
//!
//! A cell holds a list of occupants rather than a single owner: one being may
//! share its cell with decorations (corpses, dropped tools, candles). Only
//! beings block movement.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{BeingId, GridPos};

/// Something registered on a grid cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occupant {
    Being(BeingId),
    Decoration(String),
}

/// Multi-item occupancy map
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    cells: AHashMap<GridPos, Vec<Occupant>>,
}

impl Occupancy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pos: GridPos, occupant: Occupant) {
        self.cells.entry(pos).or_default().push(occupant);
    }

    /// Remove one matching occupant, returns false if it was not there
    pub fn remove(&mut self, pos: GridPos, occupant: &Occupant) -> bool {
        let Some(list) = self.cells.get_mut(&pos) else {
            return false;
        };
        let Some(idx) = list.iter().position(|o| o == occupant) else {
            return false;
        };
        list.remove(idx);
        if list.is_empty() {
            self.cells.remove(&pos);
        }
        true
    }

    pub fn at(&self, pos: GridPos) -> &[Occupant] {
        self.cells.get(&pos).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The being standing on a cell, if any
    pub fn being_at(&self, pos: GridPos) -> Option<BeingId> {
        self.at(pos).iter().find_map(|o| match o {
            Occupant::Being(id) => Some(*id),
            Occupant::Decoration(_) => None,
        })
    }

    pub fn beings_on(&self, pos: GridPos) -> usize {
        self.at(pos).iter().filter(|o| matches!(o, Occupant::Being(_))).count()
    }

    pub fn total_beings(&self) -> usize {
        self.cells.values().flatten().filter(|o| matches!(o, Occupant::Being(_))).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_holds_being_and_decoration() {
        let mut occupancy = Occupancy::new();
        let pos = GridPos::new(2, 3);
        occupancy.add(pos, Occupant::Decoration("candle".into()));
        occupancy.add(pos, Occupant::Being(BeingId(7)));

        assert_eq!(occupancy.at(pos).len(), 2);
        assert_eq!(occupancy.being_at(pos), Some(BeingId(7)));

        assert!(occupancy.remove(pos, &Occupant::Being(BeingId(7))));
        assert_eq!(occupancy.being_at(pos), None);
        assert_eq!(occupancy.at(pos).len(), 1);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut occupancy = Occupancy::new();
        assert!(!occupancy.remove(GridPos::new(0, 0), &Occupant::Being(BeingId(1))));
        occupancy.add(GridPos::new(0, 0), Occupant::Being(BeingId(1)));
        assert!(!occupancy.remove(GridPos::new(0, 0), &Occupant::Being(BeingId(2))));
        assert_eq!(occupancy.total_beings(), 1);
    }
}
