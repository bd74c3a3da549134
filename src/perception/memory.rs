//! Decaying memory of perceived things
//!
//! Keyed by position so a being can ask "what was over there", with a
//! subject index for "where did I last see X". Storage contents are kept
//! separately with the tick they were seen, so hungry beings walk to the
//! larder they remember rather than the one the world knows about.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::content::{ContentRegistry, ItemStack};
use crate::core::types::{FacilityId, GridPos, Tick};
use crate::perception::filter::Perception;
use crate::world::observation::Subject;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recollection {
    pub subject: Subject,
    pub label: String,
    pub pos: GridPos,
    pub last_sensed: Tick,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub facility: FacilityId,
    pub pos: GridPos,
    pub contents: Vec<ItemStack>,
    pub seen_at: Tick,
}

impl StorageRecord {
    pub fn count(&self, item: &str) -> u32 {
        self.contents
            .iter()
            .filter(|s| s.item == item)
            .map(|s| s.quantity)
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    by_pos: BTreeMap<GridPos, Vec<Recollection>>,
    subjects: BTreeMap<Subject, GridPos>,
    storages: BTreeMap<FacilityId, StorageRecord>,
    retention: Tick,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(3000)
    }
}

impl Memory {
    pub fn new(retention: Tick) -> Self {
        Self {
            by_pos: BTreeMap::new(),
            subjects: BTreeMap::new(),
            storages: BTreeMap::new(),
            retention,
        }
    }

    /// Record a perception and drop everything older than the retention
    pub fn update(&mut self, perception: &Perception) {
        self.remember(perception);
        self.purge(perception.tick());
    }

    pub fn remember(&mut self, perception: &Perception) {
        let now = perception.tick();
        for obj in perception.iter() {
            self.forget_subject(obj.subject);
            self.by_pos.entry(obj.pos).or_default().push(Recollection {
                subject: obj.subject,
                label: obj.label.clone(),
                pos: obj.pos,
                last_sensed: now,
            });
            self.subjects.insert(obj.subject, obj.pos);

            if let (Subject::Facility(facility), Some(contents)) = (obj.subject, &obj.contents) {
                self.storages.insert(
                    facility,
                    StorageRecord {
                        facility,
                        pos: obj.pos,
                        contents: contents.clone(),
                        seen_at: now,
                    },
                );
            }
        }
    }

    /// Drop expired recollections
    pub fn purge(&mut self, now: Tick) {
        let retention = self.retention;
        let expired = |seen: Tick| now.saturating_sub(seen) > retention;

        let subjects = &mut self.subjects;
        self.by_pos.retain(|_, list| {
            list.retain(|r| {
                if expired(r.last_sensed) {
                    subjects.remove(&r.subject);
                    false
                } else {
                    true
                }
            });
            !list.is_empty()
        });
        self.storages.retain(|_, record| !expired(record.seen_at));
    }

    fn forget_subject(&mut self, subject: Subject) {
        if let Some(old) = self.subjects.remove(&subject) {
            if let Some(list) = self.by_pos.get_mut(&old) {
                list.retain(|r| r.subject != subject);
                if list.is_empty() {
                    self.by_pos.remove(&old);
                }
            }
        }
    }

    pub fn recall_at(&self, pos: GridPos) -> &[Recollection] {
        self.by_pos.get(&pos).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn last_known(&self, subject: Subject) -> Option<&Recollection> {
        let pos = self.subjects.get(&subject)?;
        self.recall_at(*pos).iter().find(|r| r.subject == subject)
    }

    pub fn storage(&self, facility: FacilityId) -> Option<&StorageRecord> {
        self.storages.get(&facility)
    }

    /// Nearest remembered storage holding an item (ties: lower facility id)
    pub fn nearest_storage_with(&self, item: &str, from: GridPos) -> Option<&StorageRecord> {
        self.storages
            .values()
            .filter(|r| r.count(item) > 0)
            .min_by_key(|r| (r.pos.chebyshev(&from), r.facility))
    }

    /// Nearest remembered storage holding anything edible
    pub fn nearest_food(&self, content: &ContentRegistry, from: GridPos) -> Option<(FacilityId, String)> {
        self.storages
            .values()
            .filter_map(|r| {
                r.contents
                    .iter()
                    .find(|s| s.quantity > 0 && content.is_edible(&s.item))
                    .map(|s| (r, s.item.clone()))
            })
            .min_by_key(|(r, _)| (r.pos.chebyshev(&from), r.facility))
            .map(|(r, item)| (r.facility, item))
    }

    /// Correct a remembered storage after finding it short
    pub fn note_missing(&mut self, facility: FacilityId, item: &str) {
        if let Some(record) = self.storages.get_mut(&facility) {
            record.contents.retain(|s| s.item != item);
        }
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty() && self.storages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BeingId;
    use crate::perception::filter::{PerceptionFilter, Senses};
    use crate::world::grid::NavGrid;
    use crate::world::observation::{Detectability, ObservationData, RawObservation};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn perceive(objects: Vec<RawObservation>, tick: Tick) -> Perception {
        let grid = NavGrid::new(20, 20);
        let mut data = ObservationData::empty(BeingId(0), GridPos::new(0, 0));
        data.objects = objects;
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        PerceptionFilter::new(&grid, Senses::default()).filter(&data, tick, &mut rng)
    }

    fn larder(pos: GridPos, contents: Vec<ItemStack>) -> RawObservation {
        RawObservation {
            subject: Subject::Facility(FacilityId(3)),
            label: "Larder".into(),
            pos,
            detectability: Detectability::default(),
            contents: Some(contents),
        }
    }

    #[test]
    fn test_moving_subject_keeps_one_entry() {
        let mut memory = Memory::new(100);
        let subject = Subject::Being(BeingId(4));
        let at = |pos| RawObservation {
            subject,
            label: "Ghoul".into(),
            pos,
            detectability: Detectability::default(),
            contents: None,
        };

        memory.update(&perceive(vec![at(GridPos::new(2, 2))], 1));
        memory.update(&perceive(vec![at(GridPos::new(3, 2))], 2));

        assert_eq!(memory.len(), 1);
        assert!(memory.recall_at(GridPos::new(2, 2)).is_empty());
        assert_eq!(memory.last_known(subject).unwrap().pos, GridPos::new(3, 2));
    }

    #[test]
    fn test_entries_expire() {
        let mut memory = Memory::new(10);
        memory.update(&perceive(vec![larder(GridPos::new(1, 1), vec![ItemStack::new("bread", 2)])], 5));
        assert!(memory.storage(FacilityId(3)).is_some());

        memory.purge(15);
        assert!(memory.storage(FacilityId(3)).is_some());

        memory.purge(16);
        assert!(memory.is_empty());
    }

    #[test]
    fn test_nearest_food_from_memory() {
        let content = ContentRegistry::with_defaults();
        let mut memory = Memory::new(100);
        memory.update(&perceive(
            vec![larder(GridPos::new(5, 5), vec![ItemStack::new("bone", 3), ItemStack::new("bread", 1)])],
            1,
        ));

        let (facility, item) = memory.nearest_food(&content, GridPos::new(0, 0)).unwrap();
        assert_eq!(facility, FacilityId(3));
        assert_eq!(item, "bread");

        memory.note_missing(facility, "bread");
        assert!(memory.nearest_food(&content, GridPos::new(0, 0)).is_none());
        assert_eq!(memory.nearest_storage_with("bone", GridPos::new(0, 0)).unwrap().count("bone"), 3);
    }
}
