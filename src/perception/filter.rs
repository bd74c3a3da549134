//! Perception filter - what a being actually senses this tick
//!
//! Sight is deterministic: range, line of sight and visibility against sight
//! level. Hearing and smell fall off with distance and become a random draw,
//! so the filter takes the being's own RNG stream.

use ahash::AHashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::content::ItemStack;
use crate::core::types::{BeingId, FacilityId, GridPos, Tick};
use crate::perception::line_of_sight::has_line_of_sight;
use crate::world::grid::NavGrid;
use crate::world::observation::{EventChannel, ObservationData, RawObservation, Subject, WorldEvent};

/// Sense ranges and acuity of a being
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Senses {
    pub sight_range: f32,
    /// Compared against an object's visibility requirement
    pub sight_level: f32,
    pub hearing_range: f32,
    pub hearing_level: f32,
    pub smell_range: f32,
    pub smell_level: f32,
}

impl Default for Senses {
    fn default() -> Self {
        Self {
            sight_range: 12.0,
            sight_level: 1.0,
            hearing_range: 10.0,
            hearing_level: 1.0,
            smell_range: 4.0,
            smell_level: 0.5,
        }
    }
}

impl Senses {
    /// Empty eye sockets still see; skeletons have no nose
    pub fn undead() -> Self {
        Self {
            smell_range: 0.0,
            smell_level: 0.0,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SenseChannel {
    Sight,
    Hearing,
    Smell,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerceivedObject {
    pub subject: Subject,
    pub label: String,
    pub pos: GridPos,
    pub distance: f32,
    pub sensed_by: SenseChannel,
    /// Storage contents, only when seen
    pub contents: Option<Vec<ItemStack>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerceivedEvent {
    pub event: WorldEvent,
    pub distance: f32,
    pub sensed_by: SenseChannel,
}

/// Filtered view of the world for one being and one tick
///
/// Built once by [`PerceptionFilter::filter`] and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Perception {
    observer: BeingId,
    origin: GridPos,
    tick: Tick,
    objects: Vec<PerceivedObject>,
    by_pos: AHashMap<GridPos, Vec<usize>>,
    events: Vec<PerceivedEvent>,
}

impl Perception {
    pub fn empty(observer: BeingId, origin: GridPos, tick: Tick) -> Self {
        Self {
            observer,
            origin,
            tick,
            objects: Vec::new(),
            by_pos: AHashMap::new(),
            events: Vec::new(),
        }
    }

    fn from_parts(
        observer: BeingId,
        origin: GridPos,
        tick: Tick,
        objects: Vec<PerceivedObject>,
        events: Vec<PerceivedEvent>,
    ) -> Self {
        let mut by_pos: AHashMap<GridPos, Vec<usize>> = AHashMap::new();
        for (idx, obj) in objects.iter().enumerate() {
            by_pos.entry(obj.pos).or_default().push(idx);
        }
        Self {
            observer,
            origin,
            tick,
            objects,
            by_pos,
            events,
        }
    }

    pub fn observer(&self) -> BeingId {
        self.observer
    }

    pub fn origin(&self) -> GridPos {
        self.origin
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Everything sensed on a cell
    pub fn at(&self, pos: GridPos) -> impl Iterator<Item = &PerceivedObject> {
        self.by_pos
            .get(&pos)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.objects[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &PerceivedObject> {
        self.objects.iter()
    }

    pub fn beings(&self) -> impl Iterator<Item = (BeingId, &PerceivedObject)> {
        self.objects.iter().filter_map(|o| match o.subject {
            Subject::Being(id) => Some((id, o)),
            Subject::Facility(_) => None,
        })
    }

    pub fn facilities(&self) -> impl Iterator<Item = (FacilityId, &PerceivedObject)> {
        self.objects.iter().filter_map(|o| match o.subject {
            Subject::Facility(id) => Some((id, o)),
            Subject::Being(_) => None,
        })
    }

    pub fn locate_being(&self, id: BeingId) -> Option<GridPos> {
        self.beings().find(|(b, _)| *b == id).map(|(_, o)| o.pos)
    }

    pub fn senses(&self, subject: Subject) -> bool {
        self.objects.iter().any(|o| o.subject == subject)
    }

    /// Cells currently holding a sensed being
    pub fn being_cells(&self) -> impl Iterator<Item = GridPos> + '_ {
        self.beings().map(|(_, o)| o.pos)
    }

    pub fn events(&self) -> &[PerceivedEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.events.is_empty()
    }
}

/// Chance to notice a sound or smell
///
/// Scales with acuity and intensity and falls off with the square of
/// distance (four cells at full strength).
pub fn detection_chance(level: f32, intensity: f32, distance: f32) -> f32 {
    let falloff = 1.0 + (distance / 4.0).powi(2);
    (level * intensity / falloff).clamp(0.0, 1.0)
}

pub struct PerceptionFilter<'a> {
    grid: &'a NavGrid,
    senses: Senses,
}

impl<'a> PerceptionFilter<'a> {
    pub fn new(grid: &'a NavGrid, senses: Senses) -> Self {
        Self { grid, senses }
    }

    /// Turn raw observation data into a perception
    pub fn filter<R: Rng + ?Sized>(&self, data: &ObservationData, tick: Tick, rng: &mut R) -> Perception {
        let origin = data.origin;

        let objects = data
            .objects
            .iter()
            .filter_map(|raw| self.sense_object(origin, raw, rng))
            .collect();
        let events = data
            .events
            .iter()
            .filter_map(|event| self.sense_event(origin, event, rng))
            .collect();

        Perception::from_parts(data.observer, origin, tick, objects, events)
    }

    fn can_see(&self, origin: GridPos, pos: GridPos, distance: f32, reach: f32) -> bool {
        self.senses.sight_range > 0.0
            && distance <= self.senses.sight_range + reach
            && has_line_of_sight(self.grid, origin, pos)
    }

    fn roll<R: Rng + ?Sized>(rng: &mut R, range: f32, level: f32, intensity: f32, distance: f32) -> bool {
        if intensity <= 0.0 || level <= 0.0 || distance > range * intensity {
            return false;
        }
        rng.gen::<f32>() < detection_chance(level, intensity, distance)
    }

    fn sense_object<R: Rng + ?Sized>(
        &self,
        origin: GridPos,
        raw: &RawObservation,
        rng: &mut R,
    ) -> Option<PerceivedObject> {
        let distance = origin.euclidean(&raw.pos);
        let detect = raw.detectability;

        let sensed_by = if self.senses.sight_level >= detect.visibility
            && self.can_see(origin, raw.pos, distance, 0.0)
        {
            SenseChannel::Sight
        } else if Self::roll(rng, self.senses.hearing_range, self.senses.hearing_level, detect.noise, distance) {
            SenseChannel::Hearing
        } else if Self::roll(rng, self.senses.smell_range, self.senses.smell_level, detect.scent, distance) {
            SenseChannel::Smell
        } else {
            return None;
        };

        Some(PerceivedObject {
            subject: raw.subject,
            label: raw.label.clone(),
            pos: raw.pos,
            distance,
            contents: if sensed_by == SenseChannel::Sight {
                raw.contents.clone()
            } else {
                None
            },
            sensed_by,
        })
    }

    fn sense_event<R: Rng + ?Sized>(&self, origin: GridPos, event: &WorldEvent, rng: &mut R) -> Option<PerceivedEvent> {
        let distance = origin.euclidean(&event.pos);
        // Distance to the edge of the event's area
        let edge = (distance - event.radius).max(0.0);
        let senses = &self.senses;

        let sensed_by = match event.channel {
            EventChannel::Visual => self
                .can_see(origin, event.pos, distance, event.radius)
                .then_some(SenseChannel::Sight),
            EventChannel::Sound => {
                Self::roll(rng, senses.hearing_range, senses.hearing_level, event.intensity, edge)
                    .then_some(SenseChannel::Hearing)
            }
            EventChannel::Environmental => {
                if self.can_see(origin, event.pos, distance, event.radius) {
                    Some(SenseChannel::Sight)
                } else if Self::roll(rng, senses.hearing_range, senses.hearing_level, event.intensity, edge) {
                    Some(SenseChannel::Hearing)
                } else if Self::roll(rng, senses.smell_range, senses.smell_level, event.intensity, edge) {
                    Some(SenseChannel::Smell)
                } else {
                    None
                }
            }
        }?;

        Some(PerceivedEvent {
            event: event.clone(),
            distance,
            sensed_by,
        })
    }
}
