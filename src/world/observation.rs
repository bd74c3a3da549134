//! Raw observation data handed to a being once per tick
//!
//! This is everything geometrically inside the being's broad observation
//! square, before any sense filtering. The perception filter decides what of
//! it is actually sensed.

use serde::{Deserialize, Serialize};

use crate::content::ItemStack;
use crate::core::types::{BeingId, FacilityId, GridPos, Tick};

/// Identity of something that can be sensed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subject {
    Being(BeingId),
    Facility(FacilityId),
}

/// How hard something is to notice on each sense channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detectability {
    /// Sight level needed to see it (0.0 = in plain view)
    pub visibility: f32,
    /// Sound intensity it gives off (0.0 = silent)
    pub noise: f32,
    /// Smell intensity it gives off (0.0 = odorless)
    pub scent: f32,
}

impl Default for Detectability {
    fn default() -> Self {
        Self {
            visibility: 0.0,
            noise: 0.0,
            scent: 0.0,
        }
    }
}

/// One sensable object inside the observation radius
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawObservation {
    pub subject: Subject,
    pub label: String,
    pub pos: GridPos,
    pub detectability: Detectability,
    /// Storage contents, visible only when the object is seen
    pub contents: Option<Vec<ItemStack>>,
}

/// Sense channel a world event travels on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventChannel {
    Visual,
    Sound,
    /// Detectable by any available channel
    Environmental,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Noise,
    Fire,
    Death,
    Custom(String),
}

/// Something that happened at a point in the world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldEvent {
    pub kind: EventKind,
    pub pos: GridPos,
    pub radius: f32,
    pub intensity: f32,
    pub channel: EventChannel,
    pub tick: Tick,
}

impl WorldEvent {
    pub fn new(kind: EventKind, pos: GridPos, channel: EventChannel) -> Self {
        Self {
            kind,
            pos,
            radius: 0.0,
            intensity: 1.0,
            channel,
            tick: 0,
        }
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius.max(0.0);
        self
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity.max(0.0);
        self
    }
}

/// Unfiltered snapshot of everything near one being
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationData {
    pub observer: BeingId,
    pub origin: GridPos,
    pub objects: Vec<RawObservation>,
    pub events: Vec<WorldEvent>,
}

impl ObservationData {
    pub fn empty(observer: BeingId, origin: GridPos) -> Self {
        Self {
            observer,
            origin,
            objects: Vec::new(),
            events: Vec::new(),
        }
    }
}
