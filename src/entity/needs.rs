//! Bodily needs that drive survival behavior

use serde::{Deserialize, Serialize};

/// Needs shared by every living (and most unliving) being
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Needs {
    /// 0.0 = fed, 1.0 = starving
    pub hunger: f32,
    /// 0.0 = fully rested, 1.0 = collapsing
    pub fatigue: f32,
}

impl Default for Needs {
    fn default() -> Self {
        Self {
            hunger: 0.2,
            fatigue: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeedKind {
    Hunger,
    Fatigue,
}

/// Scales need decay; `1.0` is the normal rate, `0.0` stops the need
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeedMultipliers {
    pub hunger: f32,
    pub fatigue: f32,
}

impl Default for NeedMultipliers {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl NeedMultipliers {
    pub const NORMAL: Self = Self {
        hunger: 1.0,
        fatigue: 1.0,
    };

    pub const NONE: Self = Self {
        hunger: 0.0,
        fatigue: 0.0,
    };

    pub fn new(hunger: f32, fatigue: f32) -> Self {
        Self { hunger, fatigue }
    }

    /// Multipliers stack multiplicatively
    pub fn combine(self, other: Self) -> Self {
        Self {
            hunger: self.hunger * other.hunger,
            fatigue: self.fatigue * other.fatigue,
        }
    }
}

impl Needs {
    pub fn new(hunger: f32, fatigue: f32) -> Self {
        Self {
            hunger: hunger.clamp(0.0, 1.0),
            fatigue: fatigue.clamp(0.0, 1.0),
        }
    }

    pub fn get(&self, kind: NeedKind) -> f32 {
        match kind {
            NeedKind::Hunger => self.hunger,
            NeedKind::Fatigue => self.fatigue,
        }
    }

    /// Most pressing need (hunger wins ties)
    pub fn most_pressing(&self) -> (NeedKind, f32) {
        if self.fatigue > self.hunger {
            (NeedKind::Fatigue, self.fatigue)
        } else {
            (NeedKind::Hunger, self.hunger)
        }
    }

    /// First need at or above the threshold, hunger before fatigue
    pub fn critical(&self, threshold: f32) -> Option<NeedKind> {
        if self.hunger >= threshold {
            return Some(NeedKind::Hunger);
        }
        if self.fatigue >= threshold {
            return Some(NeedKind::Fatigue);
        }
        None
    }

    /// Advance needs by one tick
    pub fn decay(&mut self, hunger_rate: f32, fatigue_rate: f32, multipliers: NeedMultipliers) {
        self.hunger = (self.hunger + hunger_rate * multipliers.hunger.max(0.0)).min(1.0);
        self.fatigue = (self.fatigue + fatigue_rate * multipliers.fatigue.max(0.0)).min(1.0);
    }

    pub fn satisfy(&mut self, kind: NeedKind, amount: f32) {
        match kind {
            NeedKind::Hunger => self.hunger = (self.hunger - amount).max(0.0),
            NeedKind::Fatigue => self.fatigue = (self.fatigue - amount).max(0.0),
        }
    }

    pub fn is_starving(&self) -> bool {
        self.hunger >= 1.0
    }
}
