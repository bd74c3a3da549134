//! Calendar system for time-of-day tracking
//!
//! Traits consult the current [`TimePeriod`] to pick schedule-driven
//! behavior (farmers work during the day and turn in at night).

use serde::{Deserialize, Serialize};

use crate::core::types::Tick;

/// Time of day periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimePeriod {
    Morning,   // 06:00-12:00
    Afternoon, // 12:00-18:00
    Evening,   // 18:00-22:00
    Night,     // 22:00-06:00
}

impl TimePeriod {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => TimePeriod::Morning,
            12..=17 => TimePeriod::Afternoon,
            18..=21 => TimePeriod::Evening,
            _ => TimePeriod::Night, // 22-23, 0-5
        }
    }

    /// Working hours for scheduled jobs
    pub fn is_working_hours(&self) -> bool {
        matches!(self, TimePeriod::Morning | TimePeriod::Afternoon)
    }
}

/// Calendar tracks simulation time with day/hour granularity
///
/// Tick 0 falls at `start_hour` of day 0 so a fresh world wakes up in the
/// morning rather than at midnight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calendar {
    tick: Tick,
    ticks_per_day: u64,
    start_hour: u32,
}

impl Calendar {
    pub fn new(ticks_per_day: u64) -> Self {
        Self::starting_at(ticks_per_day, 6)
    }

    pub fn starting_at(ticks_per_day: u64, start_hour: u32) -> Self {
        Self {
            tick: 0,
            ticks_per_day: ticks_per_day.max(1),
            start_hour: start_hour % 24,
        }
    }

    pub fn advance(&mut self) {
        self.tick += 1;
    }

    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    fn offset_tick(&self) -> u64 {
        self.tick + (self.start_hour as u64 * self.ticks_per_day) / 24
    }

    pub fn current_day(&self) -> u64 {
        self.offset_tick() / self.ticks_per_day
    }

    pub fn current_hour(&self) -> u32 {
        let tick_in_day = self.offset_tick() % self.ticks_per_day;
        ((tick_in_day * 24) / self.ticks_per_day) as u32
    }

    pub fn current_time_period(&self) -> TimePeriod {
        TimePeriod::from_hour(self.current_hour())
    }

    pub fn ticks_per_day(&self) -> u64 {
        self.ticks_per_day
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::new(2400)
    }
}
