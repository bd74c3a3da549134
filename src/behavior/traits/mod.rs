//! Traits - composable capabilities that propose default behavior
//!
//! A being holds a list of traits. When polled a trait either proposes an
//! action or declines. Long behaviors are started through
//! [`ActionKind::StartActivity`] so the actual state change happens in the
//! single-threaded apply phase.

mod jobs;
mod nature;
mod survival;
mod wanderer;

pub use jobs::{Crafter, Farmer, Hauler};
pub use nature::{Mindless, Undead};
pub use survival::{SelfPreservation, Survival};
pub use wanderer::Wanderer;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::behavior::action::{priority, ActionKind};
use crate::behavior::BehaviorContext;
use crate::core::error::Result;
use crate::entity::needs::NeedMultipliers;

/// When in the think order a trait is consulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Urgency {
    /// Before commands (fleeing fire)
    Crucial,
    /// Before the running activity (starving, collapsing)
    Interrupt,
    /// Only when nothing else claimed the turn
    Routine,
}

impl Urgency {
    pub fn priority(&self) -> i32 {
        match self {
            Urgency::Crucial => priority::CRUCIAL,
            Urgency::Interrupt => priority::INTERRUPT,
            Urgency::Routine => priority::ROUTINE,
        }
    }
}

pub trait BeingTrait: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn urgency(&self) -> Urgency {
        Urgency::Routine
    }

    /// Propose an action or decline with `Ok(None)`
    fn suggest_action(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<Option<ActionKind>>;

    fn need_multipliers(&self) -> NeedMultipliers {
        NeedMultipliers::NORMAL
    }

    /// Mindless beings cannot take complex commands
    fn forbids_complex_commands(&self) -> bool {
        false
    }
}
