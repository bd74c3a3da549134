//! Actions - atomic one-tick units of change
//!
//! Actions are proposed on worker threads and applied by the scheduler on a
//! single thread in priority order. They never outlive the tick.

use serde::{Deserialize, Serialize};

use crate::behavior::activity::Activity;
use crate::content::ItemStack;
use crate::core::types::{BeingId, CommandId, FacilityId, GridPos};

/// Priority convention: lower value applies first
pub mod priority {
    /// Emergencies that override even commands
    pub const CRUCIAL: i32 = -10;
    /// Movement ordered by a command
    pub const COMMAND: i32 = -1;
    /// Traits allowed to interrupt a running activity
    pub const INTERRUPT: i32 = -1;
    /// Activity actions and command idling
    pub const DEFAULT: i32 = 0;
    /// Routine trait suggestions
    pub const ROUTINE: i32 = 1;
}

/// Which layer produced an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionSource {
    Trait(String),
    Activity(String),
    Command(CommandId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ActionKind {
    Idle,
    /// Step into an adjacent cell
    Move { to: GridPos },
    /// Begin a multi-tick activity, suspending or replacing the current one
    StartActivity(Box<Activity>),
    TakeItem { facility: FacilityId, item: String, quantity: u32 },
    DepositItem { facility: FacilityId, item: String, quantity: u32 },
    /// Eat from the being's own inventory
    Consume { item: String, quantity: u32 },
    Rest,
    /// One tick of labour at a facility (advances its work site, if any)
    Work { facility: FacilityId },
    /// Remove recipe inputs from the being's inventory
    CommitInputs { inputs: Vec<ItemStack> },
    /// Place crafted outputs into a facility's storage, or the inventory
    Produce { facility: Option<FacilityId>, outputs: Vec<ItemStack> },
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Idle => "idle",
            ActionKind::Move { .. } => "move",
            ActionKind::StartActivity(_) => "start_activity",
            ActionKind::TakeItem { .. } => "take_item",
            ActionKind::DepositItem { .. } => "deposit_item",
            ActionKind::Consume { .. } => "consume",
            ActionKind::Rest => "rest",
            ActionKind::Work { .. } => "work",
            ActionKind::CommitInputs { .. } => "commit_inputs",
            ActionKind::Produce { .. } => "produce",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub owner: BeingId,
    pub source: ActionSource,
    pub priority: i32,
    pub kind: ActionKind,
}

impl Action {
    pub fn new(owner: BeingId, source: ActionSource, priority: i32, kind: ActionKind) -> Self {
        Self {
            owner,
            source,
            priority,
            kind,
        }
    }

    pub fn idle(owner: BeingId, source: ActionSource, priority: i32) -> Self {
        Self::new(owner, source, priority, ActionKind::Idle)
    }
}

/// Result of applying one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionOutcome {
    Applied,
    Rejected(String),
}

impl ActionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ActionOutcome::Applied)
    }
}

/// Order actions for application: ascending priority, proposal order on ties
pub fn sort_for_apply(actions: &mut [Action]) {
    // sort_by_key is stable
    actions.sort_by_key(|a| a.priority);
}
