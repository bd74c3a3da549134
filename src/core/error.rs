use thiserror::Error;

use crate::core::types::{BeingId, BuildingId, FacilityId, GridPos, RoomId};

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Being not found: {0:?}")]
    BeingNotFound(BeingId),

    #[error("Facility not found: {0:?}")]
    FacilityNotFound(FacilityId),

    #[error("Building not found: {0:?}")]
    BuildingNotFound(BuildingId),

    #[error("Room not found: {0:?}")]
    RoomNotFound(RoomId),

    #[error("A game tick is already in progress")]
    TickInProgress,

    #[error("Cell {0} is not walkable")]
    CellNotWalkable(GridPos),

    #[error("Cell {0} is occupied by {1:?}")]
    CellOccupied(GridPos, BeingId),

    #[error("Command rejected for {being:?}: {reason}")]
    CommandRejected { being: BeingId, reason: String },

    #[error("Think panicked for {0:?}")]
    ThinkPanicked(BeingId),

    #[error("Task '{task}' timed out after {elapsed_ms}ms")]
    TaskTimedOut { task: String, elapsed_ms: u64 },

    #[error("World lock poisoned")]
    WorldPoisoned,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Content error: {0}")]
    Content(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
