//! Necro Village - entity cognition and activity scheduling core

pub mod behavior;
pub mod content;
pub mod core;
pub mod entity;
pub mod pathfinding;
pub mod perception;
pub mod scenario;
pub mod simulation;
pub mod world;
