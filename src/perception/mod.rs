//! Sense filtering and memory

pub mod filter;
pub mod line_of_sight;
pub mod memory;

pub use filter::{detection_chance, PerceivedEvent, PerceivedObject, Perception, PerceptionFilter, SenseChannel, Senses};
pub use line_of_sight::{bresenham_line, has_line_of_sight};
pub use memory::{Memory, Recollection, StorageRecord};
