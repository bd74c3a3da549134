pub mod being;
pub mod body;
pub mod inventory;
pub mod movement;
pub mod needs;

pub use being::{Being, BeingSpec};
pub use body::Body;
pub use inventory::Inventory;
pub use movement::{MoveRejection, MovementController};
pub use needs::{NeedKind, NeedMultipliers, Needs};
