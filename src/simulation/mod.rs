pub mod driver;
pub mod scheduler;
pub mod watchdog;

pub use driver::{DriverSummary, TickDriver};
pub use scheduler::{AppliedAction, EntityThinkingSystem, TickGuard, TickReport};
pub use watchdog::{TimeoutReport, Watchdog};
