//! Grid navigation: A*, goals, cached path following and cross-area routes

pub mod astar;
pub mod goal;
pub mod pathfinder;
pub mod route;

pub use astar::{find_path, find_path_to_any, PathRequest, PathResult};
pub use goal::{GoalContext, PathGoal};
pub use pathfinder::{Pathfinder, StepDecision};
pub use route::{AreaMap, RouteLeg, Transition};
