//! Routing across several navigation areas
//!
//! Areas (the surface, a crypt, a cellar) each have their own grid and are
//! joined by transition points such as stairs. A route is planned at two
//! levels: a cheapest-cost search over transition points, where each edge is
//! an A* leg inside one area.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::{AreaId, GridPos};
use crate::pathfinding::astar::{find_path_to_any, PathRequest};
use crate::world::grid::NavGrid;

/// One-way link from a cell in one area to a cell in another
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from_area: AreaId,
    pub from: GridPos,
    pub to_area: AreaId,
    pub to: GridPos,
    /// Cost of taking the transition itself
    pub cost: f32,
}

/// Path inside a single area, optionally ending at a transition
#[derive(Debug, Clone, PartialEq)]
pub struct RouteLeg {
    pub area: AreaId,
    pub path: Vec<GridPos>,
    pub exit: Option<Transition>,
}

#[derive(Debug, Clone, Default)]
pub struct AreaMap {
    areas: BTreeMap<AreaId, NavGrid>,
    transitions: Vec<Transition>,
}

impl AreaMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_area(&mut self, id: AreaId, grid: NavGrid) {
        self.areas.insert(id, grid);
    }

    pub fn area(&self, id: AreaId) -> Option<&NavGrid> {
        self.areas.get(&id)
    }

    /// Link two cells in both directions
    pub fn link(&mut self, a: (AreaId, GridPos), b: (AreaId, GridPos), cost: f32) {
        self.transitions.push(Transition { from_area: a.0, from: a.1, to_area: b.0, to: b.1, cost });
        self.transitions.push(Transition { from_area: b.0, from: b.1, to_area: a.0, to: a.1, cost });
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    fn leg(&self, area: AreaId, from: GridPos, to: GridPos, max_expansions: usize) -> Option<(Vec<GridPos>, f32)> {
        let grid = self.areas.get(&area)?;
        let targets = [to];
        let result = find_path_to_any(grid, &PathRequest::new(from, &targets).max_expansions(max_expansions));
        result.reached_goal.then_some((result.path, result.cost))
    }

    /// Plan the cheapest route between two cells, possibly in different areas
    ///
    /// Nodes of the high-level search are the start, the arrival side of every
    /// transition, and the goal.
    pub fn plan_route(
        &self,
        start: (AreaId, GridPos),
        goal: (AreaId, GridPos),
        max_expansions: usize,
    ) -> Option<Vec<RouteLeg>> {
        let transition_count = self.transitions.len();
        let goal_node = transition_count + 1;
        let node_pos = |node: usize| -> (AreaId, GridPos) {
            if node == 0 {
                start
            } else {
                let t = &self.transitions[node - 1];
                (t.to_area, t.to)
            }
        };

        let mut dist = vec![f32::INFINITY; transition_count + 2];
        // predecessor node + the leg that reached this node
        let mut prev: Vec<Option<(usize, RouteLeg)>> = vec![None; transition_count + 2];
        let mut open = BinaryHeap::new();
        dist[0] = 0.0;
        open.push(Reverse((OrderedFloat(0.0_f32), 0_usize)));

        while let Some(Reverse((OrderedFloat(cost), node))) = open.pop() {
            if cost > dist[node] {
                continue;
            }
            if node == goal_node {
                break;
            }
            let (area, pos) = node_pos(node);

            if area == goal.0 {
                if let Some((path, leg_cost)) = self.leg(area, pos, goal.1, max_expansions) {
                    let total = cost + leg_cost;
                    if total < dist[goal_node] {
                        dist[goal_node] = total;
                        prev[goal_node] = Some((node, RouteLeg { area, path, exit: None }));
                        open.push(Reverse((OrderedFloat(total), goal_node)));
                    }
                }
            }

            for (idx, transition) in self.transitions.iter().enumerate() {
                if transition.from_area != area {
                    continue;
                }
                let Some((path, leg_cost)) = self.leg(area, pos, transition.from, max_expansions) else {
                    continue;
                };
                let next = idx + 1;
                let total = cost + leg_cost + transition.cost;
                if total < dist[next] {
                    dist[next] = total;
                    prev[next] = Some((node, RouteLeg { area, path, exit: Some(*transition) }));
                    open.push(Reverse((OrderedFloat(total), next)));
                }
            }
        }

        if dist[goal_node].is_infinite() {
            debug!(?start, ?goal, "no route between areas");
            return None;
        }

        let mut legs = Vec::new();
        let mut node = goal_node;
        while let Some((before, leg)) = prev[node].take() {
            legs.push(leg);
            node = before;
        }
        legs.reverse();
        Some(legs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_area_route_is_single_leg() {
        let mut map = AreaMap::new();
        map.add_area(AreaId(0), NavGrid::new(8, 8));
        let legs = map
            .plan_route((AreaId(0), GridPos::new(0, 0)), (AreaId(0), GridPos::new(5, 0)), 1000)
            .unwrap();
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].path.len(), 6);
        assert!(legs[0].exit.is_none());
    }

    #[test]
    fn test_route_through_stairs() {
        let mut map = AreaMap::new();
        map.add_area(AreaId(0), NavGrid::new(10, 10));
        map.add_area(AreaId(1), NavGrid::new(6, 6));
        map.link((AreaId(0), GridPos::new(9, 9)), (AreaId(1), GridPos::new(0, 0)), 1.0);

        let legs = map
            .plan_route((AreaId(0), GridPos::new(0, 0)), (AreaId(1), GridPos::new(5, 5)), 5000)
            .unwrap();

        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].area, AreaId(0));
        assert_eq!(legs[0].path.last(), Some(&GridPos::new(9, 9)));
        assert_eq!(legs[1].area, AreaId(1));
        assert_eq!(legs[1].path.first(), Some(&GridPos::new(0, 0)));
        assert_eq!(legs[1].path.last(), Some(&GridPos::new(5, 5)));
    }

    #[test]
    fn test_unlinked_area_has_no_route() {
        let mut map = AreaMap::new();
        map.add_area(AreaId(0), NavGrid::new(4, 4));
        map.add_area(AreaId(1), NavGrid::new(4, 4));
        assert!(map
            .plan_route((AreaId(0), GridPos::new(0, 0)), (AreaId(1), GridPos::new(1, 1)), 1000)
            .is_none());
    }
}
