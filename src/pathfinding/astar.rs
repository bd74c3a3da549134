//! Thread-safe A* over a read-only navigation grid
//!
//! Every call allocates its own node table and open set; the grid is only
//! read. Any number of searches can therefore run at once on worker threads
//! against the same `&NavGrid`.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ahash::{AHashMap, AHashSet};
use ordered_float::OrderedFloat;

use crate::core::types::GridPos;
use crate::world::grid::NavGrid;

/// Default cap on node expansions per search
pub const DEFAULT_MAX_EXPANSIONS: usize = 20_000;

/// Per-search state of one grid cell
#[derive(Debug, Clone, Copy)]
struct NodeState {
    g: f32,
    f: f32,
    parent: Option<GridPos>,
    closed: bool,
}

/// Open-set entry: f, then h, then insertion order (FIFO on full ties)
type OpenEntry = Reverse<(OrderedFloat<f32>, OrderedFloat<f32>, u64, GridPos)>;

/// Search parameters
#[derive(Debug, Clone, Copy)]
pub struct PathRequest<'a> {
    pub start: GridPos,
    /// Reaching any of these cells satisfies the search
    pub targets: &'a [GridPos],
    /// Return the closest approach when no target is reachable
    pub allow_partial: bool,
    /// Extra cells treated as unwalkable (beings in the way, reserved cells)
    pub blocked: Option<&'a AHashSet<GridPos>>,
    pub max_expansions: usize,
}

impl<'a> PathRequest<'a> {
    pub fn new(start: GridPos, targets: &'a [GridPos]) -> Self {
        Self {
            start,
            targets,
            allow_partial: false,
            blocked: None,
            max_expansions: DEFAULT_MAX_EXPANSIONS,
        }
    }

    pub fn partial(mut self, allow: bool) -> Self {
        self.allow_partial = allow;
        self
    }

    pub fn blocking(mut self, blocked: &'a AHashSet<GridPos>) -> Self {
        self.blocked = Some(blocked);
        self
    }

    pub fn max_expansions(mut self, max: usize) -> Self {
        self.max_expansions = max.max(1);
        self
    }
}

/// Outcome of a search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathResult {
    /// Cells from start to end, inclusive; empty when nothing was found.
    /// A partial result of just `[start]` means no cell gets any closer.
    pub path: Vec<GridPos>,
    pub cost: f32,
    /// False for partial (closest approach) paths
    pub reached_goal: bool,
    pub expanded: usize,
}

impl PathResult {
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn end(&self) -> Option<GridPos> {
        self.path.last().copied()
    }
}

/// Cost of a single step between adjacent cells
///
/// Base cost (1 cardinal, sqrt(2) diagonal) times the mean weight of the two
/// cells.
pub fn step_cost(grid: &NavGrid, from: GridPos, to: GridPos) -> f32 {
    let base = if from.is_diagonal_to(&to) {
        std::f32::consts::SQRT_2
    } else {
        1.0
    };
    base * (grid.weight(from) + grid.weight(to)) * 0.5
}

/// Whether a single step `from -> to` is legal on the grid
///
/// `to` must be adjacent, walkable and not blocked; diagonal steps also have
/// to satisfy the grid's diagonal mode.
pub fn can_step(grid: &NavGrid, from: GridPos, to: GridPos, blocked: Option<&AHashSet<GridPos>>) -> bool {
    if from.chebyshev(&to) != 1 {
        return false;
    }
    let clear = |p: GridPos| grid.is_walkable(p) && !blocked.is_some_and(|b| b.contains(&p));
    if !clear(to) {
        return false;
    }
    if from.is_diagonal_to(&to) {
        let first = GridPos::new(to.x, from.y);
        let second = GridPos::new(from.x, to.y);
        return grid.diagonal_mode().permits(clear(first), clear(second));
    }
    true
}

/// Single cell to cell search
pub fn find_path(grid: &NavGrid, start: GridPos, goal: GridPos, allow_partial: bool) -> PathResult {
    let targets = [goal];
    find_path_to_any(grid, &PathRequest::new(start, &targets).partial(allow_partial))
}

/// Search towards the nearest of several target cells
pub fn find_path_to_any(grid: &NavGrid, request: &PathRequest<'_>) -> PathResult {
    let start = request.start;
    if request.targets.is_empty() || !grid.in_bounds(start) {
        return PathResult::default();
    }

    let target_set: AHashSet<GridPos> = request.targets.iter().copied().collect();
    let heuristic = |p: GridPos| {
        request
            .targets
            .iter()
            .map(|t| p.octile(t))
            .fold(f32::INFINITY, f32::min)
    };

    if target_set.contains(&start) {
        return PathResult {
            path: vec![start],
            cost: 0.0,
            reached_goal: true,
            expanded: 0,
        };
    }

    let mut nodes: AHashMap<GridPos, NodeState> = AHashMap::new();
    let mut open: BinaryHeap<OpenEntry> = BinaryHeap::new();
    let mut sequence: u64 = 0;

    let start_h = heuristic(start);
    nodes.insert(
        start,
        NodeState {
            g: 0.0,
            f: start_h,
            parent: None,
            closed: false,
        },
    );
    open.push(Reverse((OrderedFloat(start_h), OrderedFloat(start_h), sequence, start)));

    // Closest approach so far: (h, g, cell)
    let mut best = (start_h, 0.0_f32, start);
    let mut expanded = 0;

    while let Some(Reverse((_, OrderedFloat(h), _, current))) = open.pop() {
        let Some(state) = nodes.get_mut(&current) else {
            continue;
        };
        if state.closed {
            continue;
        }
        state.closed = true;
        let current_g = state.g;

        if target_set.contains(&current) {
            return PathResult {
                path: reconstruct_path(&nodes, current),
                cost: current_g,
                reached_goal: true,
                expanded,
            };
        }

        if h < best.0 || (h == best.0 && current_g < best.1) {
            best = (h, current_g, current);
        }

        expanded += 1;
        if expanded >= request.max_expansions {
            break;
        }

        for neighbor in current.neighbors() {
            if !can_step(grid, current, neighbor, request.blocked) {
                continue;
            }

            let tentative_g = current_g + step_cost(grid, current, neighbor);
            let neighbor_h = heuristic(neighbor);
            let entry = nodes.entry(neighbor).or_insert(NodeState {
                g: f32::INFINITY,
                f: f32::INFINITY,
                parent: None,
                closed: false,
            });
            if entry.closed || tentative_g >= entry.g {
                continue;
            }

            entry.g = tentative_g;
            entry.f = tentative_g + neighbor_h;
            entry.parent = Some(current);

            sequence += 1;
            open.push(Reverse((
                OrderedFloat(entry.f),
                OrderedFloat(neighbor_h),
                sequence,
                neighbor,
            )));
        }
    }

    if request.allow_partial {
        let (_, cost, cell) = best;
        return PathResult {
            path: reconstruct_path(&nodes, cell),
            cost,
            reached_goal: false,
            expanded,
        };
    }

    PathResult {
        expanded,
        ..PathResult::default()
    }
}

/// Walk parent links back to the start
fn reconstruct_path(nodes: &AHashMap<GridPos, NodeState>, mut current: GridPos) -> Vec<GridPos> {
    let mut path = vec![current];
    while let Some(prev) = nodes.get(&current).and_then(|n| n.parent) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Sum of step costs along a path
pub fn path_cost(grid: &NavGrid, path: &[GridPos]) -> f32 {
    path.windows(2).map(|w| step_cost(grid, w[0], w[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::grid::DiagonalMode;

    #[test]
    fn test_pathfind_straight_line() {
        let grid = NavGrid::new(10, 10);
        let start = GridPos::new(0, 0);
        let goal = GridPos::new(5, 0);

        let result = find_path(&grid, start, goal, false);

        assert!(result.reached_goal);
        assert_eq!(result.path.len(), 6);
        assert_eq!(result.path.first(), Some(&start));
        assert_eq!(result.path.last(), Some(&goal));
        assert!((result.cost - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_pathfind_diagonal_uses_octile_cost() {
        let grid = NavGrid::new(10, 10);
        let result = find_path(&grid, GridPos::new(0, 0), GridPos::new(3, 3), false);

        assert_eq!(result.path.len(), 4);
        assert!((result.cost - 3.0 * std::f32::consts::SQRT_2).abs() < 1e-4);
    }

    #[test]
    fn test_pathfind_around_obstacle() {
        let grid = NavGrid::from_ascii(&[
            "......",
            "..#...",
            "..#...",
            "......",
        ]);
        let result = find_path(&grid, GridPos::new(0, 1), GridPos::new(5, 1), false);

        assert!(result.reached_goal);
        assert!(!result.path.contains(&GridPos::new(2, 1)));
        assert!(!result.path.contains(&GridPos::new(2, 2)));
        for w in result.path.windows(2) {
            assert_eq!(w[0].chebyshev(&w[1]), 1);
        }
    }

    #[test]
    fn test_pathfind_no_path() {
        let mut grid = NavGrid::new(10, 10);
        let goal = GridPos::new(5, 5);
        for n in goal.neighbors() {
            grid.set_walkable(n, false);
        }

        let result = find_path(&grid, GridPos::new(0, 0), goal, false);
        assert!(result.is_empty());
        assert!(!result.reached_goal);
    }

    #[test]
    fn test_partial_path_ends_at_closest_approach() {
        let mut grid = NavGrid::new(10, 10);
        let goal = GridPos::new(5, 5);
        for n in goal.neighbors() {
            grid.set_walkable(n, false);
        }

        let result = find_path(&grid, GridPos::new(0, 0), goal, true);
        let end = result.end().unwrap();

        assert!(!result.reached_goal);
        assert_ne!(end, goal);
        assert!((end.octile(&goal) - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_partial_from_closest_cell_is_just_start() {
        let grid = NavGrid::from_ascii(&["...#."]);
        let start = GridPos::new(2, 0);

        let partial = find_path(&grid, start, GridPos::new(4, 0), true);
        assert_eq!(partial.path, vec![start]);
        assert!(!partial.reached_goal);
        assert_eq!(partial.cost, 0.0);

        assert!(find_path(&grid, start, GridPos::new(4, 0), false).is_empty());
    }

    #[test]
    fn test_pathfind_same_start_goal() {
        let grid = NavGrid::new(10, 10);
        let start = GridPos::new(5, 5);
        let result = find_path(&grid, start, start, false);
        assert_eq!(result.path, vec![start]);
        assert_eq!(result.cost, 0.0);
    }

    #[test]
    fn test_blocked_cells_respected() {
        let grid = NavGrid::from_ascii(&["...", "...", "..."]).with_diagonal_mode(DiagonalMode::Never);
        let blocked: AHashSet<GridPos> = [GridPos::new(1, 0)].into_iter().collect();
        let targets = [GridPos::new(2, 0)];
        let request = PathRequest::new(GridPos::new(0, 0), &targets).blocking(&blocked);

        let result = find_path_to_any(&grid, &request);
        assert!(result.reached_goal);
        assert!(!result.path.contains(&GridPos::new(1, 0)));
        assert_eq!(result.path.len(), 5);
    }

    #[test]
    fn test_diagonal_policies_at_corner() {
        // Moving (0,0) -> (1,1) with (1,0) walled
        let base = NavGrid::from_ascii(&[".#", ".."]);
        let from = GridPos::new(0, 0);
        let to = GridPos::new(1, 1);

        let never = base.clone().with_diagonal_mode(DiagonalMode::Never);
        let always = base.clone().with_diagonal_mode(DiagonalMode::Always);
        let strict = base.clone().with_diagonal_mode(DiagonalMode::OnlyIfNoObstacles);
        let lenient = base.with_diagonal_mode(DiagonalMode::AtLeastOneWalkable);

        assert!(!can_step(&never, from, to, None));
        assert!(can_step(&always, from, to, None));
        assert!(!can_step(&strict, from, to, None));
        assert!(can_step(&lenient, from, to, None));
    }

    #[test]
    fn test_prefers_cheaper_terrain() {
        let grid = NavGrid::from_ascii(&[
            ".~~~.",
            ".....",
        ])
        .with_diagonal_mode(DiagonalMode::Never);
        let result = find_path(&grid, GridPos::new(0, 0), GridPos::new(4, 0), false);

        assert!(result.reached_goal);
        assert!(!result.path.contains(&GridPos::new(2, 0)));
        assert!((result.cost - path_cost(&grid, &result.path)).abs() < 1e-4);
    }

    #[test]
    fn test_any_target_picks_nearest() {
        let grid = NavGrid::new(20, 3);
        let targets = [GridPos::new(19, 1), GridPos::new(3, 1)];
        let result = find_path_to_any(&grid, &PathRequest::new(GridPos::new(0, 1), &targets));
        assert_eq!(result.end(), Some(GridPos::new(3, 1)));
    }

    #[test]
    fn test_expansion_cap_stops_search() {
        let grid = NavGrid::new(200, 200);
        let targets = [GridPos::new(199, 199)];
        let request = PathRequest::new(GridPos::new(0, 0), &targets).max_expansions(10);
        let result = find_path_to_any(&grid, &request);
        assert!(result.is_empty());

        let partial = find_path_to_any(&grid, &request.partial(true));
        assert!(!partial.reached_goal);
        assert!(partial.path.len() > 1);
    }
}
