//! Navigation grid - walkability, step weights and sight blocking
//!
//! The grid is the shared, read-only structure every pathfinding search and
//! line-of-sight check reads from. It is only written while the world is
//! being built (placing walls, facilities); searches never mutate it.

use serde::{Deserialize, Serialize};

use crate::core::types::GridPos;

/// When a diagonal step between two cells is legal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DiagonalMode {
    /// Only cardinal steps
    Never,
    /// Diagonal steps always allowed, even cutting solid corners
    Always,
    /// Both orthogonal neighbours must be clear
    #[default]
    OnlyIfNoObstacles,
    /// At least one orthogonal neighbour must be clear
    AtLeastOneWalkable,
}

impl DiagonalMode {
    /// Decide diagonal legality from whether the two orthogonal cells are clear
    pub fn permits(&self, first_clear: bool, second_clear: bool) -> bool {
        match self {
            DiagonalMode::Never => false,
            DiagonalMode::Always => true,
            DiagonalMode::OnlyIfNoObstacles => first_clear && second_clear,
            DiagonalMode::AtLeastOneWalkable => first_clear || second_clear,
        }
    }
}

/// Static terrain of a single cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainCell {
    pub walkable: bool,
    /// Step cost multiplier (also the movement difficulty), 1.0 = plain ground
    pub weight: f32,
    pub blocks_sight: bool,
}

impl Default for TerrainCell {
    fn default() -> Self {
        Self {
            walkable: true,
            weight: 1.0,
            blocks_sight: false,
        }
    }
}

impl TerrainCell {
    pub fn wall() -> Self {
        Self {
            walkable: false,
            weight: 1.0,
            blocks_sight: true,
        }
    }
}

/// Rectangular navigation grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavGrid {
    width: i32,
    height: i32,
    cells: Vec<TerrainCell>,
    diagonal_mode: DiagonalMode,
}

impl NavGrid {
    /// Open grid of plain ground
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            cells: vec![TerrainCell::default(); (width * height) as usize],
            diagonal_mode: DiagonalMode::default(),
        }
    }

    /// Build a grid from rows of characters
    ///
    /// `.` ground, `#` wall, `~` mud (weight 2), `"` tall grass (blocks
    /// sight), `o` boulder (unwalkable, see-through). Unknown characters are
    /// ground.
    pub fn from_ascii(rows: &[&str]) -> Self {
        let height = rows.len() as i32;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(1) as i32;
        let mut grid = Self::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let pos = GridPos::new(x as i32, y as i32);
                let cell = match ch {
                    '#' => TerrainCell::wall(),
                    '~' => TerrainCell { weight: 2.0, ..TerrainCell::default() },
                    '"' => TerrainCell { blocks_sight: true, ..TerrainCell::default() },
                    'o' => TerrainCell { walkable: false, ..TerrainCell::default() },
                    _ => TerrainCell::default(),
                };
                grid.set_cell(pos, cell);
            }
        }
        grid
    }

    pub fn with_diagonal_mode(mut self, mode: DiagonalMode) -> Self {
        self.diagonal_mode = mode;
        self
    }

    pub fn set_diagonal_mode(&mut self, mode: DiagonalMode) {
        self.diagonal_mode = mode;
    }

    pub fn diagonal_mode(&self) -> DiagonalMode {
        self.diagonal_mode
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    #[inline]
    fn index(&self, pos: GridPos) -> Option<usize> {
        if self.in_bounds(pos) {
            Some((pos.y * self.width + pos.x) as usize)
        } else {
            None
        }
    }

    pub fn cell(&self, pos: GridPos) -> Option<&TerrainCell> {
        self.index(pos).map(|i| &self.cells[i])
    }

    pub fn set_cell(&mut self, pos: GridPos, cell: TerrainCell) {
        if let Some(i) = self.index(pos) {
            self.cells[i] = cell;
        }
    }

    pub fn set_walkable(&mut self, pos: GridPos, walkable: bool) {
        if let Some(i) = self.index(pos) {
            self.cells[i].walkable = walkable;
        }
    }

    pub fn set_weight(&mut self, pos: GridPos, weight: f32) {
        if let Some(i) = self.index(pos) {
            self.cells[i].weight = weight.max(0.01);
        }
    }

    pub fn set_blocks_sight(&mut self, pos: GridPos, blocks: bool) {
        if let Some(i) = self.index(pos) {
            self.cells[i].blocks_sight = blocks;
        }
    }

    /// Terrain walkability (out of bounds is never walkable)
    #[inline]
    pub fn is_walkable(&self, pos: GridPos) -> bool {
        self.cell(pos).is_some_and(|c| c.walkable)
    }

    /// Step weight, infinite outside the grid
    #[inline]
    pub fn weight(&self, pos: GridPos) -> f32 {
        self.cell(pos).map(|c| c.weight).unwrap_or(f32::INFINITY)
    }

    /// Out of bounds cells block sight
    #[inline]
    pub fn blocks_sight(&self, pos: GridPos) -> bool {
        self.cell(pos).map(|c| c.blocks_sight).unwrap_or(true)
    }

    /// All walkable cells, row-major
    pub fn walkable_cells(&self) -> impl Iterator<Item = GridPos> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| GridPos::new(x, y)))
            .filter(move |p| self.is_walkable(*p))
    }
}
