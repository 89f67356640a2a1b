use macroquad::prelude::*;
use std::collections::HashMap;

/// Orthogonal direction on the grid. `Above` is +y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// -x
    Left,
    /// +x
    Right,
    /// +y
    Above,
    /// -y
    Below,
}

impl Side {
    /// Every side.
    pub const ALL: [Side; 4] = [Side::Left, Side::Right, Side::Above, Side::Below];

    /// Unit step towards this side.
    #[inline]
    pub fn delta(self) -> IVec2 {
        match self {
            Side::Left => ivec2(-1, 0),
            Side::Right => ivec2(1, 0),
            Side::Above => ivec2(0, 1),
            Side::Below => ivec2(0, -1),
        }
    }

    /// The side facing this one.
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Above => Side::Below,
            Side::Below => Side::Above,
        }
    }

    /// Left or right.
    #[inline]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }
}

/// Triangular ramp occupying half a cell.
///
/// Positive slopes rise to the right, negative ones fall. `Bottom`/`Top`
/// says which half of the cell is solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlopeType {
    /// Rises to the right, solid below the diagonal
    PositiveBottom,
    /// Rises to the right, solid above the diagonal
    PositiveTop,
    /// Falls to the right, solid below the diagonal
    NegativeBottom,
    /// Falls to the right, solid above the diagonal
    NegativeTop,
}

impl SlopeType {
    /// `positive-bottom`, `positive-top`, `negative-bottom` or `negative-top`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive-bottom" => Some(SlopeType::PositiveBottom),
            "positive-top" => Some(SlopeType::PositiveTop),
            "negative-bottom" => Some(SlopeType::NegativeBottom),
            "negative-top" => Some(SlopeType::NegativeTop),
            _ => None,
        }
    }

    /// Whether the slope rises to the right.
    #[inline]
    pub fn is_positive(self) -> bool {
        matches!(self, SlopeType::PositiveBottom | SlopeType::PositiveTop)
    }
}

/// Boolean grid indexed `[x][y]`, y up, row 0 at the bottom.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OccupancyGrid {
    width: usize,
    height: usize,
    cells: Vec<bool>, // column-major: x * height + y
}

impl OccupancyGrid {
    /// An empty grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
        }
    }

    /// Build from rows written top-first, `#` meaning occupied.
    ///
    /// Handy for tests and debugging; the area loader builds grids from its key instead.
    pub fn from_rows(rows: &[&str]) -> Self {
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let height = rows.len();
        let mut grid = Self::new(width, height);
        for (r, row) in rows.iter().enumerate() {
            let y = height - 1 - r;
            for (x, ch) in row.chars().enumerate() {
                if ch == '#' {
                    grid.set(x, y, true);
                }
            }
        }
        grid
    }

    /// Columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether `(x, y)` lies inside the grid.
    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Occupancy at `(x, y)`; out of bounds is empty.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && self.cells[x as usize * self.height + y as usize]
    }

    /// [`get`](Self::get) for a cell vector.
    #[inline]
    pub fn occupied(&self, cell: IVec2) -> bool {
        self.get(cell.x, cell.y)
    }

    /// Set one cell; out of bounds is ignored.
    pub fn set(&mut self, x: usize, y: usize, occupied: bool) {
        if x < self.width && y < self.height {
            self.cells[x * self.height + y] = occupied;
        }
    }

    /// Occupied cells, column by column, bottom to top.
    pub fn iter_occupied(&self) -> impl Iterator<Item = IVec2> + '_ {
        (0..self.width).flat_map(move |x| {
            (0..self.height)
                .filter(move |&y| self.cells[x * self.height + y])
                .map(move |y| ivec2(x as i32, y as i32))
        })
    }

    /// Number of occupied cells.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }
}

/// Sparse map of slope cells, same dimensions as the middle layer grid.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SlopeGrid {
    width: usize,
    height: usize,
    slopes: HashMap<IVec2, SlopeType>,
}

impl SlopeGrid {
    /// A grid with no slopes.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            slopes: HashMap::new(),
        }
    }

    /// Columns of the matching occupancy grid.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows of the matching occupancy grid.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Mark `cell` as a slope, replacing any previous one.
    pub fn set(&mut self, cell: IVec2, slope: SlopeType) {
        self.slopes.insert(cell, slope);
    }

    /// Slope at `cell`, if any.
    #[inline]
    pub fn get(&self, cell: IVec2) -> Option<SlopeType> {
        self.slopes.get(&cell).copied()
    }

    /// Number of slope cells.
    pub fn len(&self) -> usize {
        self.slopes.len()
    }

    /// True when the grid holds no slopes.
    pub fn is_empty(&self) -> bool {
        self.slopes.is_empty()
    }
}

/// What stopped a pin walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Obstruction {
    /// A solid cell
    Block(IVec2),
    /// A slope cell and its type
    Slope(IVec2, SlopeType),
    /// The walk left the grid
    GridEdge,
}

/// Walk from `start` towards `side` through free cells.
///
/// Returns the last free cell before a block, a slope cell or the grid edge,
/// and what ended the walk. If the neighbour of `start` is already blocked,
/// `start` itself is returned.
pub fn last_free_cell_in_direction(
    grid: &OccupancyGrid,
    slopes: Option<&SlopeGrid>,
    start: IVec2,
    side: Side,
) -> (IVec2, Obstruction) {
    let step = side.delta();
    let mut cell = start;
    // Bounded by the grid extent along the walk axis.
    let limit = grid.width().max(grid.height()) + 1;
    for _ in 0..limit {
        let next = cell + step;
        if !grid.in_bounds(next.x, next.y) {
            return (cell, Obstruction::GridEdge);
        }
        if let Some(slope) = slopes.and_then(|s| s.get(next)) {
            return (cell, Obstruction::Slope(next, slope));
        }
        if grid.occupied(next) {
            return (cell, Obstruction::Block(next));
        }
        cell = next;
    }
    (cell, Obstruction::GridEdge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_bottom_anchored() {
        let grid = OccupancyGrid::from_rows(&["#..", "...", "..#"]);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 3);
        assert!(grid.get(0, 2));
        assert!(grid.get(2, 0));
        assert!(!grid.get(0, 0));
        assert!(!grid.get(-1, 0));
        assert!(!grid.get(3, 0));
        assert_eq!(grid.count(), 2);
    }

    #[test]
    fn pin_walk_stops_before_block() {
        let grid = OccupancyGrid::from_rows(&["....", "....", "####"]);
        let (cell, hit) = last_free_cell_in_direction(&grid, None, ivec2(1, 2), Side::Below);
        assert_eq!(cell, ivec2(1, 1));
        assert_eq!(hit, Obstruction::Block(ivec2(1, 0)));
    }

    #[test]
    fn pin_walk_immediately_blocked_returns_start() {
        let grid = OccupancyGrid::from_rows(&["#.", ".."]);
        let (cell, hit) = last_free_cell_in_direction(&grid, None, ivec2(1, 1), Side::Left);
        assert_eq!(cell, ivec2(1, 1));
        assert_eq!(hit, Obstruction::Block(ivec2(0, 1)));
    }

    #[test]
    fn pin_walk_terminates_at_grid_edge() {
        let grid = OccupancyGrid::from_rows(&["....."]);
        for side in Side::ALL {
            let (cell, hit) = last_free_cell_in_direction(&grid, None, ivec2(2, 0), side);
            assert_eq!(hit, Obstruction::GridEdge);
            let expected = match side {
                Side::Left => ivec2(0, 0),
                Side::Right => ivec2(4, 0),
                Side::Above | Side::Below => ivec2(2, 0),
            };
            assert_eq!(cell, expected);
        }
    }

    #[test]
    fn pin_walk_stops_on_slope() {
        let mut grid = OccupancyGrid::from_rows(&["...", "...", "..."]);
        grid.set(0, 1, true);
        let mut slopes = SlopeGrid::new(3, 3);
        slopes.set(ivec2(0, 1), SlopeType::NegativeBottom);

        let (cell, hit) =
            last_free_cell_in_direction(&grid, Some(&slopes), ivec2(2, 1), Side::Left);
        assert_eq!(cell, ivec2(1, 1));
        assert_eq!(hit, Obstruction::Slope(ivec2(0, 1), SlopeType::NegativeBottom));
    }

    #[test]
    fn slope_names_parse() {
        assert_eq!(SlopeType::parse("Positive-Top"), Some(SlopeType::PositiveTop));
        assert_eq!(SlopeType::parse("sideways"), None);
        assert!(SlopeType::PositiveBottom.is_positive());
        assert!(!SlopeType::NegativeTop.is_positive());
    }
}
