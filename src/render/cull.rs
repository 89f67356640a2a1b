//! Restricting draws to the cells around the view.

use macroquad::prelude::*;

const CULL_MARGIN_CELLS: i32 = 1;

/// Inclusive range of cells, `min` to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    /// Lowest cell, inclusive
    pub min: IVec2,
    /// Highest cell, inclusive
    pub max: IVec2,
}

impl CellRect {
    /// Covers every cell; used when no camera is known.
    pub const EVERYTHING: CellRect = CellRect {
        min: IVec2::new(i32::MIN, i32::MIN),
        max: IVec2::new(i32::MAX, i32::MAX),
    };

    /// Whether `cell` is inside the range.
    #[inline]
    pub fn contains(&self, cell: IVec2) -> bool {
        cell.x >= self.min.x && cell.x <= self.max.x && cell.y >= self.min.y && cell.y <= self.max.y
    }

    /// Same test for a box in cell units; decor can straddle cells.
    #[inline]
    pub fn overlaps(&self, center: Vec2, size: Vec2) -> bool {
        let lo = (center - size * 0.5).floor();
        let hi = (center + size * 0.5).floor();
        hi.x as i32 >= self.min.x
            && lo.x as i32 <= self.max.x
            && hi.y as i32 >= self.min.y
            && lo.y as i32 <= self.max.y
    }
}

/// Cells visible through a view rect given in cell units, padded by one cell.
pub fn visible_cells_rect(view_min: Vec2, view_max: Vec2) -> CellRect {
    let mut cx_min = view_min.x.floor() as i32;
    let mut cy_min = view_min.y.floor() as i32;
    let mut cx_max = view_max.x.floor() as i32;
    let mut cy_max = view_max.y.floor() as i32;

    if cx_min > cx_max {
        std::mem::swap(&mut cx_min, &mut cx_max);
    }
    if cy_min > cy_max {
        std::mem::swap(&mut cy_min, &mut cy_max);
    }

    CellRect {
        min: ivec2(cx_min - CULL_MARGIN_CELLS, cy_min - CULL_MARGIN_CELLS),
        max: ivec2(cx_max + CULL_MARGIN_CELLS, cy_max + CULL_MARGIN_CELLS),
    }
}

/// Cells visible through a camera centred on `target` showing `view` cells.
pub fn visible_cells(target: Vec2, view: Vec2) -> CellRect {
    let half = view * 0.5;
    visible_cells_rect(target - half, target + half)
}

/// Keep only positions inside `rect`, reusing `out`.
pub fn cull_positions(positions: &[IVec2], rect: CellRect, out: &mut Vec<IVec2>) {
    out.clear();
    out.extend(positions.iter().copied().filter(|p| rect.contains(*p)));
}
