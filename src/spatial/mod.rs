//! Occupancy and slope grids, and neighbour classification over them.

mod connectivity;
mod grid;

pub use connectivity::{
    classify, classify_neighbours, preferences, Connectivity, Corner, CornerCuts, EdgeInset,
    InsetPattern, Neighbours, OverlayKind, OverlayKinds,
};
pub use grid::{last_free_cell_in_direction, Obstruction, OccupancyGrid, Side, SlopeGrid, SlopeType};
