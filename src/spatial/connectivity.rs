//! Neighbour classification for modularized tiles.
//!
//! A cell's 8-neighbour occupancy picks which overlay pieces (edges, corners,
//! caps, insets) are drawn over its base texture. Each occupancy pattern has a
//! fixed preference list; the first entry whose overlay art is available wins,
//! so a tile with partial art degrades to a coarser piece instead of failing.

use super::grid::{OccupancyGrid, Side};
use macroquad::prelude::*;

/// Diagonal neighbour / corner of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    /// Up and to the left
    TopLeft,
    /// Up and to the right
    TopRight,
    /// Down and to the right
    BottomRight,
    /// Down and to the left
    BottomLeft,
}

impl Corner {
    /// Clockwise from the top left.
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    /// Offset to the diagonal neighbour, y up.
    #[inline]
    pub fn delta(self) -> IVec2 {
        match self {
            Corner::TopLeft => ivec2(-1, 1),
            Corner::TopRight => ivec2(1, 1),
            Corner::BottomRight => ivec2(1, -1),
            Corner::BottomLeft => ivec2(-1, -1),
        }
    }

    /// The two orthogonal sides meeting at this corner.
    #[inline]
    pub fn sides(self) -> (Side, Side) {
        match self {
            Corner::TopLeft => (Side::Above, Side::Left),
            Corner::TopRight => (Side::Above, Side::Right),
            Corner::BottomRight => (Side::Below, Side::Right),
            Corner::BottomLeft => (Side::Below, Side::Left),
        }
    }

    /// Corner formed by two adjacent sides; `None` for opposite sides.
    pub fn between(a: Side, b: Side) -> Option<Corner> {
        Corner::ALL.into_iter().find(|c| {
            let (s1, s2) = c.sides();
            (s1 == a && s2 == b) || (s1 == b && s2 == a)
        })
    }

    /// The diagonally opposite corner.
    #[inline]
    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomRight => Corner::TopLeft,
            Corner::BottomLeft => Corner::TopRight,
        }
    }

    /// Whether the corner is on the top edge.
    #[inline]
    pub fn is_top(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::TopRight)
    }

    /// Clockwise quarter turns from the canonical top-left orientation.
    #[inline]
    pub fn quarter_turns(self) -> u8 {
        match self {
            Corner::TopLeft => 0,
            Corner::TopRight => 1,
            Corner::BottomRight => 2,
            Corner::BottomLeft => 3,
        }
    }
}

/// Kind of overlay art a tile may ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    /// Isolated tile with no neighbours
    Single,
    /// End of a row or column
    Cap,
    /// Outer corner
    Corner,
    /// Straight edge
    Edge,
    /// Top-surface-only art (grass on a ledge); cannot be rotated.
    Top,
    /// Inner corner, where a diagonal neighbour is missing
    Inset,
}

impl OverlayKind {
    /// Every kind, in discovery order.
    pub const ALL: [OverlayKind; 6] = [
        OverlayKind::Single,
        OverlayKind::Cap,
        OverlayKind::Corner,
        OverlayKind::Edge,
        OverlayKind::Top,
        OverlayKind::Inset,
    ];

    /// File stem of the overlay image inside a tile's overlay directory.
    pub fn file_stem(self) -> &'static str {
        match self {
            OverlayKind::Single => "single",
            OverlayKind::Cap => "cap",
            OverlayKind::Corner => "corner",
            OverlayKind::Edge => "edge",
            OverlayKind::Top => "top",
            OverlayKind::Inset => "inset",
        }
    }

    #[inline]
    fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Set of overlay kinds with art available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OverlayKinds(u8);

impl OverlayKinds {
    /// No overlay art at all.
    pub const NONE: OverlayKinds = OverlayKinds(0);

    /// Every kind available.
    pub fn all() -> Self {
        OverlayKind::ALL.into_iter().collect()
    }

    /// Whether art for `kind` is available.
    #[inline]
    pub fn contains(self, kind: OverlayKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Whether every kind in `other` is available.
    pub fn contains_all(self, other: OverlayKinds) -> bool {
        self.0 & other.0 == other.0
    }

    /// This set plus `kind`.
    pub fn with(mut self, kind: OverlayKind) -> Self {
        self.insert(kind);
        self
    }

    /// This set minus `kind`.
    pub fn without(mut self, kind: OverlayKind) -> Self {
        self.0 &= !kind.bit();
        self
    }

    /// Add `kind` in place.
    pub fn insert(&mut self, kind: OverlayKind) {
        self.0 |= kind.bit();
    }

    /// True when no overlay art is available.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<OverlayKind> for OverlayKinds {
    fn from_iter<I: IntoIterator<Item = OverlayKind>>(iter: I) -> Self {
        let mut set = OverlayKinds::NONE;
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

/// Insets cut into a three-sided edge piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeInset {
    /// Both diagonals on the closed side are filled.
    None,
    /// One diagonal on the closed side is empty.
    One(Corner),
    /// Both diagonals on the closed side are empty (T-intersection).
    Tee,
}

/// Inset layout for a cell with all four orthogonal neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsetPattern {
    /// No diagonal neighbours: insets in all four corners.
    Cross,
    /// Only this diagonal is occupied: insets in the other three.
    AllBut(Corner),
    /// Both diagonals on this side are empty.
    Side(Side),
    /// Two opposite diagonals are empty.
    Diagonal {
        /// The empty pair is bottom-left and top-right
        positive: bool,
    },
    /// Only this diagonal is empty.
    One(Corner),
}

impl InsetPattern {
    /// Corners that receive an inset piece.
    pub fn corners(self) -> Vec<Corner> {
        match self {
            InsetPattern::Cross => Corner::ALL.to_vec(),
            InsetPattern::AllBut(solid) => {
                Corner::ALL.into_iter().filter(|c| *c != solid).collect()
            }
            InsetPattern::Side(side) => Corner::ALL
                .into_iter()
                .filter(|c| {
                    let (a, b) = c.sides();
                    a == side || b == side
                })
                .collect(),
            InsetPattern::Diagonal { positive: true } => {
                vec![Corner::TopRight, Corner::BottomLeft]
            }
            InsetPattern::Diagonal { positive: false } => {
                vec![Corner::TopLeft, Corner::BottomRight]
            }
            InsetPattern::One(c) => vec![c],
        }
    }
}

/// Which modular piece a cell resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connectivity {
    /// Base texture only.
    Default,
    /// No orthogonal neighbours.
    Single,
    /// Exactly one orthogonal neighbour, on the given side.
    Cap(Side),
    /// Left and right neighbours only.
    Row,
    /// Above and below neighbours only.
    Column,
    /// Two adjacent neighbours.
    Corner {
        /// The exposed corner
        corner: Corner,
        /// The diagonal between the two neighbours is empty
        inset: bool,
    },
    /// Three neighbours.
    Edge {
        /// The empty side
        open: Side,
        /// Insets on the closed side
        inset: EdgeInset,
    },
    /// Top-surface-only art, drawn without rotation.
    Top,
    /// All four neighbours with at least one empty diagonal.
    FourWay(InsetPattern),
}

impl Connectivity {
    /// Overlay kinds that must be available for this piece.
    pub fn required_kinds(self) -> OverlayKinds {
        let kinds = OverlayKinds::NONE;
        match self {
            Connectivity::Default => kinds,
            Connectivity::Single => kinds.with(OverlayKind::Single),
            Connectivity::Cap(_) => kinds.with(OverlayKind::Cap),
            Connectivity::Row | Connectivity::Column => kinds.with(OverlayKind::Edge),
            Connectivity::Corner { inset, .. } => {
                let kinds = kinds.with(OverlayKind::Corner);
                if inset {
                    kinds.with(OverlayKind::Inset)
                } else {
                    kinds
                }
            }
            Connectivity::Edge { inset, .. } => {
                let kinds = kinds.with(OverlayKind::Edge);
                match inset {
                    EdgeInset::None => kinds,
                    _ => kinds.with(OverlayKind::Inset),
                }
            }
            Connectivity::Top => kinds.with(OverlayKind::Top),
            Connectivity::FourWay(_) => kinds.with(OverlayKind::Inset),
        }
    }

    /// Overlay pieces to draw, in order, with clockwise quarter turns.
    ///
    /// Canonical art orientation: `edge` and `top` face up, `corner` and
    /// `inset` sit top-left, `cap` has its neighbour below.
    pub fn overlays(self) -> Vec<(OverlayKind, u8)> {
        match self {
            Connectivity::Default => Vec::new(),
            Connectivity::Single => vec![(OverlayKind::Single, 0)],
            Connectivity::Cap(side) => vec![(OverlayKind::Cap, cap_turns(side))],
            Connectivity::Row => vec![(OverlayKind::Edge, 0), (OverlayKind::Edge, 2)],
            Connectivity::Column => vec![(OverlayKind::Edge, 1), (OverlayKind::Edge, 3)],
            Connectivity::Corner { corner, inset } => {
                let mut out = vec![(OverlayKind::Corner, corner.quarter_turns())];
                if inset {
                    out.push((OverlayKind::Inset, corner.opposite().quarter_turns()));
                }
                out
            }
            Connectivity::Edge { open, inset } => {
                let mut out = vec![(OverlayKind::Edge, edge_turns(open))];
                out.extend(
                    edge_inset_corners(open, inset)
                        .into_iter()
                        .map(|c| (OverlayKind::Inset, c.quarter_turns())),
                );
                out
            }
            Connectivity::Top => vec![(OverlayKind::Top, 0)],
            Connectivity::FourWay(pattern) => pattern
                .corners()
                .into_iter()
                .map(|c| (OverlayKind::Inset, c.quarter_turns()))
                .collect(),
        }
    }

    /// Short stable name, used in logs and debug output.
    pub fn label(self) -> String {
        match self {
            Connectivity::Default => "default".into(),
            Connectivity::Single => "single".into(),
            Connectivity::Cap(side) => format!("cap-{side:?}").to_lowercase(),
            Connectivity::Row => "row".into(),
            Connectivity::Column => "column".into(),
            Connectivity::Corner { corner, inset } => {
                format!("corner-{corner:?}{}", if inset { "-inset" } else { "" }).to_lowercase()
            }
            Connectivity::Edge { open, inset } => match inset {
                EdgeInset::None => format!("edge-{open:?}").to_lowercase(),
                EdgeInset::One(c) => format!("edge-{open:?}-inset-{c:?}").to_lowercase(),
                EdgeInset::Tee => format!("edge-{open:?}-tee").to_lowercase(),
            },
            Connectivity::Top => "top".into(),
            Connectivity::FourWay(p) => format!("fourway-{p:?}").to_lowercase(),
        }
    }
}

#[inline]
fn cap_turns(neighbour: Side) -> u8 {
    match neighbour {
        Side::Below => 0,
        Side::Left => 1,
        Side::Above => 2,
        Side::Right => 3,
    }
}

#[inline]
fn edge_turns(open: Side) -> u8 {
    match open {
        Side::Above => 0,
        Side::Right => 1,
        Side::Below => 2,
        Side::Left => 3,
    }
}

fn edge_inset_corners(open: Side, inset: EdgeInset) -> Vec<Corner> {
    match inset {
        EdgeInset::None => Vec::new(),
        EdgeInset::One(c) => vec![c],
        EdgeInset::Tee => closed_side_corners(open).to_vec(),
    }
}

/// The two diagonals on the side opposite `open`.
fn closed_side_corners(open: Side) -> [Corner; 2] {
    match open.opposite() {
        Side::Below => [Corner::BottomLeft, Corner::BottomRight],
        Side::Above => [Corner::TopLeft, Corner::TopRight],
        Side::Left => [Corner::TopLeft, Corner::BottomLeft],
        Side::Right => [Corner::TopRight, Corner::BottomRight],
    }
}

/// Occupancy of the eight neighbours of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Neighbours {
    /// Orthogonal neighbour to the left
    pub left: bool,
    /// Orthogonal neighbour to the right
    pub right: bool,
    /// Orthogonal neighbour above
    pub above: bool,
    /// Orthogonal neighbour below
    pub below: bool,
    /// Diagonal neighbour, up-left
    pub top_left: bool,
    /// Diagonal neighbour, up-right
    pub top_right: bool,
    /// Diagonal neighbour, down-right
    pub bottom_right: bool,
    /// Diagonal neighbour, down-left
    pub bottom_left: bool,
}

impl Neighbours {
    /// Read the neighbours of `(x, y)`; out-of-bounds cells are empty.
    pub fn of(grid: &OccupancyGrid, x: i32, y: i32) -> Self {
        let at = |d: IVec2| grid.get(x + d.x, y + d.y);
        Self {
            left: at(Side::Left.delta()),
            right: at(Side::Right.delta()),
            above: at(Side::Above.delta()),
            below: at(Side::Below.delta()),
            top_left: at(Corner::TopLeft.delta()),
            top_right: at(Corner::TopRight.delta()),
            bottom_right: at(Corner::BottomRight.delta()),
            bottom_left: at(Corner::BottomLeft.delta()),
        }
    }

    /// Unpack from 8 bits: left, right, above, below, then the diagonals clockwise from top-left.
    pub fn from_bits(bits: u8) -> Self {
        let b = |i: u8| bits & (1 << i) != 0;
        Self {
            left: b(0),
            right: b(1),
            above: b(2),
            below: b(3),
            top_left: b(4),
            top_right: b(5),
            bottom_right: b(6),
            bottom_left: b(7),
        }
    }

    /// Occupancy on `side`.
    #[inline]
    pub fn side(&self, side: Side) -> bool {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
            Side::Above => self.above,
            Side::Below => self.below,
        }
    }

    /// Occupancy of the diagonal at `corner`.
    #[inline]
    pub fn diagonal(&self, corner: Corner) -> bool {
        match corner {
            Corner::TopLeft => self.top_left,
            Corner::TopRight => self.top_right,
            Corner::BottomRight => self.bottom_right,
            Corner::BottomLeft => self.bottom_left,
        }
    }

    fn present_sides(&self) -> Vec<Side> {
        Side::ALL.into_iter().filter(|s| self.side(*s)).collect()
    }
}

/// Ordered candidate pieces for a neighbour pattern, most specific first.
///
/// Always ends with [`Connectivity::Default`].
pub fn preferences(n: &Neighbours) -> Vec<Connectivity> {
    use Connectivity as C;

    let present = n.present_sides();
    let mut prefs = Vec::with_capacity(5);

    match present.as_slice() {
        [] => {
            prefs.push(C::Single);
            prefs.push(C::Top);
        }
        [only] => {
            prefs.push(C::Cap(*only));
            prefs.push(if only.is_horizontal() { C::Row } else { C::Column });
            if *only == Side::Below {
                prefs.push(C::Top);
            }
        }
        [a, b] => match Corner::between(a.opposite(), b.opposite()) {
            Some(corner) => {
                // The diagonal between the two occupied sides.
                if !n.diagonal(corner.opposite()) {
                    prefs.push(C::Corner { corner, inset: true });
                }
                prefs.push(C::Corner { corner, inset: false });
                let open = if corner.is_top() { Side::Above } else { Side::Below };
                prefs.push(C::Edge { open, inset: EdgeInset::None });
                if corner.is_top() {
                    prefs.push(C::Top);
                }
            }
            None if a.is_horizontal() => {
                prefs.push(C::Row);
                prefs.push(C::Top);
            }
            None => prefs.push(C::Column),
        },
        [_, _, _] => {
            let open = Side::ALL
                .into_iter()
                .find(|s| !n.side(*s))
                .unwrap_or(Side::Above);
            let [c1, c2] = closed_side_corners(open);
            let inset = match (n.diagonal(c1), n.diagonal(c2)) {
                (false, false) => EdgeInset::Tee,
                (false, true) => EdgeInset::One(c1),
                (true, false) => EdgeInset::One(c2),
                (true, true) => EdgeInset::None,
            };
            if inset != EdgeInset::None {
                prefs.push(C::Edge { open, inset });
            }
            prefs.push(C::Edge { open, inset: EdgeInset::None });
            if open == Side::Above {
                prefs.push(C::Top);
            }
        }
        _ => {
            if let Some(pattern) = inset_pattern(n) {
                prefs.push(C::FourWay(pattern));
            }
        }
    }

    prefs.push(C::Default);
    prefs
}

fn inset_pattern(n: &Neighbours) -> Option<InsetPattern> {
    let present: Vec<Corner> = Corner::ALL.into_iter().filter(|c| n.diagonal(*c)).collect();
    let missing: Vec<Corner> = Corner::ALL.into_iter().filter(|c| !n.diagonal(*c)).collect();

    match (present.as_slice(), missing.as_slice()) {
        ([], _) => Some(InsetPattern::Cross),
        ([solid], _) => Some(InsetPattern::AllBut(*solid)),
        (_, [a, b]) => {
            if *a == b.opposite() {
                Some(InsetPattern::Diagonal {
                    positive: matches!(a, Corner::TopRight | Corner::BottomLeft),
                })
            } else {
                let (a1, a2) = a.sides();
                let (b1, b2) = b.sides();
                let shared = if a1 == b1 || a1 == b2 { a1 } else { a2 };
                debug_assert!(shared == b1 || shared == b2);
                Some(InsetPattern::Side(shared))
            }
        }
        (_, [gap]) => Some(InsetPattern::One(*gap)),
        _ => None,
    }
}

/// Pick the most specific piece for `n` whose art is available.
pub fn classify_neighbours(n: &Neighbours, available: OverlayKinds) -> Connectivity {
    preferences(n)
        .into_iter()
        .find(|c| available.contains_all(c.required_kinds()))
        .unwrap_or(Connectivity::Default)
}

/// Classify the cell `(x, y)` of `grid`.
pub fn classify(x: i32, y: i32, grid: &OccupancyGrid, available: OverlayKinds) -> Connectivity {
    classify_neighbours(&Neighbours::of(grid, x, y), available)
}

/// Corners with no orthogonal neighbour on either adjoining side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CornerCuts {
    /// Bevel the top-left corner
    pub top_left: bool,
    /// Bevel the top-right corner
    pub top_right: bool,
    /// Bevel the bottom-right corner
    pub bottom_right: bool,
    /// Bevel the bottom-left corner
    pub bottom_left: bool,
}

impl CornerCuts {
    /// Cuts for the cell at `(x, y)`.
    pub fn of(grid: &OccupancyGrid, x: i32, y: i32) -> Self {
        Self::from_neighbours(&Neighbours::of(grid, x, y))
    }

    /// Cuts implied by a neighbour pattern.
    pub fn from_neighbours(n: &Neighbours) -> Self {
        let cut = |c: Corner| {
            let (a, b) = c.sides();
            !n.side(a) && !n.side(b)
        };
        Self {
            top_left: cut(Corner::TopLeft),
            top_right: cut(Corner::TopRight),
            bottom_right: cut(Corner::BottomRight),
            bottom_left: cut(Corner::BottomLeft),
        }
    }

    /// Whether any corner is cut.
    pub fn any(&self) -> bool {
        self.top_left || self.top_right || self.bottom_right || self.bottom_left
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn center(rows: &[&str], available: OverlayKinds) -> Connectivity {
        let grid = OccupancyGrid::from_rows(rows);
        classify(1, 1, &grid, available)
    }

    #[test]
    fn every_pattern_classifies_deterministically_within_available_art() {
        for bits in 0..=u8::MAX {
            let n = Neighbours::from_bits(bits);
            for available in (0u8..64).map(OverlayKinds) {
                let first = classify_neighbours(&n, available);
                assert_eq!(first, classify_neighbours(&n, available));
                assert!(available.contains_all(first.required_kinds()));
                assert!(preferences(&n).contains(&first));
            }
        }
    }

    #[test]
    fn missing_art_degrades_to_next_preference() {
        for bits in 0..=u8::MAX {
            let n = Neighbours::from_bits(bits);
            let prefs = preferences(&n);
            let ideal = prefs[0];
            for kind in OverlayKind::ALL {
                if !ideal.required_kinds().contains(kind) {
                    continue;
                }
                let available = OverlayKinds::all().without(kind);
                let got = classify_neighbours(&n, available);
                assert_ne!(got, ideal);
                let expected = prefs[1..]
                    .iter()
                    .copied()
                    .find(|c| available.contains_all(c.required_kinds()))
                    .unwrap_or(Connectivity::Default);
                assert_eq!(got, expected);
            }
        }
    }

    #[test]
    fn diagonals_ignored_without_all_four_sides() {
        // Same orthogonal layout, diagonals flipped: only insets may differ.
        let a = center(&["...", "##.", "..."], OverlayKinds::all());
        let b = center(&["#.#", "##.", "#.#"], OverlayKinds::all());
        assert_eq!(a, Connectivity::Cap(Side::Left));
        assert_eq!(a, b);
    }

    #[test]
    fn missing_top_left_diagonal_gives_single_inset() {
        let c = center(&[".##", "###", "###"], OverlayKinds::all());
        assert_eq!(c, Connectivity::FourWay(InsetPattern::One(Corner::TopLeft)));

        let no_insets = OverlayKinds::all().without(OverlayKind::Inset);
        let degraded = center(&[".##", "###", "###"], no_insets);
        assert_eq!(degraded, Connectivity::Default);
    }

    #[test]
    fn four_way_patterns() {
        let all = OverlayKinds::all();
        assert_eq!(
            center(&[".#.", "###", ".#."], all),
            Connectivity::FourWay(InsetPattern::Cross)
        );
        assert_eq!(
            center(&["##.", "###", ".#."], all),
            Connectivity::FourWay(InsetPattern::AllBut(Corner::TopLeft))
        );
        assert_eq!(
            center(&[".#.", "###", "###"], all),
            Connectivity::FourWay(InsetPattern::Side(Side::Above))
        );
        assert_eq!(
            center(&["##.", "###", ".##"], all),
            Connectivity::FourWay(InsetPattern::Diagonal { positive: true })
        );
        assert_eq!(
            center(&[".##", "###", "##."], all),
            Connectivity::FourWay(InsetPattern::Diagonal { positive: false })
        );
        assert_eq!(center(&["###", "###", "###"], all), Connectivity::Default);
    }

    #[test]
    fn single_row_gets_caps_and_row() {
        let grid = OccupancyGrid::from_rows(&["###"]);
        let all = OverlayKinds::all();
        assert_eq!(classify(0, 0, &grid, all), Connectivity::Cap(Side::Right));
        assert_eq!(classify(1, 0, &grid, all), Connectivity::Row);
        assert_eq!(classify(2, 0, &grid, all), Connectivity::Cap(Side::Left));

        let no_caps = all.without(OverlayKind::Cap);
        assert_eq!(classify(0, 0, &grid, no_caps), Connectivity::Row);
        assert_eq!(classify(2, 0, &grid, no_caps), Connectivity::Row);
    }

    #[test]
    fn row_degrades_to_top_surface_art() {
        let grid = OccupancyGrid::from_rows(&["###"]);
        let top_only = OverlayKinds::NONE.with(OverlayKind::Top);
        assert_eq!(classify(1, 0, &grid, top_only), Connectivity::Top);
        assert_eq!(classify(0, 0, &grid, OverlayKinds::NONE), Connectivity::Default);
    }

    #[test]
    fn corner_inset_and_degrade_order() {
        // Neighbours right and below, diagonal bottom-right empty.
        let rows = ["...", ".##", ".#."];
        let all = OverlayKinds::all();
        assert_eq!(
            center(&rows, all),
            Connectivity::Corner { corner: Corner::TopLeft, inset: true }
        );
        assert_eq!(
            center(&rows, all.without(OverlayKind::Inset)),
            Connectivity::Corner { corner: Corner::TopLeft, inset: false }
        );
        assert_eq!(
            center(&rows, OverlayKinds::NONE.with(OverlayKind::Edge)),
            Connectivity::Edge { open: Side::Above, inset: EdgeInset::None }
        );
        // Filled diagonal never asks for an inset.
        assert_eq!(
            center(&["...", ".##", ".##"], all),
            Connectivity::Corner { corner: Corner::TopLeft, inset: false }
        );
    }

    #[test]
    fn edge_insets_follow_closed_side_diagonals() {
        let all = OverlayKinds::all();
        assert_eq!(
            center(&["...", "###", ".#."], all),
            Connectivity::Edge { open: Side::Above, inset: EdgeInset::Tee }
        );
        assert_eq!(
            center(&["...", "###", "##."], all),
            Connectivity::Edge { open: Side::Above, inset: EdgeInset::One(Corner::BottomRight) }
        );
        assert_eq!(
            center(&["...", "###", "###"], all),
            Connectivity::Edge { open: Side::Above, inset: EdgeInset::None }
        );
        assert_eq!(
            center(&["##.", "##.", "##."], all),
            Connectivity::Edge { open: Side::Right, inset: EdgeInset::None }
        );
    }

    #[test]
    fn isolated_cell() {
        let all = OverlayKinds::all();
        assert_eq!(center(&["...", ".#.", "..."], all), Connectivity::Single);
        assert_eq!(
            center(&["...", ".#.", "..."], all.without(OverlayKind::Single)),
            Connectivity::Top
        );
    }

    #[test]
    fn overlays_rotate_with_orientation() {
        let c = Connectivity::Corner { corner: Corner::BottomRight, inset: true };
        assert_eq!(
            c.overlays(),
            vec![(OverlayKind::Corner, 2), (OverlayKind::Inset, 0)]
        );
        assert_eq!(
            Connectivity::Edge { open: Side::Left, inset: EdgeInset::Tee }.overlays(),
            vec![(OverlayKind::Edge, 3), (OverlayKind::Inset, 1), (OverlayKind::Inset, 2)]
        );
        assert_eq!(Connectivity::Cap(Side::Right).overlays(), vec![(OverlayKind::Cap, 3)]);
        assert!(Connectivity::Default.overlays().is_empty());
    }

    #[test]
    fn corner_cuts_need_both_sides_empty() {
        let grid = OccupancyGrid::from_rows(&["...", "##.", "..."]);
        let cuts = CornerCuts::of(&grid, 1, 1);
        assert!(!cuts.top_left);
        assert!(cuts.top_right);
        assert!(cuts.bottom_right);
        assert!(!cuts.bottom_left);

        let lone = OccupancyGrid::from_rows(&["#"]);
        let cuts = CornerCuts::of(&lone, 0, 0);
        assert!(cuts.top_left && cuts.top_right && cuts.bottom_left && cuts.bottom_right);
    }
}
