//! Moving things that live in a loaded area.

use crate::render::Material;
use crate::spatial::{OccupancyGrid, SlopeGrid};
use macroquad::prelude::*;
use std::rc::Rc;

/// Grids shared by everything that moves in the current area.
///
/// Swapped wholesale when the player walks through a gate.
#[derive(Debug, Clone, Default)]
pub struct WorldContext {
    blocks: OccupancyGrid,
    slopes: SlopeGrid,
}

impl WorldContext {
    /// Context over the given grids.
    pub fn new(blocks: OccupancyGrid, slopes: SlopeGrid) -> Self {
        Self { blocks, slopes }
    }

    /// Replace the block grid, e.g. after an area change.
    pub fn set_block_grid(&mut self, blocks: OccupancyGrid) {
        self.blocks = blocks;
    }

    /// Replace the slope grid.
    pub fn set_slope_grid(&mut self, slopes: SlopeGrid) {
        self.slopes = slopes;
    }

    /// Current block grid.
    pub fn blocks(&self) -> &OccupancyGrid {
        &self.blocks
    }

    /// Current slope grid.
    pub fn slopes(&self) -> &SlopeGrid {
        &self.slopes
    }

    /// Whether `cell` stops moving objects. Slope cells count as full blocks.
    pub fn solid(&self, cell: IVec2) -> bool {
        self.blocks.occupied(cell) || self.slopes.get(cell).is_some()
    }
}

/// Axis-aligned box in cell units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Bottom-left corner
    pub min: Vec2,
    /// Top-right corner
    pub max: Vec2,
}

impl Aabb {
    /// Box of `size` centred on `center`.
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// The unit box covering `cell`.
    pub fn cell(cell: IVec2) -> Self {
        let min = cell.as_vec2();
        Self {
            min,
            max: min + Vec2::ONE,
        }
    }

    /// Strict overlap; touching edges do not count.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Grid cells this box touches, inclusive.
    pub fn cells(&self) -> impl Iterator<Item = IVec2> {
        let lo = self.min.floor().as_ivec2();
        let hi = self.max.floor().as_ivec2();
        (lo.y..=hi.y).flat_map(move |y| (lo.x..=hi.x).map(move |x| ivec2(x, y)))
    }
}

/// Position, velocity and size of an object, in cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    /// Center
    pub position: Vec2,
    /// Cells per second
    pub velocity: Vec2,
    /// Width and height
    pub size: Vec2,
}

impl Body {
    /// A body at rest.
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            size,
        }
    }

    /// Current bounds.
    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(self.position, self.size)
    }
}

/// How the physics engine treats an object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsProperties {
    /// Multiplier on the engine's gravity; 0 floats
    pub gravity_scale: f32,
    /// Whether other objects are stopped by this one
    pub collidable: bool,
}

impl Default for PhysicsProperties {
    fn default() -> Self {
        Self {
            gravity_scale: 1.0,
            collidable: true,
        }
    }
}

/// How an object is drawn.
#[derive(Debug, Clone)]
pub enum Renderable {
    /// Always the same material
    Static(Rc<Material>),
    /// Materials cycled in order
    Animated {
        /// One material per frame
        frames: Vec<Rc<Material>>,
        /// Seconds per frame
        frame_time: f32,
        /// Seconds since the first frame
        elapsed: f32,
    },
    /// Named states, one of which is shown
    MultiState {
        /// State names and their materials
        states: Vec<(String, Rc<Material>)>,
        /// Index into `states`
        current: usize,
    },
}

impl Renderable {
    /// Move an animation forward by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        if let Renderable::Animated { elapsed, .. } = self {
            *elapsed += dt;
        }
    }

    /// Switch to the state called `name`; false if there is none.
    pub fn set_state(&mut self, name: &str) -> bool {
        let Renderable::MultiState { states, current } = self else {
            return false;
        };
        match states.iter().position(|(n, _)| n == name) {
            Some(i) => {
                *current = i;
                true
            }
            None => false,
        }
    }

    /// Material to draw right now.
    pub fn material(&self) -> Option<&Rc<Material>> {
        match self {
            Renderable::Static(m) => Some(m),
            Renderable::Animated {
                frames,
                frame_time,
                elapsed,
            } => {
                if frames.is_empty() {
                    return None;
                }
                let i = if *frame_time > 0.0 {
                    (*elapsed / *frame_time) as usize % frames.len()
                } else {
                    0
                };
                frames.get(i)
            }
            Renderable::MultiState { states, current } => states.get(*current).map(|(_, m)| m),
        }
    }
}

/// A movable object: a body, optional physics and optional rendering.
#[derive(Debug, Clone)]
pub struct WorldObject {
    /// Where it is and how it moves
    pub body: Body,
    /// `None` ignores gravity
    pub physics: Option<PhysicsProperties>,
    /// `None` is invisible
    pub renderable: Option<Renderable>,
}

impl WorldObject {
    /// An object with only a body.
    pub fn new(body: Body) -> Self {
        Self {
            body,
            physics: None,
            renderable: None,
        }
    }

    /// Attach physics properties.
    pub fn with_physics(mut self, physics: PhysicsProperties) -> Self {
        self.physics = Some(physics);
        self
    }

    /// Attach a renderable.
    pub fn with_renderable(mut self, renderable: Renderable) -> Self {
        self.renderable = Some(renderable);
        self
    }

    /// Whether this object blocks others.
    pub fn collidable(&self) -> bool {
        self.physics.is_some_and(|p| p.collidable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::descriptor::BlendMode;
    use crate::render::MaterialId;
    use crate::spatial::{CornerCuts, SlopeType};

    fn material(id: u32) -> Rc<Material> {
        Rc::new(Material {
            id: MaterialId(id),
            texture: None,
            overlays: Vec::new(),
            color: WHITE,
            blend: BlendMode::None,
            cuts: CornerCuts::default(),
            connectivity: None,
        })
    }

    #[test]
    fn slopes_are_solid() {
        let mut slopes = SlopeGrid::new(2, 1);
        slopes.set(ivec2(1, 0), SlopeType::PositiveBottom);
        let ctx = WorldContext::new(OccupancyGrid::from_rows(&["#."]), slopes);
        assert!(ctx.solid(ivec2(0, 0)));
        assert!(ctx.solid(ivec2(1, 0)));
        assert!(!ctx.solid(ivec2(2, 0)));
    }

    #[test]
    fn touching_boxes_do_not_overlap() {
        let a = Aabb::from_center(vec2(0.5, 0.5), Vec2::ONE);
        assert!(!a.overlaps(&Aabb::cell(ivec2(1, 0))));
        assert!(a.overlaps(&Aabb::from_center(vec2(1.4, 0.5), Vec2::ONE)));
        assert_eq!(a.cells().count(), 4);
    }

    #[test]
    fn animation_cycles_frames() {
        let mut r = Renderable::Animated {
            frames: vec![material(0), material(1)],
            frame_time: 0.5,
            elapsed: 0.0,
        };
        assert_eq!(r.material().map(|m| m.id), Some(MaterialId(0)));
        r.advance(0.6);
        assert_eq!(r.material().map(|m| m.id), Some(MaterialId(1)));
        r.advance(0.5);
        assert_eq!(r.material().map(|m| m.id), Some(MaterialId(0)));
    }

    #[test]
    fn multi_state_switches_by_name() {
        let mut r = Renderable::MultiState {
            states: vec![("idle".into(), material(0)), ("open".into(), material(1))],
            current: 0,
        };
        assert!(r.set_state("open"));
        assert_eq!(r.material().map(|m| m.id), Some(MaterialId(1)));
        assert!(!r.set_state("closed"));
        assert!(!Renderable::Static(material(2)).set_state("open"));
    }
}
