//! Axis-separated AABB movement against the block grid and other objects.
//!
//! Each move is resolved along x first, then y. An axis whose move would
//! overlap a solid cell or a collidable object is reverted on its own, so
//! an object pushed diagonally into a wall slides along it.

use crate::config::PhysicsConfig;
use crate::world::{Aabb, WorldContext, WorldObject};
use macroquad::prelude::*;

/// Axis a move is resolved along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Horizontal, resolved first
    X,
    /// Vertical
    Y,
}

/// What a move ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collider {
    /// A solid or slope cell
    Block(IVec2),
    /// Index into the object list passed to the engine
    Object(usize),
}

/// A blocked axis, passed to reaction callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    /// The axis that was reverted
    pub axis: Axis,
    /// First thing found overlapping
    pub with: Collider,
}

/// Moves world objects against a [`WorldContext`] and each other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsEngine {
    /// Cells per second squared
    pub gravity: f32,
    /// Lowest vertical velocity gravity can reach; negative
    pub terminal_velocity: f32,
}

impl Default for PhysicsEngine {
    fn default() -> Self {
        Self::from_config(&PhysicsConfig::default())
    }
}

impl PhysicsEngine {
    /// Engine with explicit constants.
    pub fn new(gravity: f32, terminal_velocity: f32) -> Self {
        Self {
            gravity,
            terminal_velocity,
        }
    }

    /// Engine using the constants from an [`EngineConfig`](crate::EngineConfig).
    pub fn from_config(config: &PhysicsConfig) -> Self {
        Self::new(config.gravity, config.terminal_velocity)
    }

    /// Move `object` by `(dx, dy)`, reverting any axis that would collide.
    ///
    /// `others` must not contain `object`. `reaction` is called once per
    /// blocked axis. Returns whether the object moved at all.
    pub fn move_object(
        &self,
        ctx: &WorldContext,
        object: &mut WorldObject,
        others: &[WorldObject],
        dx: f32,
        dy: f32,
        reaction: &mut dyn FnMut(Collision),
    ) -> bool {
        self.move_among(ctx, object, || others.iter().enumerate(), dx, dy, reaction)
    }

    fn move_among<'o, I>(
        &self,
        ctx: &WorldContext,
        object: &mut WorldObject,
        others: impl Fn() -> I,
        dx: f32,
        dy: f32,
        reaction: &mut dyn FnMut(Collision),
    ) -> bool
    where
        I: Iterator<Item = (usize, &'o WorldObject)>,
    {
        // Non-collidable objects pass through everything.
        if object.physics.is_some_and(|p| !p.collidable) {
            object.body.position += vec2(dx, dy);
            return dx != 0.0 || dy != 0.0;
        }

        let mut moved = false;
        for (axis, delta) in [(Axis::X, dx), (Axis::Y, dy)] {
            if delta == 0.0 {
                continue;
            }
            let before = object.body.position;
            match axis {
                Axis::X => object.body.position.x += delta,
                Axis::Y => object.body.position.y += delta,
            }
            match first_overlap(ctx, &object.body.aabb(), others()) {
                Some(with) => {
                    log::trace!("{axis:?} move blocked by {with:?}");
                    reaction(Collision { axis, with });
                    object.body.position = before;
                }
                None => moved = true,
            }
        }
        moved
    }

    /// Pull `object` down by gravity, clamped at terminal velocity.
    ///
    /// Objects without physics properties, or non-collidable ones, are left alone.
    pub fn apply_gravity(&self, object: &mut WorldObject, dt: f32) {
        let Some(physics) = object.physics.filter(|p| p.collidable) else {
            return;
        };
        let v = &mut object.body.velocity.y;
        *v = (*v - self.gravity * physics.gravity_scale * dt).max(self.terminal_velocity);
    }

    /// Whether something solid sits within `precision` below `object`.
    pub fn something_under(
        &self,
        ctx: &WorldContext,
        object: &WorldObject,
        others: &[WorldObject],
        precision: f32,
    ) -> bool {
        let mut below = object.body;
        below.position.y -= precision;
        first_overlap(ctx, &below.aabb(), others.iter().enumerate()).is_some()
    }

    /// Gravity, then a move by `velocity * dt`.
    ///
    /// The velocity component of a blocked axis is zeroed.
    pub fn step(
        &self,
        ctx: &WorldContext,
        object: &mut WorldObject,
        others: &[WorldObject],
        dt: f32,
        reaction: &mut dyn FnMut(Collision),
    ) -> bool {
        self.apply_gravity(object, dt);
        let delta = object.body.velocity * dt;
        let mut blocked = [false; 2];
        let moved = self.move_object(ctx, object, others, delta.x, delta.y, &mut |c| {
            blocked[c.axis as usize] = true;
            reaction(c);
        });
        zero_blocked(object, blocked);
        moved
    }

    /// [`step`](Self::step) every object against all the others.
    ///
    /// `reaction` receives the index of the moving object.
    pub fn step_all(
        &self,
        ctx: &WorldContext,
        objects: &mut [WorldObject],
        dt: f32,
        reaction: &mut dyn FnMut(usize, Collision),
    ) {
        for i in 0..objects.len() {
            let (before, rest) = objects.split_at_mut(i);
            let Some((object, after)) = rest.split_first_mut() else {
                break;
            };
            self.apply_gravity(object, dt);
            let delta = object.body.velocity * dt;
            let before = &*before;
            let after = &*after;
            let others = move || {
                before
                    .iter()
                    .enumerate()
                    .chain(after.iter().enumerate().map(move |(j, o)| (i + 1 + j, o)))
            };
            let mut blocked = [false; 2];
            self.move_among(ctx, object, others, delta.x, delta.y, &mut |c| {
                blocked[c.axis as usize] = true;
                reaction(i, c);
            });
            zero_blocked(object, blocked);
        }
    }
}

fn zero_blocked(object: &mut WorldObject, blocked: [bool; 2]) {
    if blocked[Axis::X as usize] {
        object.body.velocity.x = 0.0;
    }
    if blocked[Axis::Y as usize] {
        object.body.velocity.y = 0.0;
    }
}

fn first_overlap<'o>(
    ctx: &WorldContext,
    aabb: &Aabb,
    others: impl Iterator<Item = (usize, &'o WorldObject)>,
) -> Option<Collider> {
    if let Some(cell) = aabb
        .cells()
        .find(|c| ctx.solid(*c) && aabb.overlaps(&Aabb::cell(*c)))
    {
        return Some(Collider::Block(cell));
    }
    others
        .filter(|(_, o)| o.collidable())
        .find(|(_, o)| aabb.overlaps(&o.body.aabb()))
        .map(|(i, _)| Collider::Object(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{OccupancyGrid, SlopeGrid, SlopeType};
    use crate::world::{Body, PhysicsProperties};

    fn ctx(rows: &[&str]) -> WorldContext {
        let grid = OccupancyGrid::from_rows(rows);
        let slopes = SlopeGrid::new(grid.width(), grid.height());
        WorldContext::new(grid, slopes)
    }

    fn boxed(x: f32, y: f32, size: f32) -> WorldObject {
        WorldObject::new(Body::new(vec2(x, y), Vec2::splat(size)))
            .with_physics(PhysicsProperties::default())
    }

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn diagonal_into_l_shape_slides() {
        let ctx = ctx(&["#...", "#...", "####"]);
        let engine = PhysicsEngine::default();

        let mut obj = boxed(1.5, 1.5, 0.8);
        let mut hits = Vec::new();
        assert!(engine.move_object(&ctx, &mut obj, &[], 0.5, -0.5, &mut |c| hits.push(c)));
        assert!(close(obj.body.position, vec2(2.0, 1.5)));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].axis, Axis::Y);
        assert!(matches!(hits[0].with, Collider::Block(c) if c.y == 0));

        let mut obj = boxed(1.5, 1.5, 0.8);
        hits.clear();
        assert!(engine.move_object(&ctx, &mut obj, &[], -0.5, 0.3, &mut |c| hits.push(c)));
        assert!(close(obj.body.position, vec2(1.5, 1.8)));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].axis, Axis::X);
    }

    #[test]
    fn fully_blocked_move_reports_no_movement() {
        let ctx = ctx(&["#...", "#...", "####"]);
        let engine = PhysicsEngine::default();
        let mut obj = boxed(1.5, 1.5, 0.8);
        let mut count = 0;
        assert!(!engine.move_object(&ctx, &mut obj, &[], -0.5, -0.5, &mut |_| count += 1));
        assert_eq!(count, 2);
        assert_eq!(obj.body.position, vec2(1.5, 1.5));
    }

    #[test]
    fn touching_a_wall_is_not_a_collision() {
        let ctx = ctx(&["#.."]);
        let engine = PhysicsEngine::default();
        let mut obj = boxed(1.75, 0.5, 1.0);
        assert!(engine.move_object(&ctx, &mut obj, &[], -0.25, 0.0, &mut |_| panic!("no hit")));
        assert_eq!(obj.body.position.x, 1.5);
    }

    #[test]
    fn slope_cells_block_like_walls() {
        let grid = OccupancyGrid::from_rows(&["..."]);
        let mut slopes = SlopeGrid::new(3, 1);
        slopes.set(ivec2(2, 0), SlopeType::PositiveBottom);
        let ctx = WorldContext::new(grid, slopes);
        let mut obj = boxed(1.5, 0.5, 0.8);
        let mut hit = None;
        PhysicsEngine::default().move_object(&ctx, &mut obj, &[], 0.5, 0.0, &mut |c| hit = Some(c));
        assert_eq!(hit.map(|c| c.with), Some(Collider::Block(ivec2(2, 0))));
    }

    #[test]
    fn only_collidable_objects_block() {
        let ctx = ctx(&["....."]);
        let engine = PhysicsEngine::default();
        let wall = boxed(3.5, 0.5, 1.0);
        let mut ghost = boxed(3.5, 0.5, 1.0);
        ghost.physics = Some(PhysicsProperties {
            gravity_scale: 0.0,
            collidable: false,
        });

        let mut obj = boxed(1.5, 0.5, 1.0);
        let mut hit = None;
        let others = [ghost.clone(), wall];
        engine.move_object(&ctx, &mut obj, &others, 1.5, 0.0, &mut |c| hit = Some(c));
        assert_eq!(hit.map(|c| c.with), Some(Collider::Object(1)));
        assert_eq!(obj.body.position.x, 1.5);

        let mut obj = boxed(1.5, 0.5, 1.0);
        assert!(engine.move_object(&ctx, &mut obj, &[ghost], 1.5, 0.0, &mut |_| panic!("no hit")));
    }

    #[test]
    fn gravity_clamps_at_terminal_velocity() {
        let engine = PhysicsEngine::new(30.0, -40.0);
        let mut obj = boxed(0.0, 0.0, 1.0);
        engine.apply_gravity(&mut obj, 1.0 / 60.0);
        assert!((obj.body.velocity.y + 0.5).abs() < 1e-5);
        for _ in 0..1000 {
            engine.apply_gravity(&mut obj, 1.0 / 60.0);
        }
        assert_eq!(obj.body.velocity.y, -40.0);

        let mut floating = WorldObject::new(Body::new(Vec2::ZERO, Vec2::ONE));
        engine.apply_gravity(&mut floating, 1.0);
        assert_eq!(floating.body.velocity, Vec2::ZERO);
    }

    #[test]
    fn non_collidable_objects_ignore_gravity() {
        let engine = PhysicsEngine::new(30.0, -40.0);
        let mut ghost = WorldObject::new(Body::new(Vec2::ZERO, Vec2::ONE)).with_physics(
            PhysicsProperties {
                gravity_scale: 1.0,
                collidable: false,
            },
        );
        engine.apply_gravity(&mut ghost, 1.0);
        assert_eq!(ghost.body.velocity, Vec2::ZERO);

        let ctx = ctx(&["...", "...", "###"]);
        ghost.body.position = vec2(1.5, 1.5);
        engine.step(&ctx, &mut ghost, &[], 1.0, &mut |_| {});
        assert_eq!(ghost.body.position, vec2(1.5, 1.5));
    }

    #[test]
    fn something_under_checks_without_moving() {
        let ctx = ctx(&["...", "..."]);
        let mut ground = ctx.clone();
        ground.set_block_grid(OccupancyGrid::from_rows(&["...", "###"]));
        let engine = PhysicsEngine::default();

        let obj = boxed(1.5, 1.5, 1.0);
        assert!(engine.something_under(&ground, &obj, &[], 0.05));
        assert!(!engine.something_under(&ctx, &obj, &[], 0.05));
        assert_eq!(obj.body.position, vec2(1.5, 1.5));

        let crate_below = boxed(1.5, 0.5, 1.0);
        assert!(engine.something_under(&ctx, &obj, &[crate_below], 0.05));
    }

    #[test]
    fn step_lands_and_stops_falling() {
        let ctx = ctx(&["...", "...", "###"]);
        let engine = PhysicsEngine::default();
        let mut obj = boxed(1.5, 1.6, 1.0);
        let dt = 1.0 / 60.0;
        for _ in 0..120 {
            engine.step(&ctx, &mut obj, &[], dt, &mut |_| {});
        }
        assert!(obj.body.position.y >= 1.5);
        assert!(obj.body.position.y < 1.6);
        assert!(engine.something_under(&ctx, &obj, &[], 0.05));
    }

    #[test]
    fn step_all_stacks_objects() {
        let ctx = ctx(&["...", "...", "...", "###"]);
        let engine = PhysicsEngine::default();
        let mut objects = vec![boxed(1.5, 1.5, 1.0), boxed(1.5, 2.6, 1.0)];
        let mut hits = Vec::new();
        for _ in 0..60 {
            engine.step_all(&ctx, &mut objects, 1.0 / 60.0, &mut |i, c| hits.push((i, c.with)));
        }
        assert!(hits.contains(&(1, Collider::Object(0))));
        assert!(objects[1].body.position.y >= 2.5);
    }
}
