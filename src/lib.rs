//! Tile-based area loading for a 2D side-scroller on Macroquad.
//!
//! An area is described by a tree of config nodes: a key mapping characters
//! to tile descriptors, an optional decor key and up to three text layouts.
//! Loading classifies every tile by its neighbours, picks overlay art for
//! its edges and corners, shares one material among identical cells and
//! places decor against nearby blocks and slopes. The resulting block and
//! slope grids drive [`PhysicsEngine`].

#![warn(missing_docs)]

mod area;
mod config;
mod error;
pub mod loader {
    //! Node files, descriptors and the area layout loader.
    pub mod area_loader;
    pub mod descriptor;
    pub mod json_loader;
}
mod node;
mod physics;
pub mod render;
pub mod spatial;
mod world;

pub use area::{Area, Decor, Layer, LayerKind, PlacedLight};
pub use config::{AssetRoots, EngineConfig, PhysicsConfig};
pub use error::{AreaError, LoadIssue, LoadReport};
pub use loader::area_loader::{place_decor, AreaLoader, Placement};
pub use loader::descriptor::{BlendMode, DecorDescriptor, Gate, LightSource, Pin, TileDescriptor};
pub use loader::json_loader::{FsNodeSource, NodeSource};
pub use node::{AssetPath, ConfigNode, Origin};
pub use physics::{Axis, Collider, Collision, PhysicsEngine};
pub use world::{Aabb, Body, PhysicsProperties, Renderable, WorldContext, WorldObject};
