//! Materials, draw batches, view culling and the Macroquad backend.

pub mod backend;
pub mod cull;
pub mod material;

pub use backend::{CountingRenderer, MacroquadBackend, Renderer, TextureId, TextureSource};
pub use cull::{visible_cells, CellRect};
pub use material::{
    Animation, BatchAccumulator, Material, MaterialCache, MaterialId, MaterialKey, Overlay,
    RenderBatch, Texture,
};
