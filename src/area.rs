use crate::error::{AreaError, LoadReport};
use crate::loader::area_loader::AreaLoader;
use crate::loader::descriptor::{DecorDescriptor, Gate};
use crate::loader::json_loader::NodeSource;
use crate::node::AssetPath;
use crate::render::cull::cull_positions;
use crate::render::{CellRect, Material, RenderBatch, Renderer, TextureId, TextureSource};
use crate::spatial::{OccupancyGrid, SlopeGrid};
use crate::world::WorldContext;
use macroquad::prelude::*;
use ::rand::Rng;
use std::rc::Rc;

/// The three stacked tile layers, back to front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Drawn first, behind everything
    Background = 0,
    /// The playable layer; blocks and slopes come from here
    Middleground = 1,
    /// Drawn over the actors
    Foreground = 2,
}

impl LayerKind {
    /// Every layer in draw order.
    pub const ALL: [LayerKind; 3] = [
        LayerKind::Background,
        LayerKind::Middleground,
        LayerKind::Foreground,
    ];

    /// Child name of the layout node in an area file.
    pub fn node_name(self) -> &'static str {
        match self {
            LayerKind::Background => "background",
            LayerKind::Middleground => "middleground",
            LayerKind::Foreground => "foreground",
        }
    }
}

/// One layer's occupancy and its draw batches.
#[derive(Debug, Clone, Default)]
pub struct Layer {
    /// Cells holding a tile
    pub grid: OccupancyGrid,
    /// One batch per material, in first-use order
    pub batches: Vec<RenderBatch>,
}

impl Layer {
    /// Material drawn at `cell`, if any.
    pub fn material_at(&self, cell: IVec2) -> Option<&Rc<Material>> {
        self.batches
            .iter()
            .find(|b| b.positions.contains(&cell))
            .map(|b| &b.material)
    }
}

/// Light attached to a placed decor object, in world cells.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLight {
    /// Center of the light
    pub position: Vec2,
    /// Tint of the glow
    pub color: Color,
    /// Reach, in cells
    pub radius: f32,
}

/// A placed decor object.
#[derive(Debug, Clone)]
pub struct Decor {
    /// Shared definition from the decor key
    pub descriptor: Rc<DecorDescriptor>,
    /// Shared with every decor of the same descriptor and texture
    pub material: Rc<Material>,
    /// Grid cell the decor character was written in
    pub cell: IVec2,
    /// Center, in cells
    pub position: Vec2,
    /// Width and height, in cells
    pub size: Vec2,
    /// Radians, counter-clockwise
    pub rotation: f32,
    /// Light emitted by the decor, already offset
    pub light: Option<PlacedLight>,
    /// Destination when the decor is a doorway
    pub gate: Option<Gate>,
}

impl Decor {
    /// Whether `point` lies inside the decor's unrotated bounds.
    pub fn contains(&self, point: Vec2) -> bool {
        let half = self.size * 0.5;
        (point.x - self.position.x).abs() <= half.x && (point.y - self.position.y).abs() <= half.y
    }
}

/// A fully loaded area: grids, draw batches and decor.
#[derive(Debug)]
pub struct Area {
    /// Area file path, used in logs and errors
    pub name: String,
    /// Widest row across all layers, in cells
    pub width: usize,
    /// Tallest layer, in cells
    pub height: usize,
    /// Indexed by [`LayerKind`]
    pub layers: [Layer; 3],
    /// Slopes of the middle layer
    pub slopes: SlopeGrid,
    /// Background and middleground decor, drawn behind the middle layer's front
    pub background_decor: Vec<Decor>,
    /// Foreground decor, drawn before the foreground layer
    pub foreground_decor: Vec<Decor>,
    /// Recoverable problems found while loading
    pub report: LoadReport,
    pub(crate) textures: Vec<TextureId>,
}

impl Area {
    /// Load the area node file at `location`.
    pub fn load<R: Rng>(
        location: &AssetPath,
        nodes: &dyn NodeSource,
        textures: &mut dyn TextureSource,
        rng: R,
    ) -> Result<Self, AreaError> {
        AreaLoader::new(location.path.clone(), nodes, textures, rng).load_area(location)
    }

    /// The layer of the given kind.
    pub fn layer(&self, kind: LayerKind) -> &Layer {
        &self.layers[kind as usize]
    }

    /// The middle layer's grid; the only one used for collision.
    pub fn block_grid(&self) -> &OccupancyGrid {
        &self.layer(LayerKind::Middleground).grid
    }

    /// Physics context for this area.
    pub fn world_context(&self) -> WorldContext {
        WorldContext::new(self.block_grid().clone(), self.slopes.clone())
    }

    /// Number of distinct materials across all layers and decor.
    pub fn material_count(&self) -> usize {
        let mut ids: Vec<_> = self
            .layers
            .iter()
            .flat_map(|l| l.batches.iter().map(|b| b.material.id))
            .chain(
                self.background_decor
                    .iter()
                    .chain(&self.foreground_decor)
                    .map(|d| d.material.id),
            )
            .collect();
        ids.sort_unstable_by_key(|id| id.0);
        ids.dedup();
        ids.len()
    }

    /// Gate whose decor contains `point`.
    pub fn gate_at(&self, point: Vec2) -> Option<&Gate> {
        self.background_decor
            .iter()
            .chain(&self.foreground_decor)
            .filter(|d| d.contains(point))
            .find_map(|d| d.gate.as_ref())
    }

    /// Draw back to front, skipping cells outside `view`.
    pub fn draw(&self, renderer: &mut dyn Renderer, view: CellRect) {
        let mut scratch = Vec::new();
        let mut draw_layer = |renderer: &mut dyn Renderer, layer: &Layer| {
            for batch in &layer.batches {
                cull_positions(&batch.positions, view, &mut scratch);
                if !scratch.is_empty() {
                    renderer.draw_batch(&batch.material, &scratch);
                }
            }
        };
        let draw_decor = |renderer: &mut dyn Renderer, decor: &[Decor]| {
            for d in decor.iter().filter(|d| view.overlaps(d.position, d.size)) {
                renderer.draw_decor(d);
            }
        };

        draw_layer(renderer, self.layer(LayerKind::Background));
        draw_decor(renderer, &self.background_decor);
        draw_layer(renderer, self.layer(LayerKind::Middleground));
        draw_decor(renderer, &self.foreground_decor);
        draw_layer(renderer, self.layer(LayerKind::Foreground));
    }

    /// Release every texture this area loaded.
    pub fn unload(self, textures: &mut dyn TextureSource) {
        log::info!("unloading area {} ({} textures)", self.name, self.textures.len());
        for id in self.textures {
            textures.release(id);
        }
    }
}
