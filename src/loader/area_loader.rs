// src/loader/area_loader.rs
//! Turning an area node tree into an [`Area`].

use crate::area::{Area, Decor, Layer, LayerKind, PlacedLight};
use crate::error::{AreaError, LoadReport};
use crate::loader::descriptor::{DecorDescriptor, DescriptorParser, TileDescriptor};
use crate::loader::json_loader::NodeSource;
use crate::node::{AssetPath, ConfigNode};
use crate::render::{BatchAccumulator, MaterialCache, MaterialKey, TextureSource};
use crate::spatial::{
    classify, last_free_cell_in_direction, CornerCuts, Obstruction, OccupancyGrid, OverlayKind,
    OverlayKinds, Side, SlopeGrid, SlopeType,
};
use macroquad::prelude::*;
use ::rand::Rng;
use std::collections::{HashMap, HashSet};
use std::f32::consts::FRAC_PI_4;
use std::rc::Rc;

/// Characters that always mean "empty cell".
const EMPTY_CELLS: [char; 2] = [' ', '.'];

struct TileEntry {
    descriptor: Rc<TileDescriptor>,
    overlays: OverlayKinds,
}

struct DecorCell {
    layer: LayerKind,
    cell: IVec2,
    descriptor: Rc<DecorDescriptor>,
}

/// Where a decor object ends up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Center, in cells
    pub position: Vec2,
    /// Radians, counter-clockwise
    pub rotation: f32,
}

/// Builds an [`Area`] from area nodes.
///
/// One loader performs one load; its material cache is dropped afterwards.
pub struct AreaLoader<'a, R: Rng> {
    area: String,
    nodes: &'a dyn NodeSource,
    textures: &'a mut dyn TextureSource,
    rng: R,
}

impl<'a, R: Rng> AreaLoader<'a, R> {
    /// Loader for `area`, picking textures and jitter with `rng`.
    pub fn new(
        area: impl Into<String>,
        nodes: &'a dyn NodeSource,
        textures: &'a mut dyn TextureSource,
        rng: R,
    ) -> Self {
        Self {
            area: area.into(),
            nodes,
            textures,
            rng,
        }
    }

    /// Load the area node file at `location`.
    pub fn load_area(mut self, location: &AssetPath) -> Result<Area, AreaError> {
        let root = self.nodes.load(&self.area, location)?;
        self.load_node(&root)
    }

    /// Load from an already parsed area node.
    pub fn load_node(&mut self, root: &ConfigNode) -> Result<Area, AreaError> {
        let key = self.require(root, "key")?;
        let middle = self.require(root, LayerKind::Middleground.node_name())?;
        self.load(
            key,
            root.child("decor"),
            root.child(LayerKind::Background.node_name()),
            middle,
            root.child(LayerKind::Foreground.node_name()),
        )
    }

    fn require<'n>(&self, node: &'n ConfigNode, child: &str) -> Result<&'n ConfigNode, AreaError> {
        node.child(child).ok_or_else(|| AreaError::MissingNode {
            area: self.area.clone(),
            node: node.name().to_owned(),
            child: child.to_owned(),
        })
    }

    /// Load from a key, an optional decor key and up to three layouts.
    pub fn load(
        &mut self,
        key: &ConfigNode,
        decor_key: Option<&ConfigNode>,
        background: Option<&ConfigNode>,
        middle: &ConfigNode,
        foreground: Option<&ConfigNode>,
    ) -> Result<Area, AreaError> {
        log::info!("loading area {}", self.area);
        let area = self.area.clone();
        let mut parser = DescriptorParser::new(&area, self.nodes);

        let tiles = self.parse_key(&mut parser, key)?;
        let decor = match decor_key {
            Some(node) => self.parse_decor_key(&mut parser, node, &tiles)?,
            None => HashMap::new(),
        };

        let sources = [background, Some(middle), foreground];
        let mut rows: [Option<Vec<String>>; 3] = [None, None, None];
        for kind in LayerKind::ALL {
            if let Some(node) = sources[kind as usize] {
                rows[kind as usize] = Some(layout_rows(&mut parser, node, kind.node_name())?);
            }
        }
        let mut report = std::mem::take(&mut parser.report);

        let middle_rows = rows[LayerKind::Middleground as usize].as_deref().unwrap_or(&[]);
        if middle_rows.is_empty() {
            return Err(AreaError::EmptyLayout {
                area,
                node: LayerKind::Middleground.node_name().to_owned(),
            });
        }

        let height = rows.iter().flatten().map(Vec::len).max().unwrap_or(0);
        let width = rows
            .iter()
            .flatten()
            .flat_map(|r| r.iter().map(|row| row.chars().count()))
            .max()
            .unwrap_or(0);

        let mut grids: [OccupancyGrid; 3] = Default::default();
        let mut slopes = SlopeGrid::new(width, height);
        let mut decor_cells = Vec::new();
        let mut unknown = HashSet::new();

        for kind in LayerKind::ALL {
            let Some(layer_rows) = &rows[kind as usize] else {
                grids[kind as usize] = OccupancyGrid::new(width, height);
                continue;
            };
            let mut grid = OccupancyGrid::new(width, height);
            for (cell, ch) in cells(layer_rows) {
                if let Some(entry) = tiles.get(&ch) {
                    grid.set(cell.x as usize, cell.y as usize, true);
                    if let Some(slope) = entry.descriptor.slope {
                        if kind == LayerKind::Middleground {
                            slopes.set(cell, slope);
                        }
                    }
                } else if let Some(d) = decor.get(&ch) {
                    decor_cells.push(DecorCell {
                        layer: kind,
                        cell,
                        descriptor: Rc::clone(d),
                    });
                } else if !EMPTY_CELLS.contains(&ch) && unknown.insert(ch) {
                    report.warn(
                        kind.node_name(),
                        format!("unknown character '{ch}' treated as empty"),
                    );
                }
            }
            grids[kind as usize] = grid;
        }

        let mut session = Session {
            area: &area,
            textures: &mut *self.textures,
            rng: &mut self.rng,
            cache: MaterialCache::new(area.clone()),
            report,
        };

        let built = session.build(&rows, &grids, &tiles, &decor_cells, &slopes);
        let (mut layers, background_decor, foreground_decor) = match built {
            Ok(built) => built,
            Err(e) => {
                session.release_textures();
                return Err(e);
            }
        };

        for (kind, grid) in LayerKind::ALL.into_iter().zip(grids) {
            layers[kind as usize].grid = grid;
        }

        let Session { cache, report, .. } = session;
        log::info!(
            "loaded area {}: {}x{} cells, {} materials, {} decor, {} issue(s)",
            area,
            width,
            height,
            cache.len(),
            background_decor.len() + foreground_decor.len(),
            report.issues().len()
        );

        Ok(Area {
            name: area,
            width,
            height,
            layers,
            slopes,
            background_decor,
            foreground_decor,
            report,
            textures: cache.texture_ids().collect(),
        })
    }

    fn parse_key(
        &mut self,
        parser: &mut DescriptorParser<'_>,
        key: &ConfigNode,
    ) -> Result<HashMap<char, TileEntry>, AreaError> {
        let key = parser.resolve(key, "key")?;
        let mut tiles = HashMap::new();
        for child in key.children() {
            let path = format!("key/{}", child.name());
            let Some(ch) = key_char(child.name()) else {
                let message = "key entries must be a single non-blank character other than '.'";
                parser.report.warn(&path, message);
                continue;
            };
            let descriptor = parser.parse_tile(child, &path)?;
            self.check_textures(&descriptor)?;
            let overlays = self.discover_overlays(&descriptor);
            if tiles
                .insert(
                    ch,
                    TileEntry {
                        descriptor: Rc::new(descriptor),
                        overlays,
                    },
                )
                .is_some()
            {
                parser.report.warn(&path, format!("'{ch}' defined twice; last definition wins"));
            }
        }
        Ok(tiles)
    }

    fn parse_decor_key(
        &mut self,
        parser: &mut DescriptorParser<'_>,
        key: &ConfigNode,
        tiles: &HashMap<char, TileEntry>,
    ) -> Result<HashMap<char, Rc<DecorDescriptor>>, AreaError> {
        let key = parser.resolve(key, "decor")?;
        let mut decor = HashMap::new();
        for child in key.children() {
            let path = format!("decor/{}", child.name());
            let Some(ch) = key_char(child.name()) else {
                let message = "decor entries must be a single non-blank character other than '.'";
                parser.report.warn(&path, message);
                continue;
            };
            if tiles.contains_key(&ch) {
                parser
                    .report
                    .warn(&path, format!("'{ch}' is already a tile; decor entry ignored"));
                continue;
            }
            let descriptor = parser.parse_decor(child, &path)?;
            self.check_textures(&descriptor.base)?;
            if decor.insert(ch, Rc::new(descriptor)).is_some() {
                parser.report.warn(&path, format!("'{ch}' defined twice; last definition wins"));
            }
        }
        Ok(decor)
    }

    /// Every declared base texture must exist, whether or not it gets picked.
    fn check_textures(&self, descriptor: &TileDescriptor) -> Result<(), AreaError> {
        for name in &descriptor.textures {
            let path = descriptor.texture_path(name);
            if !self.textures.exists(&path) {
                return Err(AreaError::MissingTexture {
                    area: self.area.clone(),
                    node: descriptor.node.clone(),
                    texture: path.to_string(),
                });
            }
        }
        Ok(())
    }

    fn discover_overlays(&self, descriptor: &TileDescriptor) -> OverlayKinds {
        let Some(dir) = descriptor.overlay_dir() else {
            return OverlayKinds::NONE;
        };
        OverlayKind::ALL
            .into_iter()
            .filter(|k| self.textures.exists(&dir.join(&format!("{}.png", k.file_stem()))))
            .collect()
    }
}

fn key_char(name: &str) -> Option<char> {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_whitespace() && !EMPTY_CELLS.contains(&c) => Some(c),
        _ => None,
    }
}

/// Rows of a layout node, top row first.
///
/// Rows come from the node's value (one per line) or from its children's values.
fn layout_rows(
    parser: &mut DescriptorParser<'_>,
    node: &ConfigNode,
    path: &str,
) -> Result<Vec<String>, AreaError> {
    let node = parser.resolve(node, path)?;
    if let Some(value) = node.value() {
        return Ok(value
            .trim_matches('\n')
            .lines()
            .map(|l| l.trim_end_matches('\r').to_owned())
            .collect());
    }
    Ok(node
        .children()
        .iter()
        .enumerate()
        .map(|(i, row)| match row.value() {
            Some(v) => v.to_owned(),
            None => {
                parser.report.warn(
                    format!("{path}/{}", row.name()),
                    format!("row {i} has no value; treated as empty"),
                );
                String::new()
            }
        })
        .collect())
}

/// Cells of a layer, top row first, left to right, with bottom-anchored y.
fn cells(rows: &[String]) -> impl Iterator<Item = (IVec2, char)> + '_ {
    let h = rows.len();
    rows.iter().enumerate().flat_map(move |(r, row)| {
        let y = (h - 1 - r) as i32;
        row.chars()
            .enumerate()
            .map(move |(x, ch)| (ivec2(x as i32, y), ch))
    })
}

/// Per-load state shared by the modularization and decor passes.
struct Session<'s, R: Rng> {
    area: &'s str,
    textures: &'s mut dyn TextureSource,
    rng: &'s mut R,
    cache: MaterialCache,
    report: LoadReport,
}

impl<R: Rng> Session<'_, R> {
    /// Modularize every present layer, then place the decor.
    fn build(
        &mut self,
        rows: &[Option<Vec<String>>; 3],
        grids: &[OccupancyGrid; 3],
        tiles: &HashMap<char, TileEntry>,
        decor_cells: &[DecorCell],
        slopes: &SlopeGrid,
    ) -> Result<([Layer; 3], Vec<Decor>, Vec<Decor>), AreaError> {
        let mut layers: [Layer; 3] = Default::default();
        for kind in LayerKind::ALL {
            if let Some(layer_rows) = &rows[kind as usize] {
                layers[kind as usize].batches =
                    self.modularize(layer_rows, &grids[kind as usize], tiles)?;
            }
        }

        let mut background_decor = Vec::new();
        let mut foreground_decor = Vec::new();
        for dc in decor_cells {
            let grid = &grids[dc.layer as usize];
            let slope_grid = (dc.layer == LayerKind::Middleground).then_some(slopes);
            let placed = self.place(dc, grid, slope_grid)?;
            match dc.layer {
                LayerKind::Foreground => foreground_decor.push(placed),
                LayerKind::Background | LayerKind::Middleground => background_decor.push(placed),
            }
        }
        Ok((layers, background_decor, foreground_decor))
    }

    /// Free whatever a failed load already pulled into the backend.
    fn release_textures(&mut self) {
        let mut released = 0;
        for id in self.cache.texture_ids() {
            self.textures.release(id);
            released += 1;
        }
        log::debug!("{}: released {released} texture(s) after failed load", self.area);
    }

    fn pick_texture(&mut self, textures: &[String]) -> Option<String> {
        match textures.len() {
            0 => None,
            1 => Some(textures[0].clone()),
            n => Some(textures[self.rng.gen_range(0..n)].clone()),
        }
    }

    fn modularize(
        &mut self,
        rows: &[String],
        grid: &OccupancyGrid,
        tiles: &HashMap<char, TileEntry>,
    ) -> Result<Vec<crate::render::RenderBatch>, AreaError> {
        let mut acc = BatchAccumulator::new();
        for (cell, ch) in cells(rows) {
            let Some(entry) = tiles.get(&ch) else {
                continue;
            };
            let d = &entry.descriptor;
            let texture = self.pick_texture(&d.textures);
            let connectivity = classify(cell.x, cell.y, grid, entry.overlays);
            let cuts = if d.cut_corners {
                CornerCuts::of(grid, cell.x, cell.y)
            } else {
                CornerCuts::default()
            };
            let key = MaterialKey {
                descriptor: d.id,
                texture,
                connectivity: Some(connectivity),
                cuts,
            };
            let material = self
                .cache
                .get_or_create(d, key, &mut *self.textures, &mut self.report)?;
            acc.push(&material, cell);
        }
        log::debug!("{}: {} materials after layer", self.area, self.cache.len());
        Ok(acc.into_batches())
    }

    fn place(
        &mut self,
        dc: &DecorCell,
        grid: &OccupancyGrid,
        slopes: Option<&SlopeGrid>,
    ) -> Result<Decor, AreaError> {
        let d = &dc.descriptor;
        let texture = self.pick_texture(&d.base.textures);
        let key = MaterialKey {
            descriptor: d.base.id,
            texture,
            connectivity: None,
            cuts: CornerCuts::default(),
        };
        let material = self
            .cache
            .get_or_create(&d.base, key, &mut *self.textures, &mut self.report)?;
        let Placement { position, rotation } =
            place_decor(d, dc.cell, grid, slopes, &mut *self.rng);

        Ok(Decor {
            descriptor: Rc::clone(d),
            material,
            cell: dc.cell,
            position,
            size: d.size,
            rotation,
            light: d.light.as_ref().map(|l| PlacedLight {
                position: position + l.offset,
                color: l.color,
                radius: l.radius,
            }),
            gate: d.gate.clone(),
        })
    }
}

/// Position and rotation for decor written at `cell`.
///
/// Pinned decor walks towards its pin through free cells and sits flush
/// against whatever stopped it; fixed and random offsets are then applied.
/// When the walk ends on a slope and the decor asks for it, the decor is
/// slid onto the slope surface and tilted to match.
pub fn place_decor<R: Rng + ?Sized>(
    decor: &DecorDescriptor,
    cell: IVec2,
    grid: &OccupancyGrid,
    slopes: Option<&SlopeGrid>,
    rng: &mut R,
) -> Placement {
    let half = decor.size * 0.5;
    let mut position = cell.as_vec2() + Vec2::splat(0.5);
    let mut rotation = 0.0;
    let mut obstruction = None;

    if let Some(side) = decor.pin.side() {
        let (free, hit) = last_free_cell_in_direction(grid, slopes, cell, side);
        position = free.as_vec2() + Vec2::splat(0.5);
        match side {
            Side::Left => position.x = free.x as f32 + half.x,
            Side::Right => position.x = free.x as f32 + 1.0 - half.x,
            Side::Above => position.y = free.y as f32 + 1.0 - half.y,
            Side::Below => position.y = free.y as f32 + half.y,
        }
        obstruction = Some((side, hit));
    }

    position += decor.offset;
    if decor.jitter.x > 0.0 {
        position.x += rng.gen_range(-decor.jitter.x..=decor.jitter.x);
    }
    if decor.jitter.y > 0.0 {
        position.y += rng.gen_range(-decor.jitter.y..=decor.jitter.y);
    }

    if let Some((side, Obstruction::Slope(slope_cell, slope))) = obstruction {
        if decor.rotate_on_slope && rest_on_slope(side, slope, slope_cell, &mut position) {
            rotation = if slope.is_positive() { FRAC_PI_4 } else { -FRAC_PI_4 };
        }
    }

    Placement { position, rotation }
}

/// Slide `position` from the slope cell's boundary onto its diagonal.
///
/// Returns false when the slope presents a full face towards the pin.
fn rest_on_slope(side: Side, slope: SlopeType, slope_cell: IVec2, position: &mut Vec2) -> bool {
    use SlopeType::*;

    // How far across the slope cell the anchor sits, perpendicular to the pin.
    let t = if side.is_horizontal() {
        (position.y - slope_cell.y as f32).clamp(0.0, 1.0)
    } else {
        (position.x - slope_cell.x as f32).clamp(0.0, 1.0)
    };

    match (side, slope) {
        (Side::Left, NegativeBottom) => position.x -= t,
        (Side::Left, PositiveTop) => position.x -= 1.0 - t,
        (Side::Right, PositiveBottom) => position.x += t,
        (Side::Right, NegativeTop) => position.x += 1.0 - t,
        (Side::Below, NegativeBottom) => position.y -= t,
        (Side::Below, PositiveBottom) => position.y -= 1.0 - t,
        (Side::Above, PositiveTop) => position.y += t,
        (Side::Above, NegativeTop) => position.y += 1.0 - t,
        _ => return false,
    }
    true
}
