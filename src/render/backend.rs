//! Texture and draw seams, and their Macroquad implementation.

use super::material::{Material, Texture};
use crate::area::Decor;
use crate::loader::descriptor::BlendMode;
use crate::node::{AssetPath, Origin};
use crate::spatial::CornerCuts;
use anyhow::Context;
use macroquad::models::{draw_mesh, Mesh, Vertex};
use macroquad::prelude::*;
use std::f32::consts::FRAC_PI_2;
use std::path::PathBuf;

/// Opaque handle to a texture owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Texture construction seam used by the material cache.
pub trait TextureSource {
    /// Whether an image exists at `path`.
    fn exists(&self, path: &AssetPath) -> bool;

    /// Load the image at `path` into a texture.
    fn load(&mut self, path: &AssetPath) -> anyhow::Result<TextureId>;

    /// Free a texture when its area unloads.
    fn release(&mut self, _id: TextureId) {}
}

/// Draw seam used by [`crate::Area::draw`].
pub trait Renderer {
    /// Draw `material` at every cell in `positions`.
    fn draw_batch(&mut self, material: &Material, positions: &[IVec2]);
    /// Draw one placed decor object.
    fn draw_decor(&mut self, decor: &Decor);
}

/// Macroquad textures and drawing.
///
/// World space is measured in cells with y up; call [`MacroquadBackend::camera`]
/// to get a matching camera.
pub struct MacroquadBackend {
    local_root: PathBuf,
    resource_root: PathBuf,
    textures: Vec<Option<Texture2D>>,
    /// Seconds, drives animated textures
    pub time: f64,
}

impl MacroquadBackend {
    /// Backend loading textures from the two asset roots.
    pub fn new(local_root: impl Into<PathBuf>, resource_root: impl Into<PathBuf>) -> Self {
        Self {
            local_root: local_root.into(),
            resource_root: resource_root.into(),
            textures: Vec::new(),
            time: 0.0,
        }
    }

    fn resolve(&self, path: &AssetPath) -> PathBuf {
        match path.origin {
            Origin::Local => self.local_root.join(&path.path),
            Origin::Resource => self.resource_root.join(&path.path),
        }
    }

    fn get(&self, id: TextureId) -> Option<&Texture2D> {
        self.textures.get(id.0 as usize).and_then(|t| t.as_ref())
    }

    /// Camera centred on `target` (cells) showing `view` cells, y up.
    pub fn camera(target: Vec2, view: Vec2) -> Camera2D {
        Camera2D {
            target,
            zoom: vec2(2.0 / view.x, 2.0 / view.y),
            ..Default::default()
        }
    }

    fn draw_texture_cell(&self, tex: &Texture, dest: Vec2, size: Vec2, rotation: f32, tint: Color) {
        let Some(t) = self.get(tex.id) else {
            return;
        };
        let source = tex.animation.map(|a| {
            let w = t.width() / a.frames as f32;
            Rect::new(a.frame_at(self.time) as f32 * w, 0.0, w, t.height())
        });
        draw_texture_ex(
            t,
            dest.x,
            dest.y,
            tint,
            DrawTextureParams {
                dest_size: Some(size),
                source,
                rotation,
                flip_y: true,
                ..Default::default()
            },
        );
    }

    /// Draw one cell with its cut corners left out, as a triangle fan.
    fn draw_cut_cell(&self, tex: Option<&Texture>, dest: Vec2, cuts: CornerCuts, tint: Color) {
        let loaded = tex.and_then(|t| self.get(t.id).map(|g| (t, g)));
        let (frame, frames) = match loaded.and_then(|(t, _)| t.animation) {
            Some(a) => (a.frame_at(self.time) as f32, a.frames.max(1) as f32),
            None => (0.0, 1.0),
        };
        let vertices: Vec<Vertex> = cell_outline(cuts)
            .into_iter()
            .map(|p| {
                let u = (frame + p.x) / frames;
                Vertex::new(dest.x + p.x, dest.y + p.y, 0.0, u, 1.0 - p.y, tint)
            })
            .collect();
        let indices = (1..vertices.len() as u16 - 1)
            .flat_map(|i| [0, i, i + 1])
            .collect();
        draw_mesh(&Mesh {
            vertices,
            indices,
            texture: loaded.map(|(_, g)| g.clone()),
        });
    }
}

/// How far a cut reaches along each edge from the corner, in cells.
const CUT_DEPTH: f32 = 0.25;

/// Cell outline in cell-local coordinates, counter-clockwise from the
/// bottom-left corner, with every cut corner replaced by a bevel.
pub fn cell_outline(cuts: CornerCuts) -> Vec<Vec2> {
    let d = CUT_DEPTH;
    let corners = [
        (cuts.bottom_left, vec2(0.0, 0.0), [vec2(0.0, d), vec2(d, 0.0)]),
        (cuts.bottom_right, vec2(1.0, 0.0), [vec2(1.0 - d, 0.0), vec2(1.0, d)]),
        (cuts.top_right, vec2(1.0, 1.0), [vec2(1.0, 1.0 - d), vec2(1.0 - d, 1.0)]),
        (cuts.top_left, vec2(0.0, 1.0), [vec2(d, 1.0), vec2(0.0, 1.0 - d)]),
    ];
    let mut outline = Vec::with_capacity(8);
    for (cut, corner, bevel) in corners {
        if cut {
            outline.extend(bevel);
        } else {
            outline.push(corner);
        }
    }
    outline
}

/// Blend modes are approximated by tinting.
fn tint(material_color: Color, blend: BlendMode) -> Color {
    match blend {
        BlendMode::None | BlendMode::Multiplicative => material_color,
        BlendMode::Averaged => Color::new(
            material_color.r,
            material_color.g,
            material_color.b,
            material_color.a * 0.5,
        ),
    }
}

impl TextureSource for MacroquadBackend {
    fn exists(&self, path: &AssetPath) -> bool {
        self.resolve(path).is_file()
    }

    fn load(&mut self, path: &AssetPath) -> anyhow::Result<TextureId> {
        let p = self.resolve(path);
        let bytes = std::fs::read(&p).with_context(|| format!("Reading texture {}", p.display()))?;
        let image = Image::from_file_with_format(&bytes, None)
            .map_err(|e| anyhow::anyhow!("Decoding texture {}: {e:?}", p.display()))?;
        let tex = Texture2D::from_image(&image);
        tex.set_filter(FilterMode::Nearest);

        let id = TextureId(self.textures.len() as u32);
        self.textures.push(Some(tex));
        Ok(id)
    }

    fn release(&mut self, id: TextureId) {
        if let Some(slot) = self.textures.get_mut(id.0 as usize) {
            *slot = None;
        }
    }
}

impl Renderer for MacroquadBackend {
    fn draw_batch(&mut self, material: &Material, positions: &[IVec2]) {
        let color = tint(material.color, material.blend);
        for cell in positions {
            let dest = cell.as_vec2();
            if material.cuts.any() {
                self.draw_cut_cell(material.texture.as_ref(), dest, material.cuts, color);
            } else {
                match &material.texture {
                    Some(tex) => self.draw_texture_cell(tex, dest, Vec2::ONE, 0.0, color),
                    None => draw_rectangle(dest.x, dest.y, 1.0, 1.0, color),
                }
            }
            for overlay in &material.overlays {
                // Clockwise on screen is negative rotation in a y-up camera.
                let rotation = -(overlay.quarter_turns as f32) * FRAC_PI_2;
                self.draw_texture_cell(&overlay.texture, dest, Vec2::ONE, rotation, WHITE);
            }
        }
    }

    fn draw_decor(&mut self, decor: &Decor) {
        let material = &decor.material;
        let color = tint(material.color, material.blend);
        let corner = decor.position - decor.size * 0.5;
        match &material.texture {
            Some(tex) => self.draw_texture_cell(tex, corner, decor.size, decor.rotation, color),
            None => draw_rectangle(corner.x, corner.y, decor.size.x, decor.size.y, color),
        }
        if let Some(light) = &decor.light {
            let glow = Color::new(light.color.r, light.color.g, light.color.b, 0.15);
            draw_circle(light.position.x, light.position.y, light.radius, glow);
        }
    }
}

/// Draws nothing; lets headless callers run [`crate::Area::draw`] for counting.
#[derive(Debug, Default)]
pub struct CountingRenderer {
    /// Batches drawn
    pub batches: usize,
    /// Cells across all batches
    pub cells: usize,
    /// Decor objects drawn
    pub decor: usize,
}

impl Renderer for CountingRenderer {
    fn draw_batch(&mut self, _material: &Material, positions: &[IVec2]) {
        self.batches += 1;
        self.cells += positions.len();
    }

    fn draw_decor(&mut self, _decor: &Decor) {
        self.decor += 1;
    }
}
