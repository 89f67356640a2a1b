//! Shared materials and the batches that reference them.

use super::backend::{TextureId, TextureSource};
use crate::error::{AreaError, LoadReport};
use crate::loader::descriptor::{BlendMode, DescriptorId, TileDescriptor};
use crate::node::AssetPath;
use crate::spatial::{Connectivity, CornerCuts};
use macroquad::prelude::*;
use std::collections::HashMap;
use std::rc::Rc;

/// Frame strip layout for animated textures: frames side by side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation {
    /// Frames in the strip
    pub frames: u32,
    /// Seconds per frame
    pub frame_time: f32,
}

impl Animation {
    /// Frame shown at `time` seconds.
    pub fn frame_at(&self, time: f64) -> u32 {
        if self.frames <= 1 || self.frame_time <= 0.0 {
            return 0;
        }
        ((time / self.frame_time as f64) as u64 % self.frames as u64) as u32
    }
}

/// A loaded texture and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// Backend handle
    pub id: TextureId,
    /// Source image
    pub path: AssetPath,
    /// Set when the image is a frame strip
    pub animation: Option<Animation>,
}

/// Overlay piece drawn over the base texture, rotated clockwise in quarter turns.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    /// Piece art in its canonical orientation
    pub texture: Texture,
    /// 0..=3
    pub quarter_turns: u8,
}

/// Identity of a material within one load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

/// Everything needed to draw one batch of cells.
#[derive(Debug)]
pub struct Material {
    /// Assigned in creation order
    pub id: MaterialId,
    /// `None` for color-only tiles
    pub texture: Option<Texture>,
    /// Edge, corner and inset pieces, drawn in order
    pub overlays: Vec<Overlay>,
    /// Tint, or the fill when untextured
    pub color: Color,
    /// Blend against the layers behind
    pub blend: BlendMode,
    /// Corners left out when drawing
    pub cuts: CornerCuts,
    /// `None` for decor
    pub connectivity: Option<Connectivity>,
}

/// Cache key; cells with equal keys share one material.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaterialKey {
    /// Descriptor the cell was written with
    pub descriptor: DescriptorId,
    /// Chosen texture candidate; `None` means untextured
    pub texture: Option<String>,
    /// `None` for decor, which is never modularized
    pub connectivity: Option<Connectivity>,
    /// Default unless the descriptor cuts corners
    pub cuts: CornerCuts,
}

/// Memoizes materials per [`MaterialKey`] so equal cells share one instance.
#[derive(Debug, Default)]
pub struct MaterialCache {
    area: String,
    materials: HashMap<MaterialKey, Rc<Material>>,
    textures: HashMap<AssetPath, TextureId>,
    next_id: u32,
}

impl MaterialCache {
    /// Empty cache for one load of `area`.
    pub fn new(area: impl Into<String>) -> Self {
        Self {
            area: area.into(),
            ..Default::default()
        }
    }

    /// Distinct materials created so far.
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// True before the first material is created.
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Backend textures loaded so far.
    pub fn texture_ids(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.textures.values().copied()
    }

    /// Shared material for `key`, built on first request.
    ///
    /// A missing base texture is fatal; a missing overlay piece is reported
    /// and the base piece is used without it.
    pub fn get_or_create(
        &mut self,
        descriptor: &TileDescriptor,
        key: MaterialKey,
        backend: &mut dyn TextureSource,
        report: &mut LoadReport,
    ) -> Result<Rc<Material>, AreaError> {
        debug_assert_eq!(key.descriptor, descriptor.id);
        if let Some(m) = self.materials.get(&key) {
            return Ok(Rc::clone(m));
        }

        let animation = descriptor.is_animated().then_some(Animation {
            frames: descriptor.frames,
            frame_time: descriptor.frame_time,
        });

        let texture = match &key.texture {
            Some(name) => {
                let path = descriptor.texture_path(name);
                if !backend.exists(&path) {
                    return Err(AreaError::MissingTexture {
                        area: self.area.clone(),
                        node: descriptor.node.clone(),
                        texture: path.to_string(),
                    });
                }
                let id = self.texture(descriptor, &path, backend)?;
                Some(Texture {
                    id,
                    path,
                    animation,
                })
            }
            None => None,
        };

        let mut overlays = Vec::new();
        if let (Some(connectivity), Some(dir)) = (key.connectivity, descriptor.overlay_dir()) {
            for (kind, quarter_turns) in connectivity.overlays() {
                let path = dir.join(&format!("{}.png", kind.file_stem()));
                if !backend.exists(&path) {
                    let piece = connectivity.label();
                    report.warn(
                        &descriptor.node,
                        format!("overlay {path} missing, drawing {piece} without it"),
                    );
                    continue;
                }
                let id = self.texture(descriptor, &path, backend)?;
                overlays.push(Overlay {
                    texture: Texture {
                        id,
                        path,
                        animation: None,
                    },
                    quarter_turns,
                });
            }
        }

        let material = Rc::new(Material {
            id: MaterialId(self.next_id),
            texture,
            overlays,
            color: descriptor.color,
            blend: descriptor.blend,
            cuts: key.cuts,
            connectivity: key.connectivity,
        });
        self.next_id += 1;
        self.materials.insert(key, Rc::clone(&material));
        Ok(material)
    }

    fn texture(
        &mut self,
        descriptor: &TileDescriptor,
        path: &AssetPath,
        backend: &mut dyn TextureSource,
    ) -> Result<TextureId, AreaError> {
        if let Some(id) = self.textures.get(path) {
            return Ok(*id);
        }
        let id = backend.load(path).map_err(|e| AreaError::TextureLoad {
            area: self.area.clone(),
            node: descriptor.node.clone(),
            texture: path.to_string(),
            reason: format!("{e:#}"),
        })?;
        self.textures.insert(path.clone(), id);
        Ok(id)
    }
}

/// Cells sharing one material, in insertion order.
#[derive(Debug, Clone)]
pub struct RenderBatch {
    /// Shared by every cell in the batch
    pub material: Rc<Material>,
    /// Cells drawn with `material`
    pub positions: Vec<IVec2>,
}

impl RenderBatch {
    /// Number of cells.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True for a registered material with no cells yet.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Groups cell positions by material for batched drawing.
#[derive(Debug, Default)]
pub struct BatchAccumulator {
    batches: Vec<RenderBatch>,
    index: HashMap<MaterialId, usize>,
}

impl BatchAccumulator {
    /// No batches yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure `material` has a (possibly empty) batch.
    pub fn register(&mut self, material: &Rc<Material>) -> usize {
        if let Some(&i) = self.index.get(&material.id) {
            return i;
        }
        let i = self.batches.len();
        self.batches.push(RenderBatch {
            material: Rc::clone(material),
            positions: Vec::new(),
        });
        self.index.insert(material.id, i);
        i
    }

    /// Append `cell` to the batch for `material`.
    pub fn push(&mut self, material: &Rc<Material>, cell: IVec2) {
        let i = self.register(material);
        self.batches[i].positions.push(cell);
    }

    /// Batches in first-use order.
    pub fn into_batches(self) -> Vec<RenderBatch> {
        self.batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::tests::MockTextures;
    use crate::spatial::{Corner, Side};

    fn descriptor(id: u32, textures: &[&str], overlays: Option<&str>) -> TileDescriptor {
        TileDescriptor {
            id: DescriptorId(id),
            node: format!("key/{id}"),
            color: WHITE,
            textures: textures.iter().map(|s| s.to_string()).collect(),
            origin: crate::node::Origin::Local,
            blend: BlendMode::None,
            frames: 1,
            frame_time: 1.0,
            overlays: overlays.map(str::to_owned),
            slope: None,
            cut_corners: false,
        }
    }

    fn get(
        cache: &mut MaterialCache,
        d: &TileDescriptor,
        texture: Option<&str>,
        c: Connectivity,
        backend: &mut MockTextures,
    ) -> Result<Rc<Material>, AreaError> {
        cache.get_or_create(d, key(d, texture, c), backend, &mut LoadReport::new())
    }

    fn key(d: &TileDescriptor, texture: Option<&str>, c: Connectivity) -> MaterialKey {
        MaterialKey {
            descriptor: d.id,
            texture: texture.map(str::to_owned),
            connectivity: Some(c),
            cuts: CornerCuts::default(),
        }
    }

    #[test]
    fn equal_keys_share_one_material() {
        let mut backend = MockTextures::with(&["dirt.png", "dirt2.png"]);
        let mut cache = MaterialCache::new("test");
        let d = descriptor(0, &["dirt.png", "dirt2.png"], None);
        let other = descriptor(1, &["dirt.png"], None);

        let a = get(&mut cache, &d, Some("dirt.png"), Connectivity::Row, &mut backend).expect("a");
        let b = get(&mut cache, &d, Some("dirt.png"), Connectivity::Row, &mut backend).expect("b");
        assert!(Rc::ptr_eq(&a, &b));

        let variants = [
            get(&mut cache, &d, Some("dirt2.png"), Connectivity::Row, &mut backend),
            get(&mut cache, &d, Some("dirt.png"), Connectivity::Column, &mut backend),
            get(&mut cache, &other, Some("dirt.png"), Connectivity::Row, &mut backend),
        ];
        for v in variants {
            assert!(!Rc::ptr_eq(&a, &v.expect("variant")));
        }
        assert_eq!(cache.len(), 4);
        // dirt.png loaded once even though three materials use it
        assert_eq!(backend.loads("dirt.png"), 1);
    }

    #[test]
    fn missing_base_texture_is_fatal() {
        let mut backend = MockTextures::with(&[]);
        let mut cache = MaterialCache::new("test");
        let d = descriptor(0, &["gone.png"], None);

        let err = get(&mut cache, &d, Some("gone.png"), Connectivity::Default, &mut backend)
            .err()
            .expect("error");
        assert!(matches!(err, AreaError::MissingTexture { .. }));
    }

    #[test]
    fn missing_overlay_piece_falls_back_to_base() {
        let mut backend = MockTextures::with(&["rock.png", "ov/corner.png"]);
        let mut report = LoadReport::new();
        let mut cache = MaterialCache::new("test");
        let d = descriptor(0, &["rock.png"], Some("ov"));

        let c = Connectivity::Corner {
            corner: Corner::TopLeft,
            inset: true,
        };
        let m = cache
            .get_or_create(&d, key(&d, Some("rock.png"), c), &mut backend, &mut report)
            .expect("material");
        assert_eq!(m.overlays.len(), 1);
        assert_eq!(m.overlays[0].texture.path.path, "ov/corner.png");
        assert_eq!(m.overlays[0].quarter_turns, 0);
        assert!(report.mentions("key/0"));
    }

    #[test]
    fn untextured_material_keeps_color_only() {
        let mut backend = MockTextures::with(&[]);
        let mut cache = MaterialCache::new("test");
        let mut d = descriptor(0, &[], None);
        d.color = Color::new(0.2, 0.4, 0.6, 1.0);

        let m = get(&mut cache, &d, None, Connectivity::Cap(Side::Left), &mut backend)
            .expect("material");
        assert!(m.texture.is_none());
        assert_eq!(m.color, Color::new(0.2, 0.4, 0.6, 1.0));
    }

    #[test]
    fn accumulator_groups_positions_per_material() {
        let mut backend = MockTextures::with(&["a.png"]);
        let mut cache = MaterialCache::new("test");
        let d = descriptor(0, &["a.png"], None);
        let row = get(&mut cache, &d, Some("a.png"), Connectivity::Row, &mut backend).expect("row");
        let col = get(&mut cache, &d, Some("a.png"), Connectivity::Column, &mut backend)
            .expect("col");

        let mut acc = BatchAccumulator::new();
        acc.push(&row, ivec2(0, 0));
        acc.push(&col, ivec2(5, 5));
        acc.push(&row, ivec2(1, 0));
        acc.register(&row);

        let batches = acc.into_batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].positions, vec![ivec2(0, 0), ivec2(1, 0)]);
        assert_eq!(batches[1].positions, vec![ivec2(5, 5)]);
    }

    #[test]
    fn animation_frames_wrap() {
        let a = Animation {
            frames: 4,
            frame_time: 0.25,
        };
        assert_eq!(a.frame_at(0.0), 0);
        assert_eq!(a.frame_at(0.3), 1);
        assert_eq!(a.frame_at(1.1), 0);
    }
}
