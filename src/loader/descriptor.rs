// src/loader/descriptor.rs
//! Tile and decor descriptors parsed from key entries.

use crate::error::{AreaError, LoadReport};
use crate::loader::json_loader::NodeSource;
use crate::node::{AssetPath, ConfigNode, Origin};
use crate::spatial::{Side, SlopeType};
use macroquad::prelude::*;
use std::borrow::Cow;
use std::str::FromStr;

const SLOPE_NAMES: &str = "positive-bottom, positive-top, negative-bottom or negative-top";
const PIN_NAMES: &str = "none, left, above, right or below";
const BLEND_NAMES: &str = "none, multiplicative or averaged";

/// Upper bound on tile animation frames.
pub const MAX_TILE_FRAMES: u32 = 64;
/// Upper bound on decor animation frames.
pub const MAX_DECOR_FRAMES: u32 = 30;

/// Identity of one parsed descriptor instance.
///
/// Two descriptors with identical fields still get distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(pub u32);

/// How a tile's color combines with what is behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Opaque
    #[default]
    None,
    /// Color multiplies the backdrop
    Multiplicative,
    /// Half-way mix with the backdrop
    Averaged,
}

impl BlendMode {
    /// Case-insensitive name, with `multiply` and `average` as aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Some(BlendMode::None),
            "multiplicative" | "multiply" => Some(BlendMode::Multiplicative),
            "averaged" | "average" => Some(BlendMode::Averaged),
            _ => None,
        }
    }
}

/// Placement rule for decor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Pin {
    /// Stays in its own cell
    #[default]
    None,
    /// Slides left until something stops it
    Left,
    /// Slides up
    Above,
    /// Slides right
    Right,
    /// Falls until it lands
    Below,
}

impl Pin {
    /// Case-insensitive name; `up` and `down` are accepted too.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Pin::None),
            "left" => Some(Pin::Left),
            "above" | "up" => Some(Pin::Above),
            "right" => Some(Pin::Right),
            "below" | "down" => Some(Pin::Below),
            _ => None,
        }
    }

    /// Direction of the pin walk, if any.
    pub fn side(self) -> Option<Side> {
        match self {
            Pin::None => None,
            Pin::Left => Some(Side::Left),
            Pin::Above => Some(Side::Above),
            Pin::Right => Some(Side::Right),
            Pin::Below => Some(Side::Below),
        }
    }
}

/// Parsed tile definition from the area key.
#[derive(Debug, Clone)]
pub struct TileDescriptor {
    /// Unique per parsed entry
    pub id: DescriptorId,
    /// Node path, used in error messages
    pub node: String,
    /// Tint, or the fill of color-only tiles
    pub color: Color,
    /// Candidate textures; one is picked at random per cell. Empty means color only.
    pub textures: Vec<String>,
    /// Root the texture and overlay paths are relative to
    pub origin: Origin,
    /// Blend against the layers behind
    pub blend: BlendMode,
    /// Frames in the horizontal strip; 1 is static
    pub frames: u32,
    /// Seconds per frame
    pub frame_time: f32,
    /// Directory holding overlay art (`edge.png`, `corner.png`, ...)
    pub overlays: Option<String>,
    /// Set for slope tiles; only counts in the middle layer
    pub slope: Option<SlopeType>,
    /// Bevel corners that have no orthogonal neighbour
    pub cut_corners: bool,
}

impl TileDescriptor {
    pub(crate) fn with_defaults(id: DescriptorId, node: String) -> Self {
        Self {
            id,
            node,
            color: WHITE,
            textures: Vec::new(),
            origin: Origin::Local,
            blend: BlendMode::None,
            frames: 1,
            frame_time: 1.0,
            overlays: None,
            slope: None,
            cut_corners: false,
        }
    }

    /// Location of the candidate texture `texture`.
    pub fn texture_path(&self, texture: &str) -> AssetPath {
        AssetPath {
            origin: self.origin,
            path: texture.to_owned(),
        }
    }

    /// Location of the overlay art directory, if one is declared.
    pub fn overlay_dir(&self) -> Option<AssetPath> {
        self.overlays.as_ref().map(|dir| AssetPath {
            origin: self.origin,
            path: dir.clone(),
        })
    }

    /// Whether the texture is a frame strip.
    pub fn is_animated(&self) -> bool {
        self.frames > 1
    }
}

/// Light carried by a decor object.
#[derive(Debug, Clone, PartialEq)]
pub struct LightSource {
    /// Glow tint
    pub color: Color,
    /// Radius in cells
    pub radius: f32,
    /// From the decor center, in cells
    pub offset: Vec2,
}

/// Link to another area, entered at `entry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate {
    /// Area file under the local root
    pub area: String,
    /// Cell the actor appears in
    pub entry: IVec2,
}

/// Parsed decor definition; extends the tile fields with placement.
#[derive(Debug, Clone)]
pub struct DecorDescriptor {
    /// Appearance fields shared with tiles
    pub base: TileDescriptor,
    /// Which way the decor is pushed when placed
    pub pin: Pin,
    /// Fixed offset in cells
    pub offset: Vec2,
    /// Random offset drawn from `[-jitter, jitter]` per axis
    pub jitter: Vec2,
    /// Size in cells
    pub size: Vec2,
    /// Tilt onto a slope the pin walk ends against
    pub rotate_on_slope: bool,
    /// Glow drawn around the decor
    pub light: Option<LightSource>,
    /// Makes the decor a doorway
    pub gate: Option<Gate>,
}

/// Turns key nodes into descriptors, resolving indirections and
/// substituting defaults for malformed fields.
pub struct DescriptorParser<'a> {
    area: &'a str,
    nodes: &'a dyn NodeSource,
    next_id: u32,
    /// Malformed fields seen so far
    pub report: LoadReport,
}

impl<'a> DescriptorParser<'a> {
    /// Parser for one load of `area`.
    pub fn new(area: &'a str, nodes: &'a dyn NodeSource) -> Self {
        Self {
            area,
            nodes,
            next_id: 0,
            report: LoadReport::new(),
        }
    }

    fn alloc_id(&mut self) -> DescriptorId {
        let id = DescriptorId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Follow a one-hop `@local`/`@resource` indirection.
    pub fn resolve<'n>(
        &mut self,
        node: &'n ConfigNode,
        path: &str,
    ) -> Result<Cow<'n, ConfigNode>, AreaError> {
        let Some(target) = node.indirection() else {
            return Ok(Cow::Borrowed(node));
        };
        if !self.nodes.exists(&target) {
            return Err(AreaError::MissingIndirection {
                area: self.area.to_owned(),
                node: path.to_owned(),
                target: target.to_string(),
            });
        }
        let mut loaded = self.nodes.load(self.area, &target)?;
        if let Some(next) = loaded.indirection() {
            self.report.warn(
                path,
                format!("{target} is itself an indirection to {next}; only one hop is followed"),
            );
            loaded.clear_value();
        }
        log::debug!("{path}: resolved indirection to {target}");
        let mut resolved = node.clone();
        resolved.replace_body(loaded);
        Ok(Cow::Owned(resolved))
    }

    /// Tile descriptor for the key entry `node` at `path`.
    pub fn parse_tile(
        &mut self,
        node: &ConfigNode,
        path: &str,
    ) -> Result<TileDescriptor, AreaError> {
        let node = self.resolve(node, path)?;
        let mut tile = TileDescriptor::with_defaults(self.alloc_id(), path.to_owned());

        for child in node.children() {
            let field = format!("{path}/{}", child.name());
            if self.apply_common(&mut tile, child, &field, MAX_TILE_FRAMES) {
                continue;
            }
            match child.name() {
                "slope" => {
                    if let Some(s) = self.text(child, &field) {
                        match SlopeType::parse(s) {
                            Some(slope) => tile.slope = Some(slope),
                            None => self.report.warn(
                                &field,
                                format!("unknown slope '{s}', expected {SLOPE_NAMES}"),
                            ),
                        }
                    }
                }
                "cut_corners" => {
                    if let Some(b) = self.flag(child, &field) {
                        tile.cut_corners = b;
                    }
                }
                other => self.report.warn(&field, format!("unknown tile field '{other}' ignored")),
            }
        }

        log::debug!(
            "{path}: tile #{} with {} texture(s), {} frame(s)",
            tile.id.0,
            tile.textures.len(),
            tile.frames
        );
        Ok(tile)
    }

    /// Decor descriptor for the decor key entry `node` at `path`.
    pub fn parse_decor(
        &mut self,
        node: &ConfigNode,
        path: &str,
    ) -> Result<DecorDescriptor, AreaError> {
        let node = self.resolve(node, path)?;
        let base = TileDescriptor::with_defaults(self.alloc_id(), path.to_owned());
        let mut decor = DecorDescriptor {
            base,
            pin: Pin::None,
            offset: Vec2::ZERO,
            jitter: Vec2::ZERO,
            size: Vec2::ONE,
            rotate_on_slope: false,
            light: None,
            gate: None,
        };

        for child in node.children() {
            let field = format!("{path}/{}", child.name());
            if self.apply_common(&mut decor.base, child, &field, MAX_DECOR_FRAMES) {
                continue;
            }
            match child.name() {
                "pin" => {
                    if let Some(s) = self.text(child, &field) {
                        match Pin::parse(s) {
                            Some(pin) => decor.pin = pin,
                            None => self.report.warn(
                                &field,
                                format!("unknown pin '{s}', expected {PIN_NAMES}"),
                            ),
                        }
                    }
                }
                "offset_x" => {
                    decor.offset.x = self.number(child, &field, "a number").unwrap_or(0.0)
                }
                "offset_y" => {
                    decor.offset.y = self.number(child, &field, "a number").unwrap_or(0.0)
                }
                "jitter_x" => decor.jitter.x = self.non_negative(child, &field).unwrap_or(0.0),
                "jitter_y" => decor.jitter.y = self.non_negative(child, &field).unwrap_or(0.0),
                "width" => decor.size.x = self.positive(child, &field).unwrap_or(1.0),
                "height" => decor.size.y = self.positive(child, &field).unwrap_or(1.0),
                "rotate_on_slope" => {
                    decor.rotate_on_slope = self.flag(child, &field).unwrap_or(false)
                }
                "light" => decor.light = Some(self.light(child, &field)),
                "gate" => decor.gate = self.gate(child, &field),
                other => self.report.warn(&field, format!("unknown decor field '{other}' ignored")),
            }
        }

        log::debug!("{path}: decor #{} pinned {:?}", decor.base.id.0, decor.pin);
        Ok(decor)
    }

    /// Fields shared by tiles and decor. Returns false if `child` is not one of them.
    fn apply_common(
        &mut self,
        tile: &mut TileDescriptor,
        child: &ConfigNode,
        field: &str,
        max_frames: u32,
    ) -> bool {
        match child.name() {
            "color" => {
                if let Some(c) = self.color(child, field) {
                    tile.color = c;
                }
            }
            "texture" => {
                if let Some(s) = self.text(child, field) {
                    tile.textures.extend(
                        s.split(',')
                            .map(str::trim)
                            .filter(|t| !t.is_empty())
                            .map(str::to_owned),
                    );
                }
            }
            "resource" => {
                if let Some(b) = self.flag(child, field) {
                    tile.origin = if b { Origin::Resource } else { Origin::Local };
                }
            }
            "blend" => {
                if let Some(s) = self.text(child, field) {
                    match BlendMode::parse(s) {
                        Some(b) => tile.blend = b,
                        None => self.report.warn(
                            field,
                            format!("unknown blend mode '{s}', expected {BLEND_NAMES}"),
                        ),
                    }
                }
            }
            "frames" => {
                if let Some(n) = self.number::<u32>(child, field, "a whole number") {
                    if (1..=max_frames).contains(&n) {
                        tile.frames = n;
                    } else {
                        self.report.warn(
                            field,
                            format!("frame count {n} outside 1..={max_frames}, using 1"),
                        );
                    }
                }
            }
            "frame_time" => {
                if let Some(t) = self.positive(child, field) {
                    tile.frame_time = t;
                }
            }
            "overlays" => {
                if let Some(s) = self.text(child, field) {
                    tile.overlays = Some(s.trim().to_owned());
                }
            }
            _ => return false,
        }
        true
    }

    fn light(&mut self, node: &ConfigNode, path: &str) -> LightSource {
        let mut light = LightSource {
            color: WHITE,
            radius: 3.0,
            offset: Vec2::ZERO,
        };
        for child in node.children() {
            let field = format!("{path}/{}", child.name());
            match child.name() {
                "color" => {
                    if let Some(c) = self.color(child, &field) {
                        light.color = c;
                    }
                }
                "radius" => light.radius = self.positive(child, &field).unwrap_or(3.0),
                "offset_x" => {
                    light.offset.x = self.number(child, &field, "a number").unwrap_or(0.0)
                }
                "offset_y" => {
                    light.offset.y = self.number(child, &field, "a number").unwrap_or(0.0)
                }
                other => self.report.warn(&field, format!("unknown light field '{other}' ignored")),
            }
        }
        light
    }

    fn gate(&mut self, node: &ConfigNode, path: &str) -> Option<Gate> {
        let mut area = None;
        let mut entry = IVec2::ZERO;
        for child in node.children() {
            let field = format!("{path}/{}", child.name());
            match child.name() {
                "area" => area = self.text(child, &field).map(|s| s.trim().to_owned()),
                "x" => entry.x = self.number(child, &field, "an integer").unwrap_or(0),
                "y" => entry.y = self.number(child, &field, "an integer").unwrap_or(0),
                other => self.report.warn(&field, format!("unknown gate field '{other}' ignored")),
            }
        }
        match area {
            Some(area) if !area.is_empty() => Some(Gate { area, entry }),
            _ => {
                self.report.warn(path, "gate has no target area; gate ignored");
                None
            }
        }
    }

    fn text<'n>(&mut self, child: &'n ConfigNode, field: &str) -> Option<&'n str> {
        let value = child.value();
        if value.is_none() {
            self.report.warn(field, "expected a value");
        }
        value
    }

    fn number<T: FromStr>(&mut self, child: &ConfigNode, field: &str, what: &str) -> Option<T> {
        let s = self.text(child, field)?;
        match s.trim().parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                self.report.warn(field, format!("'{s}' is not {what}"));
                None
            }
        }
    }

    fn positive(&mut self, child: &ConfigNode, field: &str) -> Option<f32> {
        let v: f32 = self.number(child, field, "a number")?;
        if v > 0.0 && v.is_finite() {
            Some(v)
        } else {
            self.report.warn(field, format!("{v} must be greater than 0"));
            None
        }
    }

    fn non_negative(&mut self, child: &ConfigNode, field: &str) -> Option<f32> {
        let v: f32 = self.number(child, field, "a number")?;
        if v >= 0.0 && v.is_finite() {
            Some(v)
        } else {
            self.report.warn(field, format!("{v} must not be negative"));
            None
        }
    }

    fn flag(&mut self, child: &ConfigNode, field: &str) -> Option<bool> {
        let s = self.text(child, field)?;
        match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => {
                self.report.warn(field, format!("'{s}' is not true or false"));
                None
            }
        }
    }

    fn color(&mut self, child: &ConfigNode, field: &str) -> Option<Color> {
        let s = self.text(child, field)?;
        match parse_color(s) {
            Some(c) => Some(c),
            None => {
                self.report.warn(
                    field,
                    format!("'{s}' is not a color, expected 3 or 4 components in 0..1"),
                );
                None
            }
        }
    }
}

/// `"r g b"`, `"r g b a"` or the comma-separated equivalents, each in `0..=1`.
pub fn parse_color(s: &str) -> Option<Color> {
    let parts: Vec<f32> = s
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<f32>().ok())
        .collect::<Option<_>>()?;
    if !parts.iter().all(|v| (0.0..=1.0).contains(v)) {
        return None;
    }
    match parts.as_slice() {
        [r, g, b] => Some(Color::new(*r, *g, *b, 1.0)),
        [r, g, b, a] => Some(Color::new(*r, *g, *b, *a)),
        _ => None,
    }
}
