// tests/common/mod.rs
#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tile_area::render::{TextureId, TextureSource};
use tile_area::{AssetPath, FsNodeSource, Origin};

/// `{ "name": .., "value": .. }`
pub fn leaf(name: &str, value: &str) -> Value {
    json!({ "name": name, "value": value })
}

/// `{ "name": .., "children": [..] }`
pub fn branch(name: &str, children: Vec<Value>) -> Value {
    json!({ "name": name, "children": children })
}

/// Layout node with one row child per line, top first.
pub fn layout(name: &str, rows: &[&str]) -> Value {
    branch(name, rows.iter().map(|r| leaf("row", r)).collect())
}

/// A scratch asset tree with `data/` and `assets/` roots.
pub struct Assets {
    pub dir: TempDir,
}

impl Assets {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        Self { dir }
    }

    pub fn local_root(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn resource_root(&self) -> PathBuf {
        self.dir.path().join("assets")
    }

    pub fn nodes(&self) -> FsNodeSource {
        FsNodeSource::new(self.local_root(), self.resource_root())
    }

    pub fn textures(&self) -> DiskTextures {
        DiskTextures::new(self.local_root(), self.resource_root())
    }

    /// Write a node file under the local root.
    pub fn node(&self, path: &str, node: &Value) {
        write(&self.local_root().join(path), node.to_string().as_bytes());
    }

    /// Create a placeholder image file under the local root.
    pub fn image(&self, path: &str) {
        write(&self.local_root().join(path), b"png");
    }

    /// Create an image file that exists but cannot be decoded.
    pub fn corrupt_image(&self, path: &str) {
        write(&self.local_root().join(path), b"");
    }

    pub fn resource_image(&self, path: &str) {
        write(&self.resource_root().join(path), b"png");
    }
}

fn write(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, bytes).unwrap();
}

/// Texture source that checks files on disk but never decodes them.
///
/// Empty files stand in for images the backend fails to decode.
pub struct DiskTextures {
    local_root: PathBuf,
    resource_root: PathBuf,
    next: u32,
    pub loads: HashMap<AssetPath, usize>,
    pub ids: HashMap<TextureId, AssetPath>,
    pub released: Vec<TextureId>,
}

impl DiskTextures {
    pub fn new(local_root: PathBuf, resource_root: PathBuf) -> Self {
        Self {
            local_root,
            resource_root,
            next: 0,
            loads: HashMap::new(),
            ids: HashMap::new(),
            released: Vec::new(),
        }
    }

    fn resolve(&self, path: &AssetPath) -> PathBuf {
        match path.origin {
            Origin::Local => self.local_root.join(&path.path),
            Origin::Resource => self.resource_root.join(&path.path),
        }
    }

    pub fn total_loads(&self) -> usize {
        self.loads.values().sum()
    }
}

impl TextureSource for DiskTextures {
    fn exists(&self, path: &AssetPath) -> bool {
        self.resolve(path).is_file()
    }

    fn load(&mut self, path: &AssetPath) -> anyhow::Result<TextureId> {
        let bytes = fs::read(self.resolve(path))?;
        anyhow::ensure!(!bytes.is_empty(), "cannot decode {path}");
        *self.loads.entry(path.clone()).or_insert(0) += 1;
        let id = TextureId(self.next);
        self.next += 1;
        self.ids.insert(id, path.clone());
        Ok(id)
    }

    fn release(&mut self, id: TextureId) {
        self.released.push(id);
    }
}
