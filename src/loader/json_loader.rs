// src/loader/json_loader.rs
//! JSON node files and where to find them.

use crate::error::AreaError;
use crate::node::{AssetPath, ConfigNode, Origin};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
struct JsonNode {
    name: String,
    #[serde(default)]
    value: Option<JsonScalar>,
    #[serde(default)]
    children: Vec<JsonNode>,
}

/// Node values are strings, but authors often write bare numbers and bools.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonScalar {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl JsonScalar {
    fn into_string(self) -> String {
        match self {
            JsonScalar::Bool(b) => b.to_string(),
            JsonScalar::Number(n) => n.to_string(),
            JsonScalar::String(s) => s,
        }
    }
}

fn node_from_json(j: JsonNode) -> ConfigNode {
    let mut node = ConfigNode::new(j.name);
    if let Some(value) = j.value {
        node = node.with_value(value.into_string());
    }
    j.children
        .into_iter()
        .fold(node, |node, child| node.with_child(node_from_json(child)))
}

/// Decode a node tree from JSON text.
pub fn decode_node_str(txt: &str) -> Result<ConfigNode, serde_json::Error> {
    let j: JsonNode = serde_json::from_str(txt)?;
    Ok(node_from_json(j))
}

/// Supplies node trees for area files and indirection targets.
pub trait NodeSource {
    /// Whether a node file exists at `location`.
    fn exists(&self, location: &AssetPath) -> bool;

    /// Load the node tree at `location`. `area` is used for error context.
    fn load(&self, area: &str, location: &AssetPath) -> Result<ConfigNode, AreaError>;
}

/// Node files on disk, split between a user-data root and a resource root.
#[derive(Debug, Clone)]
pub struct FsNodeSource {
    local_root: PathBuf,
    resource_root: PathBuf,
}

impl FsNodeSource {
    /// Source reading `@local` paths from `local_root` and `@resource` paths from `resource_root`.
    pub fn new(local_root: impl Into<PathBuf>, resource_root: impl Into<PathBuf>) -> Self {
        Self {
            local_root: local_root.into(),
            resource_root: resource_root.into(),
        }
    }

    /// Filesystem path of `location`.
    pub fn resolve(&self, location: &AssetPath) -> PathBuf {
        let root: &Path = match location.origin {
            Origin::Local => &self.local_root,
            Origin::Resource => &self.resource_root,
        };
        root.join(&location.path)
    }
}

impl NodeSource for FsNodeSource {
    fn exists(&self, location: &AssetPath) -> bool {
        self.resolve(location).is_file()
    }

    fn load(&self, area: &str, location: &AssetPath) -> Result<ConfigNode, AreaError> {
        let p = self.resolve(location);
        let txt = std::fs::read_to_string(&p).map_err(|source| AreaError::Io {
            area: area.to_owned(),
            path: p.clone(),
            source,
        })?;
        decode_node_str(&txt).map_err(|source| AreaError::Json {
            area: area.to_owned(),
            path: p,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn decodes_nested_nodes_and_scalar_values() {
        let txt = r##"{
          "name": "area",
          "children": [
            {"name": "key", "children": [
              {"name": "#", "children": [
                {"name": "frames", "value": 4},
                {"name": "resource", "value": true},
                {"name": "texture", "value": "dirt.png"}
              ]}
            ]}
          ]
        }"##;

        let node = decode_node_str(txt).expect("decode");
        let tile = node.child("key").and_then(|k| k.child("#")).expect("tile");
        assert_eq!(tile.child("frames").and_then(|c| c.value()), Some("4"));
        assert_eq!(tile.child("resource").and_then(|c| c.value()), Some("true"));
        assert_eq!(tile.child("texture").and_then(|c| c.value()), Some("dirt.png"));
    }

    #[test]
    fn returns_typed_error_for_malformed_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("bad.json"), "{ not json").expect("write");
        let src = FsNodeSource::new(dir.path(), dir.path());

        let err = src
            .load("test", &AssetPath::local("bad.json"))
            .err()
            .expect("expected decode error");
        assert!(matches!(err, AreaError::Json { .. }));
    }

    #[test]
    fn resolves_against_the_matching_root() {
        let local = tempfile::tempdir().expect("tempdir");
        let res = tempfile::tempdir().expect("tempdir");
        fs::write(res.path().join("rock.json"), r#"{"name":"rock"}"#).expect("write");
        let src = FsNodeSource::new(local.path(), res.path());

        assert!(src.exists(&AssetPath::resource("rock.json")));
        assert!(!src.exists(&AssetPath::local("rock.json")));
        let err = src
            .load("test", &AssetPath::local("rock.json"))
            .err()
            .expect("missing file");
        assert!(matches!(err, AreaError::Io { .. }));
    }
}
