// src/node.rs
use std::fmt;

/// Where an asset or node file lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// User data directory
    Local,
    /// Bundled resources shipped with the game
    Resource,
}

/// A path relative to one of the two asset roots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetPath {
    /// Which root the path is under
    pub origin: Origin,
    /// Slash-separated, relative to the root
    pub path: String,
}

impl AssetPath {
    /// `path` under the local root.
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            origin: Origin::Local,
            path: path.into(),
        }
    }

    /// `path` under the resource root.
    pub fn resource(path: impl Into<String>) -> Self {
        Self {
            origin: Origin::Resource,
            path: path.into(),
        }
    }

    /// Sibling path under the same root, `dir/name`.
    pub fn join(&self, name: &str) -> Self {
        let path = if self.path.is_empty() {
            name.to_owned()
        } else {
            format!("{}/{}", self.path.trim_end_matches('/'), name)
        };
        Self {
            origin: self.origin,
            path,
        }
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin {
            Origin::Local => write!(f, "local:{}", self.path),
            Origin::Resource => write!(f, "resource:{}", self.path),
        }
    }
}

const LOCAL_MARKER: &str = "@local ";
const RESOURCE_MARKER: &str = "@resource ";

/// Canonical, format-agnostic configuration tree.
///
/// Nodes are ordered; names need not be unique (a descriptor may list
/// several `texture` children).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigNode {
    name: String,
    value: Option<String>,
    children: Vec<ConfigNode>,
}

impl ConfigNode {
    /// A node with no value and no children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            children: Vec::new(),
        }
    }

    /// Builder helper: set the value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Builder helper: append a child.
    pub fn with_child(mut self, child: ConfigNode) -> Self {
        self.children.push(child);
        self
    }

    /// Builder helper: append a `name = value` leaf.
    pub fn with_leaf(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_child(ConfigNode::new(name).with_value(value))
    }

    /// Node name; a key character for key entries.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scalar value, if the node has one.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Children in file order.
    pub fn children(&self) -> &[ConfigNode] {
        &self.children
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&ConfigNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Indirection target if this node's value is `@local <path>` or `@resource <path>`.
    pub fn indirection(&self) -> Option<AssetPath> {
        let value = self.value.as_deref()?.trim();
        if let Some(rest) = value.strip_prefix(LOCAL_MARKER) {
            Some(AssetPath::local(rest.trim()))
        } else {
            value
                .strip_prefix(RESOURCE_MARKER)
                .map(|rest| AssetPath::resource(rest.trim()))
        }
    }

    /// Take value and children from `other`, keeping this node's name.
    pub(crate) fn replace_body(&mut self, other: ConfigNode) {
        self.value = other.value;
        self.children = other.children;
    }

    pub(crate) fn clear_value(&mut self) {
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_lookup_returns_first_match() {
        let node = ConfigNode::new("tile")
            .with_leaf("texture", "a.png")
            .with_leaf("texture", "b.png");
        assert_eq!(node.child("texture").and_then(|c| c.value()), Some("a.png"));
        assert_eq!(node.children().iter().filter(|c| c.name() == "texture").count(), 2);
        assert!(node.child("color").is_none());
    }

    #[test]
    fn recognises_indirection_markers() {
        let local = ConfigNode::new("#").with_value("@local tiles/dirt.json");
        let res = ConfigNode::new("#").with_value("@resource  tiles/rock.json ");
        let plain = ConfigNode::new("#").with_value("tiles/rock.json");

        assert_eq!(local.indirection(), Some(AssetPath::local("tiles/dirt.json")));
        assert_eq!(res.indirection(), Some(AssetPath::resource("tiles/rock.json")));
        assert_eq!(plain.indirection(), None);
    }

    #[test]
    fn asset_path_join_keeps_origin() {
        let dir = AssetPath::resource("overlays/grass/");
        assert_eq!(dir.join("edge.png"), AssetPath::resource("overlays/grass/edge.png"));
        assert_eq!(dir.to_string(), "resource:overlays/grass/");
    }
}
