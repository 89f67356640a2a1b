use std::io;
use std::path::PathBuf;

/// Fatal error raised while loading an area.
///
/// Every variant names the area being loaded and the node path that caused it,
/// so the caller can point the author at the broken definition.
#[derive(Debug, thiserror::Error)]
pub enum AreaError {
    /// A node file could not be read from disk.
    #[error("{area}: reading {path}: {source}")]
    Io {
        /// Area being loaded
        area: String,
        /// File that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
    /// A node file is not valid JSON.
    #[error("{area}: parsing {path}: {source}")]
    Json {
        /// Area being loaded
        area: String,
        /// File that failed to parse
        path: PathBuf,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },
    /// A mandatory child node is missing.
    #[error("{area}: node '{node}' is missing required child '{child}'")]
    MissingNode {
        /// Area being loaded
        area: String,
        /// Path of the node that should contain the child
        node: String,
        /// Name of the missing child
        child: String,
    },
    /// An indirection marker points at a node file that does not exist.
    #[error("{area}: node '{node}' refers to missing node file {target}")]
    MissingIndirection {
        /// Area being loaded
        area: String,
        /// Path of the referencing node
        node: String,
        /// Display form of the target location
        target: String,
    },
    /// A descriptor declared a base texture that does not exist.
    #[error("{area}: node '{node}' declares missing texture {texture}")]
    MissingTexture {
        /// Area being loaded
        area: String,
        /// Path of the descriptor node
        node: String,
        /// Display form of the texture location
        texture: String,
    },
    /// The texture backend failed to construct a texture that exists.
    #[error("{area}: node '{node}' texture {texture} failed to load: {reason}")]
    TextureLoad {
        /// Area being loaded
        area: String,
        /// Path of the descriptor node
        node: String,
        /// Display form of the texture location
        texture: String,
        /// Backend message
        reason: String,
    },
    /// The middleground layout has no rows at all.
    #[error("{area}: layout '{node}' has no rows")]
    EmptyLayout {
        /// Area being loaded
        area: String,
        /// Path of the layout node
        node: String,
    },
}

/// A recoverable problem found while loading; the default was used instead.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadIssue {
    /// Path of the offending node, e.g. `key/#/frames`
    pub node: String,
    /// What was wrong and what was expected
    pub message: String,
}

/// Recoverable issues collected during a load.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    issues: Vec<LoadIssue>,
}

impl LoadReport {
    /// An empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue and forward it to the log.
    pub fn warn(&mut self, node: impl Into<String>, message: impl Into<String>) {
        let issue = LoadIssue {
            node: node.into(),
            message: message.into(),
        };
        log::warn!("{}: {}", issue.node, issue.message);
        self.issues.push(issue);
    }

    /// Issues in the order they were found.
    pub fn issues(&self) -> &[LoadIssue] {
        &self.issues
    }

    /// True when the load was clean.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// True if any issue was recorded against `node`.
    pub fn mentions(&self, node: &str) -> bool {
        self.issues.iter().any(|i| i.node == node)
    }
}
