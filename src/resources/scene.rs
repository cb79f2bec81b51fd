//! Scene roots.

use crate::document::Document;
use crate::resources::Node;

/// Root of one scene: either an existing node or a synthetic one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SceneRoot {
    /// The scene's single root node.
    Node(usize),
    /// A grouping root over the scene's top-level nodes.
    Synthetic { name: String, children: Vec<usize> },
}

impl SceneRoot {
    pub fn children<'a>(&'a self, nodes: &'a [Node]) -> &'a [usize] {
        match self {
            Self::Node(i) => nodes.get(*i).map_or(&[][..], |n| n.children.as_slice()),
            Self::Synthetic { children, .. } => children,
        }
    }

    pub fn name<'a>(&'a self, nodes: &'a [Node]) -> &'a str {
        match self {
            Self::Node(i) => nodes.get(*i).map_or("", |n| n.name.as_str()),
            Self::Synthetic { name, .. } => name,
        }
    }
}

/// One root per scene.
///
/// A document with exactly one scene holding exactly one root node exposes
/// that node. Otherwise every scene gets a synthetic root named after the
/// scene (`scene_<index>` when unnamed). Out-of-range node references are
/// dropped.
pub fn create_scenes(document: &Document, nodes: &[Node]) -> Vec<SceneRoot> {
    let roots = |nodes_of: &Option<Vec<usize>>| -> Vec<usize> {
        nodes_of
            .iter()
            .flatten()
            .copied()
            .filter(|&i| i < nodes.len())
            .collect()
    };

    if let [scene] = document.scenes.as_slice() {
        if let [single] = roots(&scene.nodes).as_slice() {
            return vec![SceneRoot::Node(*single)];
        }
    }

    document
        .scenes
        .iter()
        .enumerate()
        .map(|(i, scene)| SceneRoot::Synthetic {
            name: scene.name.clone().unwrap_or_else(|| format!("scene_{i}")),
            children: roots(&scene.nodes),
        })
        .collect()
}

/// Index of the scene shown by default; `None` without scenes.
pub fn default_scene(document: &Document) -> Option<usize> {
    if document.scenes.is_empty() {
        return None;
    }
    Some(document.scene.filter(|&s| s < document.scenes.len()).unwrap_or(0))
}
