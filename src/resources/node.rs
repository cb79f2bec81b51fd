//! Node hierarchy.

use std::collections::HashMap;

use tracing::warn;

use crate::document::NodeSchema;
use crate::util::{Mat4, Quat, Vec3};

/// Transform node of the resource graph.
///
/// Nodes are identified by their index in the document's node array.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub name: String,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Render (glTF mesh) drawn at this node.
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
    pub camera: Option<usize>,
    pub light: Option<usize>,
}

impl Node {
    /// Node with identity transform and no attachments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            parent: None,
            children: Vec::new(),
            mesh: None,
            skin: None,
            camera: None,
            light: None,
        }
    }

    /// Local transform matrix.
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Default node construction.
///
/// Unnamed nodes are called `node_<index>`. A `matrix` is decomposed into
/// TRS; explicit `translation`/`rotation`/`scale` then override the
/// decomposed parts.
pub fn create_node(schema: &NodeSchema, index: usize) -> Node {
    let name = match schema.name.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("node_{index}"),
    };
    let mut node = Node::new(name);

    if let Some(m) = &schema.matrix {
        let (scale, rotation, translation) = Mat4::from_cols_array(m).to_scale_rotation_translation();
        node.translation = translation;
        node.rotation = rotation;
        node.scale = scale;
    }
    if let Some([x, y, z, w]) = schema.rotation {
        node.rotation = Quat::from_xyzw(x, y, z, w);
    }
    if let Some(t) = schema.translation {
        node.translation = Vec3::from_array(t);
    }
    if let Some(s) = schema.scale {
        node.scale = Vec3::from_array(s);
    }

    node.mesh = schema.mesh;
    node.skin = schema.skin;
    node.camera = schema.camera;
    node.light = schema.extensions.as_ref().and_then(|e| e.lights_punctual.as_ref()).map(|l| l.light);
    node
}

/// Link `nodes` into a hierarchy following each schema's `children`.
///
/// A node keeps the first parent that claims it. Siblings sharing a name
/// get a numeric suffix (`a`, `a1`, `a2`, ...). Links that would form a
/// cycle are dropped.
pub fn link_hierarchy(nodes: &mut [Node], schemas: &[NodeSchema]) {
    for (parent, schema) in schemas.iter().enumerate() {
        let mut unique_names: HashMap<String, usize> = HashMap::new();

        for &child in &schema.children {
            if child >= nodes.len() {
                warn!(node = parent, child, "ignoring out-of-range child index");
                continue;
            }
            if nodes[child].parent.is_some() || is_ancestor_or_self(nodes, child, parent) {
                continue;
            }

            let name = nodes[child].name.clone();
            match unique_names.get_mut(&name) {
                Some(suffix) => {
                    nodes[child].name = format!("{name}{suffix}");
                    *suffix += 1;
                }
                None => {
                    unique_names.insert(name, 1);
                }
            }

            nodes[child].parent = Some(parent);
            nodes[parent].children.push(child);
        }
    }
}

/// True if `candidate` is `node` or one of its ancestors.
fn is_ancestor_or_self(nodes: &[Node], candidate: usize, mut node: usize) -> bool {
    loop {
        if node == candidate {
            return true;
        }
        match nodes[node].parent {
            Some(parent) => node = parent,
            None => return false,
        }
    }
}

/// Names from the root down to `index`.
pub fn node_path(nodes: &[Node], index: usize) -> Vec<String> {
    let mut path = Vec::new();
    let mut current = Some(index);
    while let Some(i) = current {
        let Some(node) = nodes.get(i) else { break };
        path.push(node.name.clone());
        current = node.parent;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{NodeExtensions, NodeLightRef};

    fn named(name: &str, children: Vec<usize>) -> NodeSchema {
        NodeSchema { name: Some(name.to_string()), children, ..Default::default() }
    }

    #[test]
    fn test_default_names_and_trs() {
        let schema = NodeSchema {
            translation: Some([1.0, 2.0, 3.0]),
            scale: Some([2.0, 2.0, 2.0]),
            extensions: Some(NodeExtensions { lights_punctual: Some(NodeLightRef { light: 4 }) }),
            ..Default::default()
        };
        let node = create_node(&schema, 7);
        assert_eq!(node.name, "node_7");
        assert_eq!(node.translation, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(node.scale, Vec3::splat(2.0));
        assert_eq!(node.rotation, Quat::IDENTITY);
        assert_eq!(node.light, Some(4));
    }

    #[test]
    fn test_matrix_decomposition() {
        let m = Mat4::from_scale_rotation_translation(
            Vec3::new(1.0, 2.0, 4.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            Vec3::new(5.0, 6.0, 7.0),
        );
        let schema = NodeSchema { matrix: Some(m.to_cols_array()), ..Default::default() };
        let node = create_node(&schema, 0);
        assert!((node.translation - Vec3::new(5.0, 6.0, 7.0)).length() < 1e-5);
        assert!((node.scale - Vec3::new(1.0, 2.0, 4.0)).length() < 1e-5);
        assert!(node.local_matrix().abs_diff_eq(m, 1e-5));

        // Explicit TRS wins over the matrix.
        let schema = NodeSchema { translation: Some([0.0; 3]), ..schema };
        assert_eq!(create_node(&schema, 0).translation, Vec3::ZERO);
    }

    #[test]
    fn test_hierarchy_and_name_dedupe() {
        let schemas = vec![
            named("root", vec![1, 2, 3]),
            named("leaf", vec![]),
            named("leaf", vec![]),
            named("leaf", vec![]),
        ];
        let mut nodes: Vec<Node> = schemas.iter().enumerate().map(|(i, s)| create_node(s, i)).collect();
        link_hierarchy(&mut nodes, &schemas);

        assert_eq!(nodes[0].children, vec![1, 2, 3]);
        let names: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["root", "leaf", "leaf1", "leaf2"]);
        assert_eq!(node_path(&nodes, 3), vec!["root".to_string(), "leaf2".to_string()]);
    }

    #[test]
    fn test_first_parent_wins_and_cycles_dropped() {
        let schemas = vec![named("a", vec![1]), named("b", vec![0, 2]), named("c", vec![1])];
        let mut nodes: Vec<Node> = schemas.iter().enumerate().map(|(i, s)| create_node(s, i)).collect();
        link_hierarchy(&mut nodes, &schemas);

        assert_eq!(nodes[1].parent, Some(0));
        assert_eq!(nodes[0].parent, None);
        assert_eq!(nodes[2].parent, Some(1));
        assert_eq!(nodes[1].children, vec![2]);
        assert!(nodes[2].children.is_empty());
    }
}
