//! Result of a parse.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::device::GraphicsDevice;
use crate::document::Document;
use crate::resources::{AnimTrack, Camera, Light, Material, MeshId, Node, Render, SceneRoot, Skin, Texture};

/// Resource graph built from one glTF asset.
///
/// Per-document arrays keep the document's indexing, so a node's `mesh`
/// indexes [`renders`](Self::renders) and a primitive's material indexes
/// [`materials`](Self::materials).
pub struct GltfContainer {
    pub document: Document,
    pub nodes: Vec<Node>,
    pub scenes: Vec<SceneRoot>,
    pub default_scene: Option<usize>,
    pub animations: Vec<AnimTrack>,
    /// `None` where a texture has no usable image.
    pub textures: Vec<Option<Texture>>,
    pub materials: Vec<Material>,
    /// `KHR_materials_variants` names.
    pub variants: Vec<String>,
    pub mesh_variants: HashMap<MeshId, HashMap<String, usize>>,
    pub mesh_default_materials: HashMap<MeshId, usize>,
    pub renders: Vec<Render>,
    pub skins: Vec<Arc<Skin>>,
    /// Lights by the node they are attached to.
    pub lights: HashMap<usize, Light>,
    /// Cameras by the node they are attached to.
    pub cameras: HashMap<usize, Camera>,
    pub(crate) device: Arc<dyn GraphicsDevice>,
}

impl GltfContainer {
    /// Material a primitive uses under `variant`, else its default.
    pub fn variant_material(&self, mesh: MeshId, variant: &str) -> Option<usize> {
        self.mesh_variants
            .get(&mesh)
            .and_then(|v| v.get(variant))
            .or_else(|| self.mesh_default_materials.get(&mesh))
            .copied()
    }

    /// Release every device allocation and drop the renders' meshes.
    ///
    /// Safe to call more than once.
    pub fn destroy(&mut self) {
        let mut handles = BTreeSet::new();
        for render in &mut self.renders {
            for mesh in render.meshes.drain(..) {
                handles.insert(mesh.vertex_buffer.handle);
                if let Some(ib) = &mesh.index_buffer {
                    handles.insert(ib.handle);
                }
            }
        }
        for texture in self.textures.iter_mut().filter_map(Option::take) {
            handles.insert(texture.handle);
        }

        debug!(allocations = handles.len(), "releasing glTF resources");
        for handle in handles {
            self.device.release(handle);
        }
    }
}

impl fmt::Debug for GltfContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GltfContainer")
            .field("nodes", &self.nodes.len())
            .field("scenes", &self.scenes.len())
            .field("renders", &self.renders.len())
            .field("materials", &self.materials.len())
            .field("textures", &self.textures.len())
            .field("animations", &self.animations.len())
            .field("skins", &self.skins.len())
            .finish()
    }
}
