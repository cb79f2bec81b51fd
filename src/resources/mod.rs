//! Resource builders.
//!
//! Each builder turns schema records plus resolved buffer data into
//! engine-facing resources:
//! - [`create_render`] / [`Mesh`] - primitives with vertex and index buffers
//! - [`create_material`] / [`Material`] - PBR materials and their extensions
//! - [`create_texture`] / [`Texture`] - textures, samplers and images
//! - [`create_skin`] / [`Skin`] - inverse bind matrices
//! - [`create_animation`] / [`AnimTrack`] - animation curves
//! - [`create_camera`], [`create_light`], [`create_node`], [`create_scenes`]

pub mod animation;
pub mod camera;
pub mod light;
pub mod material;
pub mod mesh;
pub mod node;
pub mod scene;
pub mod skin;
pub mod texture;

pub use animation::{
    create_animation, quat_continuity, AnimCurve, AnimationContext, AnimData, AnimTarget, AnimTrack, Interpolation,
};
pub use camera::{create_camera, AspectRatio, Camera, Projection};
pub use light::{create_light, light_unit_conversion, Light, LightType};
pub use material::{create_material, Channel, Material, MaterialContext, TextureSlot, MATERIAL_EXTENSIONS};
pub use mesh::{
    create_mesh, create_render, morph_weight_property, Mesh, MeshContext, MeshId, Morph, MorphTarget, Render,
};
pub use node::{create_node, link_hierarchy, node_path, Node};
pub use scene::{create_scenes, default_scene, SceneRoot};
pub use skin::{create_skin, Skin, SkinCache};
pub use texture::{create_texture, texture_image_source, ImageData, ImagePixels, Sampler, Texture};

use crate::util::BBox3f;

// ============================================================================
// Capabilities
// ============================================================================

/// Something that can be drawn.
pub trait Renderable {
    fn meshes(&self) -> &[std::sync::Arc<Mesh>];

    /// World-independent bounds of everything drawn.
    fn aabb(&self) -> BBox3f {
        let mut aabb = BBox3f::EMPTY;
        for mesh in self.meshes() {
            aabb.expand_by_box(&mesh.aabb);
        }
        aabb
    }
}

/// Something animation curves can drive.
pub trait Animatable {
    /// Property names a curve may target.
    fn animated_properties(&self) -> Vec<String>;
}

impl Renderable for Render {
    fn meshes(&self) -> &[std::sync::Arc<Mesh>] {
        &self.meshes
    }
}

impl Animatable for Node {
    fn animated_properties(&self) -> Vec<String> {
        ["localPosition", "localRotation", "localScale"].map(String::from).to_vec()
    }
}

impl Animatable for Render {
    /// Weights of every morph target across the primitives.
    fn animated_properties(&self) -> Vec<String> {
        let mut properties: Vec<String> = self
            .meshes
            .iter()
            .filter_map(|m| m.morph.as_ref())
            .flat_map(|m| m.targets.iter().map(|t| t.weight_property.clone()))
            .collect();
        properties.dedup();
        properties
    }
}
