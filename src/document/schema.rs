//! Typed glTF 2.0 scene-description schema.
//!
//! Only the fields the loader consumes are modelled; extension payloads
//! stay as raw JSON maps and are decoded by whichever builder handles them.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::util::AccessorType;

/// Unparsed `extensions` object, in declaration order.
pub type Extensions = Map<String, Value>;

/// Root of a glTF document.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub asset: Option<Asset>,
    #[serde(default)]
    pub accessors: Vec<AccessorSchema>,
    #[serde(default)]
    pub buffer_views: Vec<BufferViewSchema>,
    #[serde(default)]
    pub buffers: Vec<BufferSchema>,
    #[serde(default)]
    pub meshes: Vec<MeshSchema>,
    #[serde(default)]
    pub materials: Vec<MaterialSchema>,
    #[serde(default)]
    pub textures: Vec<TextureSchema>,
    #[serde(default)]
    pub images: Vec<ImageSchema>,
    #[serde(default)]
    pub samplers: Vec<SamplerSchema>,
    #[serde(default)]
    pub skins: Vec<SkinSchema>,
    #[serde(default)]
    pub animations: Vec<AnimationSchema>,
    #[serde(default)]
    pub cameras: Vec<CameraSchema>,
    #[serde(default)]
    pub nodes: Vec<NodeSchema>,
    #[serde(default)]
    pub scenes: Vec<SceneSchema>,
    /// Default scene index.
    pub scene: Option<usize>,
    #[serde(default)]
    pub extensions_used: Vec<String>,
    #[serde(default)]
    pub extensions_required: Vec<String>,
    pub extensions: Option<Extensions>,
}

/// `asset` metadata block.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(default)]
    pub version: String,
    pub min_version: Option<String>,
    pub generator: Option<String>,
    pub copyright: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessorSchema {
    pub name: Option<String>,
    pub buffer_view: Option<usize>,
    #[serde(default)]
    pub byte_offset: usize,
    /// Missing values decode as 0, which no component type maps to.
    #[serde(default)]
    pub component_type: u32,
    #[serde(default)]
    pub normalized: bool,
    #[serde(default)]
    pub count: usize,
    #[serde(rename = "type", default)]
    pub accessor_type: AccessorType,
    pub min: Option<Vec<f64>>,
    pub max: Option<Vec<f64>>,
    pub sparse: Option<SparseSchema>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseSchema {
    pub count: usize,
    pub indices: SparseIndicesSchema,
    pub values: SparseValuesSchema,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseIndicesSchema {
    pub buffer_view: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: u32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseValuesSchema {
    pub buffer_view: usize,
    #[serde(default)]
    pub byte_offset: usize,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferViewSchema {
    pub name: Option<String>,
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub target: Option<u32>,
    pub extensions: Option<Extensions>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferSchema {
    pub name: Option<String>,
    pub uri: Option<String>,
    #[serde(default)]
    pub byte_length: usize,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshSchema {
    pub name: Option<String>,
    #[serde(default)]
    pub primitives: Vec<PrimitiveSchema>,
    pub weights: Option<Vec<f32>>,
    pub extras: Option<MeshExtras>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshExtras {
    pub target_names: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimitiveSchema {
    /// Attribute semantic to accessor index.
    #[serde(default)]
    pub attributes: HashMap<String, usize>,
    pub indices: Option<usize>,
    pub material: Option<usize>,
    pub mode: Option<u32>,
    #[serde(default)]
    pub targets: Vec<HashMap<String, usize>>,
    pub extensions: Option<PrimitiveExtensions>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PrimitiveExtensions {
    #[serde(rename = "KHR_draco_mesh_compression")]
    pub draco: Option<DracoExtension>,
    #[serde(rename = "KHR_materials_variants")]
    pub variants: Option<PrimitiveVariants>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DracoExtension {
    pub buffer_view: usize,
    /// Attribute semantic to Draco unique id.
    #[serde(default)]
    pub attributes: HashMap<String, u32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PrimitiveVariants {
    #[serde(default)]
    pub mappings: Vec<VariantMapping>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VariantMapping {
    pub material: usize,
    #[serde(default)]
    pub variants: Vec<usize>,
}

/// Reference from a material slot to a texture.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureInfo {
    pub index: usize,
    #[serde(default)]
    pub tex_coord: u32,
    /// Normal map scale or occlusion strength.
    pub scale: Option<f32>,
    pub strength: Option<f32>,
    pub extensions: Option<TextureInfoExtensions>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TextureInfoExtensions {
    #[serde(rename = "KHR_texture_transform")]
    pub texture_transform: Option<TextureTransformSchema>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureTransformSchema {
    pub offset: Option<[f32; 2]>,
    pub rotation: Option<f32>,
    pub scale: Option<[f32; 2]>,
    pub tex_coord: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialSchema {
    pub name: Option<String>,
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,
    pub normal_texture: Option<TextureInfo>,
    pub occlusion_texture: Option<TextureInfo>,
    pub emissive_texture: Option<TextureInfo>,
    pub emissive_factor: Option<[f32; 3]>,
    pub alpha_mode: Option<String>,
    pub alpha_cutoff: Option<f32>,
    pub double_sided: Option<bool>,
    pub extensions: Option<Extensions>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    pub base_color_factor: Option<[f32; 4]>,
    pub base_color_texture: Option<TextureInfo>,
    pub metallic_factor: Option<f32>,
    pub roughness_factor: Option<f32>,
    pub metallic_roughness_texture: Option<TextureInfo>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureSchema {
    pub name: Option<String>,
    pub sampler: Option<usize>,
    pub source: Option<usize>,
    pub extensions: Option<Extensions>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSchema {
    pub name: Option<String>,
    pub uri: Option<String>,
    pub mime_type: Option<String>,
    pub buffer_view: Option<usize>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplerSchema {
    pub name: Option<String>,
    pub mag_filter: Option<u32>,
    pub min_filter: Option<u32>,
    pub wrap_s: Option<u32>,
    pub wrap_t: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkinSchema {
    pub name: Option<String>,
    pub inverse_bind_matrices: Option<usize>,
    pub skeleton: Option<usize>,
    #[serde(default)]
    pub joints: Vec<usize>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationSchema {
    pub name: Option<String>,
    #[serde(default)]
    pub channels: Vec<ChannelSchema>,
    #[serde(default)]
    pub samplers: Vec<AnimationSamplerSchema>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChannelSchema {
    pub sampler: usize,
    pub target: ChannelTarget,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChannelTarget {
    pub node: Option<usize>,
    pub path: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AnimationSamplerSchema {
    pub input: usize,
    pub output: usize,
    pub interpolation: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraSchema {
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub camera_type: String,
    pub perspective: Option<PerspectiveSchema>,
    pub orthographic: Option<OrthographicSchema>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerspectiveSchema {
    pub aspect_ratio: Option<f32>,
    pub yfov: f32,
    pub zfar: Option<f32>,
    pub znear: f32,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrthographicSchema {
    pub xmag: f32,
    pub ymag: f32,
    pub zfar: Option<f32>,
    pub znear: f32,
}

/// `KHR_lights_punctual` light definition.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightSchema {
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub light_type: String,
    pub color: Option<[f32; 3]>,
    pub intensity: Option<f32>,
    pub range: Option<f32>,
    pub spot: Option<SpotSchema>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotSchema {
    pub inner_cone_angle: Option<f32>,
    pub outer_cone_angle: Option<f32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSchema {
    pub name: Option<String>,
    #[serde(default)]
    pub children: Vec<usize>,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
    pub camera: Option<usize>,
    /// Column-major 4x4 matrix.
    pub matrix: Option<[f32; 16]>,
    pub translation: Option<[f32; 3]>,
    /// Quaternion `[x, y, z, w]`.
    pub rotation: Option<[f32; 4]>,
    pub scale: Option<[f32; 3]>,
    pub weights: Option<Vec<f32>>,
    pub extensions: Option<NodeExtensions>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NodeExtensions {
    #[serde(rename = "KHR_lights_punctual")]
    pub lights_punctual: Option<NodeLightRef>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NodeLightRef {
    pub light: usize,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SceneSchema {
    pub name: Option<String>,
    pub nodes: Option<Vec<usize>>,
}

/// Document-level `KHR_lights_punctual` block.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LightsPunctual {
    #[serde(default)]
    pub lights: Vec<LightSchema>,
}

/// Document-level `KHR_materials_variants` block.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MaterialsVariants {
    #[serde(default)]
    pub variants: Vec<VariantSchema>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct VariantSchema {
    #[serde(default)]
    pub name: String,
}
