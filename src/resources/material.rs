//! Materials.
//!
//! A [`Material`] is built in two passes: the core metallic-roughness
//! definition first, then every material extension in the order the
//! document declares them. Extension payloads land in optional sub-structs
//! so hosts can tell which features a material actually uses.

use glam::Vec2;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{trace, warn};

use crate::document::{MaterialSchema, TextureInfo};
use crate::util::Color;

// ============================================================================
// Material model
// ============================================================================

/// Colour channel(s) a map is sampled from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    R,
    G,
    B,
    A,
    Rgb,
}

/// A texture bound to one material input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureSlot {
    /// Index into the parsed textures.
    pub texture: usize,
    pub channel: Channel,
    /// UV set the map reads.
    pub uv: u32,
    pub tiling: Vec2,
    pub offset: Vec2,
    /// Rotation in degrees.
    pub rotation: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlendMode {
    #[default]
    None,
    Normal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CullMode {
    #[default]
    Back,
    None,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Clearcoat {
    pub factor: f32,
    pub map: Option<TextureSlot>,
    pub gloss: f32,
    pub gloss_invert: bool,
    pub gloss_map: Option<TextureSlot>,
    pub normal_map: Option<TextureSlot>,
    pub bumpiness: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sheen {
    pub color: Color,
    pub map: Option<TextureSlot>,
    pub gloss: f32,
    pub gloss_invert: bool,
    pub gloss_map: Option<TextureSlot>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transmission {
    pub refraction: f32,
    pub map: Option<TextureSlot>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Iridescence {
    pub factor: f32,
    pub map: Option<TextureSlot>,
    pub refraction_index: f32,
    pub thickness_min: f32,
    pub thickness_max: f32,
    pub thickness_map: Option<TextureSlot>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Volume {
    pub thickness: f32,
    pub thickness_map: Option<TextureSlot>,
    pub attenuation_distance: Option<f32>,
    pub attenuation_color: Color,
}

/// Render-engine material.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,

    pub diffuse: Color,
    pub diffuse_map: Option<TextureSlot>,
    pub opacity: f32,
    pub opacity_map: Option<TextureSlot>,

    pub use_metalness: bool,
    pub metalness: f32,
    pub metalness_map: Option<TextureSlot>,
    pub gloss: f32,
    pub gloss_invert: bool,
    pub gloss_map: Option<TextureSlot>,

    pub specular: Color,
    pub specular_map: Option<TextureSlot>,
    pub use_metalness_specular_color: bool,
    pub specularity_factor: f32,
    pub specularity_factor_map: Option<TextureSlot>,

    pub normal_map: Option<TextureSlot>,
    pub bumpiness: f32,
    pub ao_map: Option<TextureSlot>,
    pub ao_intensity: f32,

    pub emissive: Color,
    pub emissive_map: Option<TextureSlot>,
    pub emissive_intensity: f32,

    pub blend: BlendMode,
    pub alpha_test: f32,
    pub depth_write: bool,
    pub cull: CullMode,
    pub two_sided_lighting: bool,
    pub use_lighting: bool,
    /// Inverse index of refraction.
    pub refraction_index: f32,

    pub clearcoat: Option<Clearcoat>,
    pub sheen: Option<Sheen>,
    pub transmission: Option<Transmission>,
    pub iridescence: Option<Iridescence>,
    pub volume: Option<Volume>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse: Color::WHITE,
            diffuse_map: None,
            opacity: 1.0,
            opacity_map: None,
            use_metalness: true,
            metalness: 1.0,
            metalness_map: None,
            gloss: 1.0,
            gloss_invert: true,
            gloss_map: None,
            specular: Color::WHITE,
            specular_map: None,
            use_metalness_specular_color: false,
            specularity_factor: 1.0,
            specularity_factor_map: None,
            normal_map: None,
            bumpiness: 1.0,
            ao_map: None,
            ao_intensity: 1.0,
            emissive: Color::BLACK,
            emissive_map: None,
            emissive_intensity: 1.0,
            blend: BlendMode::None,
            alpha_test: 0.0,
            depth_write: true,
            cull: CullMode::Back,
            two_sided_lighting: false,
            use_lighting: true,
            refraction_index: 1.0 / 1.5,
            clearcoat: None,
            sheen: None,
            transmission: None,
            iridescence: None,
            volume: None,
        }
    }
}

// ============================================================================
// Texture references
// ============================================================================

/// Resolves texture references against the textures that actually loaded.
#[derive(Clone, Copy, Debug)]
pub struct MaterialContext<'a> {
    /// `true` at index `i` when texture `i` is available.
    pub textures: &'a [bool],
}

impl MaterialContext<'_> {
    /// Slot for `info`, or `None` if its texture is missing.
    ///
    /// Applies `texCoord` and `KHR_texture_transform` (offset re-based for
    /// the engine's flipped V, rotation negated and in degrees).
    pub fn slot(&self, info: &TextureInfo, channel: Channel) -> Option<TextureSlot> {
        if !self.textures.get(info.index).copied().unwrap_or(false) {
            trace!(texture = info.index, "material references a missing texture");
            return None;
        }

        let mut slot = TextureSlot {
            texture: info.index,
            channel,
            uv: info.tex_coord,
            tiling: Vec2::ONE,
            offset: Vec2::ZERO,
            rotation: 0.0,
        };

        let transform = info.extensions.as_ref().and_then(|e| e.texture_transform.as_ref());
        if let Some(t) = transform {
            let [ox, oy] = t.offset.unwrap_or([0.0, 0.0]);
            let [sx, sy] = t.scale.unwrap_or([1.0, 1.0]);
            slot.tiling = Vec2::new(sx, sy);
            slot.offset = Vec2::new(ox, 1.0 - sy - oy);
            slot.rotation = t.rotation.map_or(0.0, |r| -r.to_degrees());
            if let Some(uv) = t.tex_coord {
                slot.uv = uv;
            }
        }
        Some(slot)
    }
}

// ============================================================================
// Construction
// ============================================================================

/// Signature of a material extension handler.
pub type ExtensionHandler = fn(&mut Material, &Value, &MaterialContext<'_>);

/// Supported material extensions.
pub const MATERIAL_EXTENSIONS: &[(&str, ExtensionHandler)] = &[
    ("KHR_materials_clearcoat", extension_clearcoat),
    ("KHR_materials_emissive_strength", extension_emissive_strength),
    ("KHR_materials_ior", extension_ior),
    ("KHR_materials_iridescence", extension_iridescence),
    ("KHR_materials_pbrSpecularGlossiness", extension_pbr_spec_glossiness),
    ("KHR_materials_sheen", extension_sheen),
    ("KHR_materials_specular", extension_specular),
    ("KHR_materials_transmission", extension_transmission),
    ("KHR_materials_unlit", extension_unlit),
    ("KHR_materials_volume", extension_volume),
];

/// Default material construction.
pub fn create_material(schema: &MaterialSchema, ctx: &MaterialContext<'_>) -> Material {
    let mut material = Material {
        name: schema.name.clone().unwrap_or_default(),
        ..Default::default()
    };

    if let Some(pbr) = &schema.pbr_metallic_roughness {
        if let Some(c) = pbr.base_color_factor {
            material.diffuse = Color::gamma_encoded(&c);
            material.opacity = c[3];
        }
        if let Some(info) = &pbr.base_color_texture {
            material.diffuse_map = ctx.slot(info, Channel::Rgb);
            material.opacity_map = ctx.slot(info, Channel::A);
        }
        material.metalness = pbr.metallic_factor.unwrap_or(1.0);
        material.gloss = pbr.roughness_factor.unwrap_or(1.0);
        if let Some(info) = &pbr.metallic_roughness_texture {
            material.metalness_map = ctx.slot(info, Channel::B);
            material.gloss_map = ctx.slot(info, Channel::G);
        }
    }

    if let Some(info) = &schema.normal_texture {
        material.normal_map = ctx.slot(info, Channel::Rgb);
        material.bumpiness = info.scale.unwrap_or(1.0);
    }
    if let Some(info) = &schema.occlusion_texture {
        material.ao_map = ctx.slot(info, Channel::R);
        material.ao_intensity = info.strength.unwrap_or(1.0);
    }
    if let Some(c) = schema.emissive_factor {
        material.emissive = Color::gamma_encoded(&c);
    }
    if let Some(info) = &schema.emissive_texture {
        material.emissive_map = ctx.slot(info, Channel::Rgb);
    }

    match schema.alpha_mode.as_deref() {
        Some("MASK") => {
            material.blend = BlendMode::None;
            material.alpha_test = schema.alpha_cutoff.unwrap_or(0.5);
        }
        Some("BLEND") => {
            material.blend = BlendMode::Normal;
            material.depth_write = false;
        }
        _ => material.blend = BlendMode::None,
    }

    if schema.double_sided.unwrap_or(false) {
        material.two_sided_lighting = true;
        material.cull = CullMode::None;
    }

    if let Some(extensions) = &schema.extensions {
        for (name, payload) in extensions {
            match MATERIAL_EXTENSIONS.iter().find(|(n, _)| n == name) {
                Some((_, handler)) => handler(&mut material, payload, ctx),
                None => trace!(extension = %name, "ignoring unknown material extension"),
            }
        }
    }

    material
}

/// Decode an extension payload, warning and skipping it when malformed.
fn payload<T: DeserializeOwned>(value: &Value, extension: &str) -> Option<T> {
    match serde_json::from_value(value.clone()) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(extension, error = %e, "ignoring malformed material extension");
            None
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClearcoatSchema {
    clearcoat_factor: Option<f32>,
    clearcoat_texture: Option<TextureInfo>,
    clearcoat_roughness_factor: Option<f32>,
    clearcoat_roughness_texture: Option<TextureInfo>,
    clearcoat_normal_texture: Option<TextureInfo>,
}

fn extension_clearcoat(material: &mut Material, value: &Value, ctx: &MaterialContext<'_>) {
    let Some(data) = payload::<ClearcoatSchema>(value, "KHR_materials_clearcoat") else { return };
    let normal = data.clearcoat_normal_texture.as_ref();
    material.clearcoat = Some(Clearcoat {
        factor: data.clearcoat_factor.unwrap_or(0.0) * 0.25,
        map: data.clearcoat_texture.as_ref().and_then(|i| ctx.slot(i, Channel::R)),
        gloss: data.clearcoat_roughness_factor.unwrap_or(0.0),
        gloss_invert: true,
        gloss_map: data.clearcoat_roughness_texture.as_ref().and_then(|i| ctx.slot(i, Channel::G)),
        normal_map: normal.and_then(|i| ctx.slot(i, Channel::Rgb)),
        bumpiness: normal.and_then(|i| i.scale).unwrap_or(1.0),
    });
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmissiveStrengthSchema {
    emissive_strength: Option<f32>,
}

fn extension_emissive_strength(material: &mut Material, value: &Value, _ctx: &MaterialContext<'_>) {
    if let Some(data) = payload::<EmissiveStrengthSchema>(value, "KHR_materials_emissive_strength") {
        material.emissive_intensity = data.emissive_strength.unwrap_or(1.0);
    }
}

#[derive(Deserialize)]
struct IorSchema {
    ior: Option<f32>,
}

fn extension_ior(material: &mut Material, value: &Value, _ctx: &MaterialContext<'_>) {
    if let Some(data) = payload::<IorSchema>(value, "KHR_materials_ior") {
        material.refraction_index = 1.0 / data.ior.unwrap_or(1.5);
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IridescenceSchema {
    iridescence_factor: Option<f32>,
    iridescence_texture: Option<TextureInfo>,
    iridescence_ior: Option<f32>,
    iridescence_thickness_minimum: Option<f32>,
    iridescence_thickness_maximum: Option<f32>,
    iridescence_thickness_texture: Option<TextureInfo>,
}

fn extension_iridescence(material: &mut Material, value: &Value, ctx: &MaterialContext<'_>) {
    let Some(data) = payload::<IridescenceSchema>(value, "KHR_materials_iridescence") else { return };
    material.iridescence = Some(Iridescence {
        factor: data.iridescence_factor.unwrap_or(0.0),
        map: data.iridescence_texture.as_ref().and_then(|i| ctx.slot(i, Channel::R)),
        refraction_index: data.iridescence_ior.unwrap_or(1.3),
        thickness_min: data.iridescence_thickness_minimum.unwrap_or(100.0),
        thickness_max: data.iridescence_thickness_maximum.unwrap_or(400.0),
        thickness_map: data.iridescence_thickness_texture.as_ref().and_then(|i| ctx.slot(i, Channel::G)),
    });
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpecGlossSchema {
    diffuse_factor: Option<[f32; 4]>,
    diffuse_texture: Option<TextureInfo>,
    specular_factor: Option<[f32; 3]>,
    glossiness_factor: Option<f32>,
    specular_glossiness_texture: Option<TextureInfo>,
}

fn extension_pbr_spec_glossiness(material: &mut Material, value: &Value, ctx: &MaterialContext<'_>) {
    let Some(data) = payload::<SpecGlossSchema>(value, "KHR_materials_pbrSpecularGlossiness") else {
        return;
    };
    material.use_metalness = false;

    match data.diffuse_factor {
        Some(c) => {
            material.diffuse = Color::gamma_encoded(&c);
            material.opacity = c[3];
        }
        None => {
            material.diffuse = Color::WHITE;
            material.opacity = 1.0;
        }
    }
    if let Some(info) = &data.diffuse_texture {
        material.diffuse_map = ctx.slot(info, Channel::Rgb);
        material.opacity_map = ctx.slot(info, Channel::A);
    }

    material.specular = data.specular_factor.map_or(Color::WHITE, |c| Color::gamma_encoded(&c));
    material.gloss = data.glossiness_factor.unwrap_or(1.0);
    material.gloss_invert = false;
    if let Some(info) = &data.specular_glossiness_texture {
        material.specular_map = ctx.slot(info, Channel::Rgb);
        material.gloss_map = ctx.slot(info, Channel::A);
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheenSchema {
    sheen_color_factor: Option<[f32; 3]>,
    sheen_color_texture: Option<TextureInfo>,
    sheen_roughness_factor: Option<f32>,
    sheen_roughness_texture: Option<TextureInfo>,
}

fn extension_sheen(material: &mut Material, value: &Value, ctx: &MaterialContext<'_>) {
    let Some(data) = payload::<SheenSchema>(value, "KHR_materials_sheen") else { return };
    material.sheen = Some(Sheen {
        color: data.sheen_color_factor.map_or(Color::WHITE, |c| Color::gamma_encoded(&c)),
        map: data.sheen_color_texture.as_ref().and_then(|i| ctx.slot(i, Channel::Rgb)),
        gloss: data.sheen_roughness_factor.unwrap_or(0.0),
        gloss_invert: true,
        gloss_map: data.sheen_roughness_texture.as_ref().and_then(|i| ctx.slot(i, Channel::A)),
    });
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpecularSchema {
    specular_factor: Option<f32>,
    specular_texture: Option<TextureInfo>,
    specular_color_factor: Option<[f32; 3]>,
    specular_color_texture: Option<TextureInfo>,
}

fn extension_specular(material: &mut Material, value: &Value, ctx: &MaterialContext<'_>) {
    let Some(data) = payload::<SpecularSchema>(value, "KHR_materials_specular") else { return };
    material.use_metalness_specular_color = true;
    if let Some(info) = &data.specular_color_texture {
        material.specular_map = ctx.slot(info, Channel::Rgb);
    }
    material.specular = data.specular_color_factor.map_or(Color::WHITE, |c| Color::gamma_encoded(&c));
    material.specularity_factor = data.specular_factor.unwrap_or(1.0);
    if let Some(info) = &data.specular_texture {
        material.specularity_factor_map = ctx.slot(info, Channel::A);
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransmissionSchema {
    transmission_factor: Option<f32>,
    transmission_texture: Option<TextureInfo>,
}

fn extension_transmission(material: &mut Material, value: &Value, ctx: &MaterialContext<'_>) {
    let Some(data) = payload::<TransmissionSchema>(value, "KHR_materials_transmission") else {
        return;
    };
    material.blend = BlendMode::Normal;
    material.transmission = Some(Transmission {
        refraction: data.transmission_factor.unwrap_or(0.0),
        map: data.transmission_texture.as_ref().and_then(|i| ctx.slot(i, Channel::R)),
    });
}

fn extension_unlit(material: &mut Material, _value: &Value, _ctx: &MaterialContext<'_>) {
    material.use_lighting = false;

    // Unlit output is carried by the emissive channel.
    material.emissive = material.diffuse;
    material.emissive_map = material.diffuse_map.take();
    material.diffuse = Color::BLACK;
    material.specular = Color::BLACK;
    material.metalness = 0.0;
    material.metalness_map = None;
    material.gloss = 0.0;
    material.gloss_map = None;
    material.normal_map = None;
    material.ao_map = None;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeSchema {
    thickness_factor: Option<f32>,
    thickness_texture: Option<TextureInfo>,
    attenuation_distance: Option<f32>,
    attenuation_color: Option<[f32; 3]>,
}

fn extension_volume(material: &mut Material, value: &Value, ctx: &MaterialContext<'_>) {
    let Some(data) = payload::<VolumeSchema>(value, "KHR_materials_volume") else { return };
    material.volume = Some(Volume {
        thickness: data.thickness_factor.unwrap_or(0.0),
        thickness_map: data.thickness_texture.as_ref().and_then(|i| ctx.slot(i, Channel::G)),
        attenuation_distance: data.attenuation_distance,
        attenuation_color: data.attenuation_color.map_or(Color::WHITE, |c| Color::gamma_encoded(&c)),
    });
}
