//! Punctual lights (`KHR_lights_punctual`).

use std::f32::consts::PI;

use crate::document::LightSchema;
use crate::util::{Color, Quat};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightType {
    Directional,
    /// Point light.
    Omni,
    Spot,
}

impl LightType {
    fn from_gltf(name: &str) -> Self {
        match name {
            "directional" => Self::Directional,
            "spot" => Self::Spot,
            _ => Self::Omni,
        }
    }
}

/// Light attached to a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub name: String,
    pub light_type: LightType,
    pub color: Color,
    /// Engine intensity, clamped to `[0, 2]`.
    pub intensity: f32,
    pub range: f32,
    /// Cone angles in degrees.
    pub inner_cone_angle: f32,
    pub outer_cone_angle: f32,
    /// Photometric intensity, when the source declares one.
    pub luminance: Option<f32>,
    /// Rotation aligning the engine's light axis with glTF's `-Z`.
    pub local_rotation: Quat,
}

/// Factor converting glTF light intensity into luminance.
pub fn light_unit_conversion(light_type: LightType, outer_angle: f32, inner_angle: f32) -> f32 {
    match light_type {
        LightType::Spot => {
            let falloff_end = outer_angle.cos();
            let falloff_start = inner_angle.cos();
            2.0 * PI * ((1.0 - falloff_start) + (falloff_start - falloff_end) / 2.0)
        }
        LightType::Omni => 4.0 * PI,
        LightType::Directional => 1.0,
    }
}

/// Default light construction; `node_name` names the light entity.
pub fn create_light(schema: &LightSchema, node_name: &str) -> Light {
    let light_type = LightType::from_gltf(&schema.light_type);
    let (inner, outer) = match &schema.spot {
        Some(spot) => (
            spot.inner_cone_angle.unwrap_or(0.0),
            spot.outer_cone_angle.unwrap_or(PI / 4.0),
        ),
        None => (0.0, PI / 4.0),
    };

    Light {
        name: node_name.to_string(),
        light_type,
        color: schema.color.map_or(Color::WHITE, |c| Color::from_rgb_slice(&c)),
        intensity: schema.intensity.map_or(1.0, |i| i.clamp(0.0, 2.0)),
        range: schema.range.unwrap_or(9999.0),
        inner_cone_angle: inner.to_degrees(),
        outer_cone_angle: outer.to_degrees(),
        luminance: schema.intensity.map(|i| i * light_unit_conversion(light_type, outer, inner)),
        local_rotation: Quat::from_rotation_x(90f32.to_radians()),
    }
}
