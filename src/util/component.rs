//! Accessor component types and element shapes.

use bytemuck::Pod;
use serde::Deserialize;
use std::fmt;

/// Storage type of a single accessor component.
///
/// Discriminants are the GL enum values used by the `componentType` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum ComponentType {
    /// Signed 8-bit integer
    Int8 = 5120,
    /// Unsigned 8-bit integer
    Uint8 = 5121,
    /// Signed 16-bit integer
    Int16 = 5122,
    /// Unsigned 16-bit integer
    Uint16 = 5123,
    /// Signed 32-bit integer
    Int32 = 5124,
    /// Unsigned 32-bit integer
    Uint32 = 5125,
    /// 32-bit floating point
    Float32 = 5126,
}

impl ComponentType {
    /// Map a `componentType` GL enum to a component type.
    ///
    /// Unknown values yield `None`; callers report that as a decode failure.
    pub const fn from_gl(value: u32) -> Option<Self> {
        match value {
            5120 => Some(Self::Int8),
            5121 => Some(Self::Uint8),
            5122 => Some(Self::Int16),
            5123 => Some(Self::Uint16),
            5124 => Some(Self::Int32),
            5125 => Some(Self::Uint32),
            5126 => Some(Self::Float32),
            _ => None,
        }
    }

    /// GL enum value.
    #[inline]
    pub const fn gl(self) -> u32 {
        self as u32
    }

    /// Size in bytes of one component.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
        }
    }

    /// Returns the name of this type as a string.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Uint8 => "uint8",
            Self::Int16 => "int16",
            Self::Uint16 => "uint16",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Float32 => "float32",
        }
    }

    /// Returns true if this is an integer type.
    #[inline]
    pub const fn is_integer(self) -> bool {
        !matches!(self, Self::Float32)
    }

    /// Rescale one normalized component into `[-1, 1]` / `[0, 1]`.
    ///
    /// 32-bit integer and float components pass through unchanged.
    #[inline]
    pub fn dequantize(self, value: f64) -> f32 {
        match self {
            Self::Int8 => (value / 127.0).max(-1.0) as f32,
            Self::Uint8 => (value / 255.0) as f32,
            Self::Int16 => (value / 32767.0).max(-1.0) as f32,
            Self::Uint16 => (value / 65535.0) as f32,
            Self::Int32 | Self::Uint32 | Self::Float32 => value as f32,
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Element shape of an accessor (`type` field).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum AccessorType {
    #[default]
    #[serde(rename = "SCALAR")]
    Scalar,
    #[serde(rename = "VEC2")]
    Vec2,
    #[serde(rename = "VEC3")]
    Vec3,
    #[serde(rename = "VEC4")]
    Vec4,
    #[serde(rename = "MAT2")]
    Mat2,
    #[serde(rename = "MAT3")]
    Mat3,
    #[serde(rename = "MAT4")]
    Mat4,
}

impl AccessorType {
    /// Number of components per element.
    #[inline]
    pub const fn num_components(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 | Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
        }
    }
}

/// Rust scalar types that back one [`ComponentType`].
pub trait Component: Pod + Copy + Default + Into<f64> {
    /// The matching component type.
    const COMPONENT_TYPE: ComponentType;
}

impl Component for i8 {
    const COMPONENT_TYPE: ComponentType = ComponentType::Int8;
}

impl Component for u8 {
    const COMPONENT_TYPE: ComponentType = ComponentType::Uint8;
}

impl Component for i16 {
    const COMPONENT_TYPE: ComponentType = ComponentType::Int16;
}

impl Component for u16 {
    const COMPONENT_TYPE: ComponentType = ComponentType::Uint16;
}

impl Component for i32 {
    const COMPONENT_TYPE: ComponentType = ComponentType::Int32;
}

impl Component for u32 {
    const COMPONENT_TYPE: ComponentType = ComponentType::Uint32;
}

impl Component for f32 {
    const COMPONENT_TYPE: ComponentType = ComponentType::Float32;
}

/// Read component `index` of a little-endian packed array as `f64`.
#[inline]
pub fn read_component(bytes: &[u8], ty: ComponentType, index: usize) -> f64 {
    let at = index * ty.num_bytes();
    match ty {
        ComponentType::Int8 => bytes[at] as i8 as f64,
        ComponentType::Uint8 => bytes[at] as f64,
        ComponentType::Int16 => i16::from_le_bytes([bytes[at], bytes[at + 1]]) as f64,
        ComponentType::Uint16 => u16::from_le_bytes([bytes[at], bytes[at + 1]]) as f64,
        ComponentType::Int32 => {
            i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]) as f64
        }
        ComponentType::Uint32 => {
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]) as f64
        }
        ComponentType::Float32 => {
            f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]) as f64
        }
    }
}
