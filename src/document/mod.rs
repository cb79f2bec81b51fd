//! Scene-description parser.
//!
//! Decodes the JSON chunk into a typed [`Document`], rejects asset versions
//! below 2.0 and reports which required extensions the host must satisfy.

mod schema;

pub use schema::*;

use tracing::{debug, warn};

use crate::util::{Error, Result};

/// Extension name for Draco-compressed primitives.
pub const KHR_DRACO_MESH_COMPRESSION: &str = "KHR_draco_mesh_compression";
/// Extension name for punctual lights.
pub const KHR_LIGHTS_PUNCTUAL: &str = "KHR_lights_punctual";
/// Extension name for material variants.
pub const KHR_MATERIALS_VARIANTS: &str = "KHR_materials_variants";

/// Extensions the loader understands when listed in `extensionsRequired`.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    KHR_DRACO_MESH_COMPRESSION,
    KHR_LIGHTS_PUNCTUAL,
    KHR_MATERIALS_VARIANTS,
    "KHR_materials_clearcoat",
    "KHR_materials_emissive_strength",
    "KHR_materials_ior",
    "KHR_materials_iridescence",
    "KHR_materials_pbrSpecularGlossiness",
    "KHR_materials_sheen",
    "KHR_materials_specular",
    "KHR_materials_transmission",
    "KHR_materials_unlit",
    "KHR_materials_volume",
    "KHR_texture_transform",
    "KHR_texture_basisu",
    "EXT_texture_webp",
    "KHR_mesh_quantization",
];

/// Lowest scene-description version accepted.
pub const MIN_VERSION: f64 = 2.0;

/// Decode UTF-8 scene-description bytes into a [`Document`].
pub fn parse_document(json: &[u8]) -> Result<Document> {
    let text = decode_utf8(json)?;
    let document: Document = serde_json::from_str(text)?;
    document.validate_version()?;

    for name in &document.extensions_required {
        if !SUPPORTED_EXTENSIONS.contains(&name.as_str()) {
            warn!(extension = %name, "required extension is not supported");
        }
    }

    debug!(
        nodes = document.nodes.len(),
        meshes = document.meshes.len(),
        accessors = document.accessors.len(),
        "parsed scene description"
    );
    Ok(document)
}

/// Decode a UTF-8 byte stream, dropping a leading byte-order mark.
pub fn decode_utf8(bytes: &[u8]) -> Result<&str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    Ok(std::str::from_utf8(bytes)?)
}

/// Leading `major.minor` number of a version string, as `parseFloat` reads it.
fn parse_version_number(version: &str) -> Option<f64> {
    let trimmed = version.trim();
    let end = trimmed
        .char_indices()
        .scan(false, |seen_dot, (i, c)| match c {
            '0'..='9' => Some(i + 1),
            '.' if !*seen_dot => {
                *seen_dot = true;
                Some(i)
            }
            _ => None,
        })
        .last()?;
    trimmed[..end].parse().ok()
}

impl Document {
    /// Fail when the declared asset version is below [`MIN_VERSION`].
    pub fn validate_version(&self) -> Result<()> {
        let Some(asset) = &self.asset else { return Ok(()) };
        if asset.version.is_empty() {
            return Ok(());
        }
        match parse_version_number(&asset.version) {
            Some(v) if v >= MIN_VERSION => Ok(()),
            _ => Err(Error::UnsupportedVersion(asset.version.clone())),
        }
    }

    /// The `asset.generator` string, if any.
    pub fn generator(&self) -> Option<&str> {
        self.asset.as_ref()?.generator.as_deref()
    }

    /// Check whether `name` appears in `extensionsRequired`.
    pub fn is_extension_required(&self, name: &str) -> bool {
        self.extensions_required.iter().any(|e| e == name)
    }

    /// Check whether any primitive carries Draco-compressed data.
    pub fn uses_draco(&self) -> bool {
        self.is_extension_required(KHR_DRACO_MESH_COMPRESSION)
            || self.extensions_used.iter().any(|e| e == KHR_DRACO_MESH_COMPRESSION)
    }

    /// Lights declared by `KHR_lights_punctual`.
    pub fn lights(&self) -> Vec<LightSchema> {
        self.root_extension::<LightsPunctual>(KHR_LIGHTS_PUNCTUAL)
            .map(|l| l.lights)
            .unwrap_or_default()
    }

    /// Variant names declared by `KHR_materials_variants`, by index.
    pub fn variant_names(&self) -> Vec<String> {
        self.root_extension::<MaterialsVariants>(KHR_MATERIALS_VARIANTS)
            .map(|v| v.variants.into_iter().map(|v| v.name).collect())
            .unwrap_or_default()
    }

    fn root_extension<T: serde::de::DeserializeOwned>(&self, name: &str) -> Option<T> {
        let value = self.extensions.as_ref()?.get(name)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(extension = name, error = %e, "ignoring malformed extension block");
                None
            }
        }
    }
}
