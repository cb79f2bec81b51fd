//! Textures, samplers and decoded images.

use std::sync::Arc;

use tracing::debug;

use crate::device::{GpuHandle, GraphicsDevice, TextureUpload};
use crate::document::{SamplerSchema, TextureSchema};
use crate::util::Result;

// ============================================================================
// Samplers
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl FilterMode {
    fn from_gl(value: u32) -> Option<Self> {
        Some(match value {
            9728 => Self::Nearest,
            9729 => Self::Linear,
            9984 => Self::NearestMipmapNearest,
            9985 => Self::LinearMipmapNearest,
            9986 => Self::NearestMipmapLinear,
            9987 => Self::LinearMipmapLinear,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressMode {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

impl AddressMode {
    fn from_gl(value: u32) -> Option<Self> {
        Some(match value {
            10497 => Self::Repeat,
            33071 => Self::ClampToEdge,
            33648 => Self::MirroredRepeat,
            _ => return None,
        })
    }
}

/// Filtering and addressing state of a texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sampler {
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            min_filter: FilterMode::LinearMipmapLinear,
            mag_filter: FilterMode::Linear,
            address_u: AddressMode::Repeat,
            address_v: AddressMode::Repeat,
        }
    }
}

impl Sampler {
    /// Map a sampler definition; unknown or absent values keep the defaults.
    pub fn from_schema(schema: Option<&SamplerSchema>) -> Self {
        let mut sampler = Self::default();
        let Some(schema) = schema else { return sampler };

        if let Some(f) = schema.min_filter.and_then(FilterMode::from_gl) {
            sampler.min_filter = f;
        }
        if let Some(f) = schema.mag_filter.and_then(FilterMode::from_gl) {
            sampler.mag_filter = f;
        }
        if let Some(a) = schema.wrap_s.and_then(AddressMode::from_gl) {
            sampler.address_u = a;
        }
        if let Some(a) = schema.wrap_t.and_then(AddressMode::from_gl) {
            sampler.address_v = a;
        }
        sampler
    }
}

// ============================================================================
// Images
// ============================================================================

/// Pixel payload of an image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImagePixels {
    /// Decoded 8-bit RGBA.
    Rgba8(Vec<u8>),
    /// Still in its container encoding (KTX2, Basis, DDS, WebP, ...).
    Encoded(Vec<u8>),
}

/// CPU-side image shared by every texture sampling it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub width: u32,
    pub height: u32,
    pub pixels: ImagePixels,
}

impl ImageData {
    /// Decode `bytes`; PNG and JPEG become RGBA8, other formats stay encoded.
    ///
    /// The format comes from `mime_type` when given, else from the data.
    pub fn decode(bytes: Vec<u8>, mime_type: Option<&str>, name: Option<String>) -> Result<Self> {
        let format = match mime_type {
            Some("image/png") => Some(image::ImageFormat::Png),
            Some("image/jpeg") | Some("image/jpg") => Some(image::ImageFormat::Jpeg),
            Some(_) => None,
            None => image::guess_format(&bytes)
                .ok()
                .filter(|f| matches!(f, image::ImageFormat::Png | image::ImageFormat::Jpeg)),
        };

        let Some(format) = format else {
            debug!(mime_type, bytes = bytes.len(), "keeping encoded image payload");
            return Ok(Self {
                name,
                mime_type: mime_type.map(str::to_string),
                width: 0,
                height: 0,
                pixels: ImagePixels::Encoded(bytes),
            });
        };

        let rgba = image::load_from_memory_with_format(&bytes, format)?.into_rgba8();
        Ok(Self {
            name,
            mime_type: Some(format.to_mime_type().to_string()),
            width: rgba.width(),
            height: rgba.height(),
            pixels: ImagePixels::Rgba8(rgba.into_raw()),
        })
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self.pixels, ImagePixels::Encoded(_))
    }

    pub fn bytes(&self) -> &[u8] {
        match &self.pixels {
            ImagePixels::Rgba8(b) | ImagePixels::Encoded(b) => b,
        }
    }
}

// ============================================================================
// Textures
// ============================================================================

/// A texture: a shared image plus its own sampler and device handle.
#[derive(Clone, Debug)]
pub struct Texture {
    pub name: Option<String>,
    /// Index of the document image the pixels came from.
    pub source: Option<usize>,
    pub image: Arc<ImageData>,
    pub sampler: Sampler,
    pub handle: GpuHandle,
}

/// Image a texture samples from.
///
/// `EXT_texture_webp` and `KHR_texture_basisu` sources take priority over
/// the core `source`.
pub fn texture_image_source(schema: &TextureSchema) -> Option<usize> {
    let from_extension = |name: &str| {
        schema
            .extensions
            .as_ref()?
            .get(name)?
            .get("source")?
            .as_u64()
            .map(|v| v as usize)
    };
    from_extension("EXT_texture_webp")
        .or_else(|| from_extension("KHR_texture_basisu"))
        .or(schema.source)
}

/// Default texture construction: upload `image` under a fresh handle.
pub fn create_texture(
    device: &dyn GraphicsDevice,
    schema: &TextureSchema,
    image: Arc<ImageData>,
    samplers: &[SamplerSchema],
) -> Texture {
    let sampler = Sampler::from_schema(schema.sampler.and_then(|i| samplers.get(i)));
    let handle = device.create_texture(TextureUpload {
        width: image.width,
        height: image.height,
        data: image.bytes(),
        compressed: image.is_compressed(),
    });
    Texture {
        name: schema.name.clone().or_else(|| image.name.clone()),
        source: texture_image_source(schema),
        image,
        sampler,
        handle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 1, image::Rgba([10, 20, 30, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_sampler_mapping() {
        assert_eq!(Sampler::from_schema(None), Sampler::default());

        let schema = SamplerSchema {
            min_filter: Some(9728),
            mag_filter: Some(1234),
            wrap_s: Some(33071),
            wrap_t: Some(33648),
            ..Default::default()
        };
        let sampler = Sampler::from_schema(Some(&schema));
        assert_eq!(sampler.min_filter, FilterMode::Nearest);
        assert_eq!(sampler.mag_filter, FilterMode::Linear);
        assert_eq!(sampler.address_u, AddressMode::ClampToEdge);
        assert_eq!(sampler.address_v, AddressMode::MirroredRepeat);
    }

    #[test]
    fn test_decode_png() {
        let image = ImageData::decode(tiny_png(), None, None).unwrap();
        assert_eq!((image.width, image.height), (2, 1));
        assert_eq!(image.bytes(), &[10, 20, 30, 255, 10, 20, 30, 255]);
        assert_eq!(image.mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_keep_encoded() {
        let image = ImageData::decode(vec![0xAB; 8], Some("image/ktx2"), None).unwrap();
        assert!(image.is_compressed());
        assert_eq!(image.bytes().len(), 8);

        assert!(ImageData::decode(vec![0; 8], Some("image/png"), None).is_err());
    }

    #[test]
    fn test_source_override() {
        let schema: TextureSchema = serde_json::from_str(
            r#"{"source": 0, "extensions": {"KHR_texture_basisu": {"source": 2}}}"#,
        )
        .unwrap();
        assert_eq!(texture_image_source(&schema), Some(2));

        let schema: TextureSchema = serde_json::from_str(r#"{"source": 1}"#).unwrap();
        assert_eq!(texture_image_source(&schema), Some(1));
    }

    #[test]
    fn test_shared_image_independent_handles() {
        let device = HeadlessDevice::new();
        let image = Arc::new(ImageData::decode(tiny_png(), Some("image/png"), None).unwrap());
        let schema = TextureSchema { source: Some(0), ..Default::default() };

        let a = create_texture(&device, &schema, image.clone(), &[]);
        let b = create_texture(&device, &schema, image.clone(), &[]);
        assert!(Arc::ptr_eq(&a.image, &b.image));
        assert_ne!(a.handle, b.handle);
    }
}
