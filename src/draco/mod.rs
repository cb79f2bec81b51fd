//! Draco decompression bridge.
//!
//! The decoder itself is an external module reached through
//! [`DracoDecoderModule`]. Decoded attributes are repackaged as
//! [`SourceDesc`]s so compressed primitives share the regular vertex
//! assembly path.
//!
//! The module is handed to a parse as a [`DracoCapability`]: acquired at
//! most once, then shared by reference.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::util::{ComponentType, Error, Result};
use crate::vertex::{encode_indices, IndexFormat, Semantic, SourceDesc, SourceDescs};

/// Geometry kind stored in a compressed stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DracoGeometryType {
    PointCloud,
    TriangularMesh,
    Invalid,
}

/// Attribute value type as reported by the decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DracoDataType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Other,
}

impl DracoDataType {
    /// Component type the values are extracted as.
    ///
    /// 8- and 16-bit unsigned data keeps its width; everything else is
    /// read back as 32-bit floats.
    pub fn storage(self) -> ComponentType {
        match self {
            Self::Uint8 => ComponentType::Uint8,
            Self::Uint16 => ComponentType::Uint16,
            _ => ComponentType::Float32,
        }
    }
}

/// Per-attribute metadata of a decoded geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DracoAttributeInfo {
    pub num_components: usize,
    pub data_type: DracoDataType,
    pub normalized: bool,
}

/// Non-OK status returned by the decoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DracoStatus {
    pub message: String,
}

impl fmt::Display for DracoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Decoded geometry owned by the decoder module.
///
/// Native buffers are released when the value is dropped.
pub trait DracoGeometry: Send {
    fn num_points(&self) -> usize;

    fn num_faces(&self) -> usize;

    /// Triangle corner indices as 16-bit values.
    fn triangles_u16(&self) -> Vec<u16>;

    /// Triangle corner indices as 32-bit values.
    fn triangles_u32(&self) -> Vec<u32>;

    /// Metadata of the attribute with `unique_id`.
    fn attribute(&self, unique_id: u32) -> Option<DracoAttributeInfo>;

    /// Values of attribute `unique_id` for every point, converted to
    /// `storage` and encoded little-endian.
    fn attribute_values(&self, unique_id: u32, storage: ComponentType) -> Option<Vec<u8>>;
}

/// An initialised Draco decoder.
pub trait DracoDecoderModule: Send + Sync {
    /// Inspect the stream header.
    fn geometry_type(&self, data: &[u8]) -> DracoGeometryType;

    fn decode_point_cloud(&self, data: &[u8]) -> std::result::Result<Box<dyn DracoGeometry>, DracoStatus>;

    fn decode_mesh(&self, data: &[u8]) -> std::result::Result<Box<dyn DracoGeometry>, DracoStatus>;
}

/// Asynchronous factory for a decoder module.
pub type DracoLoader =
    Box<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn DracoDecoderModule>>> + Send + Sync>;

/// Injected handle to the Draco decoder.
///
/// Either holds a ready module, knows how to load one on first use, or
/// reports Draco as unavailable.
#[derive(Default)]
pub struct DracoCapability {
    module: OnceCell<Arc<dyn DracoDecoderModule>>,
    loader: Option<DracoLoader>,
}

impl DracoCapability {
    /// No decoder; compressed primitives fall back to their plain accessors.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Wrap an already initialised module.
    pub fn with_module(module: Arc<dyn DracoDecoderModule>) -> Self {
        Self { module: OnceCell::new_with(Some(module)), loader: None }
    }

    /// Load the module lazily with `loader` the first time it is needed.
    pub fn with_loader(loader: DracoLoader) -> Self {
        Self { module: OnceCell::new(), loader: Some(loader) }
    }

    /// The module, if it has been acquired.
    pub fn get(&self) -> Option<Arc<dyn DracoDecoderModule>> {
        self.module.get().cloned()
    }

    /// True if a module is loaded or can be loaded.
    pub fn is_available(&self) -> bool {
        self.module.initialized() || self.loader.is_some()
    }

    /// Return the module, running the loader once if necessary.
    ///
    /// Concurrent callers wait on the same load.
    pub async fn acquire(&self) -> Result<Arc<dyn DracoDecoderModule>> {
        if let Some(module) = self.module.get() {
            return Ok(module.clone());
        }
        let Some(loader) = &self.loader else {
            return Err(Error::DracoUnavailable);
        };
        debug!("loading draco decoder module");
        self.module.get_or_try_init(|| loader()).await.cloned()
    }
}

impl fmt::Debug for DracoCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DracoCapability")
            .field("loaded", &self.module.initialized())
            .field("has_loader", &self.loader.is_some())
            .finish()
    }
}

/// Attribute streams and indices of one decompressed primitive.
#[derive(Clone, Debug)]
pub struct DracoPrimitive {
    pub num_vertices: usize,
    pub sources: SourceDescs,
    /// Triangle indices, absent for point clouds.
    pub indices: Option<DracoIndices>,
}

/// Encoded triangle indices.
#[derive(Clone, Debug)]
pub struct DracoIndices {
    pub format: IndexFormat,
    pub count: usize,
    pub data: Vec<u8>,
}

impl DracoIndices {
    /// Indices widened to 32 bits.
    pub fn to_u32(&self) -> Vec<u32> {
        match self.format {
            IndexFormat::U8 => self.data.iter().map(|&i| i as u32).collect(),
            IndexFormat::U16 => bytemuck::pod_collect_to_vec::<u8, u16>(&self.data)
                .into_iter()
                .map(u32::from)
                .collect(),
            IndexFormat::U32 => bytemuck::pod_collect_to_vec(&self.data),
        }
    }
}

/// Decode compressed primitive `data`, extracting every attribute in
/// `attributes` (glTF semantic → Draco unique id).
///
/// Semantics the vertex layout does not know are ignored.
pub fn decode_draco_primitive(
    module: &dyn DracoDecoderModule,
    data: &[u8],
    attributes: &HashMap<String, u32>,
) -> Result<DracoPrimitive> {
    let geometry = match module.geometry_type(data) {
        DracoGeometryType::PointCloud => module.decode_point_cloud(data),
        DracoGeometryType::TriangularMesh => module.decode_mesh(data),
        DracoGeometryType::Invalid => {
            return Err(Error::Draco("invalid geometry type".to_string()));
        }
    }
    .map_err(|status| Error::Draco(status.message))?;

    let num_points = geometry.num_points();

    let indices = if geometry.num_faces() > 0 {
        let (format, data) = if num_points > 0xFFFF {
            (IndexFormat::U32, encode_indices(&geometry.triangles_u32(), IndexFormat::U32))
        } else {
            (IndexFormat::U16, bytemuck::cast_slice(&geometry.triangles_u16()).to_vec())
        };
        Some(DracoIndices { format, count: geometry.num_faces() * 3, data })
    } else {
        None
    };

    let mut sources = SourceDescs::new();
    for (name, &unique_id) in attributes {
        let Some(semantic) = Semantic::from_gltf(name) else {
            warn!(attribute = %name, "ignoring unsupported draco attribute");
            continue;
        };
        let info = geometry
            .attribute(unique_id)
            .ok_or_else(|| Error::Draco(format!("missing attribute {name} (id {unique_id})")))?;

        let storage = info.data_type.storage();
        let values = geometry
            .attribute_values(unique_id, storage)
            .ok_or_else(|| Error::Draco(format!("failed to read attribute {name}")))?;

        let expected = num_points * info.num_components * storage.num_bytes();
        if values.len() != expected {
            return Err(Error::Draco(format!(
                "attribute {name} has {} bytes, expected {expected}",
                values.len()
            )));
        }

        let normalize = match (semantic, storage) {
            (Semantic::Color, ComponentType::Uint8 | ComponentType::Uint16) => true,
            _ => info.normalized,
        };
        sources.insert(semantic, SourceDesc::packed(values, info.num_components, storage, normalize));
    }

    debug!(num_points, attributes = sources.len(), "decoded draco primitive");
    Ok(DracoPrimitive { num_vertices: num_points, sources, indices })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Decoder double producing a fixed geometry.
    pub(crate) struct MockDraco {
        pub geometry_type: DracoGeometryType,
        pub num_points: usize,
        pub fail: Option<&'static str>,
    }

    struct MockGeometry {
        num_points: usize,
        faces: bool,
    }

    impl DracoGeometry for MockGeometry {
        fn num_points(&self) -> usize {
            self.num_points
        }

        fn num_faces(&self) -> usize {
            if self.faces { self.num_points / 3 } else { 0 }
        }

        fn triangles_u16(&self) -> Vec<u16> {
            (0..(self.num_faces() * 3) as u16).collect()
        }

        fn triangles_u32(&self) -> Vec<u32> {
            (0..(self.num_faces() * 3) as u32).collect()
        }

        fn attribute(&self, unique_id: u32) -> Option<DracoAttributeInfo> {
            match unique_id {
                0 => Some(DracoAttributeInfo { num_components: 3, data_type: DracoDataType::Float32, normalized: false }),
                1 => Some(DracoAttributeInfo { num_components: 4, data_type: DracoDataType::Uint8, normalized: false }),
                2 => Some(DracoAttributeInfo { num_components: 2, data_type: DracoDataType::Int16, normalized: true }),
                _ => None,
            }
        }

        fn attribute_values(&self, unique_id: u32, storage: ComponentType) -> Option<Vec<u8>> {
            let info = self.attribute(unique_id)?;
            let n = self.num_points * info.num_components;
            Some(match storage {
                ComponentType::Uint8 => (0..n).map(|i| i as u8).collect(),
                _ => (0..n).flat_map(|i| (i as f32).to_le_bytes()).collect(),
            })
        }
    }

    impl DracoDecoderModule for MockDraco {
        fn geometry_type(&self, _data: &[u8]) -> DracoGeometryType {
            self.geometry_type
        }

        fn decode_point_cloud(&self, _data: &[u8]) -> std::result::Result<Box<dyn DracoGeometry>, DracoStatus> {
            Ok(Box::new(MockGeometry { num_points: self.num_points, faces: false }))
        }

        fn decode_mesh(&self, _data: &[u8]) -> std::result::Result<Box<dyn DracoGeometry>, DracoStatus> {
            if let Some(message) = self.fail {
                return Err(DracoStatus { message: message.to_string() });
            }
            Ok(Box::new(MockGeometry { num_points: self.num_points, faces: true }))
        }
    }

    pub(crate) fn mesh_module(num_points: usize) -> MockDraco {
        MockDraco { geometry_type: DracoGeometryType::TriangularMesh, num_points, fail: None }
    }

    fn attributes(pairs: &[(&str, u32)]) -> HashMap<String, u32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_decode_mesh() {
        let module = mesh_module(6);
        let prim = decode_draco_primitive(
            &module,
            b"draco",
            &attributes(&[("POSITION", 0), ("COLOR_0", 1), ("TEXCOORD_0", 2), ("_ID", 7)]),
        )
        .unwrap();

        assert_eq!(prim.num_vertices, 6);
        let indices = prim.indices.unwrap();
        assert_eq!(indices.format, IndexFormat::U16);
        assert_eq!(indices.to_u32(), vec![0, 1, 2, 3, 4, 5]);

        let pos = &prim.sources[&Semantic::Position];
        assert_eq!((pos.count, pos.components, pos.component_type), (6, 3, ComponentType::Float32));

        let color = &prim.sources[&Semantic::Color];
        assert_eq!(color.component_type, ComponentType::Uint8);
        assert!(color.normalize);

        // Int16 data is read back as floats and keeps the decoder's flag.
        let uv = &prim.sources[&Semantic::TexCoord0];
        assert_eq!(uv.component_type, ComponentType::Float32);
        assert!(uv.normalize);
        assert_eq!(prim.sources.len(), 3);
    }

    #[test]
    fn test_wide_indices() {
        let prim = decode_draco_primitive(&mesh_module(70_002), b"", &attributes(&[("POSITION", 0)])).unwrap();
        let indices = prim.indices.unwrap();
        assert_eq!(indices.format, IndexFormat::U32);
        assert_eq!(indices.count, 70_002);
        assert_eq!(indices.data.len(), 70_002 * 4);
    }

    #[test]
    fn test_point_cloud() {
        let module = MockDraco { geometry_type: DracoGeometryType::PointCloud, num_points: 4, fail: None };
        let prim = decode_draco_primitive(&module, b"", &attributes(&[("POSITION", 0)])).unwrap();
        assert!(prim.indices.is_none());
        assert_eq!(prim.sources[&Semantic::Position].count, 4);
    }

    #[test]
    fn test_failures() {
        let module = MockDraco { geometry_type: DracoGeometryType::Invalid, num_points: 3, fail: None };
        assert!(matches!(
            decode_draco_primitive(&module, b"", &HashMap::new()),
            Err(Error::Draco(_))
        ));

        let module = MockDraco { fail: Some("Corrupt input"), ..mesh_module(3) };
        let err = decode_draco_primitive(&module, b"", &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("Corrupt input"));

        let err = decode_draco_primitive(&mesh_module(3), b"", &attributes(&[("NORMAL", 9)])).unwrap_err();
        assert!(matches!(err, Error::Draco(_)));
    }

    #[tokio::test]
    async fn test_capability_lifecycle() {
        use futures_util::FutureExt;

        assert!(matches!(
            DracoCapability::unavailable().acquire().await,
            Err(Error::DracoUnavailable)
        ));

        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        let capability = DracoCapability::with_loader(Box::new(move || {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async { Ok::<_, Error>(Arc::new(mesh_module(3)) as Arc<dyn DracoDecoderModule>) }.boxed()
        }));
        assert!(capability.is_available());
        assert!(capability.get().is_none());

        capability.acquire().await.unwrap();
        capability.acquire().await.unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(capability.get().is_some());
    }
}
