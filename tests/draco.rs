//! Draco-compressed primitives through an injected decoder.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{glb, BinBuilder};
use futures_util::FutureExt;
use gltf_ingest::device::HeadlessDevice;
use gltf_ingest::draco::{
    DracoAttributeInfo, DracoCapability, DracoDataType, DracoDecoderModule, DracoGeometry, DracoGeometryType,
    DracoStatus,
};
use gltf_ingest::pipeline::{GltfParser, ParseOptions};
use gltf_ingest::util::ComponentType;
use gltf_ingest::vertex::{IndexFormat, Semantic};

/// Decoder returning one triangle for any input.
struct TriangleDecoder;

struct Triangle;

impl DracoGeometry for Triangle {
    fn num_points(&self) -> usize {
        3
    }

    fn num_faces(&self) -> usize {
        1
    }

    fn triangles_u16(&self) -> Vec<u16> {
        vec![0, 1, 2]
    }

    fn triangles_u32(&self) -> Vec<u32> {
        vec![0, 1, 2]
    }

    fn attribute(&self, unique_id: u32) -> Option<DracoAttributeInfo> {
        (unique_id == 0).then_some(DracoAttributeInfo {
            num_components: 3,
            data_type: DracoDataType::Float32,
            normalized: false,
        })
    }

    fn attribute_values(&self, unique_id: u32, storage: ComponentType) -> Option<Vec<u8>> {
        if unique_id != 0 || storage != ComponentType::Float32 {
            return None;
        }
        let positions = [0.0f32, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0, 0.0];
        Some(positions.iter().flat_map(|v| v.to_le_bytes()).collect())
    }
}

impl DracoDecoderModule for TriangleDecoder {
    fn geometry_type(&self, _data: &[u8]) -> DracoGeometryType {
        DracoGeometryType::TriangularMesh
    }

    fn decode_point_cloud(&self, _data: &[u8]) -> Result<Box<dyn DracoGeometry>, DracoStatus> {
        Err(DracoStatus { message: "not a point cloud".to_string() })
    }

    fn decode_mesh(&self, _data: &[u8]) -> Result<Box<dyn DracoGeometry>, DracoStatus> {
        Ok(Box::new(Triangle))
    }
}

fn compressed_document() -> (serde_json::Value, Vec<u8>) {
    let mut bin = BinBuilder::default();
    let (off, len) = bin.push(b"DRACO-payload");

    let json = serde_json::json!({
        "asset": { "version": "2.0" },
        "extensionsUsed": ["KHR_draco_mesh_compression"],
        "extensionsRequired": ["KHR_draco_mesh_compression"],
        "meshes": [{
            "primitives": [{
                "attributes": { "POSITION": 0 },
                "extensions": {
                    "KHR_draco_mesh_compression": { "bufferView": 0, "attributes": { "POSITION": 0 } }
                }
            }]
        }],
        "accessors": [{ "componentType": 5126, "count": 3, "type": "VEC3" }],
        "bufferViews": [{ "buffer": 0, "byteOffset": off, "byteLength": len }],
        "buffers": [{ "byteLength": bin.data.len() }]
    });
    (json, bin.data)
}

#[tokio::test]
async fn test_decoder_module_is_used() {
    let (json, bin) = compressed_document();
    let draco = Arc::new(DracoCapability::with_module(Arc::new(TriangleDecoder)));
    let parser = GltfParser::new(Arc::new(HeadlessDevice::new()))
        .with_options(ParseOptions::new().with_draco(draco));

    let container = parser.parse("draco.glb", &glb(&json, Some(&bin))).await.unwrap();
    let mesh = &container.renders[0].meshes[0];
    assert_eq!(mesh.vertex_buffer.num_vertices, 3);
    assert_eq!(
        mesh.vertex_buffer.read_f32(Semantic::Position).unwrap(),
        vec![0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0, 0.0]
    );
    assert!(mesh.vertex_buffer.format.element(Semantic::Normal).is_some());

    let ib = mesh.index_buffer.as_ref().unwrap();
    assert_eq!(ib.format, IndexFormat::U16);
    assert_eq!((ib.get(0), ib.get(1), ib.get(2)), (0, 1, 2));
    assert!(mesh.morph.is_none());
}

#[tokio::test]
async fn test_loader_runs_once() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let draco = Arc::new(DracoCapability::with_loader(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, gltf_ingest::Error>(Arc::new(TriangleDecoder) as Arc<dyn DracoDecoderModule>) }.boxed()
    })));

    let (json, bin) = compressed_document();
    let data = glb(&json, Some(&bin));
    let parser = GltfParser::new(Arc::new(HeadlessDevice::new()))
        .with_options(ParseOptions::new().with_draco(draco.clone()));

    for _ in 0..2 {
        let container = parser.parse("draco.glb", &data).await.unwrap();
        assert_eq!(container.renders[0].meshes[0].count, 3);
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(draco.get().is_some());
}

#[tokio::test]
async fn test_missing_decoder_falls_back_to_accessors() {
    let (json, bin) = compressed_document();
    let parser = GltfParser::new(Arc::new(HeadlessDevice::new()));

    let container = parser.parse("draco.glb", &glb(&json, Some(&bin))).await.unwrap();
    let mesh = &container.renders[0].meshes[0];
    // The placeholder accessor has no buffer view and decodes as zeros.
    assert_eq!(mesh.vertex_buffer.read_f32(Semantic::Position).unwrap(), vec![0.0; 9]);
    assert!(!mesh.indexed);
}
