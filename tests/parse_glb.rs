//! End-to-end parsing of binary containers.

mod common;

use std::sync::Arc;

use common::{glb, triangle_document, wide_index_document, BinBuilder, TRIANGLE_POSITIONS};
use gltf_ingest::accessor::{decode_accessor_f32, BufferViewData};
use gltf_ingest::device::HeadlessDevice;
use gltf_ingest::document::parse_document;
use gltf_ingest::pipeline::{FlipVPolicy, GltfParser, ParseOptions};
use gltf_ingest::resources::{Renderable, SceneRoot};
use gltf_ingest::vertex::{IndexFormat, PrimitiveTopology, Semantic};
use gltf_ingest::Error;

fn parser() -> (Arc<HeadlessDevice>, GltfParser) {
    let device = Arc::new(HeadlessDevice::new());
    (device.clone(), GltfParser::new(device))
}

#[tokio::test]
async fn test_minimal_triangle() {
    let (json, bin) = triangle_document();
    let data = glb(&json, Some(&bin));
    let (_, parser) = parser();

    let container = parser.parse("triangle.glb", &data).await.unwrap();

    assert_eq!(container.nodes.len(), 1);
    assert_eq!(container.nodes[0].name, "Triangle");
    assert_eq!(container.scenes, vec![SceneRoot::Node(0)]);
    assert_eq!(container.default_scene, Some(0));

    let render = &container.renders[0];
    assert_eq!(render.name.as_deref(), Some("tri"));
    assert_eq!(render.meshes.len(), 1);

    let mesh = &render.meshes[0];
    assert_eq!(mesh.topology, PrimitiveTopology::Triangles);
    assert!(mesh.indexed);
    assert_eq!(mesh.count, 3);
    assert_eq!(mesh.material, Some(0));
    assert_eq!(mesh.vertex_buffer.num_vertices, 3);

    let positions = mesh.vertex_buffer.read_f32(Semantic::Position).unwrap();
    assert_eq!(positions, TRIANGLE_POSITIONS);

    // Normals are synthesized when the primitive has none.
    let normals = mesh.vertex_buffer.read_f32(Semantic::Normal).unwrap();
    for n in normals.chunks_exact(3) {
        assert!((n[2] - 1.0).abs() < 1e-5, "normal {n:?}");
    }

    let aabb = render.aabb();
    assert_eq!(aabb.max.x, 1.0);
    assert_eq!(aabb.max.y, 1.0);

    let material = &container.materials[0];
    assert_eq!(material.name, "red");
    assert_eq!(material.diffuse.r, 1.0);
    assert_eq!(material.diffuse.g, 0.0);
}

#[tokio::test]
async fn test_empty_scene() {
    let json = serde_json::json!({ "asset": { "version": "2.0" }, "scenes": [], "nodes": [] });
    let (_, parser) = parser();
    let container = parser.parse("empty.glb", &glb(&json, None)).await.unwrap();
    assert!(container.nodes.is_empty());
    assert!(container.scenes.is_empty());
    assert!(container.renders.is_empty());
    assert_eq!(container.default_scene, None);
}

#[tokio::test]
async fn test_truncated_chunk() {
    let (json, bin) = triangle_document();
    let mut data = glb(&json, Some(&bin));

    // Claim a BIN chunk longer than the data that follows.
    let bin_header = data.len() - bin.len() - 8;
    data[bin_header..bin_header + 4].copy_from_slice(&(bin.len() as u32 + 64).to_le_bytes());

    let (_, parser) = parser();
    let err = parser.parse("triangle.glb", &data).await.unwrap_err();
    assert!(matches!(err, Error::ChunkLength { index: 1, .. }), "{err}");
}

#[test]
fn test_huge_accessor_count_fails_cleanly() {
    let (_, parser) = parser();

    // Backed by a real view: the primitive is rejected and skipped.
    let (mut json, bin) = triangle_document();
    json["accessors"][0]["count"] = (1u64 << 62).into();
    let container = parser.parse_sync("huge.glb", &glb(&json, Some(&bin))).unwrap();
    assert!(container.renders[0].meshes.is_empty());

    // No view at all: zero-filling that many elements is refused.
    let (mut json, bin) = triangle_document();
    json["accessors"][0]["count"] = (1u64 << 40).into();
    json["accessors"][0].as_object_mut().unwrap().remove("bufferView");
    let container = parser.parse_sync("huge.glb", &glb(&json, Some(&bin))).unwrap();
    assert!(container.renders[0].meshes.is_empty());
}

#[tokio::test]
async fn test_unsupported_version() {
    let json = serde_json::json!({ "asset": { "version": "1.0" } });
    let (_, parser) = parser();
    let err = parser.parse("old.glb", &glb(&json, None)).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedVersion(_)));
}

#[test]
fn test_sparse_overrides() {
    let mut bin = BinBuilder::default();
    let (base_off, base_len) = bin.push_f32(&[1.0, 1.0, 1.0, 1.0]);
    let (idx_off, idx_len) = bin.push(&[0, 2]);
    let (val_off, val_len) = bin.push_f32(&[9.0, 9.0]);

    let json = serde_json::json!({
        "asset": { "version": "2.0" },
        "accessors": [{
            "bufferView": 0, "componentType": 5126, "count": 4, "type": "SCALAR",
            "sparse": {
                "count": 2,
                "indices": { "bufferView": 1, "componentType": 5121 },
                "values": { "bufferView": 2 }
            }
        }, {
            "componentType": 5126, "count": 3, "type": "SCALAR",
            "sparse": {
                "count": 2,
                "indices": { "bufferView": 1, "componentType": 5121 },
                "values": { "bufferView": 2 }
            }
        }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": base_off, "byteLength": base_len },
            { "buffer": 0, "byteOffset": idx_off, "byteLength": idx_len },
            { "buffer": 0, "byteOffset": val_off, "byteLength": val_len }
        ],
        "buffers": [{ "byteLength": bin.data.len() }]
    });
    let document = parse_document(&serde_json::to_vec(&json).unwrap()).unwrap();
    let buffer: Arc<[u8]> = Arc::from(bin.data);
    let views: Vec<_> = document
        .buffer_views
        .iter()
        .map(|v| BufferViewData::new(buffer.clone(), v).unwrap())
        .collect();

    let values = decode_accessor_f32(&document.accessors[0], &views).unwrap();
    assert_eq!(values, vec![9.0, 1.0, 9.0, 1.0]);

    // Without base data the untouched elements read as zero.
    let values = decode_accessor_f32(&document.accessors[1], &views).unwrap();
    assert_eq!(values, vec![9.0, 0.0, 9.0]);
}

#[tokio::test]
async fn test_u32_indices_follow_device_support() {
    let (json, bin) = wide_index_document(70_000);
    let data = glb(&json, Some(&bin));

    let parser = GltfParser::new(Arc::new(HeadlessDevice::new()));
    let container = parser.parse("wide.glb", &data).await.unwrap();
    let ib = container.renders[0].meshes[0].index_buffer.as_ref().unwrap();
    assert_eq!(ib.format, IndexFormat::U32);
    assert_eq!(ib.get(2), 69_999);

    // Without wide-index support the indices are narrowed regardless.
    let parser = GltfParser::new(Arc::new(HeadlessDevice::with_capabilities(false, true)));
    let container = parser.parse("wide.glb", &data).await.unwrap();
    let ib = container.renders[0].meshes[0].index_buffer.as_ref().unwrap();
    assert_eq!(ib.format, IndexFormat::U16);
    assert_eq!(ib.count, 3);
    assert_eq!(ib.get(1), 1);
}

fn textured_document(generator: &str) -> (serde_json::Value, Vec<u8>) {
    let mut bin = BinBuilder::default();
    let (pos_off, pos_len) = bin.push_f32(&TRIANGLE_POSITIONS);
    let (uv_off, uv_len) = bin.push_f32(&[0.0, 0.25, 1.0, 0.5, 0.0, 1.0]);

    let json = serde_json::json!({
        "asset": { "version": "2.0", "generator": generator },
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0, "TEXCOORD_0": 1 } }] }],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3" },
            { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": pos_off, "byteLength": pos_len },
            { "buffer": 0, "byteOffset": uv_off, "byteLength": uv_len }
        ],
        "buffers": [{ "byteLength": bin.data.len() }]
    });
    (json, bin.data)
}

#[tokio::test]
async fn test_uv_flip_by_generator() {
    let (json, bin) = textured_document("PlayCanvas");
    let data = glb(&json, Some(&bin));
    let (_, parser) = parser();
    let container = parser.parse("uv.glb", &data).await.unwrap();
    let uvs = container.renders[0].meshes[0].vertex_buffer.read_f32(Semantic::TexCoord0).unwrap();
    assert_eq!(uvs, vec![0.0, 0.75, 1.0, 0.5, 0.0, 0.0]);

    // Non-indexed primitive draws every vertex.
    assert!(!container.renders[0].meshes[0].indexed);
    assert_eq!(container.renders[0].meshes[0].count, 3);

    let (json, bin) = textured_document("Khronos glTF Blender I/O");
    let data = glb(&json, Some(&bin));
    let container = parser.parse("uv.glb", &data).await.unwrap();
    let uvs = container.renders[0].meshes[0].vertex_buffer.read_f32(Semantic::TexCoord0).unwrap();
    assert_eq!(uvs, vec![0.0, 0.25, 1.0, 0.5, 0.0, 1.0]);

    let parser = GltfParser::new(Arc::new(HeadlessDevice::new()))
        .with_options(ParseOptions::new().with_flip_v(FlipVPolicy::Always));
    let container = parser.parse("uv.glb", &data).await.unwrap();
    let uvs = container.renders[0].meshes[0].vertex_buffer.read_f32(Semantic::TexCoord0).unwrap();
    assert_eq!(uvs, vec![0.0, 0.75, 1.0, 0.5, 0.0, 0.0]);
}

#[tokio::test]
async fn test_destroy_releases_allocations() {
    let (mut json, mut bin) = triangle_document();
    let png = common::tiny_png();
    let mut extra = BinBuilder { data: std::mem::take(&mut bin) };
    let (png_off, png_len) = extra.push(&png);
    json["bufferViews"].as_array_mut().unwrap().push(serde_json::json!({
        "buffer": 0, "byteOffset": png_off, "byteLength": png_len
    }));
    json["buffers"][0]["byteLength"] = extra.data.len().into();
    json["images"] = serde_json::json!([{ "bufferView": 2, "mimeType": "image/png" }]);
    json["textures"] = serde_json::json!([{ "source": 0 }, { "source": 0 }]);
    json["materials"][0]["pbrMetallicRoughness"]["baseColorTexture"] = serde_json::json!({ "index": 1 });

    let data = glb(&json, Some(&extra.data));
    let (device, parser) = parser();
    let mut container = parser.parse("textured.glb", &data).await.unwrap();

    let textures: Vec<_> = container.textures.iter().flatten().collect();
    assert_eq!(textures.len(), 2);
    assert!(Arc::ptr_eq(&textures[0].image, &textures[1].image));
    assert_ne!(textures[0].handle, textures[1].handle);
    assert_eq!((textures[0].image.width, textures[0].image.height), (2, 2));
    assert_eq!(container.materials[0].diffuse_map.as_ref().map(|s| s.texture), Some(1));

    // Vertex buffer, index buffer and two textures.
    assert_eq!(device.live_allocations(), 4);
    container.destroy();
    assert_eq!(device.live_allocations(), 0);
    assert!(container.renders[0].meshes.is_empty());

    container.destroy();
    assert_eq!(device.live_allocations(), 0);
}
