//! Helpers shared by the integration tests.

#![allow(dead_code)]

use serde_json::Value;

pub const CHUNK_JSON: u32 = 0x4E4F534A;
pub const CHUNK_BIN: u32 = 0x004E4942;

/// Binary buffer under construction; every push is 4-byte aligned.
#[derive(Default)]
pub struct BinBuilder {
    pub data: Vec<u8>,
}

impl BinBuilder {
    /// Append `bytes`, returning their `(offset, length)`.
    pub fn push(&mut self, bytes: &[u8]) -> (usize, usize) {
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
        (offset, bytes.len())
    }

    pub fn push_f32(&mut self, values: &[f32]) -> (usize, usize) {
        self.push(bytemuck::cast_slice(values))
    }

    pub fn push_u16(&mut self, values: &[u16]) -> (usize, usize) {
        self.push(bytemuck::cast_slice(values))
    }

    pub fn push_u32(&mut self, values: &[u32]) -> (usize, usize) {
        self.push(bytemuck::cast_slice(values))
    }
}

/// Pack a JSON document and optional binary chunk into a GLB stream.
pub fn glb(json: &Value, bin: Option<&[u8]>) -> Vec<u8> {
    let mut json = serde_json::to_vec(json).unwrap();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut chunks: Vec<(u32, Vec<u8>)> = vec![(CHUNK_JSON, json)];
    if let Some(bin) = bin {
        let mut bin = bin.to_vec();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }
        chunks.push((CHUNK_BIN, bin));
    }

    let total = 12 + chunks.iter().map(|(_, d)| 8 + d.len()).sum::<usize>();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    for (kind, data) in &chunks {
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(data);
    }
    out
}

pub const TRIANGLE_POSITIONS: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];

/// One indexed triangle in a GLB, referencing buffer 0 as the BIN chunk.
pub fn triangle_document() -> (Value, Vec<u8>) {
    let mut bin = BinBuilder::default();
    let (pos_off, pos_len) = bin.push_f32(&TRIANGLE_POSITIONS);
    let (idx_off, idx_len) = bin.push_u16(&[0, 1, 2]);

    let json = serde_json::json!({
        "asset": { "version": "2.0", "generator": "integration test" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "Triangle", "mesh": 0 }],
        "meshes": [{
            "name": "tri",
            "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }]
        }],
        "materials": [{ "name": "red", "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.0, 0.0, 1.0] } }],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": pos_off, "byteLength": pos_len },
            { "buffer": 0, "byteOffset": idx_off, "byteLength": idx_len }
        ],
        "buffers": [{ "byteLength": bin.data.len() }]
    });
    (json, bin.data)
}

/// A 2x2 RGBA PNG.
pub fn tiny_png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 100, 50, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// `num_vertices` positions drawn by one triangle through 32-bit indices.
pub fn wide_index_document(num_vertices: usize) -> (serde_json::Value, Vec<u8>) {
    let positions: Vec<f32> = (0..num_vertices)
        .flat_map(|i| [i as f32, (i % 7) as f32, 0.0])
        .collect();
    let last = num_vertices as u32 - 1;

    let mut bin = BinBuilder::default();
    let (pos_off, pos_len) = bin.push_f32(&positions);
    let (idx_off, idx_len) = bin.push_u32(&[0, 1, last]);

    let json = serde_json::json!({
        "asset": { "version": "2.0" },
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": num_vertices, "type": "VEC3" },
            { "bufferView": 1, "componentType": 5125, "count": 3, "type": "SCALAR" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": pos_off, "byteLength": pos_len },
            { "buffer": 0, "byteOffset": idx_off, "byteLength": idx_len }
        ],
        "buffers": [{ "byteLength": bin.data.len() }]
    });
    (json, bin.data)
}
