//! Texture-coordinate V flip.

use super::VertexFormat;
use crate::util::ComponentType;

/// Invert the V component of `TEXCOORD0`/`TEXCOORD1` in an interleaved buffer.
///
/// Floats become `1 - v`; normalized 16-bit and 8-bit values are inverted
/// about 65535 and 255. Other storage types are left alone. Applying the
/// flip twice restores the original bytes.
pub fn flip_texcoord_v(format: &VertexFormat, data: &mut [u8], num_vertices: usize) {
    for element in format.elements.iter().filter(|e| e.semantic.is_flippable_texcoord()) {
        if element.components < 2 {
            continue;
        }
        let width = element.component_type.num_bytes();
        for i in 0..num_vertices {
            let at = i * format.stride + element.offset + width;
            let Some(v) = data.get_mut(at..at + width) else { break };
            match (element.component_type, element.normalize) {
                (ComponentType::Float32, _) => {
                    let x = f32::from_le_bytes([v[0], v[1], v[2], v[3]]);
                    v.copy_from_slice(&(1.0 - x).to_le_bytes());
                }
                (ComponentType::Uint16, true) => {
                    let x = u16::from_le_bytes([v[0], v[1]]);
                    v.copy_from_slice(&(u16::MAX - x).to_le_bytes());
                }
                (ComponentType::Uint8, true) => v[0] = u8::MAX - v[0],
                _ => break,
            }
        }
    }
}
