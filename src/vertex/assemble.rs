//! Interleaved vertex buffer assembly.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;

use super::{flip_texcoord_v, generate_normals, sequential_indices, Semantic, SourceDesc, VertexFormat};
use crate::device::{BufferKind, GpuHandle, GraphicsDevice};
use crate::util::{ComponentType, Error, Result};

/// Attribute descriptors of one primitive, keyed (and thus ordered) by semantic.
pub type SourceDescs = BTreeMap<Semantic, SourceDesc>;

/// Interleaved vertex data ready for drawing.
#[derive(Clone, Debug)]
pub struct VertexBuffer {
    pub format: VertexFormat,
    pub num_vertices: usize,
    /// `num_vertices * format.stride` bytes.
    pub data: Vec<u8>,
    pub handle: GpuHandle,
}

impl VertexBuffer {
    /// Attribute `semantic` of every vertex as packed floats.
    pub fn read_f32(&self, semantic: Semantic) -> Option<Vec<f32>> {
        let element = self.format.element(semantic)?;
        let desc = SourceDesc {
            buffer: Arc::from(self.data.as_slice()),
            offset: element.offset,
            stride: self.format.stride,
            size: element.size,
            count: self.num_vertices,
            components: element.components,
            component_type: element.component_type,
            normalize: element.normalize,
        };
        Some(desc.read_f32())
    }
}

/// Build an interleaved vertex buffer from attribute descriptors.
///
/// Returns `None` when there is no position attribute, and a structure
/// error when the interleaved size overflows. A missing normal
/// attribute is synthesized from positions and `indices` (or sequential
/// indices for non-indexed geometry). `flip_v` inverts the V coordinate
/// of the first two texture-coordinate sets.
pub fn assemble_vertex_buffer(
    device: &dyn GraphicsDevice,
    mut sources: SourceDescs,
    indices: Option<&[u32]>,
    flip_v: bool,
) -> Result<Option<VertexBuffer>> {
    let Some(positions) = sources.get(&Semantic::Position) else { return Ok(None) };
    let num_vertices = positions.count;

    if !sources.contains_key(&Semantic::Normal) && positions.components == 3 {
        let points = positions.read_f32();
        let normals = match indices {
            Some(indices) => generate_normals(&points, indices),
            None => generate_normals(&points, &sequential_indices(num_vertices)),
        };
        let bytes: Vec<u8> = bytemuck::cast_slice(&normals).to_vec();
        sources.insert(
            Semantic::Normal,
            SourceDesc::packed(bytes, 3, ComponentType::Float32, false),
        );
    }

    let format = VertexFormat::new(sources.iter().map(|(s, d)| (*s, d)));
    let mut data = match interleave_fast(&format, &sources, num_vertices) {
        Some(data) => {
            trace!(num_vertices, stride = format.stride, "vertex data already interleaved");
            data
        }
        None => interleave_slow(&format, &sources, num_vertices)?,
    };

    if flip_v {
        flip_texcoord_v(&format, &mut data, num_vertices);
    }

    let handle = device.create_buffer(BufferKind::Vertex, &data);
    Ok(Some(VertexBuffer { format, num_vertices, data, handle }))
}

/// Bulk-copy the source block when it already matches `format` exactly.
///
/// Every attribute must share the position attribute's buffer and the
/// target stride, and sit at its target offset relative to the position.
pub fn interleave_fast(format: &VertexFormat, sources: &SourceDescs, num_vertices: usize) -> Option<Vec<u8>> {
    let positions = sources.get(&Semantic::Position)?;

    let matches = format.elements.iter().all(|element| {
        sources.get(&element.semantic).is_some_and(|src| {
            Arc::ptr_eq(&src.buffer, &positions.buffer)
                && src.stride == format.stride
                && src.size == element.size
                && src.offset.checked_sub(positions.offset) == Some(element.offset)
        })
    });
    if !matches {
        return None;
    }

    let start = positions.offset;
    let end = start.checked_add(num_vertices.checked_mul(format.stride)?)?;
    positions.buffer.get(start..end).map(<[u8]>::to_vec)
}

/// Repack each attribute into the interleaved layout one vertex at a time.
///
/// Copies whole 32-bit words per element, so padding bytes in the target
/// take whatever follows the element in its source.
pub fn interleave_slow(format: &VertexFormat, sources: &SourceDescs, num_vertices: usize) -> Result<Vec<u8>> {
    let len = num_vertices.checked_mul(format.stride).ok_or_else(|| {
        Error::invalid(format!("{num_vertices} vertices of {} bytes overflow", format.stride))
    })?;
    let mut data = vec![0u8; len];

    for element in &format.elements {
        let Some(src) = sources.get(&element.semantic) else { continue };
        let copy_len = element.size.div_ceil(4) * 4;

        for i in 0..num_vertices.min(src.count) {
            let from = src.offset + i * src.stride;
            let len = copy_len.min(src.buffer.len().saturating_sub(from));
            let to = i * format.stride + element.offset;
            data[to..to + len].copy_from_slice(&src.buffer[from..from + len]);
        }
    }

    Ok(data)
}
