//! Attribute descriptors and interleaved vertex layouts.

use std::sync::Arc;

use smallvec::SmallVec;

use super::Semantic;
use crate::accessor::{self, decode_accessor, BufferViewData};
use crate::document::AccessorSchema;
use crate::util::{get_indexed, read_component, ComponentType, Error, Result};

/// Where one vertex attribute lives in its source bytes.
///
/// Accessors and Draco output both produce this shape, so assembly does not
/// care which path the data came from.
#[derive(Clone, Debug)]
pub struct SourceDesc {
    /// Backing bytes, shared with the buffer they were resolved from.
    pub buffer: Arc<[u8]>,
    /// Absolute byte offset of the first element in `buffer`.
    pub offset: usize,
    /// Byte distance between consecutive elements.
    pub stride: usize,
    /// Byte size of one element.
    pub size: usize,
    /// Number of elements.
    pub count: usize,
    /// Components per element.
    pub components: usize,
    pub component_type: ComponentType,
    /// Integer components are to be read as normalized values.
    pub normalize: bool,
}

impl SourceDesc {
    /// Describe tightly packed elements held in `bytes`.
    pub fn packed(
        bytes: Vec<u8>,
        components: usize,
        component_type: ComponentType,
        normalize: bool,
    ) -> Self {
        let size = components * component_type.num_bytes();
        let count = if size == 0 { 0 } else { bytes.len() / size };
        Self {
            buffer: Arc::from(bytes),
            offset: 0,
            stride: size,
            size,
            count,
            components,
            component_type,
            normalize,
        }
    }

    /// Describe an accessor's data in place.
    ///
    /// Plain accessors alias their buffer view; sparse accessors and
    /// accessors without a view are decoded into a private packed copy.
    pub fn from_accessor(accessor: &AccessorSchema, views: &[BufferViewData]) -> Result<Self> {
        let ty = accessor::component_type(accessor)?;
        let components = accessor.accessor_type.num_components();
        let normalize = accessor.normalized;

        let view_index = match accessor.buffer_view {
            Some(index) if accessor.sparse.is_none() => index,
            _ => {
                let data = decode_accessor(accessor, views, true)?;
                return Ok(Self::packed(data.bytes.into_owned(), components, ty, normalize));
            }
        };

        let view = get_indexed(views, view_index, "bufferView")?;
        let size = components * ty.num_bytes();
        let stride = view.stride.unwrap_or(size);
        let offset = view
            .offset
            .checked_add(accessor.byte_offset)
            .ok_or_else(|| Error::invalid("accessor byte offset overflows"))?;
        let desc = Self {
            buffer: view.buffer.clone(),
            offset,
            stride,
            size,
            count: accessor.count,
            components,
            component_type: ty,
            normalize,
        };

        let view_end = view.offset + view.length;
        match desc.end() {
            Some(end) if end <= view_end => Ok(desc),
            Some(end) => Err(Error::invalid(format!(
                "accessor data ends at byte {end} past buffer view end {view_end}"
            ))),
            None => Err(Error::invalid(format!(
                "accessor of {} elements with stride {} overflows",
                desc.count, desc.stride
            ))),
        }
    }

    /// One past the last byte of the last element, `None` on overflow.
    #[inline]
    pub fn end(&self) -> Option<usize> {
        match self.count {
            0 => Some(self.offset),
            n => (n - 1)
                .checked_mul(self.stride)?
                .checked_add(self.offset)?
                .checked_add(self.size),
        }
    }

    /// Component `c` of element `i`, widened to `f64`.
    #[inline]
    pub fn get(&self, i: usize, c: usize) -> f64 {
        let at = self.offset + i * self.stride;
        read_component(&self.buffer[at..at + self.size], self.component_type, c)
    }

    /// Every element as packed floats, dequantised when normalized.
    pub fn read_f32(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.count * self.components);
        for i in 0..self.count {
            for c in 0..self.components {
                let v = self.get(i, c);
                out.push(if self.normalize { self.component_type.dequantize(v) } else { v as f32 });
            }
        }
        out
    }
}

/// One attribute inside an interleaved vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexElement {
    pub semantic: Semantic,
    pub components: usize,
    pub component_type: ComponentType,
    pub normalize: bool,
    /// Byte offset inside the vertex.
    pub offset: usize,
    /// Unpadded byte size.
    pub size: usize,
}

/// Interleaved vertex layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexFormat {
    pub elements: SmallVec<[VertexElement; 8]>,
    /// Bytes per vertex.
    pub stride: usize,
}

#[inline]
const fn align4(v: usize) -> usize {
    (v + 3) & !3
}

impl VertexFormat {
    /// Lay out `attributes` in canonical semantic order, each element
    /// starting on a 4-byte boundary.
    pub fn new<'a>(attributes: impl IntoIterator<Item = (Semantic, &'a SourceDesc)>) -> Self {
        let mut sorted: SmallVec<[(Semantic, &SourceDesc); 8]> = attributes.into_iter().collect();
        sorted.sort_by_key(|(semantic, _)| *semantic);

        let mut elements = SmallVec::new();
        let mut offset = 0;
        for (semantic, desc) in sorted {
            let size = desc.components * desc.component_type.num_bytes();
            elements.push(VertexElement {
                semantic,
                components: desc.components,
                component_type: desc.component_type,
                normalize: desc.normalize,
                offset,
                size,
            });
            offset = align4(offset + size);
        }

        Self { elements, stride: offset }
    }

    pub fn element(&self, semantic: Semantic) -> Option<&VertexElement> {
        self.elements.iter().find(|e| e.semantic == semantic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::AccessorType;

    #[test]
    fn test_layout_alignment() {
        let pos = SourceDesc::packed(vec![0; 12], 3, ComponentType::Float32, false);
        let col = SourceDesc::packed(vec![0; 3], 3, ComponentType::Uint8, true);
        let uv = SourceDesc::packed(vec![0; 4], 2, ComponentType::Uint16, true);

        let format = VertexFormat::new([
            (Semantic::TexCoord0, &uv),
            (Semantic::Color, &col),
            (Semantic::Position, &pos),
        ]);
        let semantics: Vec<_> = format.elements.iter().map(|e| e.semantic).collect();
        assert_eq!(semantics, vec![Semantic::Position, Semantic::Color, Semantic::TexCoord0]);

        let col = format.element(Semantic::Color).unwrap();
        assert_eq!((col.offset, col.size), (12, 3));
        assert_eq!(format.element(Semantic::TexCoord0).unwrap().offset, 16);
        assert_eq!(format.stride, 20);
    }

    #[test]
    fn test_from_accessor_aliases_view() {
        let buffer: Arc<[u8]> = Arc::from(vec![0u8; 64]);
        let views = vec![BufferViewData { buffer: buffer.clone(), offset: 8, length: 48, stride: Some(24) }];
        let acc = AccessorSchema {
            buffer_view: Some(0),
            byte_offset: 12,
            component_type: ComponentType::Float32.gl(),
            count: 2,
            accessor_type: AccessorType::Vec3,
            ..Default::default()
        };

        let desc = SourceDesc::from_accessor(&acc, &views).unwrap();
        assert!(Arc::ptr_eq(&desc.buffer, &buffer));
        assert_eq!((desc.offset, desc.stride, desc.size), (20, 24, 12));
        assert_eq!(desc.end(), Some(56));

        let acc = AccessorSchema { count: 3, ..acc };
        assert!(SourceDesc::from_accessor(&acc, &views).is_err());
    }

    #[test]
    fn test_from_accessor_huge_count() {
        let views = vec![BufferViewData { buffer: Arc::from(vec![0u8; 36]), offset: 0, length: 36, stride: None }];
        let mut acc = AccessorSchema {
            buffer_view: Some(0),
            component_type: ComponentType::Float32.gl(),
            count: 1 << 62,
            accessor_type: AccessorType::Vec3,
            ..Default::default()
        };
        assert!(matches!(SourceDesc::from_accessor(&acc, &views), Err(Error::InvalidStructure(_))));

        acc.count = 3;
        acc.byte_offset = usize::MAX;
        assert!(matches!(SourceDesc::from_accessor(&acc, &views), Err(Error::InvalidStructure(_))));
    }

    #[test]
    fn test_read_f32_normalized() {
        let desc = SourceDesc::packed(vec![0, 255, 51, 0], 2, ComponentType::Uint8, true);
        assert_eq!(desc.count, 2);
        assert_eq!(desc.read_f32(), vec![0.0, 1.0, 0.2, 0.0]);
    }
}
