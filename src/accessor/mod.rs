//! Accessor decoding.
//!
//! Turns accessor metadata plus resolved buffer views into typed element
//! data. Plain accessors borrow the buffer-view bytes; strided accessors
//! can be flattened into a packed copy; sparse accessors always produce an
//! owned copy with the overrides applied.
//!
//! # Layout
//!
//! ```text
//! buffer:       [ ........ | view.offset ........................ ]
//! view:                    [ acc.offset | elem | stride gap | elem ... ]
//! decoded:                              [ elem | elem | ... ]  (count * components)
//! ```

mod view;

pub use view::*;

use std::borrow::Cow;

use tracing::trace;

use crate::document::{AccessorSchema, SparseSchema};
use crate::util::{
    get_indexed, read_component, BBox3f, Component, ComponentType, Error, Result, Vec3,
};

/// Decoded accessor elements, tightly packed unless borrowed zero-copy.
#[derive(Clone, Debug)]
pub struct AccessorData<'a> {
    /// Storage type of every component.
    pub component_type: ComponentType,
    /// Components per element.
    pub num_components: usize,
    /// Number of elements.
    pub count: usize,
    /// Little-endian component bytes.
    pub bytes: Cow<'a, [u8]>,
}

impl<'a> AccessorData<'a> {
    /// Zero-filled elements, refused beyond [`MAX_UNBACKED_BYTES`].
    pub fn zeroed(component_type: ComponentType, num_components: usize, count: usize) -> Result<Self> {
        let len = unbacked_length(count, num_components * component_type.num_bytes())?;
        Ok(Self {
            component_type,
            num_components,
            count,
            bytes: Cow::Owned(vec![0; len]),
        })
    }

    /// Number of components (`count * num_components`).
    #[inline]
    pub fn len(&self) -> usize {
        self.count * self.num_components
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes of one element.
    #[inline]
    pub fn element_size(&self) -> usize {
        self.num_components * self.component_type.num_bytes()
    }

    /// True if the bytes are a private copy rather than a view.
    pub fn is_owned(&self) -> bool {
        matches!(self.bytes, Cow::Owned(_))
    }

    /// Component `index` widened to `f64`.
    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        read_component(&self.bytes, self.component_type, index)
    }

    /// Component `index` as a float, dequantised when `normalized`.
    #[inline]
    pub fn get_f32(&self, index: usize, normalized: bool) -> f32 {
        let v = self.get(index);
        if normalized {
            self.component_type.dequantize(v)
        } else {
            v as f32
        }
    }

    /// Copy out as `T`, failing if `T` does not match the component type.
    pub fn to_vec<T: Component>(&self) -> Result<Vec<T>> {
        if T::COMPONENT_TYPE != self.component_type {
            return Err(Error::invalid(format!(
                "accessor holds {} components, requested {}",
                self.component_type,
                T::COMPONENT_TYPE
            )));
        }
        Ok(bytemuck::pod_collect_to_vec(&self.bytes))
    }

    /// Every component as `f32`, dequantised when `normalized`.
    pub fn to_f32(&self, normalized: bool) -> Vec<f32> {
        (0..self.len()).map(|i| self.get_f32(i, normalized)).collect()
    }

    /// Every component as `u32` (used for indices).
    pub fn to_u32(&self) -> Vec<u32> {
        (0..self.len()).map(|i| self.get(i) as u32).collect()
    }

    /// Detach from the buffer view.
    pub fn into_owned(self) -> AccessorData<'static> {
        AccessorData {
            component_type: self.component_type,
            num_components: self.num_components,
            count: self.count,
            bytes: Cow::Owned(self.bytes.into_owned()),
        }
    }
}

// ============================================================================
// Layout helpers
// ============================================================================

/// Resolve the accessor's component type.
pub fn component_type(accessor: &AccessorSchema) -> Result<ComponentType> {
    ComponentType::from_gl(accessor.component_type)
        .ok_or(Error::UnsupportedComponentType(accessor.component_type))
}

/// Largest zero-filled allocation for data no buffer view backs.
pub const MAX_UNBACKED_BYTES: usize = 1 << 28;

/// Byte size of `count` elements of `element_size` bytes.
pub fn byte_length(count: usize, element_size: usize) -> Result<usize> {
    count
        .checked_mul(element_size)
        .ok_or_else(|| Error::invalid(format!("accessor of {count} elements x {element_size} bytes overflows")))
}

fn unbacked_length(count: usize, element_size: usize) -> Result<usize> {
    let len = byte_length(count, element_size)?;
    if len > MAX_UNBACKED_BYTES {
        return Err(Error::invalid(format!(
            "accessor without buffer view needs {len} bytes (limit {MAX_UNBACKED_BYTES})"
        )));
    }
    Ok(len)
}

/// Size in bytes of one packed element.
pub fn element_size(accessor: &AccessorSchema) -> Result<usize> {
    Ok(component_type(accessor)?.num_bytes() * accessor.accessor_type.num_components())
}

/// Bytes `[offset, offset + len)` of `bytes`, as a structure error when short.
fn slice_range<'b>(bytes: &'b [u8], offset: usize, len: usize, what: &str) -> Result<&'b [u8]> {
    offset
        .checked_add(len)
        .and_then(|end| bytes.get(offset..end))
        .ok_or_else(|| {
            Error::invalid(format!(
                "{what}: {len} bytes at offset {offset} exceed buffer view of {} bytes",
                bytes.len()
            ))
        })
}

/// Read `count` elements of `element_size` bytes from a view.
///
/// With `flatten` and a stride wider than the element, every element is
/// copied into a packed buffer; otherwise the packed range is borrowed.
fn read_elements<'a>(
    view: &'a BufferViewData,
    byte_offset: usize,
    count: usize,
    element_size: usize,
    flatten: bool,
) -> Result<Cow<'a, [u8]>> {
    let bytes = view.bytes();
    let packed_len = byte_length(count, element_size)?;
    match view.stride {
        Some(stride) if flatten && stride != element_size && count > 0 => {
            let last = stride
                .checked_mul(count - 1)
                .and_then(|v| v.checked_add(byte_offset));
            let Some(last) = last else {
                return Err(Error::invalid("strided accessor range overflows"));
            };
            slice_range(bytes, last, element_size, "strided accessor")?;

            let mut packed = Vec::with_capacity(packed_len);
            for i in 0..count {
                let src = byte_offset + i * stride;
                packed.extend_from_slice(&bytes[src..src + element_size]);
            }
            Ok(Cow::Owned(packed))
        }
        _ => Ok(Cow::Borrowed(slice_range(
            bytes,
            byte_offset,
            packed_len,
            "accessor",
        )?)),
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode an accessor into element data.
///
/// `views` are the resolved buffer views of the document, by index. Sparse
/// accessors and accessors without a buffer view always return owned data.
pub fn decode_accessor<'a>(
    accessor: &AccessorSchema,
    views: &'a [BufferViewData],
    flatten: bool,
) -> Result<AccessorData<'a>> {
    let ty = component_type(accessor)?;
    let num_components = accessor.accessor_type.num_components();
    let element_size = ty.num_bytes() * num_components;

    if let Some(sparse) = &accessor.sparse {
        return decode_sparse(accessor, sparse, ty, views);
    }

    let Some(view_index) = accessor.buffer_view else {
        return AccessorData::zeroed(ty, num_components, accessor.count);
    };
    let view = get_indexed(views, view_index, "bufferView")?;
    let bytes = read_elements(view, accessor.byte_offset, accessor.count, element_size, flatten)?;

    Ok(AccessorData { component_type: ty, num_components, count: accessor.count, bytes })
}

fn decode_sparse<'a>(
    accessor: &AccessorSchema,
    sparse: &SparseSchema,
    ty: ComponentType,
    views: &[BufferViewData],
) -> Result<AccessorData<'a>> {
    let num_components = accessor.accessor_type.num_components();
    let element_size = ty.num_bytes() * num_components;

    let mut data = match accessor.buffer_view {
        Some(view_index) => {
            let view = get_indexed(views, view_index, "bufferView")?;
            let bytes =
                read_elements(view, accessor.byte_offset, accessor.count, element_size, true)?;
            bytes.into_owned()
        }
        // Undefined base data reads as zeros.
        None => vec![0u8; unbacked_length(accessor.count, element_size)?],
    };

    let index_type = ComponentType::from_gl(sparse.indices.component_type)
        .ok_or(Error::UnsupportedComponentType(sparse.indices.component_type))?;
    let index_view = get_indexed(views, sparse.indices.buffer_view, "bufferView")?;
    let indices = read_elements(
        index_view,
        sparse.indices.byte_offset,
        sparse.count,
        index_type.num_bytes(),
        true,
    )?;

    let value_view = get_indexed(views, sparse.values.buffer_view, "bufferView")?;
    let values = read_elements(
        value_view,
        sparse.values.byte_offset,
        sparse.count,
        element_size,
        true,
    )?;

    for i in 0..sparse.count {
        let target = read_component(&indices, index_type, i) as usize;
        if target >= accessor.count {
            return Err(Error::index("sparse accessor element", target, accessor.count));
        }
        let dst = target * element_size;
        let src = i * element_size;
        data[dst..dst + element_size].copy_from_slice(&values[src..src + element_size]);
    }

    trace!(count = accessor.count, overrides = sparse.count, "applied sparse accessor");
    Ok(AccessorData {
        component_type: ty,
        num_components,
        count: accessor.count,
        bytes: Cow::Owned(data),
    })
}

/// Decode an accessor into packed floats.
///
/// Normalized 8/16-bit integers are rescaled into `[-1, 1]` / `[0, 1]`;
/// everything else is converted as-is.
pub fn decode_accessor_f32(accessor: &AccessorSchema, views: &[BufferViewData]) -> Result<Vec<f32>> {
    let data = decode_accessor(accessor, views, true)?;
    if data.component_type == ComponentType::Float32 {
        return data.to_vec::<f32>();
    }
    Ok(data.to_f32(accessor.normalized))
}

/// Decode into a packed vector of `T`, which must match the component type.
pub fn decode_accessor_typed<T: Component>(
    accessor: &AccessorSchema,
    views: &[BufferViewData],
) -> Result<Vec<T>> {
    decode_accessor(accessor, views, true)?.to_vec::<T>()
}

/// Bounding box from the accessor's `min`/`max`, dequantised if normalized.
///
/// Returns `None` unless both bounds carry at least three values.
pub fn accessor_bounding_box(accessor: &AccessorSchema) -> Option<BBox3f> {
    let (min, max) = (accessor.min.as_ref()?, accessor.max.as_ref()?);
    if min.len() < 3 || max.len() < 3 {
        return None;
    }

    let rescale = |v: f64| match ComponentType::from_gl(accessor.component_type) {
        Some(ty) if accessor.normalized => ty.dequantize(v),
        _ => v as f32,
    };
    let min = Vec3::new(rescale(min[0]), rescale(min[1]), rescale(min[2]));
    let max = Vec3::new(rescale(max[0]), rescale(max[1]), rescale(max[2]));

    Some(BBox3f::from_center_half_extents((max + min) * 0.5, (max - min) * 0.5))
}
