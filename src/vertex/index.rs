//! Index buffers and primitive topology.

use tracing::warn;

use crate::accessor::AccessorData;
use crate::device::{BufferKind, GpuHandle, GraphicsDevice};
use crate::util::{ComponentType, Error, Result};

/// How consecutive indices form primitives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveTopology {
    /// Map a primitive `mode`; unknown or absent modes draw triangles.
    pub fn from_mode(mode: Option<u32>) -> Self {
        match mode {
            Some(0) => Self::Points,
            Some(1) => Self::Lines,
            Some(2) => Self::LineLoop,
            Some(3) => Self::LineStrip,
            Some(5) => Self::TriangleStrip,
            Some(6) => Self::TriangleFan,
            _ => Self::Triangles,
        }
    }
}

/// Width of one index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    U8,
    U16,
    U32,
}

impl IndexFormat {
    /// Format matching an index accessor's component type.
    pub fn from_component_type(ty: ComponentType) -> Result<Self> {
        match ty {
            ComponentType::Uint8 => Ok(Self::U8),
            ComponentType::Uint16 => Ok(Self::U16),
            ComponentType::Uint32 => Ok(Self::U32),
            other => Err(Error::invalid(format!("index accessor uses {other} components"))),
        }
    }

    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Index data ready for drawing.
#[derive(Clone, Debug)]
pub struct IndexBuffer {
    pub format: IndexFormat,
    pub count: usize,
    /// Little-endian indices of `format` width.
    pub data: Vec<u8>,
    pub handle: GpuHandle,
}

impl IndexBuffer {
    /// Build and upload an index buffer, adapting the format to `device`.
    ///
    /// 32-bit indices on a device without wide-index support are narrowed to
    /// 16 bits, with a warning when `num_vertices` cannot be addressed that
    /// way. 8-bit indices are widened on devices that cannot draw them.
    pub fn new(device: &dyn GraphicsDevice, indices: &AccessorData<'_>, num_vertices: usize) -> Result<Self> {
        let mut format = IndexFormat::from_component_type(indices.component_type)?;

        if format == IndexFormat::U32 && !device.supports_u32_indices() {
            if num_vertices > 0xFFFF {
                warn!(
                    num_vertices,
                    "32-bit index buffer is not supported by this device and is narrowed to 16 bits; it may render incorrectly"
                );
            }
            format = IndexFormat::U16;
        }
        if format == IndexFormat::U8 && !device.supports_u8_indices() {
            format = IndexFormat::U16;
        }

        let data = if format == IndexFormat::from_component_type(indices.component_type)? {
            indices.bytes.to_vec()
        } else {
            encode_indices(&indices.to_u32(), format)
        };

        Ok(Self::from_bytes(device, format, indices.len(), data))
    }

    /// Upload already-encoded indices.
    pub fn from_bytes(device: &dyn GraphicsDevice, format: IndexFormat, count: usize, data: Vec<u8>) -> Self {
        let handle = device.create_buffer(BufferKind::Index, &data);
        Self { format, count, data, handle }
    }

    /// Index `i`, widened.
    pub fn get(&self, i: usize) -> u32 {
        let at = i * self.format.num_bytes();
        match self.format {
            IndexFormat::U8 => self.data[at] as u32,
            IndexFormat::U16 => u16::from_le_bytes([self.data[at], self.data[at + 1]]) as u32,
            IndexFormat::U32 => u32::from_le_bytes([
                self.data[at],
                self.data[at + 1],
                self.data[at + 2],
                self.data[at + 3],
            ]),
        }
    }
}

/// Encode `indices` at the given width; wider values are truncated.
pub fn encode_indices(indices: &[u32], format: IndexFormat) -> Vec<u8> {
    match format {
        IndexFormat::U8 => indices.iter().map(|&i| i as u8).collect(),
        IndexFormat::U16 => indices.iter().flat_map(|&i| (i as u16).to_le_bytes()).collect(),
        IndexFormat::U32 => indices.iter().flat_map(|&i| i.to_le_bytes()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;
    use std::borrow::Cow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Counts `WARN` events seen by the subscriber it is layered on.
    #[derive(Clone, Default)]
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn warnings_during(f: impl FnOnce()) -> usize {
        let counter = WarnCounter::default();
        let subscriber = tracing_subscriber::registry().with(counter.clone());
        tracing::subscriber::with_default(subscriber, f);
        counter.0.load(Ordering::SeqCst)
    }

    fn indices(ty: ComponentType, values: &[u32]) -> AccessorData<'static> {
        let format = IndexFormat::from_component_type(ty).unwrap();
        AccessorData {
            component_type: ty,
            num_components: 1,
            count: values.len(),
            bytes: Cow::Owned(encode_indices(values, format)),
        }
    }

    #[test]
    fn test_topology_modes() {
        assert_eq!(PrimitiveTopology::from_mode(None), PrimitiveTopology::Triangles);
        assert_eq!(PrimitiveTopology::from_mode(Some(0)), PrimitiveTopology::Points);
        assert_eq!(PrimitiveTopology::from_mode(Some(2)), PrimitiveTopology::LineLoop);
        assert_eq!(PrimitiveTopology::from_mode(Some(6)), PrimitiveTopology::TriangleFan);
        assert_eq!(PrimitiveTopology::from_mode(Some(42)), PrimitiveTopology::Triangles);
    }

    #[test]
    fn test_keeps_supported_format() {
        let device = HeadlessDevice::new();
        let ib = IndexBuffer::new(&device, &indices(ComponentType::Uint32, &[0, 1, 70000]), 70001).unwrap();
        assert_eq!(ib.format, IndexFormat::U32);
        assert_eq!(ib.get(2), 70000);
    }

    #[test]
    fn test_narrows_u32_without_support() {
        let device = HeadlessDevice::with_capabilities(false, true);
        let ib = IndexBuffer::new(&device, &indices(ComponentType::Uint32, &[0, 1, 2]), 3).unwrap();
        assert_eq!(ib.format, IndexFormat::U16);
        assert_eq!(ib.data.len(), 6);
        assert_eq!((ib.get(0), ib.get(1), ib.get(2)), (0, 1, 2));
    }

    #[test]
    fn test_narrowing_warns_only_past_u16_range() {
        let device = HeadlessDevice::with_capabilities(false, true);

        let warnings = warnings_during(|| {
            let ib = IndexBuffer::new(&device, &indices(ComponentType::Uint32, &[0, 1, 69_999]), 70_000).unwrap();
            assert_eq!(ib.format, IndexFormat::U16);
        });
        assert_eq!(warnings, 1);

        let warnings = warnings_during(|| {
            let ib = IndexBuffer::new(&device, &indices(ComponentType::Uint32, &[0, 1, 2]), 3).unwrap();
            assert_eq!(ib.format, IndexFormat::U16);
        });
        assert_eq!(warnings, 0);

        // A capable device keeps the wide format without complaint.
        let warnings = warnings_during(|| {
            let ib = IndexBuffer::new(&HeadlessDevice::new(), &indices(ComponentType::Uint32, &[0, 1, 69_999]), 70_000)
                .unwrap();
            assert_eq!(ib.format, IndexFormat::U32);
        });
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_widens_u8_without_support() {
        let device = HeadlessDevice::with_capabilities(true, false);
        let ib = IndexBuffer::new(&device, &indices(ComponentType::Uint8, &[3, 2, 1]), 4).unwrap();
        assert_eq!(ib.format, IndexFormat::U16);
        assert_eq!(ib.get(0), 3);
        assert_eq!(ib.count, 3);
    }

    #[test]
    fn test_rejects_float_indices() {
        let device = HeadlessDevice::new();
        let data = AccessorData::zeroed(ComponentType::Float32, 1, 3).unwrap();
        assert!(IndexBuffer::new(&device, &data, 3).is_err());
    }
}
