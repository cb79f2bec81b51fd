//! GPU-device abstraction.
//!
//! The loader never talks to a graphics API directly. It asks a
//! [`GraphicsDevice`] about index-format capabilities and hands it finished
//! vertex, index and texture payloads in exchange for opaque handles.

use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque handle to a device-side allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuHandle(pub u64);

/// Kind of buffer being uploaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// Texture payload handed to the device.
#[derive(Clone, Copy, Debug)]
pub struct TextureUpload<'a> {
    pub width: u32,
    pub height: u32,
    /// Decoded RGBA8 pixels, or the encoded payload for compressed formats.
    pub data: &'a [u8],
    /// True when `data` is still in its container encoding.
    pub compressed: bool,
}

/// Capabilities and allocation entry points of a render device.
pub trait GraphicsDevice: Send + Sync {
    /// Whether 32-bit index buffers can be drawn.
    fn supports_u32_indices(&self) -> bool;

    /// Whether 8-bit index buffers can be drawn.
    fn supports_u8_indices(&self) -> bool;

    /// Upload a vertex or index buffer.
    fn create_buffer(&self, kind: BufferKind, data: &[u8]) -> GpuHandle;

    /// Upload a texture.
    fn create_texture(&self, texture: TextureUpload<'_>) -> GpuHandle;

    /// Release a previously created allocation.
    fn release(&self, _handle: GpuHandle) {}
}

/// Device without a backing graphics API.
///
/// Hands out sequential handles and tracks how many allocations are live.
/// Capabilities are configurable, which makes it the device of choice for
/// tooling and tests.
#[derive(Debug)]
pub struct HeadlessDevice {
    u32_indices: bool,
    u8_indices: bool,
    next: AtomicU64,
    live: AtomicU64,
}

impl HeadlessDevice {
    /// Device supporting every index format.
    pub fn new() -> Self {
        Self::with_capabilities(true, true)
    }

    pub fn with_capabilities(u32_indices: bool, u8_indices: bool) -> Self {
        Self {
            u32_indices,
            u8_indices,
            next: AtomicU64::new(1),
            live: AtomicU64::new(0),
        }
    }

    /// Allocations created and not yet released.
    pub fn live_allocations(&self) -> u64 {
        self.live.load(Ordering::Relaxed)
    }

    fn allocate(&self) -> GpuHandle {
        self.live.fetch_add(1, Ordering::Relaxed);
        GpuHandle(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn supports_u32_indices(&self) -> bool {
        self.u32_indices
    }

    fn supports_u8_indices(&self) -> bool {
        self.u8_indices
    }

    fn create_buffer(&self, _kind: BufferKind, _data: &[u8]) -> GpuHandle {
        self.allocate()
    }

    fn create_texture(&self, _texture: TextureUpload<'_>) -> GpuHandle {
        self.allocate()
    }

    fn release(&self, _handle: GpuHandle) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}
