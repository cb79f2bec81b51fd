//! Vertex and index buffer assembly.
//!
//! Attribute data arrives as [`SourceDesc`] descriptors, whether it came
//! from plain accessors or from the Draco bridge. Assembly lays the
//! attributes out in a canonical interleaved [`VertexFormat`], reusing the
//! source block directly when it already has that layout.
//!
//! - [`assemble_vertex_buffer`] - interleave, synthesize normals, flip UVs
//! - [`IndexBuffer`] - index data with device-dependent width
//! - [`PrimitiveTopology`] - primitive `mode` mapping

mod assemble;
mod format;
mod index;
mod normals;
mod semantic;
mod uv;

pub use assemble::*;
pub use format::*;
pub use index::*;
pub use normals::*;
pub use semantic::*;
pub use uv::*;
