//! # gltf-ingest
//!
//! glTF 2.0 and GLB loader that turns an asset into render-ready resources:
//! interleaved vertex buffers, device-sized index buffers, PBR materials,
//! textures, skins, animation curves, cameras, lights and the node graph.
//!
//! ## Modules
//!
//! - [`util`] - Errors, component lookups, math types
//! - [`glb`] - Binary container parsing
//! - [`document`] - JSON scene description
//! - [`accessor`] - Accessor decoding (strided, sparse, normalized)
//! - [`vertex`] - Vertex/index assembly, normal synthesis, UV flipping
//! - [`draco`] - Bridge to an externally provided Draco decoder
//! - [`device`] - Graphics device abstraction
//! - [`resources`] - Resource builders
//! - [`pipeline`] - Staged async loading with hooks and cancellation
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gltf_ingest::prelude::*;
//!
//! let parser = GltfParser::new(Arc::new(HeadlessDevice::new()));
//! let container = parser.load_file("scene.glb").await?;
//!
//! for render in &container.renders {
//!     println!("{}: {} primitives", render.name, render.meshes.len());
//! }
//! ```

pub mod util;
pub mod glb;
pub mod document;
pub mod accessor;
pub mod vertex;
pub mod draco;
pub mod device;
pub mod resources;
pub mod pipeline;

// Re-export commonly used types
pub use util::{Error, Result};
pub use pipeline::{GltfContainer, GltfParser, ParseOptions};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result};
    pub use crate::device::{GraphicsDevice, HeadlessDevice};
    pub use crate::document::{parse_document, Document};
    pub use crate::glb::parse_container;
    pub use crate::draco::DracoCapability;
    pub use crate::pipeline::{
        AssetFetcher, CancelToken, FileFetcher, FlipVPolicy, GltfContainer, GltfParser, ParseOptions,
    };
    pub use crate::resources::*;
}
