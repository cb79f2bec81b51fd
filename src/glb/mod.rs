//! GLB binary container.
//!
//! A `.glb` file packs the JSON scene description and one optional binary
//! buffer into length-prefixed chunks.
//!
//! ## File Structure
//!
//! ```text
//! +------------------+
//! | Magic: "glTF"    |  4 bytes (u32 LE 0x46546C67)
//! +------------------+
//! | Version          |  4 bytes (u32 LE, always 2)
//! +------------------+
//! | Total length     |  4 bytes (u32 LE)
//! +------------------+
//! | Chunk 0 (JSON)   |  length: u32, type: u32, data
//! +------------------+
//! | Chunk 1 (BIN)    |  optional
//! +------------------+
//! ```
//!
//! Plain `.gltf` text passes through [`parse_container`] unchanged.

mod format;
mod reader;

pub use format::*;
pub use reader::*;
