//! Error types for glTF/GLB ingestion.

use thiserror::Error;

/// Main error type for parsing and resource construction.
#[derive(Error, Debug)]
pub enum Error {
    /// Container header does not start with `glTF`
    #[error("Invalid GLB magic: expected 0x46546C67, found 0x{0:08X}")]
    InvalidMagic(u32),

    /// Container version other than 2
    #[error("Invalid GLB version: expected 2, found {0}")]
    UnsupportedContainerVersion(u32),

    /// Declared total length is larger than the data handed to the parser
    #[error("Invalid GLB length: header declares {declared} bytes but only {actual} available")]
    LengthMismatch { declared: usize, actual: usize },

    /// Container holds something other than one or two chunks
    #[error("Invalid number of GLB chunks: {0}")]
    ChunkCount(usize),

    /// Chunk carries an unexpected type tag
    #[error("Invalid GLB chunk type at chunk {index}: 0x{found:08X}")]
    ChunkType { index: usize, found: u32 },

    /// Chunk data runs past the end of the buffer
    #[error("Invalid GLB chunk length at chunk {index}: {length} bytes at offset {offset} exceeds buffer length {available}")]
    ChunkLength {
        index: usize,
        length: usize,
        offset: usize,
        available: usize,
    },

    /// Data ended before a fixed-size field could be read
    #[error("Unexpected end of data at position {0}")]
    UnexpectedEof(u64),

    /// Scene description declares a version below 2.0
    #[error("Invalid glTF version: expected 2.0 or above, found '{0}'")]
    UnsupportedVersion(String),

    /// JSON syntax or schema error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Scene description is not valid UTF-8
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Accessor component type outside the supported lookup table
    #[error("Unsupported accessor component type: {0}")]
    UnsupportedComponentType(u32),

    /// A document index points outside its array
    #[error("Invalid {kind} index {index} (count: {count})")]
    IndexOutOfBounds {
        kind: &'static str,
        index: usize,
        count: usize,
    },

    /// Structurally invalid data (ranges, strides, counts)
    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    /// Draco decoder reported a failure
    #[error("Failed to decode draco compressed asset: {0}")]
    Draco(String),

    /// Draco data present but no decoder module could be acquired
    #[error("Draco decoder module is not available")]
    DracoUnavailable,

    /// External resource could not be fetched
    #[error("Failed to fetch '{url}': {reason}")]
    Fetch { url: String, reason: String },

    /// Image has neither `uri` nor `bufferView`
    #[error("Invalid image found in gltf (neither uri or bufferView found). index={0}")]
    InvalidImage(usize),

    /// Image payload could not be decoded
    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    /// Malformed `data:` URI
    #[error("Invalid data URI: {0}")]
    DataUri(String),

    /// Parse was cancelled through its token
    #[error("Parse cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create an out-of-bounds index error.
    pub fn index(kind: &'static str, index: usize, count: usize) -> Self {
        Self::IndexOutOfBounds { kind, index, count }
    }
}

/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Look up `items[index]`, reporting a typed error when out of range.
#[inline]
pub fn get_indexed<'a, T>(items: &'a [T], index: usize, kind: &'static str) -> Result<&'a T> {
    items.get(index).ok_or(Error::index(kind, index, items.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::InvalidMagic(0x12345678);
        assert!(e.to_string().contains("0x12345678"));

        let e = Error::ChunkCount(3);
        assert!(e.to_string().contains("3"));

        let e = Error::index("accessor", 5, 3);
        assert!(e.to_string().contains("accessor"));
        assert!(e.to_string().contains("5"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_get_indexed() {
        let items = [1, 2, 3];
        assert_eq!(*get_indexed(&items, 1, "node").unwrap(), 2);
        assert!(matches!(
            get_indexed(&items, 7, "node"),
            Err(Error::IndexOutOfBounds { index: 7, count: 3, .. })
        ));
    }
}
