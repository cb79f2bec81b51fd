//! GLB format constants.

/// Magic number at the start of a GLB file ("glTF" little-endian).
pub const GLB_MAGIC: u32 = 0x46546C67;

/// The only container version this reader accepts.
pub const GLB_VERSION: u32 = 2;

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 12;

/// Size of a chunk header (length + type) in bytes.
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Chunk type tag for the JSON scene description ("JSON").
pub const CHUNK_JSON: u32 = 0x4E4F534A;

/// Chunk type tag for the embedded binary buffer ("BIN\0").
pub const CHUNK_BIN: u32 = 0x004E4942;

/// File extension that forces container parsing.
pub const GLB_EXTENSION: &str = ".glb";

/// Check whether `data` starts with the GLB magic bytes.
#[inline]
pub fn has_glb_magic(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == GLB_MAGIC.to_le_bytes()
}

/// Check whether a filename hint names a binary container.
#[inline]
pub fn is_glb_filename(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(GLB_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic() {
        assert_eq!(&GLB_MAGIC.to_le_bytes(), b"glTF");
        assert_eq!(&CHUNK_JSON.to_le_bytes(), b"JSON");
        assert_eq!(&CHUNK_BIN.to_le_bytes(), b"BIN\0");
        assert!(has_glb_magic(b"glTF\x02\x00\x00\x00"));
        assert!(!has_glb_magic(b"{\"asset\""));
        assert!(!has_glb_magic(b"gl"));
    }

    #[test]
    fn test_filename() {
        assert!(is_glb_filename("model.glb"));
        assert!(is_glb_filename("dir/MODEL.GLB"));
        assert!(!is_glb_filename("model.gltf"));
        assert!(!is_glb_filename(""));
    }
}
