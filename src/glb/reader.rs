//! GLB container reader.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::debug;

use super::format::*;
use crate::util::{Error, Result};

/// One raw chunk inside a container.
#[derive(Clone, Copy, Debug)]
pub struct Chunk<'a> {
    /// Chunk type tag.
    pub kind: u32,
    /// Chunk payload.
    pub data: &'a [u8],
}

/// Payloads split out of an input byte stream.
#[derive(Clone, Copy, Debug)]
pub struct Container<'a> {
    /// Scene description bytes (UTF-8 JSON).
    pub json: &'a [u8],
    /// Contents of the default (URI-less) buffer, if the file carries one.
    pub binary: Option<&'a [u8]>,
}

impl<'a> Container<'a> {
    /// Wrap plain scene-description text.
    pub fn from_json(json: &'a [u8]) -> Self {
        Self { json, binary: None }
    }
}

/// Split an input byte stream into its JSON and binary payloads.
///
/// The stream is treated as a binary container when `filename` ends in
/// `.glb` or the data starts with the GLB magic; anything else passes
/// through unchanged as a single JSON payload.
pub fn parse_container<'a>(data: &'a [u8], filename: &str) -> Result<Container<'a>> {
    if is_glb_filename(filename) || has_glb_magic(data) {
        parse_glb(data)
    } else {
        Ok(Container::from_json(data))
    }
}

/// Parse a binary container.
///
/// Validates the 12-byte header, walks every chunk, and requires exactly
/// one JSON chunk optionally followed by one BIN chunk.
pub fn parse_glb(data: &[u8]) -> Result<Container<'_>> {
    let chunks = read_chunks(data)?;

    if chunks.is_empty() || chunks.len() > 2 {
        return Err(Error::ChunkCount(chunks.len()));
    }
    if chunks[0].kind != CHUNK_JSON {
        return Err(Error::ChunkType { index: 0, found: chunks[0].kind });
    }
    let binary = match chunks.get(1) {
        Some(chunk) if chunk.kind != CHUNK_BIN => {
            return Err(Error::ChunkType { index: 1, found: chunk.kind });
        }
        Some(chunk) => Some(chunk.data),
        None => None,
    };

    debug!(
        json_bytes = chunks[0].data.len(),
        bin_bytes = binary.map_or(0, |b| b.len()),
        "parsed GLB container"
    );

    Ok(Container { json: chunks[0].data, binary })
}

/// Validate the header and collect every chunk up to the declared length.
///
/// Bytes past the declared length are ignored; no chunk may extend into them.
pub fn read_chunks(data: &[u8]) -> Result<Vec<Chunk<'_>>> {
    if data.len() < HEADER_SIZE {
        return Err(Error::UnexpectedEof(data.len() as u64));
    }

    let mut cursor = Cursor::new(data);
    let magic = cursor.read_u32::<LittleEndian>()?;
    if magic != GLB_MAGIC {
        return Err(Error::InvalidMagic(magic));
    }

    let version = cursor.read_u32::<LittleEndian>()?;
    if version != GLB_VERSION {
        return Err(Error::UnsupportedContainerVersion(version));
    }

    let length = cursor.read_u32::<LittleEndian>()? as usize;
    if length > data.len() {
        return Err(Error::LengthMismatch { declared: length, actual: data.len() });
    }

    let mut chunks = Vec::with_capacity(2);
    let mut offset = HEADER_SIZE;
    while offset < length {
        if offset + CHUNK_HEADER_SIZE > length {
            return Err(Error::UnexpectedEof(offset as u64));
        }
        cursor.set_position(offset as u64);
        let chunk_length = cursor.read_u32::<LittleEndian>()? as usize;
        let chunk_type = cursor.read_u32::<LittleEndian>()?;

        let start = offset + CHUNK_HEADER_SIZE;
        let end = start
            .checked_add(chunk_length)
            .filter(|&end| end <= length)
            .ok_or(Error::ChunkLength {
                index: chunks.len(),
                length: chunk_length,
                offset: start,
                available: length,
            })?;

        chunks.push(Chunk { kind: chunk_type, data: &data[start..end] });
        offset = end;
    }

    Ok(chunks)
}
