//! Resolved buffer views.

use std::sync::Arc;

use crate::document::BufferViewSchema;
use crate::util::{Error, Result};

/// A byte window into a resolved buffer.
///
/// Shares the buffer through an `Arc`, so views, accessors and vertex
/// attribute descriptors can alias the same storage without copying.
#[derive(Clone, Debug)]
pub struct BufferViewData {
    /// Whole backing buffer.
    pub buffer: Arc<[u8]>,
    /// Start of the window inside `buffer`.
    pub offset: usize,
    /// Window length in bytes.
    pub length: usize,
    /// Distance between consecutive elements, if declared.
    pub stride: Option<usize>,
}

impl BufferViewData {
    /// Window `schema` describes over `buffer`, validated against its length.
    pub fn new(buffer: Arc<[u8]>, schema: &BufferViewSchema) -> Result<Self> {
        let end = schema.byte_offset.checked_add(schema.byte_length);
        if !end.is_some_and(|end| end <= buffer.len()) {
            return Err(Error::invalid(format!(
                "buffer view range {}+{} exceeds buffer of {} bytes",
                schema.byte_offset,
                schema.byte_length,
                buffer.len()
            )));
        }
        Ok(Self {
            buffer,
            offset: schema.byte_offset,
            length: schema.byte_length,
            stride: schema.byte_stride.filter(|&s| s > 0),
        })
    }

    /// Bytes inside the window.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.buffer[self.offset..self.offset + self.length]
    }
}
