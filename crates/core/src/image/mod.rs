//! Random-access view over a raw firmware image.
//!
//! `ByteImage` wraps the file contents as an immutable byte buffer with
//! bounds-checked slicing and little-endian integer reads. Offsets are always
//! byte offsets from the start of the buffer; the optional base address is
//! informational only and never shifts a read. There is no alignment
//! requirement anywhere: calibration tables sit wherever the linker put them.

use thiserror::Error;

/// Error type for image reads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// A read extended past the end of the image.
    #[error("read of {len} bytes at offset {offset} is out of bounds for an image of {size} bytes")]
    OutOfBounds { offset: usize, len: usize, size: usize },
}

/// Convenience result type for image reads.
pub type ImageResult<T> = Result<T, ImageError>;

/// Immutable firmware image loaded once per session.
#[derive(Debug, Clone)]
pub struct ByteImage {
    data: Vec<u8>,
    base_address: Option<u32>,
}

impl ByteImage {
    /// Wrap raw file contents. The image is never modified afterwards.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, base_address: None }
    }

    /// Attach the address the ROM is mapped at in the ECU's address space.
    ///
    /// Purely informational: offsets into the buffer stay zero-based.
    pub fn with_base_address(mut self, base_address: u32) -> Self {
        self.base_address = Some(base_address);
        self
    }

    /// Total size of the image in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// The informational base address, if one was recorded.
    pub fn base_address(&self) -> Option<u32> {
        self.base_address
    }

    /// The whole underlying buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> ImageResult<&[u8]> {
        let end = offset.checked_add(len).filter(|&end| end <= self.data.len());
        match end {
            Some(end) => Ok(&self.data[offset..end]),
            None => Err(ImageError::OutOfBounds { offset, len, size: self.data.len() }),
        }
    }

    /// Read one little-endian unsigned 16-bit value at `offset`.
    pub fn read_u16_le(&self, offset: usize) -> ImageResult<u16> {
        let bytes = self.slice(offset, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read `count` consecutive little-endian u16 values starting at `offset`.
    pub fn read_u16_le_array(&self, offset: usize, count: usize) -> ImageResult<Vec<u16>> {
        let bytes = self.slice(offset, count.saturating_mul(2))?;
        Ok(bytes.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])).collect())
    }
}
