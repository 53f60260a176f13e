//! Bounds-checked byte view over packed data.
//!
//! Every multi-byte read is explicit about endianness; the mixed-endian
//! MMCMP header is the reason both families exist side by side. A failed
//! read is always an error, never a panic — callers decide whether that
//! means invalid framing or a corrupt payload.

use crate::common::{DepackError, Result};

/// Immutable byte view with bounds-checked integer reads.
#[derive(Debug, Clone, Copy)]
pub struct BufferView<'a> {
    data: &'a [u8],
}

impl<'a> BufferView<'a> {
    /// Wrap a borrowed byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Total number of bytes in the view.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// True when the view contains no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn get(&self, offset: usize, width: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(width)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(DepackError::Decompression("read past end of packed data"))
    }

    /// Read one byte at `offset`.
    pub fn byte(&self, offset: usize) -> Result<u8> {
        Ok(self.get(offset, 1)?[0])
    }

    /// Read a big-endian 16-bit value at `offset`.
    pub fn read_be16(&self, offset: usize) -> Result<u16> {
        let b = self.get(offset, 2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Read a big-endian 32-bit value at `offset`.
    pub fn read_be32(&self, offset: usize) -> Result<u32> {
        let b = self.get(offset, 4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a little-endian 16-bit value at `offset`.
    pub fn read_le16(&self, offset: usize) -> Result<u16> {
        let b = self.get(offset, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Read a little-endian 32-bit value at `offset`.
    pub fn read_le32(&self, offset: usize) -> Result<u32> {
        let b = self.get(offset, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Borrow the sub-range `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> Result<&'a [u8]> {
        if start > end {
            return Err(DepackError::Decompression("inverted buffer range"));
        }
        self.get(start, end - start)
    }
}
