//! MSB-first and LSB-first bit extraction over a byte stream.
//!
//! Readers are small state structs, not generators: an accumulator, a
//! valid-bit count, and explicit refill. Refill granularity is chosen per
//! call (`read_bits8` pulls single bytes, `read_bits_be32` pulls whole
//! big-endian words), because the formats disagree on it. Both polarities
//! accept a zero-width read and return 0 without consuming anything.

use crate::common::Result;
use crate::streams::{ByteSource, ForwardInputStream};

fn low_mask(count: u32) -> u32 {
    u32::MAX >> (32 - count)
}

/// Bit reader where the most recently fetched bit is the highest
/// unconsumed one; `read_bits8(n)` extracts the top `n` bits.
#[derive(Debug)]
pub struct MsbBitReader<S> {
    source: S,
    content: u32,
    length: u32,
}

impl<S: ByteSource> MsbBitReader<S> {
    /// Create a reader with an empty accumulator.
    pub fn new(source: S) -> Self {
        Self {
            source,
            content: 0,
            length: 0,
        }
    }

    /// Rebind the reader to a new cursor, discarding accumulator state.
    pub fn reset(&mut self, source: S) {
        self.source = source;
        self.content = 0;
        self.length = 0;
    }

    /// Extract `count` bits (at most 24), refilling one byte at a time.
    pub fn read_bits8(&mut self, count: u32) -> Result<u32> {
        debug_assert!(count <= 24);
        if count == 0 {
            return Ok(0);
        }
        while self.length < count {
            self.content = (self.content << 8) | u32::from(self.source.read_byte()?);
            self.length += 8;
        }
        self.length -= count;
        Ok((self.content >> self.length) & low_mask(count))
    }

    /// Read one byte straight from the underlying cursor.
    ///
    /// Independent of the bit accumulator: buffered bits stay buffered and
    /// the byte comes from the cursor's current position. Formats that
    /// interleave bit flags with literal bytes rely on this.
    pub fn read_byte(&mut self) -> Result<u8> {
        self.source.read_byte()
    }
}

impl<'a> MsbBitReader<ForwardInputStream<'a>> {
    /// Extract `count` bits (at most 32), refilling four bytes at a time
    /// as a big-endian word.
    pub fn read_bits_be32(&mut self, count: u32) -> Result<u32> {
        debug_assert!(count <= 32);
        if count == 0 {
            return Ok(0);
        }
        let mut result = 0u32;
        let mut needed = count;
        while needed > 0 {
            if self.length == 0 {
                self.content = self.source.read_be32()?;
                self.length = 32;
            }
            let take = needed.min(self.length);
            self.length -= take;
            let chunk = (self.content >> self.length) & low_mask(take);
            result = if take == 32 { chunk } else { (result << take) | chunk };
            needed -= take;
        }
        Ok(result)
    }
}

/// Bit reader extracting the bottom `n` bits, shifting down after each
/// extraction.
#[derive(Debug)]
pub struct LsbBitReader<S> {
    source: S,
    content: u32,
    length: u32,
}

impl<S: ByteSource> LsbBitReader<S> {
    /// Create a reader with an empty accumulator.
    pub fn new(source: S) -> Self {
        Self {
            source,
            content: 0,
            length: 0,
        }
    }

    /// Rebind the reader to a new cursor, discarding accumulator state.
    pub fn reset(&mut self, source: S) {
        self.source = source;
        self.content = 0;
        self.length = 0;
    }

    /// Extract `count` bits (at most 24), refilling one byte at a time.
    pub fn read_bits8(&mut self, count: u32) -> Result<u32> {
        debug_assert!(count <= 24);
        if count == 0 {
            return Ok(0);
        }
        while self.length < count {
            self.content |= u32::from(self.source.read_byte()?) << self.length;
            self.length += 8;
        }
        let result = self.content & low_mask(count);
        self.content >>= count;
        self.length -= count;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferView;
    use crate::streams::ReverseInputStream;

    #[test]
    fn test_msb_single_bits() {
        let view = BufferView::new(&[0b1010_0001]);
        let mut reader = MsbBitReader::new(ForwardInputStream::new(&view, 0, 1).unwrap());
        let bits: Vec<u32> = (0..8).map(|_| reader.read_bits8(1).unwrap()).collect();
        assert_eq!(bits, [1, 0, 1, 0, 0, 0, 0, 1]);
        assert!(reader.read_bits8(1).is_err());
    }

    #[test]
    fn test_msb_multi_bit() {
        let view = BufferView::new(&[0xAB, 0xCD]);
        let mut reader = MsbBitReader::new(ForwardInputStream::new(&view, 0, 2).unwrap());
        assert_eq!(reader.read_bits8(4).unwrap(), 0xA);
        assert_eq!(reader.read_bits8(8).unwrap(), 0xBC);
        assert_eq!(reader.read_bits8(4).unwrap(), 0xD);
    }

    #[test]
    fn test_lsb_bits() {
        // 0x2A = 0b0010_1010: LSB-first 3-bit reads give 2 then 5
        let view = BufferView::new(&[0x2A]);
        let mut reader = LsbBitReader::new(ForwardInputStream::new(&view, 0, 1).unwrap());
        assert_eq!(reader.read_bits8(3).unwrap(), 2);
        assert_eq!(reader.read_bits8(3).unwrap(), 5);
        assert_eq!(reader.read_bits8(0).unwrap(), 0);
        assert_eq!(reader.read_bits8(2).unwrap(), 0);
        reader.reset(ForwardInputStream::new(&view, 0, 1).unwrap());
        assert_eq!(reader.read_bits8(8).unwrap(), 0x2A);
    }

    #[test]
    fn test_lsb_crosses_byte_boundary() {
        let view = BufferView::new(&[0xFF, 0x00, 0x0F]);
        let mut reader = LsbBitReader::new(ForwardInputStream::new(&view, 0, 3).unwrap());
        assert_eq!(reader.read_bits8(12).unwrap(), 0x0FF);
        assert_eq!(reader.read_bits8(12).unwrap(), 0x0F0);
    }

    #[test]
    fn test_be32_refill_needs_full_word() {
        let view = BufferView::new(&[0x80, 0x00, 0x00]);
        let mut reader = MsbBitReader::new(ForwardInputStream::new(&view, 0, 3).unwrap());
        assert!(reader.read_bits_be32(1).is_err());

        let view = BufferView::new(&[0x80, 0x00, 0x00, 0x01]);
        let mut reader = MsbBitReader::new(ForwardInputStream::new(&view, 0, 4).unwrap());
        assert_eq!(reader.read_bits_be32(1).unwrap(), 1);
        assert_eq!(reader.read_bits_be32(31).unwrap(), 1);
    }

    #[test]
    fn test_be32_spanning_words() {
        let view = BufferView::new(&[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0]);
        let mut reader = MsbBitReader::new(ForwardInputStream::new(&view, 0, 8).unwrap());
        assert_eq!(reader.read_bits_be32(16).unwrap(), 0x1234);
        assert_eq!(reader.read_bits_be32(32).unwrap(), 0x56789ABC);
        assert_eq!(reader.read_bits_be32(16).unwrap(), 0xDEF0);
    }

    #[test]
    fn test_byte_reads_bypass_accumulator() {
        let view = BufferView::new(&[0x40, 0x00, 0x00, 0x00, 0xAA, 0xBB]);
        let mut reader = MsbBitReader::new(ForwardInputStream::new(&view, 0, 6).unwrap());
        assert_eq!(reader.read_bits_be32(2).unwrap(), 1);
        // the word is buffered; byte reads continue behind it
        assert_eq!(reader.read_byte().unwrap(), 0xAA);
        assert_eq!(reader.read_bits_be32(1).unwrap(), 0);
        assert_eq!(reader.read_byte().unwrap(), 0xBB);
    }

    #[test]
    fn test_reset_discards_state() {
        let view = BufferView::new(&[0xFF, 0x00]);
        let mut reader = MsbBitReader::new(ForwardInputStream::new(&view, 0, 1).unwrap());
        assert_eq!(reader.read_bits8(3).unwrap(), 7);
        reader.reset(ForwardInputStream::new(&view, 1, 2).unwrap());
        assert_eq!(reader.read_bits8(8).unwrap(), 0);
    }

    #[test]
    fn test_msb_over_reverse_stream() {
        let view = BufferView::new(&[0x0F, 0xF0]);
        let mut reader = MsbBitReader::new(ReverseInputStream::new(&view, 0, 2).unwrap());
        // reverse cursor hands out 0xF0 first
        assert_eq!(reader.read_bits8(8).unwrap(), 0xF0);
        assert_eq!(reader.read_bits8(8).unwrap(), 0x0F);
        assert!(reader.read_bits8(1).is_err());
    }
}
