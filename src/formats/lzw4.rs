//! XPK-LZW4: LZW4 CyberYAFA compressor.
//!
//! Despite the name this is a plain LZ77 back-reference scheme with no
//! framing beyond the format id. Flag bits are drawn from 32-bit big-endian
//! refills while literal bytes, distances and counts are read straight off
//! the same cursor behind the buffered word. A zero distance terminates
//! the stream, which only succeeds if the raw buffer is already full.

use crate::bits::MsbBitReader;
use crate::buffer::BufferView;
use crate::common::{fourcc, DepackError, Result};
use crate::streams::{ForwardInputStream, ForwardOutputStream};

/// Decoder for the XPK-LZW4 back-reference format.
#[derive(Debug)]
pub struct Lzw4Decompressor<'a> {
    packed: BufferView<'a>,
}

impl<'a> Lzw4Decompressor<'a> {
    /// Match the XPK inner format id.
    pub fn detect_header_xpk(header: u32) -> bool {
        header == fourcc(*b"LZW4")
    }

    /// Wrap the payload; the format has no framing of its own.
    pub fn new(header: u32, packed_data: &'a [u8]) -> Result<Self> {
        if !Self::detect_header_xpk(header) {
            return Err(DepackError::InvalidFormat("not an LZW4 stream"));
        }
        Ok(Self {
            packed: BufferView::new(packed_data),
        })
    }

    /// Decode until `raw` is full or the stream terminates.
    pub fn decompress(&self, raw: &mut [u8]) -> Result<()> {
        let raw_len = raw.len();
        let mut reader = MsbBitReader::new(ForwardInputStream::new(
            &self.packed,
            0,
            self.packed.size(),
        )?);
        let mut output = ForwardOutputStream::new(raw, 0, raw_len)?;

        while !output.eof() {
            if reader.read_bits_be32(1)? == 0 {
                let value = reader.read_byte()?;
                output.write_byte(value)?;
            } else {
                let mut distance = u32::from(reader.read_byte()?) << 8;
                distance |= u32::from(reader.read_byte()?);
                if distance == 0 {
                    break;
                }
                let distance = 65536 - distance as usize;
                let count = usize::from(reader.read_byte()?) + 3;
                output.copy(distance, count)?;
            }
        }

        if !output.eof() {
            return Err(DepackError::Decompression(
                "LZW4 stream terminated before the raw buffer was full",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decompress(payload: &[u8], raw_size: usize) -> Result<Vec<u8>> {
        let decoder = Lzw4Decompressor::new(fourcc(*b"LZW4"), payload)?;
        let mut raw = vec![0u8; raw_size];
        decoder.decompress(&mut raw)?;
        Ok(raw)
    }

    #[test]
    fn test_literals_then_back_reference() {
        // bits 0,0,0,1 then bytes 'A' 'B' 'C', distance 0xFFFF (= 1),
        // count byte 0 (= 3)
        let payload = [0x10, 0x00, 0x00, 0x00, 0x41, 0x42, 0x43, 0xFF, 0xFF, 0x00];
        assert_eq!(decompress(&payload, 6).unwrap(), b"ABCCCC");
    }

    #[test]
    fn test_zero_distance_terminates() {
        let payload = [0x20, 0x00, 0x00, 0x00, 0x41, 0x42, 0x00, 0x00];
        // terminating with the buffer full is fine
        assert_eq!(decompress(&payload[..6], 2).unwrap(), b"AB");
        // terminating early is a decompression error
        assert!(matches!(
            decompress(&payload, 5),
            Err(DepackError::Decompression(_))
        ));
    }

    #[test]
    fn test_back_reference_bounds() {
        // distance 2 with only one byte written so far
        let payload = [0x40, 0x00, 0x00, 0x00, 0x41, 0xFF, 0xFE, 0x00];
        assert!(decompress(&payload, 8).is_err());
        // count overruns the declared raw size
        let payload = [0x40, 0x00, 0x00, 0x00, 0x41, 0xFF, 0xFF, 0x08];
        assert!(decompress(&payload, 4).is_err());
    }

    #[test]
    fn test_partial_refill_word_fails() {
        assert!(decompress(&[0x00], 1).is_err());
        assert!(decompress(&[], 1).is_err());
    }
}
