//! XPK-HFMN: static Huffman compressor.
//!
//! The stream opens with a big-endian size word whose low 9 bits give the
//! length of the code table region (written in 4-byte chunks); the top 7
//! bits are flags with no published meaning and are ignored. The table
//! region is followed by a 16-bit raw size and the payload. Decoding runs
//! in two phases over the same bit reader: first the code table is rebuilt
//! from a walk of the canonical tree, then the payload is decoded symbol
//! by symbol until the raw buffer is full.

use log::debug;

use crate::bits::MsbBitReader;
use crate::buffer::BufferView;
use crate::common::{fourcc, DepackError, Result};
use crate::huffman::{HuffmanCode, HuffmanDecoder};
use crate::streams::{ForwardInputStream, ForwardOutputStream};

/// Decoder for the XPK-HFMN Huffman format.
#[derive(Debug)]
pub struct HfmnDecompressor<'a> {
    packed: BufferView<'a>,
    header_size: usize,
    raw_size: usize,
}

impl<'a> HfmnDecompressor<'a> {
    /// Match the XPK inner format id.
    pub fn detect_header_xpk(header: u32) -> bool {
        header == fourcc(*b"HFMN")
    }

    /// Validate framing and capture the declared sizes.
    pub fn new(header: u32, packed_data: &'a [u8]) -> Result<Self> {
        let packed = BufferView::new(packed_data);
        if !Self::detect_header_xpk(header) || packed.size() < 4 {
            return Err(DepackError::InvalidFormat("not an HFMN stream"));
        }
        let size_word = packed
            .read_be16(0)
            .map_err(|_| DepackError::InvalidFormat("truncated HFMN header"))?;
        if size_word & 3 != 0 {
            return Err(DepackError::InvalidFormat(
                "HFMN table size not a multiple of 4",
            ));
        }
        if size_word & 0xFE00 != 0 {
            debug!("ignoring HFMN size-word flags {:#06x}", size_word & 0xFE00);
        }
        let mut header_size = usize::from(size_word & 0x1FF);
        if header_size + 4 > packed.size() {
            return Err(DepackError::InvalidFormat("HFMN table exceeds stream"));
        }
        let raw_size = usize::from(
            packed
                .read_be16(header_size + 2)
                .map_err(|_| DepackError::InvalidFormat("truncated HFMN header"))?,
        );
        if raw_size == 0 {
            return Err(DepackError::InvalidFormat("HFMN declares zero raw size"));
        }
        header_size += 4;
        Ok(Self {
            packed,
            header_size,
            raw_size,
        })
    }

    /// Raw size declared by the stream.
    pub fn raw_size(&self) -> usize {
        self.raw_size
    }

    /// Decode the whole stream into `raw`, which must match the declared
    /// raw size exactly.
    pub fn decompress(&self, raw: &mut [u8]) -> Result<()> {
        if raw.len() != self.raw_size {
            return Err(DepackError::Decompression(
                "output size does not match declared raw size",
            ));
        }

        // Phase one: rebuild the code table. A set bit descends into a
        // longer all-ones suffix, a clear bit emits a literal at the
        // current position and backtracks to the next unfilled slot.
        let mut reader = MsbBitReader::new(ForwardInputStream::new(
            &self.packed,
            2,
            self.header_size,
        )?);
        let mut decoder = HuffmanDecoder::new();
        let mut code: u32 = 1;
        let mut code_bits: u32 = 1;
        loop {
            if reader.read_bits8(1)? == 0 {
                let mut literal = 0u32;
                for i in 0..8 {
                    literal |= reader.read_bits8(1)? << i;
                }
                decoder.insert(HuffmanCode {
                    length: code_bits,
                    code,
                    value: literal as u8,
                })?;
                while code & 1 == 0 && code_bits != 0 {
                    code_bits -= 1;
                    code >>= 1;
                }
                if code_bits == 0 {
                    break;
                }
                code -= 1;
            } else {
                code = (code << 1) + 1;
                code_bits += 1;
            }
        }

        // Phase two: the payload, with the reader rebound past the table.
        reader.reset(ForwardInputStream::new(
            &self.packed,
            self.header_size,
            self.packed.size(),
        )?);
        let raw_len = raw.len();
        let mut output = ForwardOutputStream::new(raw, 0, raw_len)?;
        while !output.eof() {
            let value = decoder.decode(|| reader.read_bits8(1))?;
            output.write_byte(value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // hdrSize 4, codes '1' -> 0x41 and '0' -> 0x42, raw size 4,
    // payload bits 1,0,0,1
    const TWO_SYMBOL_STREAM: &[u8] = &[0x00, 0x04, 0x41, 0x10, 0x80, 0x00, 0x00, 0x04, 0x90];

    #[test]
    fn test_two_symbol_stream() {
        let decoder = HfmnDecompressor::new(fourcc(*b"HFMN"), TWO_SYMBOL_STREAM).unwrap();
        assert_eq!(decoder.raw_size(), 4);
        let mut raw = [0u8; 4];
        decoder.decompress(&mut raw).unwrap();
        assert_eq!(&raw, b"ABBA");
    }

    #[test]
    fn test_output_size_must_match() {
        let decoder = HfmnDecompressor::new(fourcc(*b"HFMN"), TWO_SYMBOL_STREAM).unwrap();
        let mut raw = [0u8; 5];
        assert!(matches!(
            decoder.decompress(&mut raw),
            Err(DepackError::Decompression(_))
        ));
    }

    #[test]
    fn test_framing_rejects() {
        // size word not a multiple of 4
        assert!(HfmnDecompressor::new(fourcc(*b"HFMN"), &[0x00, 0x05, 0, 0, 0, 0, 0, 0]).is_err());
        // table runs past the stream
        assert!(HfmnDecompressor::new(fourcc(*b"HFMN"), &[0x00, 0x08, 0, 0]).is_err());
        // zero raw size
        assert!(HfmnDecompressor::new(
            fourcc(*b"HFMN"),
            &[0x00, 0x04, 0, 0, 0, 0, 0x00, 0x00, 0x90]
        )
        .is_err());
        // wrong format id
        assert!(HfmnDecompressor::new(fourcc(*b"LZW4"), TWO_SYMBOL_STREAM).is_err());
    }

    #[test]
    fn test_size_word_flags_are_ignored() {
        let mut stream = TWO_SYMBOL_STREAM.to_vec();
        stream[0] = 0xFE; // set all seven flag bits
        let decoder = HfmnDecompressor::new(fourcc(*b"HFMN"), &stream).unwrap();
        let mut raw = [0u8; 4];
        decoder.decompress(&mut raw).unwrap();
        assert_eq!(&raw, b"ABBA");
    }

    #[test]
    fn test_truncated_payload_fails() {
        let stream = &TWO_SYMBOL_STREAM[..8];
        let decoder = HfmnDecompressor::new(fourcc(*b"HFMN"), stream).unwrap();
        let mut raw = [0u8; 4];
        assert!(decoder.decompress(&mut raw).is_err());
    }
}
