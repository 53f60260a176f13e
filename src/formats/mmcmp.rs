//! MMCMP: Music Module Compressor.
//!
//! A standalone wrapper around blocks of packed PCM-ish data. The file
//! header points at a table of block offsets; each block carries its own
//! 20-byte header, a list of sub-block descriptors naming where its output
//! lands in the raw buffer, an optional pack table, and an LSB-first
//! bitstream. Blocks may leave gaps in the output, so the raw buffer is
//! zeroed first. Compressed blocks use a variable bit width with an escape
//! code that either switches the width, emits a high symbol, or ends the
//! block.

use log::debug;

use crate::bits::LsbBitReader;
use crate::buffer::BufferView;
use crate::common::{fourcc, DecompressOptions, DepackError, Result};
use crate::streams::{ByteSource, ForwardInputStream};

const VALUE_THRESHOLDS_8: [u8; 8] = [0x01, 0x03, 0x07, 0x0F, 0x1E, 0x3C, 0x78, 0xF8];
const EXTRA_BITS_8: [u32; 8] = [3, 3, 3, 3, 2, 1, 0, 0];

const VALUE_THRESHOLDS_16: [u16; 16] = [
    0x0001, 0x0003, 0x0007, 0x000F, 0x001E, 0x003C, 0x0078, 0x00F0, 0x01F0, 0x03F0, 0x07F0,
    0x0FF0, 0x1FF0, 0x3FF0, 0x7FF0, 0xFFF0,
];
const EXTRA_BITS_16: [u32; 16] = [4, 4, 4, 4, 3, 2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0];

const FLAG_COMPRESSED: u16 = 0x0001;
const FLAG_DELTA: u16 = 0x0002;
const FLAG_16BIT: u16 = 0x0004;
const FLAG_STEREO: u16 = 0x0100;
const FLAG_ABS16: u16 = 0x0200;
const FLAG_BIG_ENDIAN: u16 = 0x0400;

/// Decoder for standalone MMCMP files.
#[derive(Debug)]
pub struct MmcmpDecompressor<'a> {
    packed: BufferView<'a>,
    verify: bool,
    blocks: u32,
    blocks_offset: usize,
    raw_size: usize,
    packed_size: usize,
}

impl<'a> MmcmpDecompressor<'a> {
    /// Match the standalone magic.
    pub fn detect_header(header: u32) -> bool {
        header == fourcc(*b"ziRC")
    }

    /// Validate framing, walk the block table, and compute the packed
    /// extent of the file.
    pub fn new(packed_data: &'a [u8], options: &DecompressOptions) -> Result<Self> {
        let packed = BufferView::new(packed_data);
        let framing = |_| DepackError::InvalidFormat("truncated MMCMP header");
        if !Self::detect_header(packed.read_be32(0).map_err(framing)?)
            || packed.read_be32(4).map_err(framing)? != fourcc(*b"ONia")
            || packed.read_le16(8).map_err(framing)? != 14
            || packed.size() < 24
        {
            return Err(DepackError::InvalidFormat("not an MMCMP stream"));
        }
        let blocks = u32::from(packed.read_le16(12).map_err(framing)?);
        let raw_size = packed.read_le32(14).map_err(framing)? as usize;
        let blocks_offset = packed.read_le32(18).map_err(framing)? as usize;
        if blocks_offset as u64 + u64::from(blocks) * 4 > packed.size() as u64 {
            return Err(DepackError::InvalidFormat("MMCMP block table out of range"));
        }
        if raw_size > options.max_raw_size {
            return Err(DepackError::InvalidFormat(
                "declared raw size exceeds configured cap",
            ));
        }

        let mut packed_size: u64 = 0;
        for i in 0..blocks as usize {
            let block_addr = u64::from(packed.read_le32(blocks_offset + i * 4).map_err(framing)?);
            if block_addr + 20 >= packed.size() as u64 {
                return Err(DepackError::InvalidFormat(
                    "MMCMP block header out of range",
                ));
            }
            let block_size = u64::from(packed.read_le32(block_addr as usize + 4).map_err(framing)?)
                + u64::from(packed.read_le16(block_addr as usize + 12).map_err(framing)?) * 8
                + 20;
            packed_size = packed_size.max(block_addr + block_size);
        }
        if packed_size > packed.size() as u64 {
            return Err(DepackError::InvalidFormat("MMCMP block exceeds file"));
        }

        Ok(Self {
            packed,
            verify: options.verify,
            blocks,
            blocks_offset,
            raw_size,
            packed_size: packed_size as usize,
        })
    }

    /// Raw size declared by the file header.
    pub fn raw_size(&self) -> usize {
        self.raw_size
    }

    /// Smallest prefix of the input that contains every block.
    pub fn packed_size(&self) -> usize {
        self.packed_size
    }

    /// Decode every block into `raw`, which must hold at least the
    /// declared raw size. Gaps between sub-blocks stay zero.
    pub fn decompress(&self, raw: &mut [u8]) -> Result<()> {
        if raw.len() < self.raw_size {
            return Err(DepackError::Decompression(
                "output buffer smaller than declared raw size",
            ));
        }
        raw.fill(0);

        for i in 0..self.blocks as usize {
            let block_addr = self.packed.read_le32(self.blocks_offset + i * 4)? as usize;
            self.decompress_block(raw, block_addr)?;
        }
        Ok(())
    }

    fn decompress_block(&self, raw: &mut [u8], block_addr: usize) -> Result<()> {
        let unpacked_block_size = self.packed.read_le32(block_addr)?;
        let packed_block_size = self.packed.read_le32(block_addr + 4)? as usize;
        let file_checksum = self.packed.read_le32(block_addr + 8)?;
        let sub_blocks = u32::from(self.packed.read_le16(block_addr + 12)?);
        let flags = self.packed.read_le16(block_addr + 14)?;
        let pack_table_size = usize::from(self.packed.read_le16(block_addr + 16)?);
        let bit_count = u32::from(self.packed.read_le16(block_addr + 18)?);

        if pack_table_size > packed_block_size {
            return Err(DepackError::Decompression(
                "MMCMP pack table larger than block",
            ));
        }
        debug!(
            "MMCMP block at {block_addr}: flags {flags:#06x}, {sub_blocks} sub-block(s), \
             {packed_block_size} -> {unpacked_block_size} bytes"
        );

        let table_base = block_addr + sub_blocks as usize * 8 + 20;
        let mut stream = ForwardInputStream::new(
            &self.packed,
            table_base + pack_table_size,
            table_base + packed_block_size,
        )?;
        let mut writer = SubBlockWriter {
            packed: &self.packed,
            raw,
            raw_size: self.raw_size,
            block_addr,
            sub_blocks,
            current: 0,
            offset: 0,
            remaining: 0,
            checksum: 0,
            verify: self.verify,
        };

        if flags & FLAG_COMPRESSED == 0 {
            // literal block
            for _ in 0..packed_block_size {
                let value = stream.read_byte()?;
                writer.write_byte(value)?;
            }
        } else if flags & FLAG_16BIT == 0 {
            self.decode_8bit(
                &mut writer,
                LsbBitReader::new(stream),
                unpacked_block_size,
                flags,
                table_base,
                pack_table_size,
                bit_count,
            )?;
        } else {
            Self::decode_16bit(
                &mut writer,
                LsbBitReader::new(stream),
                unpacked_block_size,
                flags,
                bit_count,
            )?;
        }

        if self.verify && writer.checksum != file_checksum {
            return Err(DepackError::ChecksumMismatch {
                expected: file_checksum,
                actual: writer.checksum,
            });
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn decode_8bit(
        &self,
        writer: &mut SubBlockWriter<'_, 'a>,
        mut reader: LsbBitReader<ForwardInputStream<'a>>,
        unpacked_block_size: u32,
        flags: u16,
        table_base: usize,
        pack_table_size: usize,
        mut bit_count: u32,
    ) -> Result<()> {
        if bit_count >= 8 {
            return Err(DepackError::Decompression("MMCMP bit count out of range"));
        }
        let mut old_value = [0u8; 2];
        let mut channel = 0usize;
        let mut written = 0u32;
        while written < unpacked_block_size {
            let mut value = reader.read_bits8(bit_count + 1)?;
            if value >= u32::from(VALUE_THRESHOLDS_8[bit_count as usize]) {
                // escape: either a bit-width switch, a high symbol, or
                // (after 0xFF plus a set bit) the end of the block
                let extra = EXTRA_BITS_8[bit_count as usize];
                let new_bit_count = reader.read_bits8(extra)?
                    + ((value - u32::from(VALUE_THRESHOLDS_8[bit_count as usize])) << extra);
                if bit_count != new_bit_count {
                    bit_count = new_bit_count & 7;
                    continue;
                }
                value = 0xF8 + reader.read_bits8(3)?;
                if value == 0xFF && reader.read_bits8(1)? != 0 {
                    break;
                }
            }
            if value as usize >= pack_table_size {
                return Err(DepackError::Decompression(
                    "MMCMP symbol outside pack table",
                ));
            }
            let mut byte = self.packed.byte(table_base + value as usize)?;
            if flags & FLAG_DELTA != 0 {
                byte = byte.wrapping_add(old_value[channel]);
                old_value[channel] = byte;
                if flags & FLAG_STEREO != 0 {
                    channel ^= 1;
                }
            }
            writer.write_byte(byte)?;
            written += 1;
        }
        Ok(())
    }

    fn decode_16bit(
        writer: &mut SubBlockWriter<'_, 'a>,
        mut reader: LsbBitReader<ForwardInputStream<'a>>,
        unpacked_block_size: u32,
        flags: u16,
        mut bit_count: u32,
    ) -> Result<()> {
        if bit_count >= 16 {
            return Err(DepackError::Decompression("MMCMP bit count out of range"));
        }
        let mut old_value = [0i16; 2];
        let mut channel = 0usize;
        let mut written = 0u32;
        while written < unpacked_block_size {
            let mut value = reader.read_bits8(bit_count + 1)? as i32;
            if value >= i32::from(VALUE_THRESHOLDS_16[bit_count as usize]) {
                let extra = EXTRA_BITS_16[bit_count as usize];
                let new_bit_count = reader.read_bits8(extra)?
                    + ((value as u32 - u32::from(VALUE_THRESHOLDS_16[bit_count as usize])) << extra);
                if bit_count != new_bit_count {
                    bit_count = new_bit_count & 0xF;
                    continue;
                }
                value = 0xFFF0 + reader.read_bits8(4)? as i32;
                if value == 0xFFFF && reader.read_bits8(1)? != 0 {
                    break;
                }
            }
            // sign is folded into the low bit
            if value & 1 != 0 {
                value = -value - 1;
            }
            value >>= 1;
            if flags & FLAG_DELTA != 0 {
                value += i32::from(old_value[channel]);
                old_value[channel] = value as i16;
                if flags & FLAG_STEREO != 0 {
                    channel ^= 1;
                }
            }
            if flags & FLAG_ABS16 != 0 {
                value ^= 0x8000;
            }
            if flags & FLAG_BIG_ENDIAN != 0 {
                writer.write_byte((value >> 8) as u8)?;
                writer.write_byte(value as u8)?;
            } else {
                writer.write_byte(value as u8)?;
                writer.write_byte((value >> 8) as u8)?;
            }
            written += 2;
        }
        Ok(())
    }
}

/// Output cursor that advances through a block's sub-block descriptors,
/// folding the rotate-XOR checksum over every written byte.
#[derive(Debug)]
struct SubBlockWriter<'r, 'a> {
    packed: &'r BufferView<'a>,
    raw: &'r mut [u8],
    raw_size: usize,
    block_addr: usize,
    sub_blocks: u32,
    current: u32,
    offset: usize,
    remaining: usize,
    checksum: u32,
    verify: bool,
}

impl SubBlockWriter<'_, '_> {
    fn write_byte(&mut self, value: u8) -> Result<()> {
        while self.remaining == 0 {
            self.next_sub_block()?;
        }
        self.remaining -= 1;
        self.raw[self.offset] = value;
        self.offset += 1;
        if self.verify {
            self.checksum ^= u32::from(value);
            self.checksum = self.checksum.rotate_left(1);
        }
        Ok(())
    }

    fn next_sub_block(&mut self) -> Result<()> {
        if self.current >= self.sub_blocks {
            return Err(DepackError::Decompression(
                "MMCMP output ran past the last sub-block",
            ));
        }
        let base = self.block_addr + self.current as usize * 8 + 20;
        let offset = self.packed.read_le32(base)? as usize;
        let size = self.packed.read_le32(base + 4)? as usize;
        if offset as u64 + size as u64 > self.raw_size as u64 {
            return Err(DepackError::Decompression(
                "MMCMP sub-block exceeds declared raw size",
            ));
        }
        self.offset = offset;
        self.remaining = size;
        self.current += 1;
        Ok(())
    }
}
