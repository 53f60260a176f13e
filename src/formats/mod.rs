//! Per-format decoder state machines.
//!
//! Each decoder validates its own framing at construction and decodes in a
//! single call; all of them borrow the caller's buffers for the duration of
//! that call and own nothing afterwards.

mod hfmn;
mod lzw4;
mod mmcmp;

pub use hfmn::HfmnDecompressor;
pub use lzw4::Lzw4Decompressor;
pub use mmcmp::MmcmpDecompressor;

use crate::common::Result;

/// Decoder for one XPK inner payload, selected by the container's inner
/// format id.
#[derive(Debug)]
pub enum XpkInnerDecompressor<'a> {
    /// XPK-HFMN Huffman stream
    Hfmn(HfmnDecompressor<'a>),
    /// XPK-LZW4 back-reference stream
    Lzw4(Lzw4Decompressor<'a>),
}

impl XpkInnerDecompressor<'_> {
    /// Decode the inner payload into `raw`.
    pub fn decompress(&self, raw: &mut [u8]) -> Result<()> {
        match self {
            Self::Hfmn(decoder) => decoder.decompress(raw),
            Self::Lzw4(decoder) => decoder.decompress(raw),
        }
    }

    /// Intermediate size declared by the inner stream itself, when the
    /// format frames one. Required of formats registered as recursive.
    pub fn raw_size_hint(&self) -> Option<usize> {
        match self {
            Self::Hfmn(decoder) => Some(decoder.raw_size()),
            Self::Lzw4(_) => None,
        }
    }
}
