//! Decompressor library for legacy Amiga-era packed formats.
//!
//! This crate decodes compressed byte streams from the Amiga ecosystem back
//! into their original representation: XPK container sub-formats (HFMN,
//! LZW4) and standalone wrappers (MMCMP). The caller supplies a fully
//! materialised packed buffer; the crate identifies the format from its
//! header, validates the framing, and reconstructs the raw data in a single
//! call, optionally verifying embedded checksums.
//!
//! Decoding only — there is no encoder, no streaming mode, and no attempt
//! to salvage corrupt input.
//!
//! # Example
//!
//! ```no_run
//! use depacker::{depack_bytes, DecompressOptions, Decompressor};
//!
//! // One-shot convenience
//! let packed = std::fs::read("module.mmcmp")?;
//! let raw = depack_bytes(&packed)?;
//!
//! // Or inspect before decoding
//! let options = DecompressOptions::default();
//! let decompressor = Decompressor::new(&packed, &options)?;
//! println!("{}: {} packed bytes", decompressor.name(), decompressor.packed_size());
//! let mut raw = vec![0u8; decompressor.raw_size()];
//! decompressor.decompress(&mut raw)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod bits;
pub mod buffer;
pub mod common;
pub mod error;
pub mod formats;
pub mod huffman;
pub mod registry;
pub mod streams;
pub mod xpk;

// Re-export commonly used types
pub use common::{
    fourcc, DecompressOptions, DepackError, Result, DEFAULT_MAX_RAW_SIZE, DEFAULT_RECURSION_LIMIT,
};

use formats::MmcmpDecompressor;
use xpk::XpkDecompressor;

/// A decompressor bound to one packed buffer.
///
/// The variant is chosen by registry dispatch over the buffer's first four
/// bytes; each variant carries its own validated framing state. Nothing
/// here outlives the borrowed buffer.
#[derive(Debug)]
pub enum Decompressor<'a> {
    /// Standalone MMCMP stream
    Mmcmp(MmcmpDecompressor<'a>),
    /// XPK container wrapping an inner format
    Xpk(XpkDecompressor<'a>),
}

impl<'a> Decompressor<'a> {
    /// Identify the format of `packed` and validate its framing.
    ///
    /// Detectors run in registration order; the first match wins. A buffer
    /// matching no detector is [`DepackError::UnknownFormat`].
    pub fn new(packed: &'a [u8], options: &DecompressOptions) -> Result<Self> {
        if packed.len() < 4 {
            return Err(DepackError::UnknownFormat);
        }
        let header = u32::from_be_bytes([packed[0], packed[1], packed[2], packed[3]]);
        let descriptor = registry::find_standalone(header).ok_or(DepackError::UnknownFormat)?;
        log::debug!(
            "dispatching {} byte buffer to {}",
            packed.len(),
            descriptor.name
        );
        (descriptor.create)(packed, options)
    }

    /// Human-readable name of the detected format.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mmcmp(_) => "MMCMP: Music Module Compressor",
            Self::Xpk(container) => container.name(),
        }
    }

    /// Raw size declared by the packed stream.
    pub fn raw_size(&self) -> usize {
        match self {
            Self::Mmcmp(decoder) => decoder.raw_size(),
            Self::Xpk(container) => container.raw_size(),
        }
    }

    /// Length of the packed stream itself; trailing bytes beyond it are
    /// not part of the format and are never read.
    pub fn packed_size(&self) -> usize {
        match self {
            Self::Mmcmp(decoder) => decoder.packed_size(),
            Self::Xpk(container) => container.packed_size(),
        }
    }

    /// Decode the packed stream into `raw`.
    ///
    /// The buffer must hold at least the declared raw size. On failure the
    /// buffer contents are unspecified; no partial output is ever valid.
    pub fn decompress(&self, raw: &mut [u8]) -> Result<()> {
        match self {
            Self::Mmcmp(decoder) => decoder.decompress(raw),
            Self::Xpk(container) => container.decompress(raw),
        }
    }
}

/// Identify, validate, and decode `packed` in one call.
///
/// Allocates the raw buffer from the declared raw size and verifies
/// embedded checksums.
pub fn depack_bytes(packed: &[u8]) -> Result<Vec<u8>> {
    let options = DecompressOptions::default();
    let decompressor = Decompressor::new(packed, &options)?;
    let mut raw = vec![0u8; decompressor.raw_size()];
    decompressor.decompress(&mut raw)?;
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_format() {
        assert!(matches!(
            Decompressor::new(b"", &DecompressOptions::default()),
            Err(DepackError::UnknownFormat)
        ));
        assert!(matches!(
            Decompressor::new(b"zi", &DecompressOptions::default()),
            Err(DepackError::UnknownFormat)
        ));
        assert!(matches!(
            depack_bytes(b"NOPE-not-a-packed-stream"),
            Err(DepackError::UnknownFormat)
        ));
    }

    #[test]
    fn test_known_magic_bad_framing_is_invalid_format() {
        // MMCMP magic with a truncated header dispatches but fails framing
        assert!(matches!(
            depack_bytes(b"ziRCONia"),
            Err(DepackError::InvalidFormat(_))
        ));
    }
}
