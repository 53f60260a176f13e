//! Common types shared by every decoder in the crate.
//!
//! This module defines the error taxonomy, the crate-wide `Result` alias,
//! and the options that bound a single decompression call.

use thiserror::Error;

/// Default cap on XPK container nesting depth.
pub const DEFAULT_RECURSION_LIMIT: u32 = 4;

/// Default cap on the declared raw size of a packed stream (256 MiB).
pub const DEFAULT_MAX_RAW_SIZE: usize = 0x1000_0000;

/// Error type for decompression operations
#[derive(Debug, Error)]
pub enum DepackError {
    /// No registered format matched the buffer's header
    #[error("unknown or unsupported format")]
    UnknownFormat,

    /// The framing of the packed stream is inconsistent
    #[error("invalid format: {0}")]
    InvalidFormat(&'static str),

    /// The packed payload violated a decoder invariant
    #[error("decompression error: {0}")]
    Decompression(&'static str),

    /// Decoding completed but an embedded checksum disagreed
    #[error("checksum mismatch: expected {expected:08X}, got {actual:08X}")]
    ChecksumMismatch {
        /// Checksum stored in the packed stream
        expected: u32,
        /// Checksum computed over the decoded output
        actual: u32,
    },

    /// XPK container nesting exceeded the configured depth cap
    #[error("recursion limit {0} exceeded")]
    RecursionLimit(u32),
}

/// Result type alias for decompression operations
pub type Result<T> = std::result::Result<T, DepackError>;

/// Options bounding a single decompression call.
///
/// Both caps are enforced when a decompressor is constructed; there is no
/// mid-call cancellation.
#[derive(Debug, Clone, Copy)]
pub struct DecompressOptions {
    /// Verify embedded checksums while decoding
    pub verify: bool,
    /// Maximum XPK container nesting depth
    pub max_recursion: u32,
    /// Maximum accepted declared raw size
    pub max_raw_size: usize,
}

impl Default for DecompressOptions {
    fn default() -> Self {
        Self {
            verify: true,
            max_recursion: DEFAULT_RECURSION_LIMIT,
            max_raw_size: DEFAULT_MAX_RAW_SIZE,
        }
    }
}

/// Interpret a four-character tag as a big-endian 32-bit format id.
pub const fn fourcc(tag: [u8; 4]) -> u32 {
    u32::from_be_bytes(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc() {
        assert_eq!(fourcc(*b"XPKF"), 0x58504B46);
        assert_eq!(fourcc(*b"ziRC"), 0x7A695243);
    }

    #[test]
    fn test_default_options() {
        let options = DecompressOptions::default();
        assert!(options.verify);
        assert_eq!(options.max_recursion, DEFAULT_RECURSION_LIMIT);
        assert_eq!(options.max_raw_size, DEFAULT_MAX_RAW_SIZE);
    }
}
