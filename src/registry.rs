//! Format registries and first-match dispatch.
//!
//! Two compile-time descriptor arrays: one for standalone formats matched
//! against the first four bytes of a packed buffer, one for XPK inner
//! formats matched against the container's inner format id. Detection runs
//! in registration order and the first match wins. The arrays are plain
//! statics, never mutated, so dispatch is safe to share across threads.

use crate::common::{DecompressOptions, Result};
use crate::formats::{
    HfmnDecompressor, Lzw4Decompressor, MmcmpDecompressor, XpkInnerDecompressor,
};
use crate::xpk::XpkDecompressor;
use crate::Decompressor;

/// Constructor signature for standalone formats.
pub type CreateFn = for<'a> fn(&'a [u8], &DecompressOptions) -> Result<Decompressor<'a>>;

/// Constructor signature for XPK inner formats.
pub type XpkCreateFn = for<'a> fn(u32, &'a [u8]) -> Result<XpkInnerDecompressor<'a>>;

/// A standalone format known to the dispatcher.
#[derive(Debug)]
pub struct FormatDescriptor {
    /// Human-readable format name
    pub name: &'static str,
    /// Header predicate over the first four bytes, big-endian
    pub detect: fn(u32) -> bool,
    /// Constructor invoked when `detect` matches
    pub create: CreateFn,
}

/// An XPK inner format, selected by the container's inner format id.
#[derive(Debug)]
pub struct XpkFormatDescriptor {
    /// Human-readable format name
    pub name: &'static str,
    /// Predicate over the inner format id
    pub detect: fn(u32) -> bool,
    /// Constructor invoked when `detect` matches
    pub create: XpkCreateFn,
    /// Whether the decoded output is itself an XPK container
    pub recursive: bool,
}

fn create_mmcmp<'a>(data: &'a [u8], options: &DecompressOptions) -> Result<Decompressor<'a>> {
    Ok(Decompressor::Mmcmp(MmcmpDecompressor::new(data, options)?))
}

fn create_xpk<'a>(data: &'a [u8], options: &DecompressOptions) -> Result<Decompressor<'a>> {
    Ok(Decompressor::Xpk(XpkDecompressor::new(data, options)?))
}

fn create_hfmn<'a>(header: u32, payload: &'a [u8]) -> Result<XpkInnerDecompressor<'a>> {
    Ok(XpkInnerDecompressor::Hfmn(HfmnDecompressor::new(
        header, payload,
    )?))
}

fn create_lzw4<'a>(header: u32, payload: &'a [u8]) -> Result<XpkInnerDecompressor<'a>> {
    Ok(XpkInnerDecompressor::Lzw4(Lzw4Decompressor::new(
        header, payload,
    )?))
}

/// Standalone formats, in dispatch order.
pub static STANDALONE_FORMATS: &[FormatDescriptor] = &[
    FormatDescriptor {
        name: "MMCMP: Music Module Compressor",
        detect: MmcmpDecompressor::detect_header,
        create: create_mmcmp,
    },
    FormatDescriptor {
        name: "XPK container",
        detect: XpkDecompressor::detect_header,
        create: create_xpk,
    },
];

/// XPK inner formats, in dispatch order.
pub static XPK_INNER_FORMATS: &[XpkFormatDescriptor] = &[
    XpkFormatDescriptor {
        name: "XPK-HFMN: Huffman compressor",
        detect: HfmnDecompressor::detect_header_xpk,
        create: create_hfmn,
        recursive: false,
    },
    XpkFormatDescriptor {
        name: "XPK-LZW4: LZW4 CyberYAFA compressor",
        detect: Lzw4Decompressor::detect_header_xpk,
        create: create_lzw4,
        recursive: false,
    },
];

/// First standalone descriptor whose detector matches `header`.
pub fn find_standalone(header: u32) -> Option<&'static FormatDescriptor> {
    STANDALONE_FORMATS.iter().find(|d| (d.detect)(header))
}

/// First XPK inner descriptor whose detector matches `inner`.
pub fn find_xpk_inner(inner: u32) -> Option<&'static XpkFormatDescriptor> {
    XPK_INNER_FORMATS.iter().find(|d| (d.detect)(inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fourcc;

    #[test]
    fn test_standalone_dispatch() {
        assert_eq!(
            find_standalone(fourcc(*b"ziRC")).unwrap().name,
            "MMCMP: Music Module Compressor"
        );
        assert_eq!(find_standalone(fourcc(*b"XPKF")).unwrap().name, "XPK container");
        assert!(find_standalone(fourcc(*b"IMP!")).is_none());
    }

    #[test]
    fn test_xpk_inner_dispatch() {
        assert!(find_xpk_inner(fourcc(*b"HFMN")).is_some());
        assert!(find_xpk_inner(fourcc(*b"LZW4")).is_some());
        assert!(find_xpk_inner(fourcc(*b"LZBS")).is_none());
    }
}
