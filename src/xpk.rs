//! XPK container: outer framing and inner-format dispatch.
//!
//! The container contributes no compression of its own; it names an inner
//! format and hands that decoder the payload slice. Header layout, all
//! big-endian: the `XPKF` magic, the packed size excluding the 8-byte
//! preamble, the inner format id, one byte of header flags, one byte of
//! sub-version, a 16-bit header checksum, then the raw size leading the
//! reserved bytes. The XOR of the sixteen 16-bit header words must cancel
//! to zero.
//!
//! Some inner formats produce output that is itself an XPK container.
//! Unwrapping is explicit iteration with a depth counter, never native
//! recursion, so the bound holds on crafted input.

use log::debug;

use crate::buffer::BufferView;
use crate::common::{fourcc, DecompressOptions, DepackError, Result};
use crate::registry::find_xpk_inner;

/// Size of the fixed XPK stream header.
pub const XPK_HEADER_SIZE: usize = 32;

#[derive(Debug, Clone, Copy)]
struct XpkHeader {
    inner: u32,
    payload_start: usize,
    payload_end: usize,
    raw_size: usize,
}

fn parse_header(packed: &BufferView<'_>, options: &DecompressOptions) -> Result<XpkHeader> {
    let framing = |_| DepackError::InvalidFormat("truncated XPK header");
    if packed.size() < XPK_HEADER_SIZE {
        return Err(DepackError::InvalidFormat("truncated XPK header"));
    }
    if packed.read_be32(0).map_err(framing)? != fourcc(*b"XPKF") {
        return Err(DepackError::InvalidFormat("bad XPK magic"));
    }
    let total = u64::from(packed.read_be32(4).map_err(framing)?) + 8;
    if total < XPK_HEADER_SIZE as u64 || total > packed.size() as u64 {
        return Err(DepackError::InvalidFormat("XPK packed size out of range"));
    }
    let inner = packed.read_be32(8).map_err(framing)?;
    let flags = packed.byte(12).map_err(framing)?;
    let sub_version = packed.byte(13).map_err(framing)?;
    let raw_size = packed.read_be32(16).map_err(framing)? as usize;
    if raw_size == 0 {
        return Err(DepackError::InvalidFormat("XPK declares zero raw size"));
    }
    if raw_size > options.max_raw_size {
        return Err(DepackError::InvalidFormat(
            "declared raw size exceeds configured cap",
        ));
    }
    let mut word_xor = 0u16;
    for offset in (0..XPK_HEADER_SIZE).step_by(2) {
        word_xor ^= packed.read_be16(offset).map_err(framing)?;
    }
    if word_xor != 0 {
        return Err(DepackError::InvalidFormat("XPK header checksum mismatch"));
    }
    debug!(
        "XPK container: inner format {}, flags {flags:#04x}, sub-version {sub_version}",
        fourcc_display(inner)
    );
    Ok(XpkHeader {
        inner,
        payload_start: XPK_HEADER_SIZE,
        payload_end: total as usize,
        raw_size,
    })
}

/// Render a format id as four ASCII characters for diagnostics.
pub(crate) fn fourcc_display(tag: u32) -> String {
    tag.to_be_bytes()
        .iter()
        .map(|&b| if b.is_ascii_graphic() { b as char } else { '?' })
        .collect()
}

/// Decoder facade for XPK container files.
#[derive(Debug)]
pub struct XpkDecompressor<'a> {
    packed: BufferView<'a>,
    header: XpkHeader,
    options: DecompressOptions,
}

impl<'a> XpkDecompressor<'a> {
    /// Match the container magic.
    pub fn detect_header(header: u32) -> bool {
        header == fourcc(*b"XPKF")
    }

    /// Validate the outer framing and capture the declared sizes.
    pub fn new(packed_data: &'a [u8], options: &DecompressOptions) -> Result<Self> {
        let packed = BufferView::new(packed_data);
        let header = parse_header(&packed, options)?;
        Ok(Self {
            packed,
            header,
            options: *options,
        })
    }

    /// Name of the inner format, when registered.
    pub fn name(&self) -> &'static str {
        match find_xpk_inner(self.header.inner) {
            Some(descriptor) => descriptor.name,
            None => "XPK: unknown inner format",
        }
    }

    /// Raw size declared by the container header.
    pub fn raw_size(&self) -> usize {
        self.header.raw_size
    }

    /// Total container length, preamble included; trailing garbage beyond
    /// it is ignored.
    pub fn packed_size(&self) -> usize {
        self.header.payload_end
    }

    /// Dispatch the payload to the inner decoder and decode into `raw`,
    /// which must hold at least the declared raw size.
    pub fn decompress(&self, raw: &mut [u8]) -> Result<()> {
        if raw.len() < self.header.raw_size {
            return Err(DepackError::Decompression(
                "output buffer smaller than declared raw size",
            ));
        }
        let payload = self
            .packed
            .slice(self.header.payload_start, self.header.payload_end)?;
        decode_inner(
            self.header.inner,
            payload,
            &mut raw[..self.header.raw_size],
            0,
            &self.options,
        )
    }
}

/// Decode one inner payload, unwrapping nested containers iteratively.
pub(crate) fn decode_inner(
    inner: u32,
    payload: &[u8],
    raw: &mut [u8],
    depth: u32,
    options: &DecompressOptions,
) -> Result<()> {
    let mut inner = inner;
    let mut depth = depth;
    let mut owned: Vec<u8> = Vec::new();
    let mut range = 0..payload.len();
    let mut nested = false;
    loop {
        if depth >= options.max_recursion {
            return Err(DepackError::RecursionLimit(options.max_recursion));
        }
        let descriptor = find_xpk_inner(inner).ok_or(DepackError::UnknownFormat)?;
        debug!("XPK inner decoder: {}", descriptor.name);
        let data: &[u8] = if nested {
            &owned[range.clone()]
        } else {
            &payload[range.clone()]
        };
        let decoder = (descriptor.create)(inner, data)?;
        if !descriptor.recursive {
            return decoder.decompress(raw);
        }

        // The decoded output is itself an XPK container; materialise it,
        // unwrap the next header, and go around with the counter bumped.
        let intermediate_size = decoder.raw_size_hint().ok_or(DepackError::Decompression(
            "nested XPK stream without a declared size",
        ))?;
        if intermediate_size > options.max_raw_size {
            return Err(DepackError::InvalidFormat(
                "declared raw size exceeds configured cap",
            ));
        }
        let mut intermediate = vec![0u8; intermediate_size];
        decoder.decompress(&mut intermediate)?;
        let header = parse_header(&BufferView::new(&intermediate), options)?;
        if header.raw_size != raw.len() {
            return Err(DepackError::Decompression(
                "nested XPK container declares a different raw size",
            ));
        }
        inner = header.inner;
        range = header.payload_start..header.payload_end;
        owned = intermediate;
        nested = true;
        depth += 1;
    }
}
