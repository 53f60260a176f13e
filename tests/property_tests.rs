//! Property-based tests for the decompressor facade
//!
//! Randomized inputs exercise the hostile-input guarantees: dispatch and
//! decoding must terminate with a defined error or a full raw buffer, never
//! panic, never read or write out of bounds, and successful decodes must be
//! deterministic.

use depacker::{depack_bytes, DecompressOptions, Decompressor};
use proptest::prelude::*;

proptest! {
    #[test]
    fn arbitrary_input_never_panics(data in prop::collection::vec(any::<u8>(), 0..2048)) {
        // most random buffers are not valid packed streams; the only
        // requirement is a graceful error
        let _ = depack_bytes(&data);
    }
}

proptest! {
    #[test]
    fn mmcmp_magic_with_random_tail_never_panics(
        tail in prop::collection::vec(any::<u8>(), 0..1024)
    ) {
        let mut data = b"ziRCONia\x0E\x00".to_vec();
        data.extend_from_slice(&tail);
        let _ = depack_bytes(&data);
    }
}

proptest! {
    #[test]
    fn xpk_magic_with_random_tail_never_panics(
        tail in prop::collection::vec(any::<u8>(), 0..1024)
    ) {
        let mut data = b"XPKF".to_vec();
        data.extend_from_slice(&tail);
        let _ = depack_bytes(&data);
    }
}

proptest! {
    #[test]
    fn successful_decodes_are_deterministic(
        tail in prop::collection::vec(any::<u8>(), 0..512)
    ) {
        for magic in [&b"ziRCONia"[..], &b"XPKF"[..]] {
            let mut data = magic.to_vec();
            data.extend_from_slice(&tail);
            if let Ok(first) = depack_bytes(&data) {
                let second = depack_bytes(&data).unwrap();
                prop_assert_eq!(&first, &second);
            }
        }
    }
}

proptest! {
    #[test]
    fn decoded_output_never_exceeds_declared_size(
        tail in prop::collection::vec(any::<u8>(), 0..512)
    ) {
        let mut data = b"ziRCONia\x0E\x00".to_vec();
        data.extend_from_slice(&tail);
        let options = DecompressOptions::default();
        if let Ok(decompressor) = Decompressor::new(&data, &options) {
            prop_assert!(decompressor.raw_size() <= options.max_raw_size);
            prop_assert!(decompressor.packed_size() <= data.len());
        }
    }
}
