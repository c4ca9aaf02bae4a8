//! Property tests for the value codec: decoders must reject malformed
//! payloads with an error, never panic or fabricate data.

use proptest::prelude::*;

use isoscope::registry::value::{
    decode_guid, decode_string, decode_u32, decode_u64, encode_string, encode_u32, encode_u64,
};

proptest! {
    #[test]
    fn decode_string_never_panics(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode_string(&data);
    }

    #[test]
    fn decode_integers_never_panic(data in proptest::collection::vec(any::<u8>(), 0..32)) {
        let _ = decode_u32(&data);
        let _ = decode_u64(&data);
        let _ = decode_guid(&data);
    }

    #[test]
    fn string_round_trip(s in "\\PC*") {
        prop_assume!(!s.contains('\u{0}'));
        prop_assert_eq!(decode_string(&encode_string(&s)).unwrap(), s);
    }

    #[test]
    fn u32_round_trip(v in any::<u32>()) {
        prop_assert_eq!(decode_u32(&encode_u32(v)).unwrap(), v);
    }

    #[test]
    fn u64_round_trip(v in any::<u64>()) {
        prop_assert_eq!(decode_u64(&encode_u64(v)).unwrap(), v);
    }

    #[test]
    fn undersized_integers_always_fail(data in proptest::collection::vec(any::<u8>(), 0..4)) {
        prop_assert!(decode_u32(&data).is_err());
        prop_assert!(decode_u64(&data).is_err());
    }

    #[test]
    fn oversized_integers_use_leading_bytes(
        v in any::<u32>(),
        extra in proptest::collection::vec(any::<u8>(), 1..16),
    ) {
        let mut data = encode_u32(v);
        data.extend_from_slice(&extra);
        prop_assert_eq!(decode_u32(&data).unwrap(), v);
    }

    #[test]
    fn guid_requires_full_payload(data in proptest::collection::vec(any::<u8>(), 0..16)) {
        prop_assert!(decode_guid(&data).is_err());
    }
}
