use chunkpress_codecs::{
    deflate_bound, escape_decode, escape_encode, DeflateCodec, Lz4Codec, RunLengthCodec, ZstdCodec,
};
use chunkpress_core::Codec;
use proptest::prelude::*;

/// Byte vectors biased towards runs and literal 0xFF, the interesting cases for RLE.
fn runny_bytes() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(
        (prop_oneof![Just(0xFFu8), Just(0u8), any::<u8>()], 1usize..300),
        0..24,
    )
    .prop_map(|runs| {
        runs.into_iter()
            .flat_map(|(value, len)| std::iter::repeat(value).take(len))
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_rle_escape_round_trip(data in runny_bytes()) {
        let escaped = escape_encode(&data);
        prop_assert_eq!(escape_decode(&escaped).unwrap(), data);
    }

    #[test]
    fn prop_rle_random_round_trip(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
        prop_assert_eq!(escape_decode(&escape_encode(&data)).unwrap(), data);
    }

    #[test]
    fn prop_rle_codec_round_trip_when_smaller(data in runny_bytes()) {
        let codec = RunLengthCodec::default();
        let encoded = codec.encode(&data).unwrap();
        if encoded.len() < data.len() {
            prop_assert_eq!(codec.decode(&encoded).unwrap(), data);
        } else {
            prop_assert_eq!(encoded, data);
        }
    }

    #[test]
    fn prop_deflate_round_trip(
        data in proptest::collection::vec(any::<u8>(), 0..16384),
        level in 0u32..=9u32
    ) {
        let codec = DeflateCodec::new(level);
        let encoded = codec.encode(&data).unwrap();
        prop_assert_eq!(codec.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn prop_deflate_within_bound(
        data in proptest::collection::vec(any::<u8>(), 0..65536),
        level in 0u32..=9u32
    ) {
        let encoded = DeflateCodec::new(level).encode(&data).unwrap();
        prop_assert!(
            encoded.len() <= deflate_bound(data.len()),
            "encoded={} bound={}",
            encoded.len(),
            deflate_bound(data.len())
        );
    }

    #[test]
    fn prop_deflate_round_trip_runny(data in runny_bytes()) {
        let codec = DeflateCodec::default();
        prop_assert_eq!(codec.decode(&codec.encode(&data).unwrap()).unwrap(), data);
    }

    #[test]
    fn prop_zstd_round_trip(data in proptest::collection::vec(any::<u8>(), 0..16384)) {
        let codec = ZstdCodec::default();
        prop_assert_eq!(codec.decode(&codec.encode(&data).unwrap()).unwrap(), data);
    }

    #[test]
    fn prop_lz4_round_trip(data in proptest::collection::vec(any::<u8>(), 0..16384)) {
        let codec = Lz4Codec::default();
        prop_assert_eq!(codec.decode(&codec.encode(&data).unwrap()).unwrap(), data);
    }
}

#[test]
fn boundary_lengths_round_trip_for_every_codec() {
    let codecs: Vec<Box<dyn Codec>> = vec![
        Box::new(DeflateCodec::default()),
        Box::new(ZstdCodec::default()),
        Box::new(Lz4Codec::default()),
    ];
    for len in [0usize, 1, 2, 3, 255, 256] {
        for fill in [0x00u8, 0xFF, 0x41] {
            let data = vec![fill; len];
            for codec in &codecs {
                let encoded = codec.encode(&data).unwrap();
                assert_eq!(codec.decode(&encoded).unwrap(), data, "{} len={len}", codec.name());
            }
            assert_eq!(escape_decode(&escape_encode(&data)).unwrap(), data, "rle len={len}");
        }
    }
}

#[test]
fn deflate_bound_on_incompressible_input() {
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    let data: Vec<u8> = (0..1 << 18)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state as u8
        })
        .collect();
    let encoded = DeflateCodec::new(9).encode(&data).unwrap();
    assert!(encoded.len() <= deflate_bound(data.len()));
    assert!(encoded.len() >= data.len(), "random data should not shrink");
}
