mod deflate;
mod lz4_codec;
mod rle;
mod zstd_codec;

pub use deflate::{deflate_bound, DeflateCodec, DEFAULT_DEFLATE_LEVEL};
pub use lz4_codec::Lz4Codec;
pub use rle::{
    escape_decode, escape_decode_limited, escape_encode, RunLengthCodec, ESCAPE, MAX_RUN, MIN_RUN,
};
pub use zstd_codec::{ZstdCodec, DEFAULT_ZSTD_LEVEL};

use chunkpress_core::format::{CODEC_DEFLATE, CODEC_LZ4, CODEC_RLE, CODEC_ZSTD};
use chunkpress_core::grow::GrowthPolicy;
use chunkpress_core::{Codec, CodecConfig, CodecKind};
use std::sync::Arc;

/// Resolve a codec from the `codec_id` stored in an archive header, with
/// default settings.
///
/// Levels only matter when encoding, so a default-configured codec can
/// restore anything its kind produced.
pub fn codec_by_id(id: u16) -> anyhow::Result<Arc<dyn Codec>> {
    match id {
        CODEC_DEFLATE => Ok(Arc::new(DeflateCodec::default())),
        CODEC_RLE => Ok(Arc::new(RunLengthCodec::default())),
        CODEC_ZSTD => Ok(Arc::new(ZstdCodec::default())),
        CODEC_LZ4 => Ok(Arc::new(Lz4Codec::default())),
        _ => anyhow::bail!(
            "unknown codec id {}; supported: 1 (deflate), 2 (rle), 3 (zstd), 4 (lz4)",
            id
        ),
    }
}

/// Build the codec a [`CodecConfig`] describes.
pub fn codec_from_config(config: &CodecConfig) -> Arc<dyn Codec> {
    let growth = GrowthPolicy::default().with_max_output(config.max_decoded_size);
    match config.kind {
        CodecKind::Deflate => Arc::new(
            DeflateCodec::new(config.level.unwrap_or(DEFAULT_DEFLATE_LEVEL)).with_growth(growth),
        ),
        CodecKind::Rle => Arc::new(RunLengthCodec::default().with_max_output(config.max_decoded_size)),
        CodecKind::Zstd => {
            let level = config
                .level
                .and_then(|l| i32::try_from(l).ok())
                .unwrap_or(DEFAULT_ZSTD_LEVEL);
            Arc::new(ZstdCodec::new(level).with_growth(growth))
        }
        CodecKind::Lz4 => Arc::new(Lz4Codec::default().with_max_output(config.max_decoded_size)),
    }
}
