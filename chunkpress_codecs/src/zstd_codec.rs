use zstd::stream::raw::{Decoder, Operation};

use chunkpress_core::format::CODEC_ZSTD;
use chunkpress_core::grow::{decode_growing, GrowthPolicy, Progress, StreamDecoder};
use chunkpress_core::{Codec, CodecError};

const NAME: &str = "zstd";

pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// Zstandard codec.
///
/// Each chunk is compressed as one independent frame at the configured level
/// (default: 3). Decode streams through the shared growing-buffer loop so a
/// missing or lying content-size field in the frame cannot mis-size the output.
///
/// Best for: logs, JSON, source trees, anything text-heavy.
#[derive(Debug, Clone)]
pub struct ZstdCodec {
    /// Compression level (1 = fast / larger, 22 = slow / smallest).
    pub level: i32,
    growth: GrowthPolicy,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self::new(DEFAULT_ZSTD_LEVEL)
    }
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        Self {
            level,
            growth: GrowthPolicy::default(),
        }
    }

    pub fn with_growth(mut self, growth: GrowthPolicy) -> Self {
        self.growth = growth;
        self
    }
}

impl Codec for ZstdCodec {
    fn id(&self) -> u16 {
        CODEC_ZSTD
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        zstd::bulk::compress(data, self.level).map_err(|e| CodecError::Corrupt {
            codec: NAME,
            reason: e.to_string(),
        })
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let inner = Decoder::new().map_err(|e| CodecError::Init {
            codec: NAME,
            reason: e.to_string(),
        })?;
        let mut frame = FrameDecoder { inner };
        decode_growing(&mut frame, data, &self.growth)
    }
}

struct FrameDecoder {
    inner: Decoder<'static>,
}

impl StreamDecoder for FrameDecoder {
    fn codec_name(&self) -> &'static str {
        NAME
    }

    fn step(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, CodecError> {
        let status = self
            .inner
            .run_on_buffers(input, output)
            .map_err(|e| CodecError::Corrupt {
                codec: NAME,
                reason: e.to_string(),
            })?;
        Ok(Progress {
            consumed: status.bytes_read,
            produced: status.bytes_written,
            // A zero hint means the frame is fully decoded and flushed.
            finished: status.remaining == 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_compressible() {
        let data: Vec<u8> = b"zstd frame payload ".iter().copied().cycle().take(300_000).collect();
        let codec = ZstdCodec::default();
        let encoded = codec.encode(&data).unwrap();
        assert!(encoded.len() * 4 < data.len());
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn truncated_frame_is_an_error() {
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let codec = ZstdCodec::default();
        let encoded = codec.encode(&data).unwrap();
        assert!(codec.decode(&encoded[..encoded.len() - 3]).is_err());
    }

    #[test]
    fn trailing_bytes_after_frame_are_corrupt() {
        let codec = ZstdCodec::default();
        let mut encoded = codec.encode(&vec![7u8; 5000]).unwrap();
        encoded.extend_from_slice(b"GARBAGE-TAIL");
        let err = codec.decode(&encoded).unwrap_err();
        assert!(matches!(err, CodecError::Corrupt { codec: "zstd", .. }), "got {err:?}");
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(ZstdCodec::default().decode(b"definitely not a zstd frame").is_err());
    }
}
