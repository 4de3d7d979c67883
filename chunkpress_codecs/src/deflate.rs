use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use log::trace;

use chunkpress_core::format::CODEC_DEFLATE;
use chunkpress_core::grow::{decode_growing, GrowthPolicy, Progress, StreamDecoder};
use chunkpress_core::{Codec, CodecError};

const NAME: &str = "deflate";

/// Bytes the zlib wrapper adds around a raw DEFLATE stream (2 header + 4 adler32).
const ZLIB_WRAPPER_LEN: usize = 6;

pub const DEFAULT_DEFLATE_LEVEL: u32 = 6;

/// Worst-case zlib output size for `len` input bytes.
///
/// This is zlib's conservative `deflateBound` (valid for any window and memory
/// settings) plus the wrapper. Incompressible input degrades to stored blocks,
/// which stay well inside it.
pub fn deflate_bound(len: usize) -> usize {
    len + ((len + 7) >> 3) + ((len + 63) >> 6) + 5 + ZLIB_WRAPPER_LEN
}

/// zlib-wrapped DEFLATE codec.
///
/// The stream carries no record of the original size, so decode runs the
/// growing-buffer loop from a 4× guess. Encoded bytes are only
/// self-describing to the extent that zlib detects corruption; whether a
/// chunk was compressed at all has to be tracked by the caller.
///
/// Best for: general-purpose file data, text, mixed binary.
#[derive(Debug, Clone)]
pub struct DeflateCodec {
    level: u32,
    growth: GrowthPolicy,
}

impl Default for DeflateCodec {
    fn default() -> Self {
        Self::new(DEFAULT_DEFLATE_LEVEL)
    }
}

impl DeflateCodec {
    /// Levels above 9 are clamped to 9.
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
            growth: GrowthPolicy::default(),
        }
    }

    pub fn with_growth(mut self, growth: GrowthPolicy) -> Self {
        self.growth = growth;
        self
    }

    pub fn level(&self) -> u32 {
        self.level
    }
}

impl Codec for DeflateCodec {
    fn id(&self) -> u16 {
        CODEC_DEFLATE
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut stream = Compress::new(Compression::new(self.level), true);
        let capacity = deflate_bound(data.len());
        let mut out = Vec::with_capacity(capacity);

        loop {
            let read = stream.total_in() as usize;
            let written = out.len();
            let status = stream
                .compress_vec(&data[read..], &mut out, FlushCompress::Finish)
                .map_err(|e| CodecError::Corrupt {
                    codec: NAME,
                    reason: e.to_string(),
                })?;
            if status == Status::StreamEnd {
                break;
            }
            let stalled = stream.total_in() as usize == read && out.len() == written;
            if out.len() == out.capacity() || stalled {
                return Err(CodecError::BufferExhausted {
                    codec: NAME,
                    capacity,
                });
            }
        }

        trace!("deflate: {} -> {} bytes (bound {})", data.len(), out.len(), capacity);
        out.shrink_to_fit();
        Ok(out)
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut inflater = Inflater {
            inner: Decompress::new(true),
        };
        decode_growing(&mut inflater, data, &self.growth)
    }
}

struct Inflater {
    inner: Decompress,
}

impl StreamDecoder for Inflater {
    fn codec_name(&self) -> &'static str {
        NAME
    }

    fn step(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, CodecError> {
        let before_in = self.inner.total_in();
        let before_out = self.inner.total_out();
        let status = self
            .inner
            .decompress(input, output, FlushDecompress::None)
            .map_err(|e| CodecError::Corrupt {
                codec: NAME,
                reason: e.to_string(),
            })?;
        Ok(Progress {
            consumed: (self.inner.total_in() - before_in) as usize,
            produced: (self.inner.total_out() - before_out) as usize,
            finished: status == Status::StreamEnd,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_round_trips() {
        let codec = DeflateCodec::default();
        let encoded = codec.encode(&[]).unwrap();
        assert!(!encoded.is_empty(), "zlib wrapper is never empty");
        assert!(encoded.len() <= deflate_bound(0));
        assert_eq!(codec.decode(&encoded).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn decode_grows_well_past_four_times_input() {
        // 1 MiB of zeros compresses to ~1 KiB, so the 4x guess is far too small.
        let data = vec![0u8; 1 << 20];
        let codec = DeflateCodec::default();
        let encoded = codec.encode(&data).unwrap();
        assert!(encoded.len() * 4 < data.len());
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn every_level_round_trips() {
        let data: Vec<u8> = b"backup chunk payload with some repetition. "
            .iter()
            .copied()
            .cycle()
            .take(20_000)
            .collect();
        for level in 0..=9 {
            let codec = DeflateCodec::new(level);
            let encoded = codec.encode(&data).unwrap();
            assert!(encoded.len() <= deflate_bound(data.len()), "level {level}");
            assert_eq!(codec.decode(&encoded).unwrap(), data, "level {level}");
        }
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let data: Vec<u8> = (0..50_000u32).map(|i| (i % 97) as u8).collect();
        let codec = DeflateCodec::default();
        let encoded = codec.encode(&data).unwrap();
        let cut = &encoded[..encoded.len() / 2];
        let err = codec.decode(cut).unwrap_err();
        assert!(
            matches!(err, CodecError::Truncated { .. } | CodecError::Corrupt { .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn garbage_is_an_error() {
        let codec = DeflateCodec::default();
        assert!(codec.decode(&[0x12, 0x34, 0x56, 0x78, 0x9a]).is_err());
        assert!(codec.decode(&[]).is_err());
    }

    #[test]
    fn trailing_bytes_after_stream_are_corrupt() {
        let codec = DeflateCodec::default();
        let mut encoded = codec.encode(&vec![7u8; 5000]).unwrap();
        encoded.extend_from_slice(b"GARBAGE-TAIL");
        let err = codec.decode(&encoded).unwrap_err();
        assert!(matches!(err, CodecError::Corrupt { codec: "deflate", .. }), "got {err:?}");
    }

    #[test]
    fn decoded_size_limit_applies() {
        let data = vec![0u8; 100_000];
        let codec = DeflateCodec::default().with_growth(GrowthPolicy::default().with_max_output(Some(10_000)));
        let encoded = codec.encode(&data).unwrap();
        let err = codec.decode(&encoded).unwrap_err();
        assert_eq!(
            err,
            CodecError::OutputLimit {
                codec: "deflate",
                limit: 10_000
            }
        );
    }

    #[test]
    fn level_is_clamped() {
        assert_eq!(DeflateCodec::new(42).level(), 9);
    }
}
