use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use chunkpress_core::format::CODEC_LZ4;
use chunkpress_core::{Codec, CodecError};

const NAME: &str = "lz4";

/// LZ4 block codec.
///
/// Fastest of the bundled codecs, with the weakest ratio. The block is
/// prefixed with its decoded length, so decode sizes its buffer exactly.
/// That prefix is checked against the configured ceiling before any buffer
/// is allocated.
///
/// Best for: large hot datasets where backup throughput matters more than size.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Codec {
    max_output: Option<usize>,
}

impl Lz4Codec {
    /// Cap the bytes a single decode may produce.
    pub fn with_max_output(mut self, limit: Option<usize>) -> Self {
        self.max_output = limit;
        self
    }
}

impl Codec for Lz4Codec {
    fn id(&self) -> u16 {
        CODEC_LZ4
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(compress_prepend_size(data))
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if let (Some(limit), Some(prefix)) = (self.max_output, data.get(..4)) {
            let declared = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
            if declared as usize > limit {
                return Err(CodecError::OutputLimit { codec: NAME, limit });
            }
        }
        decompress_size_prepended(data).map_err(|e| CodecError::Corrupt {
            codec: NAME,
            reason: e.to_string(),
        })
    }
}
