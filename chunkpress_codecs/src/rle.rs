use log::trace;

use chunkpress_core::format::CODEC_RLE;
use chunkpress_core::{Codec, CodecError};

const NAME: &str = "rle";

/// Marker byte opening every escape sequence.
pub const ESCAPE: u8 = 0xFF;

/// Shortest run worth a 3-byte escape triple.
pub const MIN_RUN: usize = 3;

/// Longest run one triple can describe.
pub const MAX_RUN: usize = 255;

/// Escape-coded run-length codec.
///
/// Stream format, scanned left to right:
/// - `[0xFF][count][value]`: `value` repeated `count` (3..=255) times
/// - `[0xFF][0x00]`: a literal `0xFF`
/// - any other byte: itself
///
/// The stream is self-describing and needs no external dependency. `encode`
/// declines (returns the input unchanged) when escape coding would not make
/// the payload smaller; the engine sees no size gain and stores it raw.
///
/// Best for: sparse images, zero-filled regions, padded records.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunLengthCodec {
    max_output: Option<usize>,
}

impl RunLengthCodec {
    /// Cap the bytes a single decode may produce.
    pub fn with_max_output(mut self, limit: Option<usize>) -> Self {
        self.max_output = limit;
        self
    }
}

impl Codec for RunLengthCodec {
    fn id(&self) -> u16 {
        CODEC_RLE
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let escaped = escape_encode(data);
        if escaped.len() >= data.len() {
            trace!("rle: {} -> {} bytes, declining", data.len(), escaped.len());
            return Ok(data.to_vec());
        }
        Ok(escaped)
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        escape_decode_limited(data, self.max_output)
    }
}

/// Escape-code `data` unconditionally.
pub fn escape_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        let value = data[i];
        let run = data[i..]
            .iter()
            .take(MAX_RUN)
            .take_while(|&&b| b == value)
            .count();

        if run >= MIN_RUN {
            out.extend_from_slice(&[ESCAPE, run as u8, value]);
        } else {
            for _ in 0..run {
                push_literal(&mut out, value);
            }
        }
        i += run;
    }
    out
}

fn push_literal(out: &mut Vec<u8>, value: u8) {
    if value == ESCAPE {
        out.extend_from_slice(&[ESCAPE, 0x00]);
    } else {
        out.push(value);
    }
}

/// Decode an escape-coded stream. A stream ending inside an escape sequence
/// is [`CodecError::Truncated`].
pub fn escape_decode(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    escape_decode_limited(data, None)
}

/// [`escape_decode`] that fails with [`CodecError::OutputLimit`] as soon as the
/// output would grow past `limit` bytes.
pub fn escape_decode_limited(data: &[u8], limit: Option<usize>) -> Result<Vec<u8>, CodecError> {
    let ceiling = limit.unwrap_or(usize::MAX);
    let mut out = Vec::with_capacity(data.len().saturating_mul(2).min(ceiling));
    let mut i = 0;
    while i < data.len() {
        let (value, count, width) = match data[i] {
            ESCAPE => match (data.get(i + 1), data.get(i + 2)) {
                (Some(0), _) => (ESCAPE, 1, 2),
                (Some(&count), Some(&value)) => (value, count as usize, 3),
                _ => return Err(CodecError::Truncated { codec: NAME }),
            },
            b => (b, 1, 1),
        };
        if out.len() + count > ceiling {
            return Err(CodecError::OutputLimit {
                codec: NAME,
                limit: ceiling,
            });
        }
        out.resize(out.len() + count, value);
        i += width;
    }
    Ok(out)
}
