//! Growing-buffer decode loop shared by streaming decoders.
//!
//! Stream formats such as zlib do not record the decoded size, so the output
//! buffer is sized from a guess and doubled each time the decoder fills it
//! before reporting end of stream. Doubling keeps the number of reallocations
//! at O(log(final / initial)).

use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Outcome of one decoder step over the unread input and unwritten output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    /// Input bytes consumed by this step.
    pub consumed: usize,
    /// Output bytes written by this step.
    pub produced: usize,
    /// The decoder reached the end of its stream.
    pub finished: bool,
}

/// A decoder that can be driven incrementally into caller-provided buffers.
///
/// Implementations wrap a fresh decompression context; the loop below never
/// reuses one across payloads.
pub trait StreamDecoder {
    fn codec_name(&self) -> &'static str;

    /// Decode as much of `input` into `output` as possible.
    fn step(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, CodecError>;
}

/// Sizing rules for [`decode_growing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthPolicy {
    /// Initial capacity as a multiple of the input length.
    pub initial_factor: usize,
    /// Floor for the initial capacity.
    pub min_capacity: usize,
    /// Hard ceiling on decoded output, if any.
    pub max_output: Option<usize>,
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self {
            initial_factor: 4,
            min_capacity: 64,
            max_output: None,
        }
    }
}

impl GrowthPolicy {
    pub fn with_max_output(mut self, limit: Option<usize>) -> Self {
        self.max_output = limit;
        self
    }

    fn initial_capacity(&self, input_len: usize) -> usize {
        let guess = input_len
            .saturating_mul(self.initial_factor)
            .max(self.min_capacity)
            .max(1);
        match self.max_output {
            Some(limit) => guess.min(limit.max(1)),
            None => guess,
        }
    }
}

/// Run `decoder` over `input` until end of stream, growing the output buffer
/// by doubling whenever it fills up. The result is trimmed to exactly the
/// bytes produced.
///
/// Fails with [`CodecError::Truncated`] when the decoder stops making
/// progress while output space remains (the input ran out mid-stream),
/// with [`CodecError::OutputLimit`] when growth would cross
/// `policy.max_output`, and with [`CodecError::Corrupt`] when input is left
/// over after the decoder reports end of stream.
pub fn decode_growing<D>(
    decoder: &mut D,
    input: &[u8],
    policy: &GrowthPolicy,
) -> Result<Vec<u8>, CodecError>
where
    D: StreamDecoder + ?Sized,
{
    let mut out = vec![0u8; policy.initial_capacity(input.len())];
    let mut read = 0usize;
    let mut written = 0usize;

    loop {
        let step = decoder.step(&input[read..], &mut out[written..])?;
        read += step.consumed;
        written += step.produced;

        if step.finished {
            if read != input.len() {
                return Err(CodecError::Corrupt {
                    codec: decoder.codec_name(),
                    reason: format!(
                        "{} trailing bytes after end of stream",
                        input.len() - read
                    ),
                });
            }
            out.truncate(written);
            return Ok(out);
        }

        if written == out.len() {
            let current = out.len();
            let next = match policy.max_output {
                Some(limit) if current >= limit => {
                    return Err(CodecError::OutputLimit {
                        codec: decoder.codec_name(),
                        limit,
                    });
                }
                Some(limit) => current.saturating_mul(2).min(limit),
                None => current.saturating_mul(2),
            };
            trace!("{}: output full at {} bytes, growing to {}", decoder.codec_name(), current, next);
            out.resize(next, 0);
            continue;
        }

        if step.consumed == 0 && step.produced == 0 {
            return Err(CodecError::Truncated {
                codec: decoder.codec_name(),
            });
        }
    }
}
