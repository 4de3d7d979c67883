use thiserror::Error;

/// Failure of a single encode or decode call.
///
/// Every variant names the codec that produced it so a restore failure can be
/// attributed without extra context. An empty `Ok(Vec::new())` is only ever a
/// legitimate empty payload, never an error sentinel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The underlying compression context could not be created.
    #[error("{codec}: context init failed: {reason}")]
    Init { codec: &'static str, reason: String },

    /// The input is not a valid stream for this codec.
    #[error("{codec}: corrupt input: {reason}")]
    Corrupt { codec: &'static str, reason: String },

    /// The input ended before the codec saw the end of its stream.
    #[error("{codec}: input truncated before end of stream")]
    Truncated { codec: &'static str },

    /// The encoder ran out of its pre-sized output buffer.
    #[error("{codec}: output buffer of {capacity} bytes exhausted before end of stream")]
    BufferExhausted { codec: &'static str, capacity: usize },

    /// Decoded output would exceed the configured ceiling.
    #[error("{codec}: decoded output exceeds limit of {limit} bytes")]
    OutputLimit { codec: &'static str, limit: usize },
}

impl CodecError {
    pub fn codec(&self) -> &'static str {
        match self {
            Self::Init { codec, .. }
            | Self::Corrupt { codec, .. }
            | Self::Truncated { codec }
            | Self::BufferExhausted { codec, .. }
            | Self::OutputLimit { codec, .. } => codec,
        }
    }
}
