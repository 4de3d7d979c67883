use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::advisor::{AdvisorConfig, CompressionAdvisor};
use crate::codec::Codec;
use crate::error::CodecError;
use crate::metrics::CompressionMetrics;

/// Minimum fraction of the original size a compressed result must save.
pub const DEFAULT_MIN_SAVINGS: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub advisor: AdvisorConfig,
    /// A compressed result is kept only if it is strictly smaller than the
    /// original and no larger than `original * (1 - min_savings)`.
    pub min_savings: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            advisor: AdvisorConfig::default(),
            min_savings: DEFAULT_MIN_SAVINGS,
        }
    }
}

/// Bytes chosen by the engine plus the metrics describing how they were produced.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub data: Vec<u8>,
    pub metrics: CompressionMetrics,
}

/// Orchestrates decide → transform → measure → accept/reject for one codec.
///
/// The engine holds no per-call state: share it behind an `Arc` and call it
/// from as many worker threads as there are chunks in flight.
///
/// The caller must persist `metrics.compression_used` next to the stored
/// bytes. Codec output is not guaranteed to be self-describing, and restore
/// has to know whether to decode at all.
pub struct CompressionEngine {
    codec: Arc<dyn Codec>,
    advisor: CompressionAdvisor,
    min_savings: f64,
}

impl CompressionEngine {
    pub fn new(codec: Arc<dyn Codec>, config: &EngineConfig) -> Self {
        Self {
            codec,
            advisor: CompressionAdvisor::new(config.advisor),
            min_savings: config.min_savings.clamp(0.0, 1.0),
        }
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    pub fn advisor(&self) -> &CompressionAdvisor {
        &self.advisor
    }

    /// Compress `data` if the advisor and the achieved size both say it pays off.
    ///
    /// Never fails: a codec error is logged and the payload is passed through
    /// with `compression_used == false`.
    pub fn compress_with_metrics(&self, data: &[u8]) -> EngineOutput {
        let original_size = data.len();

        if !self.advisor.should_compress(data) {
            return pass_through(data);
        }

        let started = Instant::now();
        let encoded = self.codec.encode(data);
        let elapsed = started.elapsed();

        match encoded {
            Ok(compressed) if self.accepts(original_size, compressed.len()) => {
                debug!(
                    "{}: kept {} -> {} bytes",
                    self.codec.name(),
                    original_size,
                    compressed.len()
                );
                let metrics = CompressionMetrics::from_sizes(original_size, compressed.len(), true)
                    .with_compression_time(elapsed);
                EngineOutput {
                    data: compressed,
                    metrics,
                }
            }
            Ok(compressed) => {
                debug!(
                    "{}: rejected {} -> {} bytes, storing raw",
                    self.codec.name(),
                    original_size,
                    compressed.len()
                );
                let mut out = pass_through(data);
                out.metrics = out.metrics.with_compression_time(elapsed);
                out
            }
            Err(err) => {
                warn!("{}: encode failed, storing raw: {}", self.codec.name(), err);
                let mut out = pass_through(data);
                out.metrics = out.metrics.with_compression_time(elapsed);
                out
            }
        }
    }

    /// Restore bytes produced by [`compress_with_metrics`](Self::compress_with_metrics).
    ///
    /// `was_compressed` is the flag the caller persisted. When it is false the
    /// data is returned as-is and the codec is never called.
    pub fn decompress_with_metrics(
        &self,
        data: &[u8],
        was_compressed: bool,
    ) -> Result<EngineOutput, CodecError> {
        if !was_compressed {
            return Ok(pass_through(data));
        }

        let started = Instant::now();
        let decoded = self.codec.decode(data)?;
        let elapsed = started.elapsed();

        let metrics = CompressionMetrics::from_sizes(decoded.len(), data.len(), true)
            .with_decompression_time(elapsed);
        Ok(EngineOutput {
            data: decoded,
            metrics,
        })
    }

    fn accepts(&self, original: usize, compressed: usize) -> bool {
        compressed < original && (compressed as f64) <= (original as f64) * (1.0 - self.min_savings)
    }
}

fn pass_through(data: &[u8]) -> EngineOutput {
    EngineOutput {
        data: data.to_vec(),
        metrics: CompressionMetrics::from_sizes(data.len(), data.len(), false),
    }
}
