//! Adaptive payload compression for backup chunks.
//!
//! A [`CompressionEngine`] wraps one [`Codec`] and a [`CompressionAdvisor`].
//! For each outgoing chunk it decides whether compression is worth trying,
//! runs the codec, keeps the result only when it is actually smaller, and
//! reports [`CompressionMetrics`]. The `compression_used` flag in those
//! metrics must be stored with the chunk; restore passes it back to
//! [`CompressionEngine::decompress_with_metrics`].
//!
//! [`ArchiveWriter`] and [`ArchiveReader`] persist chunks together with that
//! flag in a single-file chunk archive.

pub mod advisor;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod grow;
pub mod metrics;
pub mod reader;
pub mod writer;

pub use advisor::{AdvisorConfig, AdvisorPolicy, CompressionAdvisor};
pub use codec::Codec;
pub use config::{ChunkpressConfig, CodecConfig, CodecKind};
pub use engine::{CompressionEngine, EngineConfig, EngineOutput};
pub use error::CodecError;
pub use format::{ArchiveHeader, ChunkEntry, HEADER_SIZE, MAGIC};
pub use grow::{decode_growing, GrowthPolicy, Progress, StreamDecoder};
pub use metrics::{CompressionMetrics, MetricsTotals};
pub use reader::ArchiveReader;
pub use writer::{ArchiveSummary, ArchiveWriter};
