//! Serde-backed configuration for the engine, the codec choice, and archive chunking.
//!
//! Every struct carries `#[serde(default)]`, so a JSON file only has to name
//! the values it wants to change:
//!
//! ```json
//! { "chunk_size": 262144, "codec": { "kind": "zstd", "level": 9 },
//!   "engine": { "advisor": { "policy": "size_threshold" } } }
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::engine::EngineConfig;
use crate::format::{CODEC_DEFLATE, CODEC_LZ4, CODEC_RLE, CODEC_ZSTD, DEFAULT_CHUNK_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecKind {
    #[default]
    Deflate,
    Rle,
    Zstd,
    Lz4,
}

impl CodecKind {
    pub fn id(self) -> u16 {
        match self {
            Self::Deflate => CODEC_DEFLATE,
            Self::Rle => CODEC_RLE,
            Self::Zstd => CODEC_ZSTD,
            Self::Lz4 => CODEC_LZ4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Deflate => "deflate",
            Self::Rle => "rle",
            Self::Zstd => "zstd",
            Self::Lz4 => "lz4",
        }
    }

    /// Accepted level range, or `None` for codecs without levels.
    pub fn level_range(self) -> Option<(u32, u32)> {
        match self {
            Self::Deflate => Some((0, 9)),
            Self::Zstd => Some((1, 22)),
            Self::Rle | Self::Lz4 => None,
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CodecKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deflate" | "zlib" | "d" => Ok(Self::Deflate),
            "rle" | "run-length" | "r" => Ok(Self::Rle),
            "zstd" | "z" => Ok(Self::Zstd),
            "lz4" | "l" => Ok(Self::Lz4),
            other => anyhow::bail!(
                "unknown codec '{}'. Valid options: deflate, rle, zstd, lz4",
                other
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub kind: CodecKind,
    /// Codec level; `None` picks the codec's default.
    pub level: Option<u32>,
    /// Ceiling on bytes a single decode may produce.
    pub max_decoded_size: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkpressConfig {
    /// Raw bytes per archive chunk.
    pub chunk_size: u32,
    pub codec: CodecConfig,
    pub engine: EngineConfig,
}

impl Default for ChunkpressConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            codec: CodecConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl ChunkpressConfig {
    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(text).context("parsing chunkpress config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {:?}", path))?;
        Self::from_json_str(&text).with_context(|| format!("in config file {:?}", path))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than zero");
        }
        let savings = self.engine.min_savings;
        if !(0.0..1.0).contains(&savings) {
            anyhow::bail!("engine.min_savings must be in [0, 1), got {}", savings);
        }
        if self.engine.advisor.sample_size == 0 {
            anyhow::bail!("engine.advisor.sample_size must be greater than zero");
        }
        if let Some(level) = self.codec.level {
            match self.codec.kind.level_range() {
                Some((lo, hi)) if level < lo || level > hi => anyhow::bail!(
                    "level {} out of range {}..={} for codec {}",
                    level,
                    lo,
                    hi,
                    self.codec.kind
                ),
                Some(_) => {}
                None => anyhow::bail!("codec {} does not take a level", self.codec.kind),
            }
        }
        if self.codec.max_decoded_size == Some(0) {
            anyhow::bail!("codec.max_decoded_size must be greater than zero when set");
        }
        Ok(())
    }
}
