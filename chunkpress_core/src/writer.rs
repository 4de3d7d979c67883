use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use log::debug;
use xxhash_rust::xxh3::xxh3_64;

use crate::engine::CompressionEngine;
use crate::format::{
    ArchiveHeader, ChunkEntry, ARCHIVE_VERSION, CHUNK_COMPRESSED, CHUNK_ENTRY_SIZE,
    FLAG_HAS_CHECKSUM, HEADER_SIZE,
};
use crate::metrics::MetricsTotals;

/// What [`ArchiveWriter::finish`] reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveSummary {
    pub chunk_count: u64,
    pub totals: MetricsTotals,
}

/// Streaming writer that packs a byte stream into a chunk archive.
///
/// Every full `chunk_size` run of input goes through
/// [`CompressionEngine::compress_with_metrics`]; the chosen bytes are written
/// and the chunk's `compression_used` outcome is recorded as
/// `CHUNK_COMPRESSED` in its index entry, next to the raw and stored lengths.
///
/// # Layout written
/// ```text
/// [HEADER: 56 bytes placeholder]
/// [CHUNK 0] [CHUNK 1] ... [CHUNK N-1]      ← compressed or raw, per chunk
/// [CHUNK INDEX: 32 bytes × N]
/// [FOOTER: 8 bytes, u64 LE offset of chunk index]
/// ← seek back to 0, overwrite header with real values
/// ```
pub struct ArchiveWriter {
    out: BufWriter<File>,
    engine: CompressionEngine,
    chunk_size: u32,
    pending: Vec<u8>,
    entries: Vec<ChunkEntry>,
    current_offset: u64,
    totals: MetricsTotals,
}

impl ArchiveWriter {
    /// Create a new archive at `path`, truncating any existing file.
    pub fn create(
        path: impl AsRef<Path>,
        engine: CompressionEngine,
        chunk_size: u32,
    ) -> anyhow::Result<Self> {
        if chunk_size == 0 {
            anyhow::bail!("chunk size must be greater than zero");
        }
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(&[0u8; HEADER_SIZE as usize])?;
        Ok(Self {
            out,
            engine,
            chunk_size,
            pending: Vec::with_capacity(chunk_size as usize),
            entries: Vec::new(),
            current_offset: HEADER_SIZE,
            totals: MetricsTotals::default(),
        })
    }

    /// Buffer `data`, emitting a chunk each time `chunk_size` bytes are available.
    pub fn write(&mut self, mut data: &[u8]) -> anyhow::Result<()> {
        let chunk_size = self.chunk_size as usize;
        while !data.is_empty() {
            if self.pending.is_empty() && data.len() >= chunk_size {
                let (chunk, rest) = data.split_at(chunk_size);
                self.flush_chunk(chunk)?;
                data = rest;
                continue;
            }
            let take = (chunk_size - self.pending.len()).min(data.len());
            self.pending.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.pending.len() == chunk_size {
                let chunk = std::mem::take(&mut self.pending);
                self.flush_chunk(&chunk)?;
                self.pending = chunk;
                self.pending.clear();
            }
        }
        Ok(())
    }

    pub fn totals(&self) -> &MetricsTotals {
        &self.totals
    }

    fn flush_chunk(&mut self, raw: &[u8]) -> anyhow::Result<()> {
        let outcome = self.engine.compress_with_metrics(raw);
        let stored = outcome.data;
        let metrics = outcome.metrics;

        let flags = if metrics.compression_used { CHUNK_COMPRESSED } else { 0 };
        let entry = ChunkEntry {
            offset: self.current_offset,
            stored_len: u32::try_from(stored.len())?,
            raw_len: u32::try_from(raw.len())?,
            checksum: xxh3_64(&stored),
            flags,
        };
        debug!(
            "chunk {}: {} -> {} bytes (compressed={})",
            self.entries.len(),
            entry.raw_len,
            entry.stored_len,
            metrics.compression_used
        );

        self.out.write_all(&stored)?;
        self.current_offset += stored.len() as u64;
        self.totals.record(&metrics);
        self.entries.push(entry);
        Ok(())
    }

    /// Flush the trailing partial chunk, append index and footer, and seal the
    /// archive by rewriting the header.
    pub fn finish(mut self) -> anyhow::Result<ArchiveSummary> {
        if !self.pending.is_empty() {
            let remaining = std::mem::take(&mut self.pending);
            self.flush_chunk(&remaining)?;
        }

        let index_offset = self.current_offset;
        for entry in &self.entries {
            self.out.write_all(&entry.to_bytes())?;
        }
        self.current_offset += self.entries.len() as u64 * CHUNK_ENTRY_SIZE;
        self.out.write_all(&index_offset.to_le_bytes())?;

        let chunk_count = self.entries.len() as u64;
        let header = ArchiveHeader {
            version: ARCHIVE_VERSION,
            codec_id: self.engine.codec().id(),
            chunk_size: self.chunk_size,
            chunk_count,
            flags: FLAG_HAS_CHECKSUM,
        };
        self.out.seek(SeekFrom::Start(0))?;
        self.out.write_all(&header.to_bytes())?;
        self.out.flush()?;

        Ok(ArchiveSummary {
            chunk_count,
            totals: self.totals,
        })
    }
}
