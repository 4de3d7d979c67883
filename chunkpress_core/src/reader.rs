use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use xxhash_rust::xxh3::xxh3_64;

use crate::engine::CompressionEngine;
use crate::format::{
    ArchiveHeader, ChunkEntry, ARCHIVE_VERSION, CHUNK_ENTRY_SIZE, FLAG_HAS_CHECKSUM, FOOTER_SIZE,
    HEADER_SIZE,
};
use crate::metrics::CompressionMetrics;

/// Random-access reader for chunk archives.
///
/// # Open sequence
/// 1. Read the 56-byte header (magic, version, codec_id, chunk_count, chunk_size).
/// 2. Seek to `file_end - 8`, read the `index_offset` u64.
/// 3. Seek to `index_offset`, load the whole chunk index.
///
/// # Restore
/// [`read_chunk`](Self::read_chunk) seeks straight to one chunk, verifies its
/// checksum, and hands it to
/// [`CompressionEngine::decompress_with_metrics`] with the chunk's persisted
/// compressed flag. Raw chunks never reach the codec.
pub struct ArchiveReader {
    file: File,
    pub header: ArchiveHeader,
    entries: Vec<ChunkEntry>,
    engine: CompressionEngine,
}

impl ArchiveReader {
    /// Open an archive. The engine's codec must match the header's `codec_id`.
    pub fn open(path: impl AsRef<Path>, engine: CompressionEngine) -> anyhow::Result<Self> {
        let mut file = File::open(path)?;

        let mut header_buf = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header_buf)?;
        let header = ArchiveHeader::from_bytes(&header_buf)?;

        if header.version != ARCHIVE_VERSION {
            anyhow::bail!(
                "unsupported archive version {} (only version {} is supported)",
                header.version,
                ARCHIVE_VERSION
            );
        }
        if header.chunk_size == 0 {
            anyhow::bail!("archive header has a zero chunk size");
        }
        let codec_id = engine.codec().id();
        if header.codec_id != codec_id {
            anyhow::bail!(
                "codec mismatch: archive uses codec {} but engine codec '{}' has id {}",
                header.codec_id,
                engine.codec().name(),
                codec_id
            );
        }

        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer_buf = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer_buf)?;
        let index_offset = u64::from_le_bytes(footer_buf);

        file.seek(SeekFrom::Start(index_offset))?;
        let mut entries = Vec::with_capacity(header.chunk_count as usize);
        let mut entry_buf = [0u8; CHUNK_ENTRY_SIZE as usize];
        for _ in 0..header.chunk_count {
            file.read_exact(&mut entry_buf)?;
            entries.push(ChunkEntry::from_bytes(&entry_buf));
        }

        // Raw offsets are derived from chunk_size, so the index must agree with it.
        let last = entries.len().saturating_sub(1);
        for (idx, entry) in entries.iter().enumerate() {
            let consistent = if idx == last {
                entry.raw_len > 0 && entry.raw_len <= header.chunk_size
            } else {
                entry.raw_len == header.chunk_size
            };
            if !consistent {
                anyhow::bail!(
                    "chunk {} has raw length {} but the header chunk size is {}",
                    idx,
                    entry.raw_len,
                    header.chunk_size
                );
            }
        }

        Ok(Self {
            file,
            header,
            entries,
            engine,
        })
    }

    #[inline]
    pub fn chunk_count(&self) -> u64 {
        self.header.chunk_count
    }

    #[inline]
    pub fn chunk_size(&self) -> u32 {
        self.header.chunk_size
    }

    pub fn raw_size(&self) -> u64 {
        self.entries.iter().map(|e| e.raw_len as u64).sum()
    }

    /// Bytes occupied by chunk payloads (excluding header, index, footer).
    pub fn stored_size(&self) -> u64 {
        self.entries.iter().map(|e| e.stored_len as u64).sum()
    }

    /// Stored over raw, the same orientation as `CompressionMetrics::compression_ratio`.
    pub fn compression_ratio(&self) -> f64 {
        crate::metrics::ratio(self.stored_size() as usize, self.raw_size() as usize)
    }

    pub fn entries(&self) -> &[ChunkEntry] {
        &self.entries
    }

    pub fn read_chunk(&mut self, idx: u64) -> anyhow::Result<Vec<u8>> {
        Ok(self.read_chunk_with_metrics(idx)?.0)
    }

    /// Restore chunk `idx` and report the decompress-direction metrics.
    ///
    /// A checksum mismatch, a codec failure, or a restored length that differs
    /// from the recorded `raw_len` (including an unexpectedly empty result) is
    /// reported as a corrupt chunk.
    pub fn read_chunk_with_metrics(
        &mut self,
        idx: u64,
    ) -> anyhow::Result<(Vec<u8>, CompressionMetrics)> {
        let entry = self
            .entries
            .get(idx as usize)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "chunk index {} out of range (total {})",
                    idx,
                    self.header.chunk_count
                )
            })?
            .clone();

        self.file.seek(SeekFrom::Start(entry.offset))?;
        let mut stored = vec![0u8; entry.stored_len as usize];
        self.file.read_exact(&mut stored)?;

        if self.header.has_flag(FLAG_HAS_CHECKSUM) {
            let computed = xxh3_64(&stored);
            if computed != entry.checksum {
                anyhow::bail!(
                    "chunk {} checksum mismatch: expected {:016x}, got {:016x}",
                    idx,
                    entry.checksum,
                    computed
                );
            }
        }

        let restored = self
            .engine
            .decompress_with_metrics(&stored, entry.is_compressed())
            .map_err(|e| anyhow::anyhow!("chunk {} is corrupt: {}", idx, e))?;

        if restored.data.len() != entry.raw_len as usize {
            anyhow::bail!(
                "chunk {} is corrupt: restored {} bytes but index says {}",
                idx,
                restored.data.len(),
                entry.raw_len
            );
        }

        Ok((restored.data, restored.metrics))
    }

    /// Restore exactly `len` bytes starting at raw offset `start` (clamped to
    /// the end of the archived data), decoding only the chunks that cover it.
    pub fn read_range(&mut self, start: u64, len: u64) -> anyhow::Result<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }

        let raw_total = self.raw_size();
        if start >= raw_total {
            anyhow::bail!("read_range start {} is beyond raw size {}", start, raw_total);
        }

        let end = start.saturating_add(len).min(raw_total);
        let chunk_size = self.header.chunk_size as u64;
        let first = start / chunk_size;
        let last = (end - 1) / chunk_size;

        let mut result = Vec::with_capacity((end - start) as usize);
        for idx in first..=last {
            let chunk = self.read_chunk(idx)?;
            let chunk_start = idx * chunk_size;
            let from = start.saturating_sub(chunk_start) as usize;
            let to = ((end - chunk_start) as usize).min(chunk.len());
            result.extend_from_slice(&chunk[from..to]);
        }
        Ok(result)
    }
}
