/// Magic bytes opening every chunk archive.
/// 14 bytes: "CHPK1\n" followed by 8 null bytes.
pub const MAGIC: &[u8; 14] = b"CHPK1\n\x00\x00\x00\x00\x00\x00\x00\x00";

pub const ARCHIVE_VERSION: u16 = 1;

/// Fixed size of the archive header in bytes.
///   magic[14] + version:u16 + codec_id:u16 + chunk_size:u32
///   + chunk_count:u64 + flags:u64 + reserved[18]
///   = 14 + 2 + 2 + 4 + 8 + 8 + 18 = 56
pub const HEADER_SIZE: u64 = 56;

/// Size of each ChunkEntry in the chunk index, in bytes.
///   offset:u64 + stored_len:u32 + raw_len:u32
///   + checksum:u64 + flags:u16 + _pad[6]
///   = 8 + 4 + 4 + 8 + 2 + 6 = 32
pub const CHUNK_ENTRY_SIZE: u64 = 32;

/// Size of the index footer (single u64 offset) in bytes.
pub const FOOTER_SIZE: u64 = 8;

/// Default chunk size: 64 KB.
pub const DEFAULT_CHUNK_SIZE: u32 = 64 * 1024;

// ── Archive flags ──────────────────────────────────────────────────────────

/// Each chunk carries an xxhash3-64 checksum of its stored bytes.
pub const FLAG_HAS_CHECKSUM: u64 = 1 << 0;

// ── Chunk flags ────────────────────────────────────────────────────────────

/// The stored bytes are codec output and must be decoded on restore.
/// Clear means the chunk was stored raw and must NOT be decoded.
pub const CHUNK_COMPRESSED: u16 = 1 << 0;

// ── Codec IDs ──────────────────────────────────────────────────────────────

pub const CODEC_DEFLATE: u16 = 1;
pub const CODEC_RLE: u16 = 2;
pub const CODEC_ZSTD: u16 = 3;
pub const CODEC_LZ4: u16 = 4;

// ── Header ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub version: u16,
    pub codec_id: u16,
    /// Nominal raw bytes per chunk (the last chunk may be smaller).
    pub chunk_size: u32,
    pub chunk_count: u64,
    pub flags: u64,
}

impl ArchiveHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];
        let mut put = Put::new(&mut buf);
        put.bytes(MAGIC);
        put.u16(self.version);
        put.u16(self.codec_id);
        put.u32(self.chunk_size);
        put.u64(self.chunk_count);
        put.u64(self.flags);
        buf
    }

    /// Decode a header, rejecting anything that does not start with [`MAGIC`].
    pub fn from_bytes(buf: &[u8; HEADER_SIZE as usize]) -> anyhow::Result<Self> {
        if &buf[..MAGIC.len()] != MAGIC {
            anyhow::bail!("invalid magic bytes, not a chunkpress archive");
        }
        let mut take = Take::new(&buf[MAGIC.len()..]);
        Ok(Self {
            version: take.u16(),
            codec_id: take.u16(),
            chunk_size: take.u32(),
            chunk_count: take.u64(),
            flags: take.u64(),
        })
    }

    pub fn has_flag(&self, flag: u64) -> bool {
        self.flags & flag != 0
    }
}

// ── Chunk index entry ──────────────────────────────────────────────────────

/// Where one chunk lives and how it must be restored.
///
/// `raw_len`, `stored_len`, and the `CHUNK_COMPRESSED` flag are the metadata
/// restore cannot do without.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkEntry {
    pub offset: u64,
    pub stored_len: u32,
    pub raw_len: u32,
    /// xxhash3-64 of the stored bytes.
    pub checksum: u64,
    pub flags: u16,
}

impl ChunkEntry {
    pub fn is_compressed(&self) -> bool {
        self.flags & CHUNK_COMPRESSED != 0
    }

    pub fn to_bytes(&self) -> [u8; CHUNK_ENTRY_SIZE as usize] {
        let mut buf = [0u8; CHUNK_ENTRY_SIZE as usize];
        let mut put = Put::new(&mut buf);
        put.u64(self.offset);
        put.u32(self.stored_len);
        put.u32(self.raw_len);
        put.u64(self.checksum);
        put.u16(self.flags);
        buf
    }

    pub fn from_bytes(buf: &[u8; CHUNK_ENTRY_SIZE as usize]) -> Self {
        let mut take = Take::new(buf);
        Self {
            offset: take.u64(),
            stored_len: take.u32(),
            raw_len: take.u32(),
            checksum: take.u64(),
            flags: take.u16(),
        }
    }
}

// Little-endian cursors over fixed-size buffers. Callers size the buffers
// from the layout constants above, so slicing cannot run past the end.

struct Put<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Put<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn bytes(&mut self, src: &[u8]) {
        self.buf[self.pos..self.pos + src.len()].copy_from_slice(src);
        self.pos += src.len();
    }

    fn u16(&mut self, v: u16) {
        self.bytes(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.bytes(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.bytes(&v.to_le_bytes());
    }
}

struct Take<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Take<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.array())
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.array())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.array())
    }
}
