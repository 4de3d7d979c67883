use crate::error::CodecError;

/// Core compression abstraction.
///
/// Each `Codec` implementation:
/// - Is identified by a stable numeric `id()` stored in the chunk archive header.
/// - Holds only immutable configuration. Every `encode`/`decode` call builds
///   and drops its own compression context, so one instance can serve any
///   number of worker threads at once.
/// - Reports failure through [`CodecError`]; `Ok` with an empty vector means
///   the payload really was empty.
pub trait Codec: Send + Sync {
    /// Stable codec ID stored in the archive header.
    fn id(&self) -> u16;

    /// Human-readable codec name for logs and CLI display.
    fn name(&self) -> &'static str;

    /// Transform a raw payload into its encoded form.
    ///
    /// An implementation may decline to compress and hand back the input
    /// unchanged. Callers must not treat `encode` output as proof that
    /// compression happened; the engine compares sizes and records the
    /// outcome separately.
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Reverse `encode`. Only valid on bytes that `encode` actually compressed.
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
}
