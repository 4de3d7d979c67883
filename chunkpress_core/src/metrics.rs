use std::time::Duration;

use serde::Serialize;

/// Size and timing facts about one compress or decompress call.
///
/// Created fresh for each engine call and owned by the caller.
///
/// For the compress direction `original_size` is the raw payload and
/// `compressed_size` the bytes chosen for storage. For the decompress
/// direction `compressed_size` is the stored input and `original_size` the
/// restored output. In both directions
/// `compression_ratio == compressed_size / original_size`, or `0.0` when
/// `original_size == 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CompressionMetrics {
    pub original_size: usize,
    pub compressed_size: usize,
    pub compression_used: bool,
    pub compression_ratio: f64,
    pub compression_time_ms: u64,
    pub decompression_time_ms: u64,
}

impl CompressionMetrics {
    /// Metrics for a pair of sizes with the ratio filled in.
    pub fn from_sizes(original_size: usize, compressed_size: usize, compression_used: bool) -> Self {
        Self {
            original_size,
            compressed_size,
            compression_used,
            compression_ratio: ratio(compressed_size, original_size),
            compression_time_ms: 0,
            decompression_time_ms: 0,
        }
    }

    pub fn with_compression_time(mut self, elapsed: Duration) -> Self {
        self.compression_time_ms = millis(elapsed);
        self
    }

    pub fn with_decompression_time(mut self, elapsed: Duration) -> Self {
        self.decompression_time_ms = millis(elapsed);
        self
    }

    /// Bytes saved by the chosen representation (zero when stored raw).
    pub fn bytes_saved(&self) -> usize {
        self.original_size.saturating_sub(self.compressed_size)
    }
}

/// `compressed / original`, defined as `0.0` for an empty original.
pub fn ratio(compressed: usize, original: usize) -> f64 {
    if original == 0 {
        0.0
    } else {
        compressed as f64 / original as f64
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Running totals over many compress/decompress calls.
///
/// Owned by a single caller (an archive writer, a CLI probe run); the engine
/// itself never holds one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsTotals {
    pub operations: u64,
    pub compressed_operations: u64,
    pub original_bytes: u64,
    pub stored_bytes: u64,
    pub compression_time_ms: u64,
    pub decompression_time_ms: u64,
}

impl MetricsTotals {
    pub fn record(&mut self, metrics: &CompressionMetrics) {
        self.operations += 1;
        if metrics.compression_used {
            self.compressed_operations += 1;
        }
        self.original_bytes += metrics.original_size as u64;
        self.stored_bytes += metrics.compressed_size as u64;
        self.compression_time_ms += metrics.compression_time_ms;
        self.decompression_time_ms += metrics.decompression_time_ms;
    }

    /// Stored bytes over original bytes across everything recorded.
    pub fn overall_ratio(&self) -> f64 {
        if self.original_bytes == 0 {
            0.0
        } else {
            self.stored_bytes as f64 / self.original_bytes as f64
        }
    }

    pub fn bytes_saved(&self) -> u64 {
        self.original_bytes.saturating_sub(self.stored_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_of_empty_original_is_zero() {
        let m = CompressionMetrics::from_sizes(0, 0, false);
        assert_eq!(m.compression_ratio, 0.0);
        assert_eq!(ratio(12, 0), 0.0);
    }

    #[test]
    fn ratio_matches_sizes() {
        let m = CompressionMetrics::from_sizes(1000, 250, true);
        assert_eq!(m.compression_ratio, 0.25);
        assert_eq!(m.bytes_saved(), 750);
    }

    #[test]
    fn timings_are_whole_milliseconds() {
        let m = CompressionMetrics::from_sizes(10, 10, false)
            .with_compression_time(Duration::from_micros(2_700))
            .with_decompression_time(Duration::from_millis(4));
        assert_eq!(m.compression_time_ms, 2);
        assert_eq!(m.decompression_time_ms, 4);
    }

    #[test]
    fn totals_accumulate() {
        let mut totals = MetricsTotals::default();
        totals.record(&CompressionMetrics::from_sizes(100, 40, true));
        totals.record(&CompressionMetrics::from_sizes(100, 100, false));
        assert_eq!(totals.operations, 2);
        assert_eq!(totals.compressed_operations, 1);
        assert_eq!(totals.original_bytes, 200);
        assert_eq!(totals.stored_bytes, 140);
        assert_eq!(totals.bytes_saved(), 60);
        assert!((totals.overall_ratio() - 0.7).abs() < 1e-12);
    }
}
