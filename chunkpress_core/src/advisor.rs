use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

/// Payloads shorter than this are never worth compressing by default.
pub const DEFAULT_MIN_SIZE: usize = 512;

/// Bytes inspected by the sampled-entropy policy.
pub const DEFAULT_SAMPLE_SIZE: usize = 1024;

/// How the advisor judges a payload at or above the size threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorPolicy {
    /// Anything at or above `min_size` is attempted.
    SizeThreshold,
    /// Sample a prefix and attempt only when few distinct byte values show up.
    #[default]
    SampledEntropy,
}

impl fmt::Display for AdvisorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeThreshold => f.write_str("size_threshold"),
            Self::SampledEntropy => f.write_str("sampled_entropy"),
        }
    }
}

impl FromStr for AdvisorPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "size" | "size_threshold" => Ok(Self::SizeThreshold),
            "entropy" | "sampled_entropy" => Ok(Self::SampledEntropy),
            other => anyhow::bail!(
                "unknown advisor policy '{}'. Valid options: size_threshold, sampled_entropy",
                other
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub policy: AdvisorPolicy,
    pub min_size: usize,
    pub sample_size: usize,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            policy: AdvisorPolicy::default(),
            min_size: DEFAULT_MIN_SIZE,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

/// Cheap pre-check deciding whether a compression attempt is worthwhile.
///
/// This is a heuristic only. The engine still rejects a compressed result
/// that turns out no smaller than the original.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompressionAdvisor {
    config: AdvisorConfig,
}

impl CompressionAdvisor {
    pub fn new(config: AdvisorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    pub fn should_compress(&self, data: &[u8]) -> bool {
        if data.len() < self.config.min_size {
            debug!("advisor: {} bytes is below min_size {}", data.len(), self.config.min_size);
            return false;
        }
        match self.config.policy {
            AdvisorPolicy::SizeThreshold => true,
            AdvisorPolicy::SampledEntropy => {
                let sample = &data[..data.len().min(self.config.sample_size)];
                let distinct = distinct_bytes(sample);
                let cutoff = sample.len().min(256) / 2;
                let advised = distinct < cutoff;
                debug!(
                    "advisor: {} distinct values in {}-byte sample (cutoff {}), advised={}",
                    distinct,
                    sample.len(),
                    cutoff,
                    advised
                );
                advised
            }
        }
    }
}

/// Number of distinct byte values in `sample`.
pub fn distinct_bytes(sample: &[u8]) -> usize {
    let mut seen = [false; 256];
    let mut count = 0;
    for &b in sample {
        if !seen[b as usize] {
            seen[b as usize] = true;
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advisor(policy: AdvisorPolicy) -> CompressionAdvisor {
        CompressionAdvisor::new(AdvisorConfig {
            policy,
            ..AdvisorConfig::default()
        })
    }

    #[test]
    fn below_threshold_never_advised() {
        for policy in [AdvisorPolicy::SizeThreshold, AdvisorPolicy::SampledEntropy] {
            let a = advisor(policy);
            assert!(!a.should_compress(&[]));
            assert!(!a.should_compress(&[0u8; 10]));
            assert!(!a.should_compress(&vec![0u8; DEFAULT_MIN_SIZE - 1]));
        }
    }

    #[test]
    fn size_threshold_advises_any_large_payload() {
        let a = advisor(AdvisorPolicy::SizeThreshold);
        let noisy: Vec<u8> = (0..4096u32).map(|i| (i.wrapping_mul(2654435761) >> 13) as u8).collect();
        assert!(a.should_compress(&noisy));
        assert!(a.should_compress(&vec![7u8; DEFAULT_MIN_SIZE]));
    }

    #[test]
    fn entropy_policy_advises_low_variety() {
        let a = advisor(AdvisorPolicy::SampledEntropy);
        let text: Vec<u8> = b"abcdefgh".iter().copied().cycle().take(4096).collect();
        assert!(a.should_compress(&text));
    }

    #[test]
    fn entropy_policy_declines_full_byte_range() {
        let a = advisor(AdvisorPolicy::SampledEntropy);
        let all: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        assert!(!a.should_compress(&all));
    }

    #[test]
    fn entropy_policy_only_looks_at_sample() {
        let a = advisor(AdvisorPolicy::SampledEntropy);
        let mut data = vec![0u8; DEFAULT_SAMPLE_SIZE];
        data.extend((0..=255u8).cycle().take(8192));
        assert!(a.should_compress(&data));
    }

    #[test]
    fn cutoff_is_exclusive() {
        let a = CompressionAdvisor::new(AdvisorConfig {
            policy: AdvisorPolicy::SampledEntropy,
            min_size: 0,
            sample_size: 1024,
        });
        // 128 distinct values is exactly half the byte range: not advised.
        let half: Vec<u8> = (0..128u8).cycle().take(1024).collect();
        assert!(!a.should_compress(&half));
        let under: Vec<u8> = (0..127u8).cycle().take(1024).collect();
        assert!(a.should_compress(&under));
    }

    #[test]
    fn policy_parses_short_names() {
        assert_eq!("size".parse::<AdvisorPolicy>().unwrap(), AdvisorPolicy::SizeThreshold);
        assert_eq!("entropy".parse::<AdvisorPolicy>().unwrap(), AdvisorPolicy::SampledEntropy);
        assert!("random".parse::<AdvisorPolicy>().is_err());
    }

    #[test]
    fn distinct_counts_values() {
        assert_eq!(distinct_bytes(&[]), 0);
        assert_eq!(distinct_bytes(&[1, 1, 2, 3, 3, 3]), 3);
    }
}
