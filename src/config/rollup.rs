//! Rollup engine configuration.

use std::time::Duration;

use serde::Deserialize;

/// Rollup engine tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RollupConfig {
    /// Distinct menu codes recomputed in parallel.
    pub max_concurrent_keys: usize,
    /// Change-log entries consumed per catch-up step.
    pub checkpoint_batch_size: u32,
    /// Per-key retry of transient storage failures.
    pub retry: RetryConfig,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            max_concurrent_keys: 4,
            checkpoint_batch_size: 500,
            retry: RetryConfig::default(),
        }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Delay before the first retry, in milliseconds.
    pub min_delay_ms: u64,
    /// Delay cap, in milliseconds.
    pub max_delay_ms: u64,
    /// Maximum number of retry attempts (0 = no retries, just initial attempt).
    pub max_retries: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 10,
            max_delay_ms: 2000,
            max_retries: 3,
        }
    }
}

impl RetryConfig {
    /// No retries; the first failure is final.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}
