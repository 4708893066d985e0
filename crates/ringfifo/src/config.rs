//! Configuration for ring buffers and the reader drain loop.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for `RingBuffer` and `ShardedRingBuffer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Total slot count. For a sharded buffer this is split across shards,
    /// rounding each shard up.
    pub capacity: usize,
    /// Number of shards (ignored by a plain `RingBuffer`).
    pub shard_count: usize,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a new configuration with custom settings.
    pub const fn new(capacity: usize, shard_count: usize, enable_metrics: bool) -> Self {
        Self {
            capacity,
            shard_count,
            enable_metrics,
        }
    }

    /// Sets the total capacity.
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the shard count.
    pub const fn with_shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    /// Enables or disables metrics.
    pub const fn with_metrics(mut self, enable_metrics: bool) -> Self {
        self.enable_metrics = enable_metrics;
        self
    }

    /// Capacity of each shard: `ceil(capacity / shard_count)`.
    ///
    /// Returns 0 when `shard_count` is 0; construction rejects that case.
    #[inline]
    pub const fn shard_capacity(&self) -> usize {
        if self.shard_count == 0 {
            return 0;
        }
        self.capacity.div_ceil(self.shard_count)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1024,
            shard_count: 1,
            enable_metrics: false,
        }
    }
}

/// Single reader over 10K slots.
pub const SINGLE_READER_CONFIG: Config = Config::new(10_000, 1, false);

/// 64K slots split across 8 shards, metrics on.
pub const SHARDED_CONFIG: Config = Config::new(65_536, 8, true);

/// Configuration for the reader's polling drain loop.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConsumerConfig {
    /// Maximum items handed to the processor per batch.
    ///
    /// Default: 1000
    pub batch_size: usize,

    /// Sleep after a poll that found the buffer empty.
    ///
    /// Default: 100ms
    pub idle_interval: Duration,

    /// Sleep after a poll that returned fewer than `batch_size` items.
    ///
    /// Default: 10ms
    pub partial_interval: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            idle_interval: Duration::from_millis(100),
            partial_interval: Duration::from_millis(10),
        }
    }
}

impl ConsumerConfig {
    /// Short sleeps and small batches.
    pub fn low_latency() -> Self {
        Self {
            batch_size: 64,
            idle_interval: Duration::from_millis(1),
            partial_interval: Duration::ZERO,
        }
    }

    /// Sets the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the idle sleep.
    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    /// Sets the partial-batch sleep.
    pub fn with_partial_interval(mut self, interval: Duration) -> Self {
        self.partial_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_capacity_rounds_up() {
        assert_eq!(Config::new(10, 3, false).shard_capacity(), 4);
        assert_eq!(Config::new(12, 3, false).shard_capacity(), 4);
        assert_eq!(Config::new(2, 4, false).shard_capacity(), 1);
        assert_eq!(Config::new(10, 0, false).shard_capacity(), 0);
    }

    #[test]
    fn test_builders() {
        let config = Config::default()
            .with_capacity(64)
            .with_shard_count(4)
            .with_metrics(true);
        assert_eq!(config, Config::new(64, 4, true));

        let consumer = ConsumerConfig::default()
            .with_batch_size(10)
            .with_idle_interval(Duration::from_millis(5))
            .with_partial_interval(Duration::ZERO);
        assert_eq!(consumer.batch_size, 10);
        assert_eq!(consumer.idle_interval, Duration::from_millis(5));
        assert_eq!(consumer.partial_interval, Duration::ZERO);
    }
}
