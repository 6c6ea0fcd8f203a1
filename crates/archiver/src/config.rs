use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The default amount of L2 blocks targeted per L1 query.
pub const DEFAULT_BATCH_SIZE: u64 = 100;

/// The default interval between two sync passes.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(1);

/// The default amount of blocks processed concurrently during entity extraction.
pub const DEFAULT_EXTRACTION_CONCURRENCY: usize = 10;

/// Configuration for the [`crate::Archiver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiverConfig {
    /// The amount of L2 blocks targeted per L1 query.
    pub batch_size: u64,
    /// The interval between two sync passes.
    pub polling_interval: Duration,
    /// The amount of blocks processed concurrently during entity extraction.
    pub extraction_concurrency: usize,
    /// The maximum amount of blocks walked back when looking for a common ancestor with L1. The
    /// walk is unbounded if unset.
    pub max_reorg_depth: Option<u64>,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            polling_interval: DEFAULT_POLLING_INTERVAL,
            extraction_concurrency: DEFAULT_EXTRACTION_CONCURRENCY,
            max_reorg_depth: None,
        }
    }
}

impl ArchiverConfig {
    /// Sets the batch size.
    pub const fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the polling interval.
    pub const fn with_polling_interval(mut self, polling_interval: Duration) -> Self {
        self.polling_interval = polling_interval;
        self
    }

    /// Sets the maximum reorg depth.
    pub const fn with_max_reorg_depth(mut self, max_reorg_depth: Option<u64>) -> Self {
        self.max_reorg_depth = max_reorg_depth;
        self
    }
}
