use serde::{
    Deserialize,
    Serialize,
};
use std::time::Duration;

pub const ONE_DAY_SECS: u64 = 24 * 60 * 60;
/// Mainnet average, used to turn block distances into elapsed seconds.
pub const DEFAULT_AVG_BLOCK_SECS: u64 = 13;
/// An unfed token starves this long after minting.
pub const DEFAULT_UNFED_GRACE_SECS: u64 = 3 * ONE_DAY_SECS;
/// Band below an approximate expiry inside which a live read is required.
pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 6 * 60 * 60;

/// Tunables for the classification engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Lower edge of every historical log query.
    pub creation_block: u64,
    pub avg_block_secs: u64,
    pub unfed_grace_secs: u64,
    pub safety_margin_secs: u64,
    /// Classify the most recently minted token as well. Off by default: the newest
    /// mint is treated as too new to evaluate.
    pub include_newest: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            creation_block: 0,
            avg_block_secs: DEFAULT_AVG_BLOCK_SECS,
            unfed_grace_secs: DEFAULT_UNFED_GRACE_SECS,
            safety_margin_secs: DEFAULT_SAFETY_MARGIN_SECS,
            include_newest: false,
        }
    }
}

impl ScanConfig {
    pub fn with_creation_block(mut self, creation_block: u64) -> Self {
        self.creation_block = creation_block;
        self
    }
}

/// Retry policy for block-number and log queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }
}
