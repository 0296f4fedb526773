/// Approximate seconds elapsed since `event_block`.
///
/// Block times vary, so this is only good enough for screening. A block ahead of
/// the reported head counts as zero elapsed.
pub fn approximate_elapsed_secs(
    current_block: u64,
    event_block: u64,
    avg_block_secs: u64,
) -> u64 {
    current_block
        .saturating_sub(event_block)
        .saturating_mul(avg_block_secs)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessEstimator {
    current_block: u64,
    avg_block_secs: u64,
}

impl StalenessEstimator {
    pub fn new(current_block: u64, avg_block_secs: u64) -> Self {
        Self {
            current_block,
            avg_block_secs,
        }
    }

    pub fn current_block(&self) -> u64 {
        self.current_block
    }

    pub fn elapsed_since(&self, event_block: u64) -> u64 {
        approximate_elapsed_secs(self.current_block, event_block, self.avg_block_secs)
    }
}
