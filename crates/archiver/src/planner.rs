use archiver_primitives::L1RollupConstants;

/// Plans the L1 block windows searched for L2 data.
///
/// A fixed amount of L2 blocks maps to a window of L1 blocks whose width depends on the ratio
/// between the L2 and the L1 slot durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRangePlanner {
    width: u64,
}

impl BatchRangePlanner {
    /// Returns a new [`BatchRangePlanner`] for the batch size and rollup constants.
    pub const fn new(batch_size: u64, constants: &L1RollupConstants) -> Self {
        Self { width: constants.l1_blocks_for_l2_blocks(batch_size) }
    }

    /// Returns the width of a full window.
    pub const fn width(&self) -> u64 {
        self.width
    }

    /// Returns the window following `last_end`, clipped to `limit`.
    pub fn next_range(&self, last_end: u64, limit: u64) -> (u64, u64) {
        let start = last_end + 1;
        let end = (start + self.width).min(limit);
        (start, end)
    }
}
