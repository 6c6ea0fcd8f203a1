use alloy_primitives::B256;

/// The error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Blocks must be unwound from the tip of the chain.
    #[error("can only unwind blocks from the tip (requested {requested}, tip {tip})")]
    UnwindNotFromTip {
        /// The block the unwind was requested from.
        requested: u64,
        /// The current tip.
        tip: u64,
    },
    /// The unwind would remove more blocks than stored.
    #[error("cannot unwind {count} blocks from block {from}")]
    UnwindTooDeep {
        /// The block the unwind was requested from.
        from: u64,
        /// The amount of blocks to unwind.
        count: u64,
    },
    /// Blocks must extend the chain without gaps.
    #[error("block {got} does not extend the chain (expected {expected})")]
    NonSequentialBlock {
        /// The expected block number.
        expected: u64,
        /// The provided block number.
        got: u64,
    },
    /// Functions were broadcast for a class that is not stored.
    #[error("unknown contract class {0}")]
    UnknownContractClass(B256),
    /// The L1 to L2 messages of a block are not contiguous.
    #[error("L1 to L2 message gap found in block {0}")]
    MessageGap(u64),
    /// A generic backend error.
    #[error("store backend error: {0}")]
    Backend(String),
}
