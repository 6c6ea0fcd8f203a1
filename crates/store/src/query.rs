use alloy_primitives::B256;
use archiver_primitives::{L2Address, PublicLog, TxEffect};

/// A transaction effect along with its position in the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedTxEffect {
    /// The block the transaction was included in.
    pub block_number: u64,
    /// The hash of the block.
    pub block_hash: B256,
    /// The index of the transaction in the block.
    pub tx_index: usize,
    /// The transaction effect.
    pub effect: TxEffect,
}

/// A public log along with its position in the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedPublicLog {
    /// The block the log was emitted in.
    pub block_number: u64,
    /// The index of the emitting transaction in the block.
    pub tx_index: usize,
    /// The index of the log in the transaction.
    pub log_index: usize,
    /// The log.
    pub log: PublicLog,
}

/// A filter over public logs. Block bounds are inclusive on `from_block` and exclusive on
/// `to_block`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogFilter {
    /// The first block to include.
    pub from_block: Option<u64>,
    /// The first block to exclude.
    pub to_block: Option<u64>,
    /// The emitting contract.
    pub contract_address: Option<L2Address>,
}

impl LogFilter {
    /// Returns true if the log matches the filter.
    pub fn matches(&self, log: &ExtendedPublicLog) -> bool {
        self.from_block.is_none_or(|from| log.block_number >= from) &&
            self.to_block.is_none_or(|to| log.block_number < to) &&
            self.contract_address.is_none_or(|address| log.log.contract_address == address)
    }
}
