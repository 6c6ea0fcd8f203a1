//! Read-only access to the rollup settlement contract on L1.

pub use error::L1Error;
mod error;

#[cfg(any(test, feature = "test-utils"))]
/// Common test helpers
pub mod test_utils;

use alloy_primitives::B256;
use archiver_primitives::{InboxMessage, PublishedL2Block, Retrieved};

/// A result of an L1 read.
pub type L1Result<T> = Result<T, L1Error>;

/// The status of the rollup contract at some L1 block.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct RollupStatus {
    /// The last proven L2 block.
    pub proven_block_number: u64,
    /// The archive root of the last proven L2 block.
    pub proven_archive: B256,
    /// The last pending L2 block.
    pub pending_block_number: u64,
    /// The archive root of the last pending L2 block.
    pub pending_archive: B256,
    /// The archive root recorded on L1 for the local pending tip, if any.
    pub archive_at_local_pending_tip: Option<B256>,
    /// The epoch of the last proven L2 block.
    pub proven_epoch_number: u64,
}

/// An instance of the trait provides read-only access to the rollup, inbox and L1 chain head.
///
/// All calls except [`L1View::get_current_l1_block_number`] and
/// [`L1View::get_total_messages_inserted`] are pinned to an explicit L1 block.
#[async_trait::async_trait]
#[auto_impl::auto_impl(Arc)]
pub trait L1View: Send + Sync {
    /// Returns the current L1 block number.
    async fn get_current_l1_block_number(&self) -> L1Result<u64>;

    /// Returns the timestamp of the provided L1 block.
    async fn get_l1_block_timestamp(&self, block_number: u64) -> L1Result<u64>;

    /// Returns the rollup status at `at_l1_block`, including the archive recorded for the
    /// `local_pending_tip` L2 block.
    async fn get_rollup_status(
        &self,
        local_pending_tip: u64,
        at_l1_block: u64,
    ) -> L1Result<RollupStatus>;

    /// Returns the archive root recorded for the L2 block at `at_l1_block`, if any.
    async fn get_archive_root_at(
        &self,
        l2_block_number: u64,
        at_l1_block: u64,
    ) -> L1Result<Option<B256>>;

    /// Returns true if the pending chain can be pruned at the provided timestamp.
    async fn can_prune_at_time(&self, timestamp: u64, at_l1_block: u64) -> L1Result<bool>;

    /// Returns the total amount of messages inserted in the inbox.
    async fn get_total_messages_inserted(&self) -> L1Result<u64>;

    /// Returns the messages inserted in the inbox between the L1 blocks, inclusive.
    async fn retrieve_messages(&self, start: u64, end: u64) -> L1Result<Retrieved<InboxMessage>>;

    /// Returns the L2 blocks published between the L1 blocks, inclusive.
    async fn retrieve_blocks(&self, start: u64, end: u64) -> L1Result<Retrieved<PublishedL2Block>>;
}
