//! Storage for the synced L2 chain, L1 to L2 messages and the contract entities derived from it.

pub use error::StoreError;
mod error;

pub use memory::MemoryArchiverStore;
mod memory;

pub use query::{ExtendedPublicLog, IndexedTxEffect, LogFilter};
mod query;

#[cfg(any(test, feature = "test-utils"))]
/// Common test helpers
pub mod test_utils;

use alloy_primitives::B256;
use archiver_primitives::{
    BroadcastFunction, ContractClass, ContractInstance, ContractInstanceUpdate, InboxMessage,
    L2Address, L2Block, PrivateLog, PublishedL2Block, Retrieved, SyncPoint,
};

/// A result of a store operation.
pub type StoreResult<T> = Result<T, StoreError>;

/// The store backing the archiver.
///
/// Implementations must allow concurrent reads while a write is in progress. Readers may observe
/// the state before or after a write, never a partial one.
#[async_trait::async_trait]
#[auto_impl::auto_impl(Arc)]
pub trait ArchiverStore: Send + Sync {
    /// Returns the L1 blocks the block and message streams are synced to.
    async fn get_sync_point(&self) -> StoreResult<SyncPoint>;

    /// Sets the L1 block the L2 blocks are synced to.
    async fn set_blocks_synced_to(&self, l1_block_number: u64) -> StoreResult<()>;

    /// Sets the L1 block the messages are synced to.
    async fn set_messages_synced_to(&self, l1_block_number: u64) -> StoreResult<()>;

    /// Returns the number of the latest stored L2 block, 0 if none.
    async fn get_synced_l2_block_number(&self) -> StoreResult<u64>;

    /// Returns the block with the provided number.
    async fn get_block(&self, number: u64) -> StoreResult<Option<PublishedL2Block>>;

    /// Returns up to `limit` consecutive blocks starting at `from`.
    async fn get_blocks(&self, from: u64, limit: usize) -> StoreResult<Vec<PublishedL2Block>>;

    /// Returns the block with the provided hash.
    async fn get_block_by_hash(&self, hash: B256) -> StoreResult<Option<PublishedL2Block>>;

    /// Returns the effect of the transaction with the provided hash.
    async fn get_tx_effect(&self, tx_hash: B256) -> StoreResult<Option<IndexedTxEffect>>;

    /// Appends the blocks to the chain. The first block must follow the current tip.
    async fn add_blocks(&self, blocks: &[PublishedL2Block]) -> StoreResult<bool>;

    /// Removes `count` blocks from the chain. `from` must be the current tip.
    async fn unwind_blocks(&self, from: u64, count: u64) -> StoreResult<bool>;

    /// Returns the latest proven L2 block number.
    async fn get_proven_l2_block_number(&self) -> StoreResult<u64>;

    /// Sets the latest proven L2 block number.
    async fn set_proven_l2_block_number(&self, block_number: u64) -> StoreResult<()>;

    /// Returns the latest proven epoch, if any.
    async fn get_proven_l2_epoch_number(&self) -> StoreResult<Option<u64>>;

    /// Sets the latest proven epoch.
    async fn set_proven_l2_epoch_number(&self, epoch_number: u64) -> StoreResult<()>;

    /// Stores the classes registered at `block_number`. A class already stored keeps its
    /// original registration block.
    async fn add_contract_classes(
        &self,
        classes: &[ContractClass],
        bytecode_commitments: &[B256],
        block_number: u64,
    ) -> StoreResult<bool>;

    /// Deletes the classes registered at or after `block_number`.
    async fn delete_contract_classes(
        &self,
        classes: &[ContractClass],
        block_number: u64,
    ) -> StoreResult<bool>;

    /// Returns the class with the provided id.
    async fn get_contract_class(&self, id: B256) -> StoreResult<Option<ContractClass>>;

    /// Returns the public bytecode commitment of the class with the provided id.
    async fn get_bytecode_commitment(&self, id: B256) -> StoreResult<Option<B256>>;

    /// Returns the ids of all stored classes.
    async fn get_contract_class_ids(&self) -> StoreResult<Vec<B256>>;

    /// Adds broadcast functions to a stored class, ignoring already known selectors.
    async fn add_functions(
        &self,
        class_id: B256,
        functions: &[BroadcastFunction],
    ) -> StoreResult<bool>;

    /// Stores the instances deployed at `block_number`.
    async fn add_contract_instances(
        &self,
        instances: &[ContractInstance],
        block_number: u64,
    ) -> StoreResult<bool>;

    /// Deletes the instances deployed at or after `block_number`.
    async fn delete_contract_instances(
        &self,
        instances: &[ContractInstance],
        block_number: u64,
    ) -> StoreResult<bool>;

    /// Stores the instance updates emitted at `block_number`.
    async fn add_contract_instance_updates(
        &self,
        updates: &[ContractInstanceUpdate],
        block_number: u64,
    ) -> StoreResult<bool>;

    /// Deletes the instance updates emitted at `block_number`.
    async fn delete_contract_instance_updates(
        &self,
        updates: &[ContractInstanceUpdate],
        block_number: u64,
    ) -> StoreResult<bool>;

    /// Returns the instance at `address`, with its current class resolved as of `block_number`.
    async fn get_contract_instance(
        &self,
        address: L2Address,
        block_number: u64,
    ) -> StoreResult<Option<ContractInstance>>;

    /// Indexes the logs of the blocks.
    async fn add_logs(&self, blocks: &[L2Block]) -> StoreResult<bool>;

    /// Removes the logs of the blocks.
    async fn delete_logs(&self, blocks: &[L2Block]) -> StoreResult<bool>;

    /// Returns the private logs of up to `limit` blocks starting at `from`.
    async fn get_private_logs(&self, from: u64, limit: usize) -> StoreResult<Vec<PrivateLog>>;

    /// Returns the public logs matching the filter.
    async fn get_public_logs(&self, filter: &LogFilter) -> StoreResult<Vec<ExtendedPublicLog>>;

    /// Indexes the nullifiers of the blocks.
    async fn add_nullifiers(&self, blocks: &[L2Block]) -> StoreResult<bool>;

    /// Removes the nullifiers of the blocks.
    async fn delete_nullifiers(&self, blocks: &[L2Block]) -> StoreResult<bool>;

    /// Returns the block the nullifier was emitted in.
    async fn find_nullifier_block_number(&self, nullifier: B256) -> StoreResult<Option<u64>>;

    /// Appends the messages and moves the message pointer forward to the last processed L1
    /// block. The pointer never moves backward.
    async fn add_l1_to_l2_messages(&self, messages: &Retrieved<InboxMessage>) -> StoreResult<bool>;

    /// Returns the amount of stored messages.
    async fn get_total_l1_to_l2_message_count(&self) -> StoreResult<u64>;

    /// Returns the message leaves of the L2 block, sorted by index.
    async fn get_l1_to_l2_messages(&self, l2_block_number: u64) -> StoreResult<Vec<B256>>;

    /// Returns the index of the message leaf.
    async fn get_l1_to_l2_message_index(&self, leaf: B256) -> StoreResult<Option<u64>>;
}
