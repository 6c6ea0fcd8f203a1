use crate::next_l2_slot;
use alloy_primitives::B256;
use archiver_primitives::{
    BlockHeader, ContractClass, ContractInstance, L1RollupConstants, L1Snapshot, L2Address,
    L2Block, PrivateLog, PublishedL2Block, SyncPoint,
};
use archiver_store::{ArchiverStore, ExtendedPublicLog, IndexedTxEffect, LogFilter, StoreResult};
use tokio::sync::watch;

/// Read-only queries over the data synced by the [`crate::Archiver`].
///
/// Reads go straight to the store and may observe the state before or after an in-flight sync
/// pass.
#[derive(Debug, Clone)]
pub struct ArchiverSource<S> {
    store: S,
    l1_snapshot: watch::Receiver<Option<L1Snapshot>>,
    constants: L1RollupConstants,
}

impl<S: ArchiverStore> ArchiverSource<S> {
    pub(crate) const fn new(
        store: S,
        l1_snapshot: watch::Receiver<Option<L1Snapshot>>,
        constants: L1RollupConstants,
    ) -> Self {
        Self { store, l1_snapshot, constants }
    }

    /// Returns the number of the latest synced L2 block.
    pub async fn get_block_number(&self) -> StoreResult<u64> {
        self.store.get_synced_l2_block_number().await
    }

    /// Returns the number of the latest proven L2 block.
    pub async fn get_proven_block_number(&self) -> StoreResult<u64> {
        self.store.get_proven_l2_block_number().await
    }

    /// Returns the latest proven epoch.
    pub async fn get_proven_l2_epoch_number(&self) -> StoreResult<Option<u64>> {
        self.store.get_proven_l2_epoch_number().await
    }

    /// Returns the block with the provided number.
    pub async fn get_block(&self, number: u64) -> StoreResult<Option<L2Block>> {
        Ok(self.store.get_block(number).await?.map(|b| b.block))
    }

    /// Returns the block with the provided number, along with its L1 publication data.
    pub async fn get_published_block(&self, number: u64) -> StoreResult<Option<PublishedL2Block>> {
        self.store.get_block(number).await
    }

    /// Returns the header of the block with the provided number.
    pub async fn get_block_header(&self, number: u64) -> StoreResult<Option<BlockHeader>> {
        Ok(self.store.get_block(number).await?.map(|b| b.block.header))
    }

    /// Returns the block with the provided hash.
    pub async fn get_block_by_hash(&self, hash: B256) -> StoreResult<Option<L2Block>> {
        Ok(self.store.get_block_by_hash(hash).await?.map(|b| b.block))
    }

    /// Returns up to `limit` blocks starting at `from`. If `proven` is set, only proven blocks
    /// are returned.
    pub async fn get_blocks(
        &self,
        from: u64,
        limit: usize,
        proven: bool,
    ) -> StoreResult<Vec<L2Block>> {
        let limit = if proven {
            let proven = self.store.get_proven_l2_block_number().await?;
            limit.min((proven + 1).saturating_sub(from) as usize)
        } else {
            limit
        };
        if limit == 0 {
            return Ok(Vec::new());
        }

        Ok(self.store.get_blocks(from, limit).await?.into_iter().map(|b| b.block).collect())
    }

    /// Returns the effect of the transaction with the provided hash.
    pub async fn get_tx_effect(&self, tx_hash: B256) -> StoreResult<Option<IndexedTxEffect>> {
        self.store.get_tx_effect(tx_hash).await
    }

    /// Returns the L1 to L2 message leaves of the L2 block.
    pub async fn get_l1_to_l2_messages(&self, l2_block_number: u64) -> StoreResult<Vec<B256>> {
        self.store.get_l1_to_l2_messages(l2_block_number).await
    }

    /// Returns the index of the L1 to L2 message leaf.
    pub async fn get_l1_to_l2_message_index(&self, leaf: B256) -> StoreResult<Option<u64>> {
        self.store.get_l1_to_l2_message_index(leaf).await
    }

    /// Returns the contract class with the provided id.
    pub async fn get_contract_class(&self, id: B256) -> StoreResult<Option<ContractClass>> {
        self.store.get_contract_class(id).await
    }

    /// Returns the public bytecode commitment of the contract class.
    pub async fn get_bytecode_commitment(&self, id: B256) -> StoreResult<Option<B256>> {
        self.store.get_bytecode_commitment(id).await
    }

    /// Returns the ids of every registered contract class.
    pub async fn get_contract_class_ids(&self) -> StoreResult<Vec<B256>> {
        self.store.get_contract_class_ids().await
    }

    /// Returns the contract instance at `address` as of `block_number`, or as of the latest
    /// synced block if unset.
    pub async fn get_contract(
        &self,
        address: L2Address,
        block_number: Option<u64>,
    ) -> StoreResult<Option<ContractInstance>> {
        let block_number = match block_number {
            Some(number) => number,
            None => self.store.get_synced_l2_block_number().await?,
        };
        self.store.get_contract_instance(address, block_number).await
    }

    /// Returns the private logs of up to `limit` blocks starting at `from`.
    pub async fn get_private_logs(&self, from: u64, limit: usize) -> StoreResult<Vec<PrivateLog>> {
        self.store.get_private_logs(from, limit).await
    }

    /// Returns the public logs matching the filter.
    pub async fn get_public_logs(&self, filter: &LogFilter) -> StoreResult<Vec<ExtendedPublicLog>> {
        self.store.get_public_logs(filter).await
    }

    /// Returns the block the nullifier was emitted in.
    pub async fn find_nullifier_block_number(&self, nullifier: B256) -> StoreResult<Option<u64>> {
        self.store.find_nullifier_block_number(nullifier).await
    }

    /// Returns the L1 blocks the archiver is synced to.
    pub async fn get_sync_point(&self) -> StoreResult<SyncPoint> {
        self.store.get_sync_point().await
    }

    /// Returns the latest L1 block observed by the archiver.
    pub fn get_l1_snapshot(&self) -> Option<L1Snapshot> {
        *self.l1_snapshot.borrow()
    }

    /// Returns the L2 slot of the next L1 block.
    pub fn get_l2_slot_number(&self) -> Option<u64> {
        self.get_l1_snapshot().map(|snapshot| next_l2_slot(&self.constants, snapshot))
    }

    /// Returns the L2 epoch of the next L1 block.
    pub fn get_l2_epoch_number(&self) -> Option<u64> {
        self.get_l2_slot_number().map(|slot| self.constants.epoch_at_slot(slot))
    }
}
