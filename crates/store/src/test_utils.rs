use crate::{
    ArchiverStore, ExtendedPublicLog, IndexedTxEffect, LogFilter, MemoryArchiverStore,
    StoreResult,
};
use alloy_primitives::B256;
use archiver_primitives::{
    BroadcastFunction, ContractClass, ContractInstance, ContractInstanceUpdate, InboxMessage,
    L2Address, L2Block, PrivateLog, PublishedL2Block, Retrieved, SyncPoint,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tokio::sync::watch;

/// A store write that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreWrite {
    /// [`ArchiverStore::add_blocks`].
    AddBlocks,
    /// [`ArchiverStore::unwind_blocks`].
    UnwindBlocks,
    /// [`ArchiverStore::add_logs`].
    AddLogs,
    /// [`ArchiverStore::add_nullifiers`].
    AddNullifiers,
    /// [`ArchiverStore::add_contract_classes`].
    AddContractClasses,
    /// [`ArchiverStore::add_functions`].
    AddFunctions,
    /// [`ArchiverStore::add_l1_to_l2_messages`].
    AddMessages,
}

/// A [`MemoryArchiverStore`] whose writes can be failed or held on demand.
///
/// A failed write reports `false` without touching the inner store.
#[derive(Debug)]
pub struct FailingArchiverStore {
    inner: MemoryArchiverStore,
    failures: Mutex<HashMap<StoreWrite, usize>>,
    hidden_blocks: Mutex<HashSet<u64>>,
    hold_block_writes: watch::Sender<bool>,
    held_block_writes: watch::Sender<usize>,
}

impl Default for FailingArchiverStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FailingArchiverStore {
    /// Returns a new empty [`FailingArchiverStore`].
    pub fn new() -> Self {
        Self {
            inner: MemoryArchiverStore::new(),
            failures: Mutex::new(HashMap::new()),
            hidden_blocks: Mutex::new(HashSet::new()),
            hold_block_writes: watch::channel(false).0,
            held_block_writes: watch::channel(0).0,
        }
    }

    /// Makes the next `count` calls of the write fail.
    pub fn fail_next(&self, write: StoreWrite, count: usize) {
        self.failures.lock().insert(write, count);
    }

    /// Makes [`ArchiverStore::get_block`] return nothing for the block.
    pub fn hide_block(&self, number: u64) {
        self.hidden_blocks.lock().insert(number);
    }

    /// Makes block writes wait until [`Self::release_block_writes`] is called.
    pub fn hold_block_writes(&self) {
        self.hold_block_writes.send_replace(true);
    }

    /// Lets the held block writes through.
    pub fn release_block_writes(&self) {
        self.hold_block_writes.send_replace(false);
    }

    /// Returns a receiver of the amount of block writes held so far.
    pub fn held_block_writes(&self) -> watch::Receiver<usize> {
        self.held_block_writes.subscribe()
    }

    fn should_fail(&self, write: StoreWrite) -> bool {
        let mut failures = self.failures.lock();
        match failures.get_mut(&write) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    async fn wait_until_released(&self) {
        let mut hold = self.hold_block_writes.subscribe();
        let held = *hold.borrow_and_update();
        if !held {
            return;
        }

        self.held_block_writes.send_modify(|held| *held += 1);
        loop {
            let held = *hold.borrow_and_update();
            if !held || hold.changed().await.is_err() {
                break;
            }
        }
    }
}

#[async_trait::async_trait]
impl ArchiverStore for FailingArchiverStore {
    async fn get_sync_point(&self) -> StoreResult<SyncPoint> {
        self.inner.get_sync_point().await
    }

    async fn set_blocks_synced_to(&self, l1_block_number: u64) -> StoreResult<()> {
        self.inner.set_blocks_synced_to(l1_block_number).await
    }

    async fn set_messages_synced_to(&self, l1_block_number: u64) -> StoreResult<()> {
        self.inner.set_messages_synced_to(l1_block_number).await
    }

    async fn get_synced_l2_block_number(&self) -> StoreResult<u64> {
        self.inner.get_synced_l2_block_number().await
    }

    async fn get_block(&self, number: u64) -> StoreResult<Option<PublishedL2Block>> {
        let hidden = self.hidden_blocks.lock().contains(&number);
        if hidden {
            return Ok(None);
        }
        self.inner.get_block(number).await
    }

    async fn get_blocks(&self, from: u64, limit: usize) -> StoreResult<Vec<PublishedL2Block>> {
        self.inner.get_blocks(from, limit).await
    }

    async fn get_block_by_hash(&self, hash: B256) -> StoreResult<Option<PublishedL2Block>> {
        self.inner.get_block_by_hash(hash).await
    }

    async fn get_tx_effect(&self, tx_hash: B256) -> StoreResult<Option<IndexedTxEffect>> {
        self.inner.get_tx_effect(tx_hash).await
    }

    async fn add_blocks(&self, blocks: &[PublishedL2Block]) -> StoreResult<bool> {
        self.wait_until_released().await;
        if self.should_fail(StoreWrite::AddBlocks) {
            return Ok(false);
        }
        self.inner.add_blocks(blocks).await
    }

    async fn unwind_blocks(&self, from: u64, count: u64) -> StoreResult<bool> {
        if self.should_fail(StoreWrite::UnwindBlocks) {
            return Ok(false);
        }
        self.inner.unwind_blocks(from, count).await
    }

    async fn get_proven_l2_block_number(&self) -> StoreResult<u64> {
        self.inner.get_proven_l2_block_number().await
    }

    async fn set_proven_l2_block_number(&self, block_number: u64) -> StoreResult<()> {
        self.inner.set_proven_l2_block_number(block_number).await
    }

    async fn get_proven_l2_epoch_number(&self) -> StoreResult<Option<u64>> {
        self.inner.get_proven_l2_epoch_number().await
    }

    async fn set_proven_l2_epoch_number(&self, epoch_number: u64) -> StoreResult<()> {
        self.inner.set_proven_l2_epoch_number(epoch_number).await
    }

    async fn add_contract_classes(
        &self,
        classes: &[ContractClass],
        bytecode_commitments: &[B256],
        block_number: u64,
    ) -> StoreResult<bool> {
        if self.should_fail(StoreWrite::AddContractClasses) {
            return Ok(false);
        }
        self.inner.add_contract_classes(classes, bytecode_commitments, block_number).await
    }

    async fn delete_contract_classes(
        &self,
        classes: &[ContractClass],
        block_number: u64,
    ) -> StoreResult<bool> {
        self.inner.delete_contract_classes(classes, block_number).await
    }

    async fn get_contract_class(&self, id: B256) -> StoreResult<Option<ContractClass>> {
        self.inner.get_contract_class(id).await
    }

    async fn get_bytecode_commitment(&self, id: B256) -> StoreResult<Option<B256>> {
        self.inner.get_bytecode_commitment(id).await
    }

    async fn get_contract_class_ids(&self) -> StoreResult<Vec<B256>> {
        self.inner.get_contract_class_ids().await
    }

    async fn add_functions(
        &self,
        class_id: B256,
        functions: &[BroadcastFunction],
    ) -> StoreResult<bool> {
        if self.should_fail(StoreWrite::AddFunctions) {
            return Ok(false);
        }
        self.inner.add_functions(class_id, functions).await
    }

    async fn add_contract_instances(
        &self,
        instances: &[ContractInstance],
        block_number: u64,
    ) -> StoreResult<bool> {
        self.inner.add_contract_instances(instances, block_number).await
    }

    async fn delete_contract_instances(
        &self,
        instances: &[ContractInstance],
        block_number: u64,
    ) -> StoreResult<bool> {
        self.inner.delete_contract_instances(instances, block_number).await
    }

    async fn add_contract_instance_updates(
        &self,
        updates: &[ContractInstanceUpdate],
        block_number: u64,
    ) -> StoreResult<bool> {
        self.inner.add_contract_instance_updates(updates, block_number).await
    }

    async fn delete_contract_instance_updates(
        &self,
        updates: &[ContractInstanceUpdate],
        block_number: u64,
    ) -> StoreResult<bool> {
        self.inner.delete_contract_instance_updates(updates, block_number).await
    }

    async fn get_contract_instance(
        &self,
        address: L2Address,
        block_number: u64,
    ) -> StoreResult<Option<ContractInstance>> {
        self.inner.get_contract_instance(address, block_number).await
    }

    async fn add_logs(&self, blocks: &[L2Block]) -> StoreResult<bool> {
        if self.should_fail(StoreWrite::AddLogs) {
            return Ok(false);
        }
        self.inner.add_logs(blocks).await
    }

    async fn delete_logs(&self, blocks: &[L2Block]) -> StoreResult<bool> {
        self.inner.delete_logs(blocks).await
    }

    async fn get_private_logs(&self, from: u64, limit: usize) -> StoreResult<Vec<PrivateLog>> {
        self.inner.get_private_logs(from, limit).await
    }

    async fn get_public_logs(&self, filter: &LogFilter) -> StoreResult<Vec<ExtendedPublicLog>> {
        self.inner.get_public_logs(filter).await
    }

    async fn add_nullifiers(&self, blocks: &[L2Block]) -> StoreResult<bool> {
        if self.should_fail(StoreWrite::AddNullifiers) {
            return Ok(false);
        }
        self.inner.add_nullifiers(blocks).await
    }

    async fn delete_nullifiers(&self, blocks: &[L2Block]) -> StoreResult<bool> {
        self.inner.delete_nullifiers(blocks).await
    }

    async fn find_nullifier_block_number(&self, nullifier: B256) -> StoreResult<Option<u64>> {
        self.inner.find_nullifier_block_number(nullifier).await
    }

    async fn add_l1_to_l2_messages(&self, messages: &Retrieved<InboxMessage>) -> StoreResult<bool> {
        if self.should_fail(StoreWrite::AddMessages) {
            return Ok(false);
        }
        self.inner.add_l1_to_l2_messages(messages).await
    }

    async fn get_total_l1_to_l2_message_count(&self) -> StoreResult<u64> {
        self.inner.get_total_l1_to_l2_message_count().await
    }

    async fn get_l1_to_l2_messages(&self, l2_block_number: u64) -> StoreResult<Vec<B256>> {
        self.inner.get_l1_to_l2_messages(l2_block_number).await
    }

    async fn get_l1_to_l2_message_index(&self, leaf: B256) -> StoreResult<Option<u64>> {
        self.inner.get_l1_to_l2_message_index(leaf).await
    }
}
