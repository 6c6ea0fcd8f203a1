use crate::{
    ArchiverStore, ExtendedPublicLog, IndexedTxEffect, LogFilter, StoreError, StoreResult,
};
use alloy_primitives::B256;
use archiver_primitives::{
    BroadcastFunction, ContractClass, ContractInstance, ContractInstanceUpdate, InboxMessage,
    L2Address, L2Block, PrivateLog, PublishedL2Block, Retrieved, SyncPoint,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug)]
struct StoredContractClass {
    class: ContractClass,
    bytecode_commitment: B256,
    block_number: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    sync_point: SyncPoint,
    blocks: BTreeMap<u64, PublishedL2Block>,
    block_hashes: HashMap<B256, u64>,
    tx_effects: HashMap<B256, (u64, usize)>,
    proven_block_number: u64,
    proven_epoch_number: Option<u64>,
    contract_classes: HashMap<B256, StoredContractClass>,
    contract_instances: HashMap<L2Address, (ContractInstance, u64)>,
    contract_instance_updates: HashMap<L2Address, Vec<(u64, ContractInstanceUpdate)>>,
    private_logs: BTreeMap<u64, Vec<PrivateLog>>,
    public_logs: BTreeMap<u64, Vec<ExtendedPublicLog>>,
    nullifiers: HashMap<B256, u64>,
    messages: BTreeMap<u64, InboxMessage>,
    message_indices: HashMap<B256, u64>,
}

impl MemoryState {
    fn tip(&self) -> u64 {
        self.blocks.last_key_value().map(|(n, _)| *n).unwrap_or_default()
    }
}

/// An in-memory implementation of the [`ArchiverStore`].
///
/// Every operation takes the lock once, so readers never observe a partially applied write.
#[derive(Debug, Default)]
pub struct MemoryArchiverStore {
    state: RwLock<MemoryState>,
}

impl MemoryArchiverStore {
    /// Returns a new empty [`MemoryArchiverStore`].
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ArchiverStore for MemoryArchiverStore {
    async fn get_sync_point(&self) -> StoreResult<SyncPoint> {
        Ok(self.state.read().sync_point)
    }

    async fn set_blocks_synced_to(&self, l1_block_number: u64) -> StoreResult<()> {
        self.state.write().sync_point.blocks_synced_to = Some(l1_block_number);
        Ok(())
    }

    async fn set_messages_synced_to(&self, l1_block_number: u64) -> StoreResult<()> {
        self.state.write().sync_point.messages_synced_to = Some(l1_block_number);
        Ok(())
    }

    async fn get_synced_l2_block_number(&self) -> StoreResult<u64> {
        Ok(self.state.read().tip())
    }

    async fn get_block(&self, number: u64) -> StoreResult<Option<PublishedL2Block>> {
        Ok(self.state.read().blocks.get(&number).cloned())
    }

    async fn get_blocks(&self, from: u64, limit: usize) -> StoreResult<Vec<PublishedL2Block>> {
        Ok(self.state.read().blocks.range(from..).take(limit).map(|(_, b)| b.clone()).collect())
    }

    async fn get_block_by_hash(&self, hash: B256) -> StoreResult<Option<PublishedL2Block>> {
        let state = self.state.read();
        Ok(state.block_hashes.get(&hash).and_then(|n| state.blocks.get(n)).cloned())
    }

    async fn get_tx_effect(&self, tx_hash: B256) -> StoreResult<Option<IndexedTxEffect>> {
        let state = self.state.read();
        let Some((block_number, tx_index)) = state.tx_effects.get(&tx_hash).copied() else {
            return Ok(None);
        };
        Ok(state.blocks.get(&block_number).and_then(|published| {
            published.block.body.tx_effects.get(tx_index).map(|effect| IndexedTxEffect {
                block_number,
                block_hash: published.block.hash(),
                tx_index,
                effect: effect.clone(),
            })
        }))
    }

    async fn add_blocks(&self, blocks: &[PublishedL2Block]) -> StoreResult<bool> {
        let mut state = self.state.write();
        let mut expected = state.tip() + 1;
        for published in blocks {
            if published.number() != expected {
                return Err(StoreError::NonSequentialBlock { expected, got: published.number() });
            }
            expected += 1;
        }

        for published in blocks {
            let number = published.number();
            state.block_hashes.insert(published.block.hash(), number);
            for (i, tx) in published.block.body.tx_effects.iter().enumerate() {
                state.tx_effects.insert(tx.tx_hash, (number, i));
            }
            state.blocks.insert(number, published.clone());
        }
        tracing::trace!(
            target: "archiver::store",
            count = blocks.len(),
            tip = state.tip(),
            "added blocks"
        );

        Ok(true)
    }

    async fn unwind_blocks(&self, from: u64, count: u64) -> StoreResult<bool> {
        let mut state = self.state.write();
        let tip = state.tip();
        if from != tip {
            return Err(StoreError::UnwindNotFromTip { requested: from, tip });
        }
        if count > from {
            return Err(StoreError::UnwindTooDeep { from, count });
        }

        for number in (from - count + 1)..=from {
            let Some(published) = state.blocks.remove(&number) else { continue };
            state.block_hashes.remove(&published.block.hash());
            for tx in &published.block.body.tx_effects {
                state.tx_effects.remove(&tx.tx_hash);
            }
        }
        tracing::debug!(
            target: "archiver::store",
            from,
            count,
            tip = state.tip(),
            "unwound blocks"
        );

        Ok(true)
    }

    async fn get_proven_l2_block_number(&self) -> StoreResult<u64> {
        Ok(self.state.read().proven_block_number)
    }

    async fn set_proven_l2_block_number(&self, block_number: u64) -> StoreResult<()> {
        self.state.write().proven_block_number = block_number;
        Ok(())
    }

    async fn get_proven_l2_epoch_number(&self) -> StoreResult<Option<u64>> {
        Ok(self.state.read().proven_epoch_number)
    }

    async fn set_proven_l2_epoch_number(&self, epoch_number: u64) -> StoreResult<()> {
        self.state.write().proven_epoch_number = Some(epoch_number);
        Ok(())
    }

    async fn add_contract_classes(
        &self,
        classes: &[ContractClass],
        bytecode_commitments: &[B256],
        block_number: u64,
    ) -> StoreResult<bool> {
        let mut state = self.state.write();
        for (class, commitment) in classes.iter().zip(bytecode_commitments) {
            state.contract_classes.entry(class.id).or_insert_with(|| StoredContractClass {
                class: class.clone(),
                bytecode_commitment: *commitment,
                block_number,
            });
        }
        Ok(true)
    }

    async fn delete_contract_classes(
        &self,
        classes: &[ContractClass],
        block_number: u64,
    ) -> StoreResult<bool> {
        let mut state = self.state.write();
        for class in classes {
            let registered_at = state.contract_classes.get(&class.id).map(|c| c.block_number);
            if registered_at.is_some_and(|registered_at| registered_at >= block_number) {
                state.contract_classes.remove(&class.id);
            }
        }
        Ok(true)
    }

    async fn get_contract_class(&self, id: B256) -> StoreResult<Option<ContractClass>> {
        Ok(self.state.read().contract_classes.get(&id).map(|c| c.class.clone()))
    }

    async fn get_bytecode_commitment(&self, id: B256) -> StoreResult<Option<B256>> {
        Ok(self.state.read().contract_classes.get(&id).map(|c| c.bytecode_commitment))
    }

    async fn get_contract_class_ids(&self) -> StoreResult<Vec<B256>> {
        Ok(self.state.read().contract_classes.keys().copied().collect())
    }

    async fn add_functions(
        &self,
        class_id: B256,
        functions: &[BroadcastFunction],
    ) -> StoreResult<bool> {
        let mut state = self.state.write();
        let stored = state
            .contract_classes
            .get_mut(&class_id)
            .ok_or(StoreError::UnknownContractClass(class_id))?;
        stored.class.add_functions(functions.iter().cloned());
        Ok(true)
    }

    async fn add_contract_instances(
        &self,
        instances: &[ContractInstance],
        block_number: u64,
    ) -> StoreResult<bool> {
        let mut state = self.state.write();
        for instance in instances {
            state.contract_instances.entry(instance.address).or_insert((*instance, block_number));
        }
        Ok(true)
    }

    async fn delete_contract_instances(
        &self,
        instances: &[ContractInstance],
        block_number: u64,
    ) -> StoreResult<bool> {
        let mut state = self.state.write();
        for instance in instances {
            if state
                .contract_instances
                .get(&instance.address)
                .is_some_and(|(_, deployed_at)| *deployed_at >= block_number)
            {
                state.contract_instances.remove(&instance.address);
            }
        }
        Ok(true)
    }

    async fn add_contract_instance_updates(
        &self,
        updates: &[ContractInstanceUpdate],
        block_number: u64,
    ) -> StoreResult<bool> {
        let mut state = self.state.write();
        for update in updates {
            let stored = state.contract_instance_updates.entry(update.address).or_default();
            if !stored.contains(&(block_number, *update)) {
                stored.push((block_number, *update));
            }
        }
        Ok(true)
    }

    async fn delete_contract_instance_updates(
        &self,
        updates: &[ContractInstanceUpdate],
        block_number: u64,
    ) -> StoreResult<bool> {
        let mut state = self.state.write();
        for update in updates {
            if let Some(stored) = state.contract_instance_updates.get_mut(&update.address) {
                stored.retain(|(emitted_at, u)| !(*emitted_at == block_number && u == update));
                if stored.is_empty() {
                    state.contract_instance_updates.remove(&update.address);
                }
            }
        }
        Ok(true)
    }

    async fn get_contract_instance(
        &self,
        address: L2Address,
        block_number: u64,
    ) -> StoreResult<Option<ContractInstance>> {
        let state = self.state.read();
        let Some((mut instance, _)) = state.contract_instances.get(&address).copied() else {
            return Ok(None);
        };

        // the latest update applying at the block wins.
        let current = state.contract_instance_updates.get(&address).and_then(|updates| {
            updates
                .iter()
                .filter(|(_, u)| u.block_of_change <= block_number)
                .max_by_key(|(emitted_at, u)| (u.block_of_change, *emitted_at))
        });
        if let Some((_, update)) = current {
            instance.current_contract_class_id = update.new_contract_class_id;
        }

        Ok(Some(instance))
    }

    async fn add_logs(&self, blocks: &[L2Block]) -> StoreResult<bool> {
        let mut state = self.state.write();
        for block in blocks {
            let number = block.number();
            state.private_logs.insert(number, block.private_logs().cloned().collect());

            let public_logs = block
                .body
                .tx_effects
                .iter()
                .enumerate()
                .flat_map(|(tx_index, tx)| {
                    tx.public_logs.iter().enumerate().map(move |(log_index, log)| {
                        ExtendedPublicLog {
                            block_number: number,
                            tx_index,
                            log_index,
                            log: log.clone(),
                        }
                    })
                })
                .collect();
            state.public_logs.insert(number, public_logs);
        }
        Ok(true)
    }

    async fn delete_logs(&self, blocks: &[L2Block]) -> StoreResult<bool> {
        let mut state = self.state.write();
        for block in blocks {
            state.private_logs.remove(&block.number());
            state.public_logs.remove(&block.number());
        }
        Ok(true)
    }

    async fn get_private_logs(&self, from: u64, limit: usize) -> StoreResult<Vec<PrivateLog>> {
        let state = self.state.read();
        let to = from.saturating_add(limit as u64);
        Ok(state.private_logs.range(from..to).flat_map(|(_, logs)| logs.iter().cloned()).collect())
    }

    async fn get_public_logs(&self, filter: &LogFilter) -> StoreResult<Vec<ExtendedPublicLog>> {
        let state = self.state.read();
        Ok(state
            .public_logs
            .values()
            .flatten()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect())
    }

    async fn add_nullifiers(&self, blocks: &[L2Block]) -> StoreResult<bool> {
        let mut state = self.state.write();
        for block in blocks {
            for nullifier in block.nullifiers() {
                state.nullifiers.insert(*nullifier, block.number());
            }
        }
        Ok(true)
    }

    async fn delete_nullifiers(&self, blocks: &[L2Block]) -> StoreResult<bool> {
        let mut state = self.state.write();
        for block in blocks {
            for nullifier in block.nullifiers() {
                state.nullifiers.remove(nullifier);
            }
        }
        Ok(true)
    }

    async fn find_nullifier_block_number(&self, nullifier: B256) -> StoreResult<Option<u64>> {
        Ok(self.state.read().nullifiers.get(&nullifier).copied())
    }

    async fn add_l1_to_l2_messages(&self, messages: &Retrieved<InboxMessage>) -> StoreResult<bool> {
        let mut state = self.state.write();
        let last = messages.last_processed_l1_block_number;
        if state.sync_point.messages_synced_to.is_none_or(|synced| synced < last) {
            state.sync_point.messages_synced_to = Some(last);
        }

        for message in &messages.retrieved_data {
            state.messages.insert(message.index, *message);
            state.message_indices.insert(message.leaf, message.index);
        }
        Ok(true)
    }

    async fn get_total_l1_to_l2_message_count(&self) -> StoreResult<u64> {
        Ok(self.state.read().messages.len() as u64)
    }

    async fn get_l1_to_l2_messages(&self, l2_block_number: u64) -> StoreResult<Vec<B256>> {
        let state = self.state.read();
        let start = InboxMessage::smallest_index_from_l2_block(l2_block_number);

        let mut expected = start;
        let mut leaves = Vec::new();
        for (index, message) in state.messages.range(start..) {
            if message.l2_block_number != l2_block_number {
                break;
            }
            if *index != expected {
                return Err(StoreError::MessageGap(l2_block_number));
            }
            leaves.push(message.leaf);
            expected += 1;
        }
        Ok(leaves)
    }

    async fn get_l1_to_l2_message_index(&self, leaf: B256) -> StoreResult<Option<u64>> {
        Ok(self.state.read().message_indices.get(&leaf).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archiver_primitives::{
        test_utils::{chain, contract::ContractClassFixture, published},
        ContractInstanceUpdate, PublicLog, TxEffect,
    };

    fn message(index: u64, l2_block_number: u64, l1_block_number: u64) -> InboxMessage {
        InboxMessage {
            index,
            leaf: B256::left_padding_from(&(index + 1).to_be_bytes()),
            l1_block_number,
            l1_block_hash: B256::ZERO,
            l2_block_number,
        }
    }

    #[tokio::test]
    async fn test_should_only_unwind_from_tip() -> eyre::Result<()> {
        // Given
        let store = MemoryArchiverStore::new();
        let blocks = chain(5).into_iter().map(|b| published(b, 1)).collect::<Vec<_>>();
        store.add_blocks(&blocks).await?;

        // When
        let res = store.unwind_blocks(4, 1).await;

        // Then
        assert!(matches!(res, Err(StoreError::UnwindNotFromTip { requested: 4, tip: 5 })));
        assert!(store.unwind_blocks(5, 2).await?);
        assert_eq!(store.get_synced_l2_block_number().await?, 3);
        assert!(store.get_block_by_hash(blocks[4].block.hash()).await?.is_none());
        assert!(store.get_block_by_hash(blocks[2].block.hash()).await?.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_should_reject_gapped_blocks() -> eyre::Result<()> {
        let store = MemoryArchiverStore::new();
        let blocks = chain(3).into_iter().map(|b| published(b, 1)).collect::<Vec<_>>();

        let res = store.add_blocks(&blocks[1..]).await;

        assert!(matches!(res, Err(StoreError::NonSequentialBlock { expected: 1, got: 2 })));
        assert_eq!(store.get_synced_l2_block_number().await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_should_index_tx_effects() -> eyre::Result<()> {
        // Given
        let store = MemoryArchiverStore::new();
        let mut block = chain(1).remove(0);
        let tx = TxEffect { tx_hash: B256::repeat_byte(0x11), ..Default::default() };
        block.body.tx_effects.push(tx.clone());
        store.add_blocks(&[published(block.clone(), 1)]).await?;

        // When
        let effect = store.get_tx_effect(tx.tx_hash).await?;

        // Then
        let expected =
            IndexedTxEffect { block_number: 1, block_hash: block.hash(), tx_index: 0, effect: tx };
        assert_eq!(effect, Some(expected));

        Ok(())
    }

    #[tokio::test]
    async fn test_should_keep_class_registered_before_deleted_block() -> eyre::Result<()> {
        // Given
        let store = MemoryArchiverStore::new();
        let class = ContractClassFixture::new(1, 1, 0).class;
        let commitment = class.public_bytecode_commitment();
        store.add_contract_classes(&[class.clone()], &[commitment], 2).await?;
        store.add_contract_classes(&[class.clone()], &[commitment], 5).await?;

        // When
        store.delete_contract_classes(&[class.clone()], 5).await?;

        // Then
        assert!(store.get_contract_class(class.id).await?.is_some());
        store.delete_contract_classes(&[class.clone()], 2).await?;
        assert!(store.get_contract_class(class.id).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_should_fail_adding_functions_to_unknown_class() {
        let store = MemoryArchiverStore::new();
        let fixture = ContractClassFixture::new(1, 1, 1);

        let res = store.add_functions(fixture.class.id, &fixture.broadcast_functions()).await;

        assert!(matches!(res, Err(StoreError::UnknownContractClass(id)) if id == fixture.class.id));
    }

    #[tokio::test]
    async fn test_should_resolve_instance_updates_by_block() -> eyre::Result<()> {
        // Given
        let store = MemoryArchiverStore::new();
        let instance = ContractInstance {
            address: B256::repeat_byte(1),
            current_contract_class_id: B256::repeat_byte(2),
            original_contract_class_id: B256::repeat_byte(2),
            ..Default::default()
        };
        let update = ContractInstanceUpdate {
            address: instance.address,
            prev_contract_class_id: B256::repeat_byte(2),
            new_contract_class_id: B256::repeat_byte(3),
            block_of_change: 10,
        };
        store.add_contract_instances(&[instance], 1).await?;
        // a retried batch adds the same update twice.
        store.add_contract_instance_updates(&[update], 4).await?;
        store.add_contract_instance_updates(&[update], 4).await?;

        // When
        let before = store.get_contract_instance(instance.address, 9).await?;
        let after = store.get_contract_instance(instance.address, 10).await?;

        // Then
        assert_eq!(before.map(|i| i.current_contract_class_id), Some(B256::repeat_byte(2)));
        assert_eq!(after.map(|i| i.current_contract_class_id), Some(B256::repeat_byte(3)));
        assert_eq!(after.map(|i| i.original_contract_class_id), Some(B256::repeat_byte(2)));

        store.delete_contract_instance_updates(&[update], 4).await?;
        let after = store.get_contract_instance(instance.address, 10).await?;
        assert_eq!(after.map(|i| i.current_contract_class_id), Some(B256::repeat_byte(2)));

        Ok(())
    }

    #[tokio::test]
    async fn test_should_return_messages_sorted_by_index() -> eyre::Result<()> {
        // Given
        let store = MemoryArchiverStore::new();
        let start = InboxMessage::smallest_index_from_l2_block(2);
        let messages =
            vec![message(start + 1, 2, 3), message(start, 2, 3), message(start + 2, 2, 4)];
        store.add_l1_to_l2_messages(&Retrieved::new(messages, 1..=4, 4)).await?;

        // When
        let leaves = store.get_l1_to_l2_messages(2).await?;

        // Then
        let expected = [start, start + 1, start + 2].map(|i| message(i, 2, 3).leaf);
        assert_eq!(leaves, expected.to_vec());
        let last = message(start + 2, 2, 4).leaf;
        assert_eq!(store.get_l1_to_l2_message_index(last).await?, Some(start + 2));
        assert_eq!(store.get_sync_point().await?.messages_synced_to, Some(4));

        Ok(())
    }

    #[tokio::test]
    async fn test_should_fail_on_message_gap() -> eyre::Result<()> {
        let store = MemoryArchiverStore::new();
        let start = InboxMessage::smallest_index_from_l2_block(3);
        let messages = vec![message(start, 3, 1), message(start + 2, 3, 1)];
        store.add_l1_to_l2_messages(&Retrieved::new(messages, 1..=1, 1)).await?;

        let res = store.get_l1_to_l2_messages(3).await;

        assert!(matches!(res, Err(StoreError::MessageGap(3))));
        Ok(())
    }

    #[tokio::test]
    async fn test_message_pointer_should_not_move_backward() -> eyre::Result<()> {
        let store = MemoryArchiverStore::new();
        store.add_l1_to_l2_messages(&Retrieved::new(vec![message(0, 1, 8)], 1..=10, 8)).await?;

        store.add_l1_to_l2_messages(&Retrieved::empty(5..=6)).await?;

        assert_eq!(store.get_sync_point().await?.messages_synced_to, Some(8));
        Ok(())
    }

    #[tokio::test]
    async fn test_should_filter_public_logs() -> eyre::Result<()> {
        // Given
        let store = MemoryArchiverStore::new();
        let mut blocks = chain(3);
        for (i, block) in blocks.iter_mut().enumerate() {
            block.body.tx_effects.push(TxEffect {
                public_logs: vec![
                    PublicLog::new(B256::repeat_byte(0xaa), vec![B256::repeat_byte(i as u8)]),
                    PublicLog::new(B256::repeat_byte(0xbb), vec![]),
                ],
                ..Default::default()
            });
        }
        store.add_logs(&blocks).await?;

        // When
        let filter = LogFilter {
            from_block: Some(2),
            to_block: None,
            contract_address: Some(B256::repeat_byte(0xaa)),
        };
        let logs = store.get_public_logs(&filter).await?;

        // Then
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|l| l.block_number >= 2 && l.log_index == 0));

        store.delete_logs(&blocks[2..]).await?;
        assert_eq!(store.get_public_logs(&filter).await?.len(), 1);

        Ok(())
    }
}
