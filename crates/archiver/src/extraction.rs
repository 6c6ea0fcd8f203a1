//! Derives contract entities from block logs and keeps them in sync with the stored chain.

use crate::{error::ArchiverResult, metrics::ArchiverMetrics, ArchiverError};
use alloy_primitives::B256;
use archiver_primitives::{
    BroadcastFunction, ContractClass, ContractInstance, ContractInstanceUpdate, L2Block,
    ProtocolEvent, PublishedL2Block,
};
use archiver_store::{ArchiverStore, StoreError};
use futures::{stream, StreamExt};
use itertools::Itertools;
use std::time::Instant;

/// Whether the entities are stored or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Store,
    Delete,
}

/// The entities carried by the logs of a single block.
#[derive(Debug, Default)]
struct BlockEntities {
    classes: Vec<ContractClass>,
    instances: Vec<ContractInstance>,
    updates: Vec<ContractInstanceUpdate>,
    functions: Vec<(B256, BroadcastFunction)>,
}

impl BlockEntities {
    /// Decodes the protocol events of the block. Logs failing to decode are skipped.
    fn from_block(block: &L2Block) -> Self {
        let number = block.number();
        let class_log_events =
            block.contract_class_logs().map(ProtocolEvent::from_contract_class_log);
        let private_log_events = block.private_logs().map(ProtocolEvent::from_private_log);
        let public_log_events = block.public_logs().map(ProtocolEvent::from_public_log);

        let mut entities = Self::default();
        for event in class_log_events.chain(private_log_events).chain(public_log_events) {
            let event = match event {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(
                        target: "archiver::extraction",
                        block = number,
                        %err,
                        "failed to decode protocol event"
                    );
                    continue;
                }
            };

            match event {
                ProtocolEvent::ContractClassRegistered(event) => {
                    match event.into_contract_class() {
                        Ok(class) => entities.classes.push(class),
                        Err(err) => {
                            tracing::warn!(
                                target: "archiver::extraction",
                                block = number,
                                %err,
                                "skipping contract class"
                            );
                        }
                    }
                }
                ProtocolEvent::ContractInstanceDeployed(event) => {
                    entities.instances.push(event.into_contract_instance())
                }
                ProtocolEvent::ContractInstanceUpdated(event) => {
                    entities.updates.push(event.into_contract_instance_update())
                }
                ProtocolEvent::PrivateFunctionBroadcasted(event) => entities
                    .functions
                    .push((event.contract_class_id, BroadcastFunction::Private(event.function))),
                ProtocolEvent::UtilityFunctionBroadcasted(event) => entities
                    .functions
                    .push((event.contract_class_id, BroadcastFunction::Utility(event.function))),
            }
        }
        entities
    }
}

/// Persists blocks along with the logs, nullifiers and contract entities they carry, and removes
/// them symmetrically on unwind.
#[derive(Debug, Clone)]
pub(crate) struct EntityExtractor<S> {
    store: S,
    concurrency: usize,
    metrics: ArchiverMetrics,
}

impl<S: ArchiverStore> EntityExtractor<S> {
    /// Returns a new [`EntityExtractor`] processing up to `concurrency` blocks at once.
    pub(crate) fn new(store: S, concurrency: usize, metrics: ArchiverMetrics) -> Self {
        Self { store, concurrency: concurrency.max(1), metrics }
    }

    /// Adds the blocks to the store along with their logs, nullifiers and entities.
    ///
    /// The blocks must extend the stored chain. Entities are written first and the blocks last,
    /// so a batch failing midway leaves the tip untouched and can be retried as a whole. The
    /// entities of a failed batch are removed again.
    pub(crate) async fn add_blocks(&self, blocks: &[PublishedL2Block]) -> ArchiverResult<()> {
        let start = Instant::now();
        let tip = self.store.get_synced_l2_block_number().await?;
        for (expected, block) in (tip + 1..).zip(blocks) {
            if block.number() != expected {
                return Err(StoreError::NonSequentialBlock { expected, got: block.number() }.into());
            }
        }

        let l2_blocks = blocks.iter().map(|b| b.block.clone()).collect::<Vec<_>>();
        let entities =
            blocks.iter().map(|b| (b.number(), BlockEntities::from_block(&b.block))).collect_vec();

        let persisted = self.persist(blocks, &l2_blocks, &entities).await;
        if let Err(err) = persisted {
            self.revert_entities(&l2_blocks, &entities).await;
            return Err(err);
        }

        if !blocks.is_empty() {
            let per_block = start.elapsed().as_secs_f64() / blocks.len() as f64;
            self.metrics.block_processing_duration.record(per_block);
        }
        Ok(())
    }

    /// Writes the logs, nullifiers and entities of the blocks, then the blocks themselves.
    /// Broadcast functions are stored once every class of the batch is registered.
    async fn persist(
        &self,
        blocks: &[PublishedL2Block],
        l2_blocks: &[L2Block],
        entities: &[(u64, BlockEntities)],
    ) -> ArchiverResult<()> {
        let registrations = entities
            .iter()
            .map(|(number, entities)| self.update_entities(entities, *number, Operation::Store))
            .collect::<Vec<_>>();
        let (logs, nullifiers, registered) = futures::join!(
            self.store.add_logs(l2_blocks),
            self.store.add_nullifiers(l2_blocks),
            stream::iter(registrations).buffer_unordered(self.concurrency).collect::<Vec<_>>(),
        );
        let registered = registered.into_iter().collect::<ArchiverResult<Vec<_>>>()?;
        if !(logs? && nullifiers? && registered.into_iter().all(|ok| ok)) {
            return Err(ArchiverError::StoreWriteFailed("add block entities"));
        }

        let functions = entities
            .iter()
            .map(|(number, entities)| self.store_broadcast_functions(&entities.functions, *number))
            .collect::<Vec<_>>();
        let functions =
            stream::iter(functions).buffered(self.concurrency).collect::<Vec<_>>().await;
        if !functions.into_iter().collect::<ArchiverResult<Vec<_>>>()?.into_iter().all(|ok| ok) {
            return Err(ArchiverError::StoreWriteFailed("store broadcast functions"));
        }

        if !self.store.add_blocks(blocks).await? {
            return Err(ArchiverError::StoreWriteFailed("add blocks"));
        }
        Ok(())
    }

    /// Removes the logs, nullifiers and entities written for blocks that were not stored.
    /// Entities first seen in an earlier block are kept.
    async fn revert_entities(&self, l2_blocks: &[L2Block], entities: &[(u64, BlockEntities)]) {
        let deletions = entities
            .iter()
            .map(|(number, entities)| self.update_entities(entities, *number, Operation::Delete))
            .collect::<Vec<_>>();
        let (logs, nullifiers, deleted) = futures::join!(
            self.store.delete_logs(l2_blocks),
            self.store.delete_nullifiers(l2_blocks),
            stream::iter(deletions).buffer_unordered(self.concurrency).collect::<Vec<_>>(),
        );

        let reverted = matches!(logs, Ok(true))
            && matches!(nullifiers, Ok(true))
            && deleted.iter().all(|res| matches!(res, Ok(true)));
        if !reverted {
            tracing::error!(
                target: "archiver::extraction",
                count = l2_blocks.len(),
                "failed to revert the entities of rejected blocks"
            );
        }
    }

    /// Removes `count` blocks from the tip `from`, along with their logs, nullifiers and entities.
    /// Broadcast functions are removed with their class. The blocks are removed last.
    pub(crate) async fn unwind_blocks(&self, from: u64, count: u64) -> ArchiverResult<()> {
        let tip = self.store.get_synced_l2_block_number().await?;
        if from != tip {
            return Err(StoreError::UnwindNotFromTip { requested: from, tip }.into());
        }
        if count == 0 {
            return Ok(());
        }

        let first = (from + 1).saturating_sub(count);
        let blocks = self.store.get_blocks(first, count as usize).await?;
        let l2_blocks = blocks.iter().map(|b| b.block.clone()).collect::<Vec<_>>();
        let entities =
            blocks.iter().map(|b| (b.number(), BlockEntities::from_block(&b.block))).collect_vec();

        let deletions = entities
            .iter()
            .map(|(number, entities)| self.update_entities(entities, *number, Operation::Delete))
            .collect::<Vec<_>>();
        let (deleted, logs, nullifiers) = futures::join!(
            stream::iter(deletions).buffer_unordered(self.concurrency).collect::<Vec<_>>(),
            self.store.delete_logs(&l2_blocks),
            self.store.delete_nullifiers(&l2_blocks),
        );
        let deleted = deleted.into_iter().collect::<ArchiverResult<Vec<_>>>()?;
        if !(logs? && nullifiers? && deleted.into_iter().all(|ok| ok)) {
            return Err(ArchiverError::StoreWriteFailed("unwind block entities"));
        }

        if !self.store.unwind_blocks(from, count).await? {
            return Err(ArchiverError::StoreWriteFailed("unwind blocks"));
        }

        self.metrics.unwound_blocks.increment(count);
        Ok(())
    }

    /// Stores or deletes the classes, instances and instance updates of a block.
    async fn update_entities(
        &self,
        entities: &BlockEntities,
        block_number: u64,
        operation: Operation,
    ) -> ArchiverResult<bool> {
        let (classes, instances, updates) = match operation {
            Operation::Store => {
                let commitments = entities
                    .classes
                    .iter()
                    .map(ContractClass::public_bytecode_commitment)
                    .collect::<Vec<_>>();
                futures::join!(
                    self.store.add_contract_classes(&entities.classes, &commitments, block_number),
                    self.store.add_contract_instances(&entities.instances, block_number),
                    self.store.add_contract_instance_updates(&entities.updates, block_number),
                )
            }
            Operation::Delete => futures::join!(
                self.store.delete_contract_classes(&entities.classes, block_number),
                self.store.delete_contract_instances(&entities.instances, block_number),
                self.store.delete_contract_instance_updates(&entities.updates, block_number),
            ),
        };

        for class in &entities.classes {
            tracing::trace!(
                target: "archiver::extraction",
                block = block_number,
                id = %class.id,
                ?operation,
                "contract class"
            );
        }
        for instance in &entities.instances {
            tracing::trace!(
                target: "archiver::extraction",
                block = block_number,
                address = %instance.address,
                ?operation,
                "contract instance"
            );
        }

        Ok(classes? && instances? && updates?)
    }

    /// Stores the functions broadcast in a block, grouped by class. Groups targeting an unknown
    /// class are skipped and functions with an invalid membership proof are dropped.
    async fn store_broadcast_functions(
        &self,
        functions: &[(B256, BroadcastFunction)],
        block_number: u64,
    ) -> ArchiverResult<bool> {
        let groups = functions.iter().cloned().into_group_map();

        let mut success = true;
        for (class_id, functions) in groups {
            let Some(class) = self.store.get_contract_class(class_id).await? else {
                tracing::warn!(
                    target: "archiver::extraction",
                    block = block_number,
                    %class_id,
                    count = functions.len(),
                    "skipping broadcast functions for unknown contract class"
                );
                self.metrics.skipped_functions.increment(functions.len() as u64);
                continue;
            };

            let total = functions.len();
            let private =
                functions.iter().filter(|f| matches!(f, BroadcastFunction::Private(_))).count();
            let valid =
                functions.into_iter().filter(|f| f.is_valid_for(&class)).collect::<Vec<_>>();
            if valid.len() != total {
                tracing::warn!(
                    target: "archiver::extraction",
                    block = block_number,
                    %class_id,
                    private,
                    utility = total - private,
                    valid = valid.len(),
                    "dropping broadcast functions with invalid membership proofs"
                );
                self.metrics.invalid_functions.increment((total - valid.len()) as u64);
            }

            if !valid.is_empty() {
                tracing::debug!(
                    target: "archiver::extraction",
                    block = block_number,
                    %class_id,
                    count = valid.len(),
                    "storing broadcast functions"
                );
                success &= self.store.add_functions(class_id, &valid).await?;
            }
        }
        Ok(success)
    }
}
