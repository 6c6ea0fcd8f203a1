//! Sync pass tests against a mocked rollup.

use alloy_primitives::B256;
use archiver::{Archiver, ArchiverConfig, ArchiverError, ArchiverEvent};
use archiver_l1::test_utils::MockL1View;
use archiver_primitives::{
    test_utils::{chain, chain_from, contract::ContractClassFixture, published},
    ContractInstanceDeployedEvent, InboxMessage, L1RollupConstants, L2Block, PublishedL2Block,
    TxEffect,
};
use archiver_store::{
    test_utils::{FailingArchiverStore, StoreWrite},
    ArchiverStore, MemoryArchiverStore,
};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};

type TestArchiver = Archiver<Arc<MockL1View>, Arc<MemoryArchiverStore>>;

const CONSTANTS: L1RollupConstants = L1RollupConstants {
    l1_start_block: 1,
    l1_genesis_time: 0,
    slot_duration: 24,
    ethereum_slot_duration: 12,
    epoch_duration: 32,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Returns an archiver searching L1 windows of 4 blocks.
fn setup(config: ArchiverConfig) -> (Arc<MockL1View>, Arc<MemoryArchiverStore>, TestArchiver) {
    init_tracing();
    let l1 = Arc::new(MockL1View::new(CONSTANTS));
    let store = Arc::new(MemoryArchiverStore::new());
    let archiver = Archiver::new(l1.clone(), store.clone(), config.with_batch_size(2), CONSTANTS);
    (l1, store, archiver)
}

fn setup_failing() -> (
    Arc<MockL1View>,
    Arc<FailingArchiverStore>,
    Archiver<Arc<MockL1View>, Arc<FailingArchiverStore>>,
) {
    init_tracing();
    let l1 = Arc::new(MockL1View::new(CONSTANTS));
    let store = Arc::new(FailingArchiverStore::new());
    let config = ArchiverConfig::default().with_batch_size(2);
    let archiver = Archiver::new(l1.clone(), store.clone(), config, CONSTANTS);
    (l1, store, archiver)
}

/// Publishes each block in its own L1 block, starting at `first_l1_block`.
fn publish(l1: &MockL1View, blocks: &[L2Block], first_l1_block: u64) {
    l1.publish_blocks(
        blocks.iter().cloned().zip(first_l1_block..).map(|(block, l1)| published(block, l1)),
    );
}

fn message(index: u64, l2_block_number: u64, l1_block_number: u64) -> InboxMessage {
    InboxMessage {
        index,
        leaf: B256::left_padding_from(&(index + 1).to_be_bytes()),
        l1_block_number,
        l1_block_hash: B256::left_padding_from(&l1_block_number.to_be_bytes()),
        l2_block_number,
    }
}

fn drain(events: &mut broadcast::Receiver<ArchiverEvent>) -> Vec<ArchiverEvent> {
    let mut drained = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => drained.push(event),
            Err(TryRecvError::Empty | TryRecvError::Closed) => return drained,
            Err(TryRecvError::Lagged(_)) => {}
        }
    }
}

async fn stored_blocks(store: &MemoryArchiverStore) -> eyre::Result<Vec<PublishedL2Block>> {
    Ok(store.get_blocks(1, usize::MAX).await?)
}

#[tokio::test]
async fn test_should_not_change_state_on_repeated_sync() -> eyre::Result<()> {
    // Given
    let (l1, store, mut archiver) = setup(ArchiverConfig::default());
    let fixture = ContractClassFixture::new(7, 2, 1);
    let mut blocks = chain(5);
    blocks[2].body.tx_effects.push(TxEffect {
        contract_class_logs: vec![fixture.registered_event().to_log()],
        ..Default::default()
    });
    publish(&l1, &blocks, 8);
    l1.insert_messages([message(0, 1, 3), message(1, 1, 12)]);
    l1.set_current_l1_block(12);
    archiver.sync(true).await?;

    let sync_point = store.get_sync_point().await?;
    let synced = stored_blocks(&store).await?;
    let class_ids = store.get_contract_class_ids().await?;
    let (block_queries, message_queries) = (l1.block_queries(), l1.message_queries());

    // When
    archiver.sync(false).await?;

    // Then
    assert_eq!(sync_point.blocks_synced_to, Some(12));
    assert_eq!(sync_point.messages_synced_to, Some(12));
    assert_eq!(store.get_sync_point().await?, sync_point);
    assert_eq!(stored_blocks(&store).await?, synced);
    assert_eq!(store.get_contract_class_ids().await?, class_ids);
    assert_eq!(class_ids, vec![fixture.class.id]);
    assert_eq!(l1.block_queries(), block_queries);
    assert_eq!(l1.message_queries(), message_queries);

    Ok(())
}

#[tokio::test]
async fn test_should_sync_messages_in_windows() -> eyre::Result<()> {
    // Given
    let (l1, store, mut archiver) = setup(ArchiverConfig::default());
    l1.insert_messages([message(1, 1, 3), message(0, 1, 3), message(16, 2, 9)]);
    l1.set_current_l1_block(20);

    // When
    archiver.sync(false).await?;

    // Then
    assert_eq!(l1.message_queries(), 4);
    assert_eq!(store.get_total_l1_to_l2_message_count().await?, 3);
    // the pointer trails the last window, which held no message.
    assert_eq!(store.get_sync_point().await?.messages_synced_to, Some(15));
    assert_eq!(
        store.get_l1_to_l2_messages(1).await?,
        vec![message(0, 1, 3).leaf, message(1, 1, 3).leaf]
    );
    assert_eq!(store.get_l1_to_l2_message_index(message(16, 2, 9).leaf).await?, Some(16));

    Ok(())
}

#[tokio::test]
async fn test_should_not_query_messages_if_counts_match() -> eyre::Result<()> {
    // Given
    let (l1, store, mut archiver) = setup(ArchiverConfig::default());
    l1.insert_messages([message(0, 1, 2)]);
    l1.set_current_l1_block(4);
    archiver.sync(false).await?;
    let queries = l1.message_queries();

    // When
    l1.set_current_l1_block(40);
    archiver.sync(false).await?;

    // Then
    assert_eq!(l1.message_queries(), queries);
    assert_eq!(store.get_sync_point().await?.messages_synced_to, Some(40));

    Ok(())
}

#[tokio::test]
async fn test_empty_windows_should_not_advance_block_pointer() -> eyre::Result<()> {
    // Given
    let (l1, store, mut archiver) = setup(ArchiverConfig::default());
    publish(&l1, &chain(2), 2);
    l1.set_current_l1_block(20);

    // When
    archiver.sync(false).await?;

    // Then
    assert_eq!(store.get_synced_l2_block_number().await?, 2);
    assert_eq!(store.get_sync_point().await?.blocks_synced_to, Some(3));
    assert_eq!(l1.block_queries(), 4);

    Ok(())
}

#[tokio::test]
async fn test_should_only_advance_pointer_when_chain_unchanged() -> eyre::Result<()> {
    // Given
    let (l1, store, mut archiver) = setup(ArchiverConfig::default());
    publish(&l1, &chain(10), 1);
    l1.set_current_l1_block(10);
    archiver.sync(false).await?;
    let synced = stored_blocks(&store).await?;
    let block_queries = l1.block_queries();
    let mut events = archiver.subscribe();

    // When
    l1.set_current_l1_block(15);
    archiver.sync(false).await?;

    // Then
    assert_eq!(stored_blocks(&store).await?, synced);
    assert_eq!(store.get_sync_point().await?.blocks_synced_to, Some(15));
    assert_eq!(l1.block_queries(), block_queries);
    assert_eq!(l1.archive_queries(), 0);
    assert!(drain(&mut events).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_should_unwind_to_common_ancestor_on_reorg() -> eyre::Result<()> {
    // Given
    let (l1, store, mut archiver) = setup(ArchiverConfig::default());
    let blocks = chain(10);
    publish(&l1, &blocks, 1);
    l1.set_current_l1_block(10);
    archiver.sync(false).await?;
    let mut events = archiver.subscribe();

    let fork = chain_from(Some(&blocks[6]), 3);
    l1.reorg_from(8, fork.iter().cloned().zip(11..).map(|(b, l1)| published(b, l1)));
    l1.set_current_l1_block(13);

    // When
    archiver.sync(false).await?;

    // Then
    assert_eq!(l1.archive_queries(), 3);
    assert_eq!(
        drain(&mut events),
        vec![
            ArchiverEvent::ChainUnwound { from: 10, to: 7 },
            ArchiverEvent::BlocksAdded { from: 8, to: 10 }
        ]
    );

    let stored = stored_blocks(&store).await?.into_iter().map(|b| b.block).collect::<Vec<_>>();
    assert_eq!(stored[..7], blocks[..7]);
    assert_eq!(stored[7..], fork[..]);

    Ok(())
}

#[tokio::test]
async fn test_should_fail_on_reorg_deeper_than_max_depth() -> eyre::Result<()> {
    // Given
    let (l1, store, mut archiver) =
        setup(ArchiverConfig::default().with_max_reorg_depth(Some(2)));
    let blocks = chain(10);
    publish(&l1, &blocks, 1);
    l1.set_current_l1_block(10);
    archiver.sync(false).await?;

    let fork = chain_from(Some(&blocks[6]), 3);
    l1.reorg_from(8, fork.into_iter().zip(11..).map(|(b, l1)| published(b, l1)));
    l1.set_current_l1_block(13);

    // When
    let res = archiver.sync(false).await;

    // Then
    assert!(matches!(res, Err(ArchiverError::ReorgTooDeep { tip: 10, max_depth: 2 })));
    assert_eq!(store.get_synced_l2_block_number().await?, 10);
    assert_eq!(store.get_sync_point().await?.blocks_synced_to, Some(10));

    Ok(())
}

#[tokio::test]
async fn test_should_unwind_pending_chain_before_prune() -> eyre::Result<()> {
    // Given
    let (l1, store, mut archiver) = setup(ArchiverConfig::default());
    let blocks = chain(12);
    publish(&l1, &blocks, 1);
    l1.set_proven_block_number(9);
    l1.set_current_l1_block(12);
    archiver.sync(false).await?;
    assert_eq!(store.get_proven_l2_block_number().await?, 9);
    let mut events = archiver.subscribe();

    // When
    l1.set_can_prune(true);
    l1.set_current_l1_block(13);
    archiver.sync(false).await?;

    // Then
    assert_eq!(store.get_synced_l2_block_number().await?, 9);
    assert_eq!(store.get_proven_l2_block_number().await?, 9);
    assert!(store.get_block(10).await?.is_none());
    assert_eq!(
        drain(&mut events),
        vec![ArchiverEvent::L2PruneDetected {
            block_number: 12,
            slot_number: blocks[11].slot_number(),
            epoch_number: CONSTANTS.epoch_at_slot(blocks[11].slot_number()),
        }]
    );

    Ok(())
}

#[tokio::test]
async fn test_proven_block_should_not_regress() -> eyre::Result<()> {
    // Given
    let (l1, store, mut archiver) = setup(ArchiverConfig::default());
    publish(&l1, &chain(5), 1);
    l1.set_proven_block_number(4);
    l1.set_current_l1_block(5);
    archiver.sync(false).await?;
    assert_eq!(store.get_proven_l2_block_number().await?, 4);
    let mut events = archiver.subscribe();

    // When
    l1.set_proven_block_number(2);
    l1.set_current_l1_block(6);
    archiver.sync(false).await?;

    // Then
    assert_eq!(store.get_proven_l2_block_number().await?, 4);
    assert!(drain(&mut events).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_should_defer_proven_update_until_block_is_synced() -> eyre::Result<()> {
    // Given
    let (l1, store, mut archiver) = setup(ArchiverConfig::default());
    let blocks = chain(4);
    publish(&l1, &blocks, 1);
    l1.set_proven_block_number(4);
    l1.set_current_l1_block(4);
    let mut events = archiver.subscribe();

    // When
    archiver.sync(false).await?;

    // Then
    assert_eq!(store.get_proven_l2_block_number().await?, 4);
    let epoch_number = CONSTANTS.epoch_at_slot(blocks[3].slot_number());
    assert_eq!(store.get_proven_l2_epoch_number().await?, Some(epoch_number));
    let events = drain(&mut events);
    assert!(events.contains(&ArchiverEvent::ProvenChainUpdated { block_number: 4, epoch_number }));

    Ok(())
}

#[tokio::test]
async fn test_should_remove_entities_of_unwound_blocks() -> eyre::Result<()> {
    // Given
    let (l1, store, mut archiver) = setup(ArchiverConfig::default());
    let fixture = ContractClassFixture::new(3, 1, 1);
    let deployment = ContractInstanceDeployedEvent {
        address: B256::repeat_byte(0xaa),
        version: 1,
        contract_class_id: fixture.class.id,
        ..Default::default()
    };

    let mut blocks = chain(3);
    let mut class_logs = vec![fixture.registered_event().to_log()];
    class_logs.extend(fixture.private_broadcast_events().iter().map(|e| e.to_log()));
    blocks[2].body.tx_effects.push(TxEffect {
        contract_class_logs: class_logs,
        private_logs: vec![deployment.to_log()],
        ..Default::default()
    });
    publish(&l1, &blocks, 1);
    l1.set_current_l1_block(3);
    archiver.sync(false).await?;

    let class = store.get_contract_class(fixture.class.id).await?.expect("class is registered");
    assert_eq!(class.private_functions, fixture.private_functions);
    assert!(store.get_contract_instance(deployment.address, 3).await?.is_some());

    // When
    let fork = chain_from(Some(&blocks[1]), 1);
    l1.reorg_from(3, fork.into_iter().map(|b| published(b, 4)));
    l1.set_current_l1_block(4);
    archiver.sync(false).await?;

    // Then
    assert_eq!(store.get_synced_l2_block_number().await?, 3);
    assert!(store.get_contract_class(fixture.class.id).await?.is_none());
    assert!(store.get_contract_class_ids().await?.is_empty());
    assert!(store.get_contract_instance(deployment.address, 3).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_should_expose_l2_slot_and_epoch() -> eyre::Result<()> {
    // Given
    let (l1, _store, mut archiver) = setup(ArchiverConfig::default());
    let source = archiver.source();
    assert_eq!(source.get_l2_slot_number(), None);
    l1.set_current_l1_block(10);

    // When
    archiver.sync(false).await?;

    // Then
    // the L1 block 10 is mined 108 seconds after genesis, the next one at 120.
    assert_eq!(archiver.get_l2_slot_number(), Some(5));
    assert_eq!(source.get_l2_slot_number(), Some(5));
    assert_eq!(source.get_l2_epoch_number(), Some(0));
    assert_eq!(source.get_l1_snapshot().map(|s| s.block_number), Some(10));

    Ok(())
}

#[tokio::test]
async fn test_should_retry_whole_batch_after_failed_write() -> eyre::Result<()> {
    for write in [StoreWrite::AddLogs, StoreWrite::AddFunctions, StoreWrite::AddBlocks] {
        // Given
        let (l1, store, mut archiver) = setup_failing();
        let fixture = ContractClassFixture::new(5, 2, 1);
        let deployment = ContractInstanceDeployedEvent {
            address: B256::repeat_byte(0xbb),
            version: 1,
            contract_class_id: fixture.class.id,
            ..Default::default()
        };
        let mut blocks = chain(3);
        let mut class_logs = vec![fixture.registered_event().to_log()];
        class_logs.extend(fixture.private_broadcast_events().iter().map(|e| e.to_log()));
        blocks[1].body.tx_effects.push(TxEffect {
            nullifiers: vec![B256::repeat_byte(0xcc)],
            private_logs: vec![deployment.to_log()],
            contract_class_logs: class_logs,
            ..Default::default()
        });
        publish(&l1, &blocks, 1);
        l1.set_current_l1_block(3);
        store.fail_next(write, 1);

        // When
        let res = archiver.sync(false).await;

        // Then
        assert!(matches!(res, Err(ArchiverError::StoreWriteFailed(_))), "{write:?}: {res:?}");
        assert_eq!(store.get_synced_l2_block_number().await?, 0);
        assert_eq!(store.get_sync_point().await?.blocks_synced_to, None);
        assert!(store.get_contract_class(fixture.class.id).await?.is_none());
        assert!(store.get_contract_instance(deployment.address, 3).await?.is_none());
        assert!(store.get_private_logs(1, 3).await?.is_empty());
        assert_eq!(store.find_nullifier_block_number(B256::repeat_byte(0xcc)).await?, None);

        // When
        archiver.sync(false).await?;

        // Then
        assert_eq!(store.get_synced_l2_block_number().await?, 3);
        assert_eq!(store.get_sync_point().await?.blocks_synced_to, Some(3));
        let class = store.get_contract_class(fixture.class.id).await?.expect("class is stored");
        assert_eq!(class.private_functions, fixture.private_functions);
        assert!(store.get_contract_instance(deployment.address, 3).await?.is_some());
        assert_eq!(store.get_private_logs(2, 1).await?, vec![deployment.to_log()]);
        assert_eq!(store.find_nullifier_block_number(B256::repeat_byte(0xcc)).await?, Some(2));
    }

    Ok(())
}

#[tokio::test]
async fn test_should_not_advance_message_pointer_on_failed_write() -> eyre::Result<()> {
    // Given
    let (l1, store, mut archiver) = setup_failing();
    l1.insert_messages([message(0, 1, 2)]);
    l1.set_current_l1_block(3);
    store.fail_next(StoreWrite::AddMessages, 1);

    // When
    let res = archiver.sync(false).await;

    // Then
    assert!(matches!(res, Err(ArchiverError::StoreWriteFailed(_))));
    assert_eq!(store.get_sync_point().await?.messages_synced_to, None);
    assert_eq!(store.get_total_l1_to_l2_message_count().await?, 0);

    archiver.sync(false).await?;
    assert_eq!(store.get_sync_point().await?.messages_synced_to, Some(2));
    assert_eq!(store.get_total_l1_to_l2_message_count().await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_should_fail_on_missing_local_tip() -> eyre::Result<()> {
    // Given
    let (l1, store, mut archiver) = setup_failing();
    let blocks = chain(3);
    publish(&l1, &blocks[..2], 1);
    l1.set_current_l1_block(2);
    archiver.sync(false).await?;

    publish(&l1, &blocks[2..], 3);
    l1.set_current_l1_block(3);
    store.hide_block(2);

    // When
    let res = archiver.sync(false).await;

    // Then
    assert!(matches!(res, Err(ArchiverError::MissingLocalBlock(2))));
    assert_eq!(store.get_synced_l2_block_number().await?, 2);
    assert_eq!(store.get_sync_point().await?.blocks_synced_to, Some(2));

    Ok(())
}
