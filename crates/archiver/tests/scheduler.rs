//! Scheduler tests.

use archiver::{Archiver, ArchiverConfig, ArchiverEvent, SchedulerError, SyncScheduler};
use archiver_l1::test_utils::MockL1View;
use archiver_primitives::{
    test_utils::{chain, published},
    L1RollupConstants,
};
use archiver_store::{test_utils::FailingArchiverStore, ArchiverStore, MemoryArchiverStore};
use std::{sync::Arc, time::Duration};

type TestScheduler = SyncScheduler<Arc<MockL1View>, Arc<MemoryArchiverStore>>;

const POLLING_INTERVAL: Duration = Duration::from_millis(10);

fn setup() -> (Arc<MockL1View>, Arc<MemoryArchiverStore>, TestScheduler) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let constants = L1RollupConstants { l1_start_block: 1, ..Default::default() };
    let l1 = Arc::new(MockL1View::new(constants));
    let store = Arc::new(MemoryArchiverStore::new());
    let config = ArchiverConfig::default().with_polling_interval(POLLING_INTERVAL);
    let scheduler = SyncScheduler::new(Archiver::new(l1.clone(), store.clone(), config, constants));
    (l1, store, scheduler)
}

#[tokio::test]
async fn test_should_reject_second_start() -> eyre::Result<()> {
    // Given
    let (_l1, _store, mut scheduler) = setup();
    scheduler.start(false).await?;

    // When
    let res = scheduler.start(false).await;

    // Then
    assert!(matches!(res, Err(SchedulerError::AlreadyRunning)));
    assert!(scheduler.is_running());
    scheduler.stop().await?;
    assert!(!scheduler.is_running());

    Ok(())
}

#[tokio::test]
async fn test_should_retry_initial_sync_until_success() -> eyre::Result<()> {
    // Given
    let (l1, store, mut scheduler) = setup();
    l1.publish_blocks(chain(3).into_iter().zip(1..).map(|(b, l1)| published(b, l1)));
    l1.set_current_l1_block(3);
    l1.fail_next_head_queries(2);

    // When
    scheduler.start(true).await?;

    // Then
    assert_eq!(store.get_synced_l2_block_number().await?, 3);
    scheduler.stop().await?;

    Ok(())
}

#[tokio::test]
async fn test_should_sync_periodically() -> eyre::Result<()> {
    // Given
    let (l1, _store, mut scheduler) = setup();
    let mut events = scheduler.subscribe();
    scheduler.start(false).await?;

    // When
    l1.publish_blocks(chain(2).into_iter().zip(1..).map(|(b, l1)| published(b, l1)));
    l1.set_current_l1_block(2);

    // Then
    let event = tokio::time::timeout(Duration::from_secs(5), events.recv()).await??;
    assert_eq!(event, ArchiverEvent::BlocksAdded { from: 1, to: 2 });
    assert_eq!(scheduler.source().get_block_number().await?, 2);
    scheduler.stop().await?;

    Ok(())
}

#[tokio::test]
async fn test_stop_should_be_idempotent() -> eyre::Result<()> {
    let (_l1, _store, mut scheduler) = setup();

    scheduler.stop().await?;
    scheduler.start(false).await?;
    scheduler.stop().await?;
    scheduler.stop().await?;

    assert!(!scheduler.is_running());
    scheduler.sync_once().await?;

    Ok(())
}

#[tokio::test]
async fn test_stop_should_wait_for_in_flight_pass() -> eyre::Result<()> {
    // Given
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let constants = L1RollupConstants { l1_start_block: 1, ..Default::default() };
    let l1 = Arc::new(MockL1View::new(constants));
    let store = Arc::new(FailingArchiverStore::new());
    let config = ArchiverConfig::default().with_polling_interval(POLLING_INTERVAL);
    let mut scheduler =
        SyncScheduler::new(Archiver::new(l1.clone(), store.clone(), config, constants));

    l1.publish_blocks(chain(2).into_iter().zip(1..).map(|(b, l1)| published(b, l1)));
    l1.set_current_l1_block(2);
    store.hold_block_writes();
    let mut held = store.held_block_writes();
    scheduler.start(false).await?;
    tokio::time::timeout(Duration::from_secs(5), held.wait_for(|held| *held > 0)).await??;

    // When
    let stop = tokio::spawn(async move {
        scheduler.stop().await?;
        Ok::<_, SchedulerError>(scheduler)
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Then
    assert!(!stop.is_finished());
    store.release_block_writes();
    let scheduler = stop.await??;
    assert!(!scheduler.is_running());
    assert_eq!(store.get_synced_l2_block_number().await?, 2);

    Ok(())
}
